use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use log::error;

const TONE_HZ: f32 = 440.0;
const VOLUME: f32 = 0.25;

/// Audio adapter: a continuously running output stream that produces a sine
/// tone while the gate is open and silence otherwise. The gate is the only
/// state shared with the audio thread.
pub struct Beeper {
    _stream: cpal::Stream,
    gate: Arc<AtomicBool>,
}

impl Beeper {
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .context("no audio output device available")?;
        let supported = device
            .default_output_config()
            .context("querying audio output config")?;
        let format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();

        let gate = Arc::new(AtomicBool::new(false));
        let stream = match format {
            cpal::SampleFormat::F32 => Self::build::<f32>(&device, &config, Arc::clone(&gate))?,
            cpal::SampleFormat::I16 => Self::build::<i16>(&device, &config, Arc::clone(&gate))?,
            cpal::SampleFormat::U16 => Self::build::<u16>(&device, &config, Arc::clone(&gate))?,
            other => return Err(anyhow!("unsupported sample format '{other}'")),
        };
        stream.play().context("starting audio stream")?;

        Ok(Self {
            _stream: stream,
            gate,
        })
    }

    pub fn set_active(&self, on: bool) {
        self.gate.store(on, Ordering::Relaxed);
    }

    fn build<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        gate: Arc<AtomicBool>,
    ) -> Result<cpal::Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let sample_rate = config.sample_rate.0 as f32;
        let channels = config.channels as usize;
        let mut clock = 0f32;

        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        clock = (clock + 1.0) % sample_rate;
                        let value = if gate.load(Ordering::Relaxed) {
                            (clock * TONE_HZ * 2.0 * std::f32::consts::PI / sample_rate).sin()
                                * VOLUME
                        } else {
                            0.0
                        };
                        for sample in frame.iter_mut() {
                            *sample = T::from_sample(value);
                        }
                    }
                },
                |err| error!("audio stream error: {err}"),
                None,
            )
            .context("building audio stream")?;
        Ok(stream)
    }
}
