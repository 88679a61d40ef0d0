use crate::decode::Opcode;
use crate::display::{FrameBuffer, HEIGHT, WIDTH};
use crate::error::Fault;
use crate::keyboard::KEY_COUNT;
use crate::memory::{Addr, Memory, GLYPH_LEN, PROGRAM_START};
use crate::registers::{Registers, FLAG};
use log::trace;
use rand::Rng;

const STACK_DEPTH: usize = 16;

/// The whole machine: register file, index register, program counter, call
/// stack, timers, the keypad snapshot from the input adapter, and the
/// framebuffer. Instruction handlers are the only mutators.
pub struct Emulator {
    mem: Memory,
    regs: Registers,
    fb: FrameBuffer,
    pc: Addr,
    i: Addr,
    stack: [Addr; STACK_DEPTH],
    sp: usize,
    delay_timer: u8,
    sound_timer: u8,
    keys: [bool; KEY_COUNT],
}

impl Emulator {
    pub fn new() -> Self {
        Self {
            mem: Memory::new(),
            regs: Registers::new(),
            fb: FrameBuffer::new(),
            pc: PROGRAM_START,
            i: 0,
            stack: [0; STACK_DEPTH],
            sp: 0,
            delay_timer: 0,
            sound_timer: 0,
            keys: [false; KEY_COUNT],
        }
    }

    pub fn load_program(&mut self, image: &[u8]) -> Result<(), Fault> {
        self.mem.load_program(image)
    }

    /// Overwrite the keypad snapshot with the adapter's current poll.
    pub fn set_keys(&mut self, keys: [bool; KEY_COUNT]) {
        self.keys = keys;
    }

    pub fn sound_active(&self) -> bool {
        self.sound_timer > 0
    }

    pub fn framebuffer(&self) -> &FrameBuffer {
        &self.fb
    }

    pub fn take_dirty(&mut self) -> bool {
        self.fb.take_dirty()
    }

    /// One timer-domain tick: both counters count down toward 0 and stop
    /// there.
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    /// Fetch, decode and execute exactly one instruction.
    pub fn step(&mut self) -> Result<(), Fault> {
        let addr = self.pc;
        let word = self.mem.read_word(addr)?;
        let op = Opcode::decode(word).ok_or(Fault::UnknownOpcode { addr, word })?;
        trace!("{addr:#05X}: {word:04X} {op:?}");
        self.execute(op)
    }

    fn advance(&mut self) {
        self.pc = self.pc.wrapping_add(2);
    }

    fn skip_if(&mut self, cond: bool) {
        self.pc = self.pc.wrapping_add(if cond { 4 } else { 2 });
    }

    fn execute(&mut self, op: Opcode) -> Result<(), Fault> {
        match op {
            Opcode::ClearScreen => {
                self.fb.clear();
                self.advance();
            }
            Opcode::Return => {
                if self.sp == 0 {
                    return Err(Fault::StackUnderflow { addr: self.pc });
                }
                self.sp -= 1;
                self.pc = self.stack[self.sp].wrapping_add(2);
            }
            Opcode::Jump(addr) => {
                self.pc = addr;
            }
            Opcode::Call(addr) => {
                if self.sp == STACK_DEPTH {
                    return Err(Fault::StackOverflow { addr: self.pc });
                }
                self.stack[self.sp] = self.pc;
                self.sp += 1;
                self.pc = addr;
            }
            Opcode::SkipEqImm(x, nn) => {
                self.skip_if(self.regs.get(x) == nn);
            }
            Opcode::SkipNeImm(x, nn) => {
                self.skip_if(self.regs.get(x) != nn);
            }
            Opcode::SkipEqReg(x, y) => {
                self.skip_if(self.regs.get(x) == self.regs.get(y));
            }
            Opcode::SkipNeReg(x, y) => {
                self.skip_if(self.regs.get(x) != self.regs.get(y));
            }
            Opcode::LoadImm(x, nn) => {
                self.regs.set(x, nn);
                self.advance();
            }
            Opcode::AddImm(x, nn) => {
                // wraps silently, no flag
                self.regs.set(x, self.regs.get(x).wrapping_add(nn));
                self.advance();
            }
            Opcode::Copy(x, y) => {
                self.regs.set(x, self.regs.get(y));
                self.advance();
            }
            Opcode::Or(x, y) => {
                self.regs.set(x, self.regs.get(x) | self.regs.get(y));
                self.advance();
            }
            Opcode::And(x, y) => {
                self.regs.set(x, self.regs.get(x) & self.regs.get(y));
                self.advance();
            }
            Opcode::Xor(x, y) => {
                self.regs.set(x, self.regs.get(x) ^ self.regs.get(y));
                self.advance();
            }
            // The ALU flag is computed from the pre-op values and written to
            // VF after the result register, so it survives even when x is VF.
            Opcode::Add(x, y) => {
                let (sum, carry) = self.regs.get(x).overflowing_add(self.regs.get(y));
                self.regs.set(x, sum);
                self.regs.set(FLAG, carry as u8);
                self.advance();
            }
            Opcode::Sub(x, y) => {
                let (vx, vy) = (self.regs.get(x), self.regs.get(y));
                self.regs.set(x, vx.wrapping_sub(vy));
                self.regs.set(FLAG, (vx > vy) as u8);
                self.advance();
            }
            Opcode::ShiftRight(x, _) => {
                let vx = self.regs.get(x);
                self.regs.set(x, vx >> 1);
                self.regs.set(FLAG, vx & 1);
                self.advance();
            }
            Opcode::SubFrom(x, y) => {
                let (vx, vy) = (self.regs.get(x), self.regs.get(y));
                self.regs.set(x, vy.wrapping_sub(vx));
                self.regs.set(FLAG, (vy > vx) as u8);
                self.advance();
            }
            Opcode::ShiftLeft(x, _) => {
                let vx = self.regs.get(x);
                self.regs.set(x, vx << 1);
                self.regs.set(FLAG, vx >> 7);
                self.advance();
            }
            Opcode::LoadIndex(addr) => {
                self.i = addr;
                self.advance();
            }
            Opcode::JumpOffset(addr) => {
                self.pc = addr.wrapping_add(u16::from(self.regs.get(0)));
            }
            Opcode::Random(x, nn) => {
                self.regs.set(x, rand::thread_rng().gen::<u8>() & nn);
                self.advance();
            }
            Opcode::Draw(x, y, n) => {
                let ox = usize::from(self.regs.get(x)) % WIDTH;
                let oy = usize::from(self.regs.get(y)) % HEIGHT;
                let mut collision = false;
                for r in 0..u16::from(n) {
                    let row = oy + r as usize;
                    // sprites clip at the bottom edge; clipped rows are
                    // never fetched from memory
                    if row >= HEIGHT {
                        break;
                    }
                    let bits = self.mem.read(self.i.wrapping_add(r))?;
                    collision |= self.fb.xor_row(ox, row, bits);
                }
                self.regs.set(FLAG, collision as u8);
                self.fb.mark_dirty();
                self.advance();
            }
            Opcode::SkipKey(x) => {
                let key = self.regs.get(x) & 0xF;
                self.skip_if(self.keys[usize::from(key)]);
            }
            Opcode::SkipNoKey(x) => {
                let key = self.regs.get(x) & 0xF;
                self.skip_if(!self.keys[usize::from(key)]);
            }
            Opcode::ReadDelay(x) => {
                self.regs.set(x, self.delay_timer);
                self.advance();
            }
            Opcode::WaitKey(x) => {
                // busy poll: the pc stays put until a key is down, so the
                // next cycle lands on this instruction again
                if let Some(key) = self.keys.iter().position(|&down| down) {
                    self.regs.set(x, key as u8);
                    self.advance();
                }
            }
            Opcode::SetDelay(x) => {
                self.delay_timer = self.regs.get(x);
                self.advance();
            }
            Opcode::SetSound(x) => {
                self.sound_timer = self.regs.get(x);
                self.advance();
            }
            Opcode::AddIndex(x) => {
                self.i = self.i.wrapping_add(u16::from(self.regs.get(x)));
                self.advance();
            }
            Opcode::FontGlyph(x) => {
                self.i = u16::from(self.regs.get(x)) * GLYPH_LEN;
                self.advance();
            }
            Opcode::StoreBcd(x) => {
                let value = self.regs.get(x);
                self.mem.write(self.i, value / 100)?;
                self.mem.write(self.i.wrapping_add(1), value / 10 % 10)?;
                self.mem.write(self.i.wrapping_add(2), value % 10)?;
                self.advance();
            }
            Opcode::StoreRegs(x) => {
                // the index register is left pointing past the last byte
                // written; programs depend on this
                for r in 0..=x {
                    self.mem.write(self.i, self.regs.get(r))?;
                    self.i = self.i.wrapping_add(1);
                }
                self.advance();
            }
            Opcode::LoadRegs(x) => {
                for r in 0..=x {
                    self.regs.set(r, self.mem.read(self.i)?);
                    self.i = self.i.wrapping_add(1);
                }
                self.advance();
            }
        }
        Ok(())
    }
}
