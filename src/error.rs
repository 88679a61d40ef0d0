use thiserror::Error;

/// Fatal machine faults. None of these are recoverable by the interpreted
/// program; the run loop halts and reports them to the caller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Fault {
    #[error("unrecognized instruction word {word:#06X} at {addr:#05X}")]
    UnknownOpcode { addr: u16, word: u16 },

    #[error("program image is {size} bytes but only {capacity} bytes of memory are free")]
    OversizedProgram { size: usize, capacity: usize },

    #[error("call stack overflow at {addr:#05X}")]
    StackOverflow { addr: u16 },

    #[error("return with an empty call stack at {addr:#05X}")]
    StackUnderflow { addr: u16 },

    #[error("memory access out of range at {addr:#06X}")]
    OutOfRange { addr: u16 },
}
