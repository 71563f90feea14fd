use thiserror::Error;

use crate::{definitions::cpu, opcode::Opcode};

/// The fatal conditions of the interpreter.
///
/// None of these are retried; an instruction either completes against the
/// chip state or the execution loop halts and surfaces the error.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum ProcessError {
    #[error("A program of {len} bytes does not fit into the {max} bytes of work ram.")]
    InvalidProgramSize { len: usize, max: usize },
    #[error("Register index V{0:X} is outside of the register bank.")]
    IllegalRegister(usize),
    #[error("The call stack is limited to {} frames.", cpu::stack::SIZE)]
    StackOverflow,
    #[error("Return was executed on an empty call stack.")]
    StackUnderflow,
    #[error("Pointer location invalid there can not be an opcode at {pointer}, if data len is {len}")]
    MemoryInvalid { pointer: usize, len: usize },
}

/// A fetched word that matches no pattern of the instruction table.
///
/// This is the only non-fatal condition: the execution loop logs it and
/// advances, mirroring the leniency of the original interpreter towards
/// unimplemented system calls.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
#[error("An unsupported opcode was used {0:#06X?}.")]
pub struct UndefinedOpcode(pub Opcode);
