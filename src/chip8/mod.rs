//! The machine itself: state, memory model and opcode execution.
mod chipset;
mod opcodes;

/// reexport chipset structs and data for simpler usage
pub use chipset::*;
