pub mod chip8;
pub mod definitions;
pub mod devices;
pub mod framebuffer;
pub mod opcode;
mod error;

// reexporting for convenience
mod runner;
pub use error::*;
pub use runner::*;
