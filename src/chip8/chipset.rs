use std::convert::TryFrom;

use {
    crate::{
        definitions::{cpu, display::fontset, memory},
        devices::KeyboardCommands,
        error::ProcessError,
        framebuffer::FrameBuffer,
        opcode::{self, Instruction, Opcode, Operation},
    },
    rand::RngCore,
    tinyvec::ArrayVec,
};

/// The ChipSet struct represents the current state
/// of the system, it contains all the structures
/// needed for emulating an instant on the
/// Chip8 CPU.
pub struct ChipSet {
    /// all two bytes long and stored big-endian
    pub(super) opcode: Opcode,
    /// - `0x000-0x1FF` - reserved for the interpreter (contains the font)
    /// - `0x050-0x0A0` - used for the built in `4x5` pixel font set (`0-F`)
    /// - `0x200-0xFFE` - program ROM and work RAM
    pub(super) memory: Vec<u8>,
    /// `8-bit` data registers named `V0` to `VF`. The `VF` register doubles
    /// as a flag for some instructions; thus, it should be avoided. In an
    /// addition operation, `VF` is the carry flag, while in subtraction, it
    /// is the "no borrow" flag. In the draw instruction `VF` is set upon
    /// pixel collision.
    pub(super) registers: [u8; cpu::register::SIZE],
    /// The index for the register, this is a special register entry
    /// called index `I`
    pub(super) index_register: u16,
    /// The program counter is a CPU register in the computer processor
    /// which has the address of the next instruction to be executed from
    /// memory.
    pub(super) program_counter: usize,
    /// The stack is only used to store return addresses when subroutines
    /// are called, with a fixed nesting depth of `16`.
    pub(super) stack: ArrayVec<[u16; cpu::stack::SIZE]>,
    /// Delay timer: This timer is intended to be used for timing the
    /// events of games. Its value can be set and read.
    /// Counts down at 60 hertz, until it reaches 0.
    pub(super) delay_timer: u8,
    /// Sound timer: This timer is used for sound effects. When its value
    /// is nonzero, a beeping sound is made.
    /// Counts down at 60 hertz, until it reaches 0.
    pub(super) sound_timer: u8,
    /// The graphics of the Chip 8 are black and white and the screen has a
    /// total of `2048` pixels `(64 x 32)`, kept as one row bitmask per row.
    pub(super) framebuffer: FrameBuffer,
    /// This stores the random number generator, used by the chipset.
    /// It is stored into the chipset, so as to enable simple mocking
    /// of the given type.
    pub(super) rng: Box<dyn RngCore + Send>,
}

impl ChipSet {
    /// will create a blank chipset object, ready for a program load
    pub fn new() -> Self {
        let mut chip = Self {
            opcode: 0,
            memory: vec![0; memory::SIZE],
            registers: [0; cpu::register::SIZE],
            index_register: 0,
            program_counter: cpu::PROGRAM_COUNTER,
            stack: ArrayVec::new(),
            delay_timer: 0,
            sound_timer: 0,
            framebuffer: FrameBuffer::new(),
            rng: Box::new(rand::rngs::OsRng {}),
        };
        chip.seed_font();
        chip
    }

    /// Will write the program into memory, starting at `0x200`.
    ///
    /// The whole machine is reset first, so no state of a previously
    /// running program can leak into the new run. On a size error the
    /// chip is left untouched.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), ProcessError> {
        let max = memory::SIZE - cpu::PROGRAM_COUNTER;
        if program.len() > max {
            return Err(ProcessError::InvalidProgramSize {
                len: program.len(),
                max,
            });
        }

        self.reset();
        self.memory[cpu::PROGRAM_COUNTER..(cpu::PROGRAM_COUNTER + program.len())]
            .copy_from_slice(program);
        Ok(())
    }

    /// Exhaustive reset back to the post-construction state.
    fn reset(&mut self) {
        self.opcode = 0;
        self.memory.iter_mut().for_each(|byte| *byte = 0);
        self.registers = [0; cpu::register::SIZE];
        self.index_register = 0;
        self.program_counter = cpu::PROGRAM_COUNTER;
        self.stack.clear();
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.framebuffer.clear();
        self.seed_font();
    }

    fn seed_font(&mut self) {
        self.memory[fontset::LOCATION..(fontset::LOCATION + fontset::FONTSET.len())]
            .copy_from_slice(&fontset::FONTSET);
    }

    /// will advance the program by a single fetch-decode-execute step
    ///
    /// An undefined opcode is not fatal: it is logged and stepped over,
    /// like the original interpreter treated unimplemented system calls.
    pub fn step<K: KeyboardCommands>(&mut self, keyboard: &K) -> Result<Operation, ProcessError> {
        self.opcode = opcode::build_opcode(&self.memory, self.program_counter)?;

        let instruction = match Instruction::try_from(self.opcode) {
            Ok(instruction) => instruction,
            Err(err) => {
                log::warn!("{}", err);
                self.advance();
                return Ok(Operation::None);
            }
        };

        let operation = self.exec(instruction, keyboard)?;

        // jumping instructions place the program counter themselves, and a
        // cancelled key wait must stay retryable
        if instruction.advances_pc() && operation != Operation::Halt {
            self.advance();
        }
        Ok(operation)
    }

    /// will move the program counter to the next opcode
    pub(super) fn advance(&mut self) {
        self.program_counter += memory::opcodes::SIZE;
    }

    /// skip-type instructions step over the next opcode on top of the
    /// loop's own advance
    pub(super) fn skip_if(&mut self, cond: bool) {
        if cond {
            self.advance();
        }
    }

    /// Will read the given register.
    pub fn get_v(&self, index: usize) -> Result<u8, ProcessError> {
        self.registers
            .get(index)
            .copied()
            .ok_or(ProcessError::IllegalRegister(index))
    }

    /// Will write the given register.
    pub fn set_v(&mut self, index: usize, value: u8) -> Result<(), ProcessError> {
        match self.registers.get_mut(index) {
            Some(register) => {
                *register = value;
                Ok(())
            }
            None => Err(ProcessError::IllegalRegister(index)),
        }
    }

    /// Will push the current pointer to the stack
    pub(super) fn push_stack(&mut self, pointer: u16) -> Result<(), ProcessError> {
        match self.stack.try_push(pointer) {
            None => Ok(()),
            Some(_) => Err(ProcessError::StackOverflow),
        }
    }

    /// Will pop from the stack
    ///
    /// The guard is never hit by a well-formed program, only by one that
    /// returns without having called.
    pub(super) fn pop_stack(&mut self) -> Result<u16, ProcessError> {
        self.stack.pop().ok_or(ProcessError::StackUnderflow)
    }

    /// Decrements both timers towards zero, never below.
    ///
    /// Meant to be driven at 60 hertz by the execution loop, independent
    /// of the instruction rate.
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    /// will return the sound timer
    pub fn get_sound_timer(&self) -> u8 {
        self.sound_timer
    }

    /// will return the delay timer
    pub fn get_delay_timer(&self) -> u8 {
        self.delay_timer
    }

    /// The signal for the audio collaborator: beep while this holds.
    pub fn sound_active(&self) -> bool {
        self.sound_timer > 0
    }

    /// Will return the current pixel state
    pub fn get_framebuffer(&self) -> &FrameBuffer {
        &self.framebuffer
    }

    /// Will return the current program counter
    pub fn get_program_counter(&self) -> usize {
        self.program_counter
    }
}

impl Default for ChipSet {
    fn default() -> Self {
        Self::new()
    }
}
