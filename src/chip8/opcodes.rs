use crate::{
    definitions::{cpu, display::fontset, keyboard, memory},
    devices::KeyboardCommands,
    error::ProcessError,
    opcode::{Instruction, Operation},
};

use super::ChipSet;

/// a key index past the 16 key pad can never be held
fn key_held<K: KeyboardCommands>(keyboard: &K, key: u8) -> bool {
    (key as usize) < keyboard::SIZE && keyboard.pressed_keys() & (1 << key) != 0
}

impl ChipSet {
    /// Executes a single decoded instruction against the chip state.
    ///
    /// Skip instructions move the program counter an extra step here, the
    /// jumping ones place it outright; everything else leaves the advance
    /// to the caller.
    pub(super) fn exec<K: KeyboardCommands>(
        &mut self,
        instruction: Instruction,
        keyboard: &K,
    ) -> Result<Operation, ProcessError> {
        log::debug!("opcode {:#06X}", self.opcode);

        let mut operation = Operation::None;
        match instruction {
            Instruction::ClearScreen => {
                self.framebuffer.clear();
                operation = Operation::Draw;
            }
            Instruction::Return => {
                // Return from sub routine => pop from stack. The loop's own
                // advance moves us behind the call site afterwards.
                let pointer = self.pop_stack()?;
                self.program_counter = pointer as usize;
            }
            Instruction::Jump { nnn } => {
                self.program_counter = nnn;
            }
            Instruction::Call { nnn } => {
                // the pre-advance counter goes onto the stack, so that the
                // matching return resumes at the call site
                self.push_stack(self.program_counter as u16)?;
                self.program_counter = nnn;
            }
            Instruction::SkipIfEqual { x, nn } => {
                self.skip_if(self.get_v(x)? == nn);
            }
            Instruction::SkipIfNotEqual { x, nn } => {
                self.skip_if(self.get_v(x)? != nn);
            }
            Instruction::SkipIfVxEqVy { x, y } => {
                self.skip_if(self.get_v(x)? == self.get_v(y)?);
            }
            Instruction::LoadImmediate { x, nn } => {
                self.set_v(x, nn)?;
            }
            Instruction::AddImmediate { x, nn } => {
                // let VX overflow, but ignore carry
                self.set_v(x, self.get_v(x)?.wrapping_add(nn))?;
            }
            Instruction::Move { x, y } => {
                self.set_v(x, self.get_v(y)?)?;
            }
            Instruction::Or { x, y } => {
                self.set_v(x, self.get_v(x)? | self.get_v(y)?)?;
            }
            Instruction::And { x, y } => {
                self.set_v(x, self.get_v(x)? & self.get_v(y)?)?;
            }
            Instruction::Xor { x, y } => {
                self.set_v(x, self.get_v(x)? ^ self.get_v(y)?)?;
            }
            Instruction::Add { x, y } => {
                let (res, carry) = self.get_v(x)?.overflowing_add(self.get_v(y)?);
                self.set_v(x, res)?;
                self.set_v(cpu::register::FLAG, carry as u8)?;
            }
            Instruction::SubXY { x, y } => {
                // VF is the "no borrow" flag, set before the subtraction
                // result is known but written after it
                let vx = self.get_v(x)?;
                let vy = self.get_v(y)?;
                self.set_v(x, vx.wrapping_sub(vy))?;
                self.set_v(cpu::register::FLAG, (vx > vy) as u8)?;
            }
            Instruction::ShiftRight { x } => {
                let vx = self.get_v(x)?;
                self.set_v(cpu::register::FLAG, vx & 1)?;
                self.set_v(x, vx >> 1)?;
            }
            Instruction::SubYX { x, y } => {
                let vx = self.get_v(x)?;
                let vy = self.get_v(y)?;
                self.set_v(x, vy.wrapping_sub(vx))?;
                self.set_v(cpu::register::FLAG, (vy > vx) as u8)?;
            }
            Instruction::ShiftLeft { x } => {
                let vx = self.get_v(x)?;
                self.set_v(cpu::register::FLAG, vx >> 7)?;
                self.set_v(x, vx << 1)?;
            }
            Instruction::SkipIfVxNeVy { x, y } => {
                self.skip_if(self.get_v(x)? != self.get_v(y)?);
            }
            Instruction::SetI { nnn } => {
                self.index_register = nnn;
            }
            Instruction::JumpPlusV0 { nnn } => {
                self.program_counter = nnn + self.get_v(0)? as usize;
            }
            Instruction::Random { x, nn } => {
                // using a fill bytes call here, as the trait RngCore does
                // not support a plain random u8
                let mut rand: [u8; 1] = [0];
                self.rng.fill_bytes(&mut rand);
                self.set_v(x, rand[0] & nn)?;
            }
            Instruction::Draw { x, y, n } => {
                let index = self.index_register as usize;
                if index + n > self.memory.len() {
                    return Err(ProcessError::MemoryInvalid {
                        pointer: index,
                        len: self.memory.len(),
                    });
                }

                let coorx = self.get_v(x)? as usize;
                let coory = self.get_v(y)? as usize;
                // I stays untouched by the draw
                let collision =
                    self.framebuffer
                        .draw_sprite(coorx, coory, &self.memory[index..(index + n)]);
                self.set_v(cpu::register::FLAG, collision as u8)?;
                operation = Operation::Draw;
            }
            Instruction::SkipIfKeyDown { x } => {
                let key = self.get_v(x)?;
                self.skip_if(key_held(keyboard, key));
            }
            Instruction::SkipIfKeyUp { x } => {
                let key = self.get_v(x)?;
                self.skip_if(!key_held(keyboard, key));
            }
            Instruction::LoadDelayTimer { x } => {
                self.set_v(x, self.delay_timer)?;
            }
            Instruction::WaitKey { x } => {
                // blocks until the collaborator observes a key release; a
                // None means the keyboard was torn down mid wait
                match keyboard.wait_for_release() {
                    Some(mask) => {
                        self.set_v(x, mask.trailing_zeros() as u8)?;
                    }
                    None => {
                        operation = Operation::Halt;
                    }
                }
            }
            Instruction::SetDelayTimer { x } => {
                self.delay_timer = self.get_v(x)?;
            }
            Instruction::SetSoundTimer { x } => {
                self.sound_timer = self.get_v(x)?;
            }
            Instruction::AddToI { x } => {
                let index = self.index_register as usize + self.get_v(x)? as usize;
                if index >= memory::SIZE {
                    // defensive, a well formed program can not push I out
                    // of the address space
                    self.set_v(cpu::register::FLAG, 1)?;
                }
                self.index_register = index as u16;
            }
            Instruction::LoadFontAddress { x } => {
                // values above 0xF wrap onto the 16 glyph table
                let digit = self.get_v(x)? as usize & 0xF;
                self.index_register = (fontset::LOCATION + fontset::CHAR_SIZE * digit) as u16;
            }
            Instruction::StoreBcd { x } => {
                let index = self.index_register as usize;
                if index + 3 > self.memory.len() {
                    return Err(ProcessError::MemoryInvalid {
                        pointer: index,
                        len: self.memory.len(),
                    });
                }

                let value = self.get_v(x)?;
                self.memory[index] = value / 100; // 246u8 / 100 => 2
                self.memory[index + 1] = value / 10 % 10; // 246u8 / 10 => 24 % 10 => 4
                self.memory[index + 2] = value % 10; // 246u8 % 10 => 6
            }
            Instruction::StoreRegisters { x } => {
                let index = self.index_register as usize;
                if index + x >= self.memory.len() {
                    return Err(ProcessError::MemoryInvalid {
                        pointer: index,
                        len: self.memory.len(),
                    });
                }

                self.memory[index..=(index + x)].copy_from_slice(&self.registers[..=x]);
                self.index_register += x as u16 + 1;
            }
            Instruction::LoadRegisters { x } => {
                let index = self.index_register as usize;
                if index + x >= self.memory.len() {
                    return Err(ProcessError::MemoryInvalid {
                        pointer: index,
                        len: self.memory.len(),
                    });
                }

                self.registers[..=x].copy_from_slice(&self.memory[index..=(index + x)]);
                self.index_register += x as u16 + 1;
            }
        }
        Ok(operation)
    }
}
