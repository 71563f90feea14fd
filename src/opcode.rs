//! Opcode abstractions, the instruction table and the pure decoder.
use std::convert::TryFrom;

use crate::{ProcessError, UndefinedOpcode};

/// the base mask used for generating all the other sub masks
pub(crate) const OPCODE_MASK_FFFF: u16 = u16::MAX;

/// the mask for the first twelve bits
pub(crate) const OPCODE_MASK_FFF0: u16 = OPCODE_MASK_FFFF << 4;

/// the mask for the first eight bits
pub(crate) const OPCODE_MASK_FF00: u16 = OPCODE_MASK_FFFF << 8;

/// the mask for the first four bits
pub(crate) const OPCODE_MASK_F000: u16 = OPCODE_MASK_FFFF << 12;

/// the mask for the last four bits
pub(crate) const OPCODE_MASK_000F: u16 = OPCODE_MASK_FFFF ^ OPCODE_MASK_FFF0;

/// the mask for the last eight bits
pub(crate) const OPCODE_MASK_00FF: u16 = OPCODE_MASK_FFFF ^ OPCODE_MASK_FF00;

/// the mask for the last twelve bits
pub(crate) const OPCODE_MASK_0FFF: u16 = OPCODE_MASK_FFFF ^ OPCODE_MASK_F000;

/// the size of a single byte in bits
const BYTE_SIZE: u16 = 0x8;

/// a wrapper type for u16 to make it clear what is meant to be used
pub type Opcode = u16;

/// will build an opcode from data and the given point
///
/// # Arguments
///
/// - `data` - A slice of u8 data entries used to generate the opcodes
/// - `pointer` - Where in the data the opcode shall be extracted, so `pointer` and `pointer + 1`
/// make the opcode up
///
/// # Example
/// ```rust
/// # use chip8vm::opcode::*;
/// const OPCODES: [Opcode; 2] = [0x00EE, 0x1EDA];
/// const SPLIT_OPCODE: [u8; 4] = [0x00, 0xEE, 0x1E, 0xDA];
/// for (i, val) in OPCODES.iter().enumerate() {
///     let opcode = build_opcode(&SPLIT_OPCODE, i * 2).expect("This will work.");
///     assert_eq!(opcode, *val);
/// }
/// assert!(build_opcode(&SPLIT_OPCODE, 3).is_err());
/// ```
pub fn build_opcode(data: &[u8], pointer: usize) -> Result<Opcode, ProcessError> {
    // controlling that there is no illegal access here
    if pointer + 1 < data.len() {
        Ok(Opcode::from_be_bytes([data[pointer], data[pointer + 1]]))
    } else {
        Err(ProcessError::MemoryInvalid {
            pointer,
            len: data.len(),
        })
    }
}

/// These are special traits used to filter out information
/// from opcodes
pub trait OpcodeTrait {
    /// this is an opcode extractor that will return the
    /// opcode type nibble from any opcode
    fn t(&self) -> usize;

    /// this is an opcode extractor for the opcode type `TNNN`
    /// - `NNN` is an address
    fn nnn(&self) -> usize;

    /// this is an opcode extractor for the opcode type `TXNN`
    /// - `X` is a register index
    /// - `NN` is a constant
    fn xnn(&self) -> (usize, u8);

    /// this is an opcode extractor for the opcode type `TXYN`
    /// - `X` is a register index
    /// - `Y` is a register index
    /// - `N` is a opcode subtype or length
    fn xyn(&self) -> (usize, usize, usize);

    /// this is an opcode extractor for the opcode type `TXYT`
    /// - `X` is a register index
    /// - `Y` is a register index
    fn xy(&self) -> (usize, usize);

    /// this is an opcode extractor for the opcode type `TXTT`
    /// - `X` is a register index
    fn x(&self) -> usize;
}

impl OpcodeTrait for Opcode {
    /// # Example
    /// ```rust
    /// # use chip8vm::opcode::*;
    /// const BASE_OPCODE: Opcode = 0x1EDA;
    /// assert_eq!(BASE_OPCODE.t(), 0x1);
    /// ```
    fn t(&self) -> usize {
        ((self & OPCODE_MASK_F000) >> (3 * 4)) as usize
    }

    /// # Example
    /// ```rust
    /// # use chip8vm::opcode::*;
    /// const BASE_OPCODE: Opcode = 0x1EDA;
    /// assert_eq!(BASE_OPCODE.nnn(), 0xEDA);
    /// ```
    fn nnn(&self) -> usize {
        (self & OPCODE_MASK_0FFF) as usize
    }

    /// # Example
    /// ```rust
    /// # use chip8vm::opcode::*;
    /// const BASE_OPCODE: Opcode = 0x1EDA;
    /// assert_eq!(BASE_OPCODE.xnn(), (0xE, 0xDA));
    /// ```
    fn xnn(&self) -> (usize, u8) {
        let x = self.x();
        let nn = (self & OPCODE_MASK_00FF) as u8;
        (x, nn)
    }

    /// # Example
    /// ```rust
    /// # use chip8vm::opcode::*;
    /// const BASE_OPCODE: Opcode = 0x1EDA;
    /// assert_eq!(BASE_OPCODE.xyn(), (0xE, 0xD, 0xA));
    /// ```
    fn xyn(&self) -> (usize, usize, usize) {
        let (x, y) = self.xy();
        let n = (self & OPCODE_MASK_000F) as usize;
        (x, y, n)
    }

    /// # Example
    /// ```rust
    /// # use chip8vm::opcode::*;
    /// const BASE_OPCODE: Opcode = 0x1EDA;
    /// assert_eq!(BASE_OPCODE.xy(), (0xE, 0xD));
    /// ```
    fn xy(&self) -> (usize, usize) {
        let x = self.x();
        const MASK: u16 = OPCODE_MASK_00FF ^ OPCODE_MASK_000F;
        const NIBBLE: u16 = BYTE_SIZE / 2;
        let y = ((self & MASK) >> NIBBLE) as usize;
        (x, y)
    }

    /// # Example
    /// ```rust
    /// # use chip8vm::opcode::*;
    /// const BASE_OPCODE: Opcode = 0x1EDA;
    /// assert_eq!(BASE_OPCODE.x(), 0xE);
    /// ```
    fn x(&self) -> usize {
        ((self & OPCODE_MASK_0FFF & OPCODE_MASK_FF00) >> BYTE_SIZE) as usize
    }
}

/// Represents a command from the interpreter up to the caller of the
/// execution loop.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Operation {
    /// If no action has to be taken.
    None,
    /// A draw or clear produced new pixel state, so the display
    /// collaborator shall be handed a framebuffer snapshot.
    Draw,
    /// The chip can not continue, the key wait was cancelled.
    Halt,
}

/// The full instruction table as a closed sum type, one variant per opcode
/// class.
///
/// Register indices arrive pre-extracted as `usize`, immediates as `u8`,
/// addresses as `usize`. The decoder in [`TryFrom<Opcode>`] is a pure
/// mapping and never touches chip state.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Instruction {
    /// `00E0` - zeroes the framebuffer
    ClearScreen,
    /// `00EE` - pops the call stack into the program counter
    Return,
    /// `1NNN` - jumps to address `NNN`
    Jump { nnn: usize },
    /// `2NNN` - pushes the current program counter, jumps to `NNN`
    Call { nnn: usize },
    /// `3XNN` - skips the next instruction if `VX == NN`
    SkipIfEqual { x: usize, nn: u8 },
    /// `4XNN` - skips the next instruction if `VX != NN`
    SkipIfNotEqual { x: usize, nn: u8 },
    /// `5XY0` - skips the next instruction if `VX == VY`
    SkipIfVxEqVy { x: usize, y: usize },
    /// `6XNN` - `VX = NN`
    LoadImmediate { x: usize, nn: u8 },
    /// `7XNN` - `VX += NN`, truncated to 8 bits, carry flag untouched
    AddImmediate { x: usize, nn: u8 },
    /// `8XY0` - `VX = VY`
    Move { x: usize, y: usize },
    /// `8XY1` - `VX |= VY`
    Or { x: usize, y: usize },
    /// `8XY2` - `VX &= VY`
    And { x: usize, y: usize },
    /// `8XY3` - `VX ^= VY`
    Xor { x: usize, y: usize },
    /// `8XY4` - `VX += VY`, `VF` holds the carry
    Add { x: usize, y: usize },
    /// `8XY5` - `VX -= VY`, `VF = 1` when there was no borrow
    SubXY { x: usize, y: usize },
    /// `8XY6` - `VF` takes the least significant bit, then `VX >>= 1`
    ShiftRight { x: usize },
    /// `8XY7` - `VX = VY - VX`, `VF = 1` when there was no borrow
    SubYX { x: usize, y: usize },
    /// `8XYE` - `VF` takes the most significant bit, then `VX <<= 1`
    ShiftLeft { x: usize },
    /// `9XY0` - skips the next instruction if `VX != VY`
    SkipIfVxNeVy { x: usize, y: usize },
    /// `ANNN` - `I = NNN`
    SetI { nnn: u16 },
    /// `BNNN` - jumps to `NNN + V0`
    JumpPlusV0 { nnn: usize },
    /// `CXNN` - `VX = random_byte() & NN`
    Random { x: usize, nn: u8 },
    /// `DXYN` - draws the `N` byte sprite at `memory[I]` to `(VX, VY)`
    Draw { x: usize, y: usize, n: usize },
    /// `EX9E` - skips the next instruction if key `VX` is held
    SkipIfKeyDown { x: usize },
    /// `EXA1` - skips the next instruction if key `VX` is not held
    SkipIfKeyUp { x: usize },
    /// `FX07` - `VX = DT`
    LoadDelayTimer { x: usize },
    /// `FX0A` - blocks until a key is released, stores its index in `VX`
    WaitKey { x: usize },
    /// `FX15` - `DT = VX`
    SetDelayTimer { x: usize },
    /// `FX18` - `ST = VX`
    SetSoundTimer { x: usize },
    /// `FX1E` - `I += VX`
    AddToI { x: usize },
    /// `FX29` - `I` points at the font glyph for digit `VX`
    LoadFontAddress { x: usize },
    /// `FX33` - writes the decimal digits of `VX` to `I`, `I+1`, `I+2`
    StoreBcd { x: usize },
    /// `FX55` - writes `V0..=VX` to `memory[I..]`, then `I += X + 1`
    StoreRegisters { x: usize },
    /// `FX65` - reads `memory[I..]` into `V0..=VX`, then `I += X + 1`
    LoadRegisters { x: usize },
}

impl Instruction {
    /// Whether the execution loop advances the program counter after this
    /// instruction ran.
    ///
    /// False exactly for the instructions that place the program counter
    /// themselves. `Return` is not among them: the loop's own advance is
    /// what makes a return land on the call site's successor, since `Call`
    /// pushes the pre-advance program counter.
    pub fn advances_pc(&self) -> bool {
        !matches!(
            self,
            Instruction::Jump { .. } | Instruction::Call { .. } | Instruction::JumpPlusV0 { .. }
        )
    }
}

impl TryFrom<Opcode> for Instruction {
    type Error = UndefinedOpcode;

    fn try_from(value: Opcode) -> Result<Self, Self::Error> {
        let res = match value.t() {
            0x0 => match value {
                0x00E0 => Instruction::ClearScreen,
                0x00EE => Instruction::Return,
                // 0NNN machine code routines are not implemented
                _ => return Err(UndefinedOpcode(value)),
            },
            0x1 => Instruction::Jump { nnn: value.nnn() },
            0x2 => Instruction::Call { nnn: value.nnn() },
            0x3 => {
                let (x, nn) = value.xnn();
                Instruction::SkipIfEqual { x, nn }
            }
            0x4 => {
                let (x, nn) = value.xnn();
                Instruction::SkipIfNotEqual { x, nn }
            }
            0x5 => match value.xyn() {
                (x, y, 0) => Instruction::SkipIfVxEqVy { x, y },
                _ => return Err(UndefinedOpcode(value)),
            },
            0x6 => {
                let (x, nn) = value.xnn();
                Instruction::LoadImmediate { x, nn }
            }
            0x7 => {
                let (x, nn) = value.xnn();
                Instruction::AddImmediate { x, nn }
            }
            0x8 => {
                let (x, y, n) = value.xyn();
                match n {
                    0x0 => Instruction::Move { x, y },
                    0x1 => Instruction::Or { x, y },
                    0x2 => Instruction::And { x, y },
                    0x3 => Instruction::Xor { x, y },
                    0x4 => Instruction::Add { x, y },
                    0x5 => Instruction::SubXY { x, y },
                    0x6 => Instruction::ShiftRight { x },
                    0x7 => Instruction::SubYX { x, y },
                    0xE => Instruction::ShiftLeft { x },
                    _ => return Err(UndefinedOpcode(value)),
                }
            }
            0x9 => match value.xyn() {
                (x, y, 0) => Instruction::SkipIfVxNeVy { x, y },
                _ => return Err(UndefinedOpcode(value)),
            },
            0xA => Instruction::SetI {
                nnn: value.nnn() as u16,
            },
            0xB => Instruction::JumpPlusV0 { nnn: value.nnn() },
            0xC => {
                let (x, nn) = value.xnn();
                Instruction::Random { x, nn }
            }
            0xD => {
                let (x, y, n) = value.xyn();
                Instruction::Draw { x, y, n }
            }
            0xE => match value.xnn() {
                (x, 0x9E) => Instruction::SkipIfKeyDown { x },
                (x, 0xA1) => Instruction::SkipIfKeyUp { x },
                _ => return Err(UndefinedOpcode(value)),
            },
            0xF => {
                let (x, nn) = value.xnn();
                match nn {
                    0x07 => Instruction::LoadDelayTimer { x },
                    0x0A => Instruction::WaitKey { x },
                    0x15 => Instruction::SetDelayTimer { x },
                    0x18 => Instruction::SetSoundTimer { x },
                    0x1E => Instruction::AddToI { x },
                    0x29 => Instruction::LoadFontAddress { x },
                    0x33 => Instruction::StoreBcd { x },
                    0x55 => Instruction::StoreRegisters { x },
                    0x65 => Instruction::LoadRegisters { x },
                    _ => return Err(UndefinedOpcode(value)),
                }
            }
            _ => unreachable!("a nibble is always in 0x0..=0xF"),
        };
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use std::convert::TryInto;

    use super::*;

    #[test]
    fn test_tryfrom_opcode_simple() {
        let value = 0x00E0;
        let res = Ok(Instruction::ClearScreen);
        let conv = value.try_into();
        assert_eq!(conv, res);
    }

    #[test]
    fn test_tryfrom_opcode_simple_fail() {
        let value: Opcode = 0x00E1;
        let conv: Result<Instruction, _> = value.try_into();
        assert!(conv.is_err());
    }

    #[test]
    fn test_tryfrom_opcode_multiple() {
        use Instruction::*;
        let tests = [
            // Zero
            (0x00E0, Ok(ClearScreen)),
            (0x00EE, Ok(Return)),
            (0x0123, Err("")),
            // One / Two
            (0x1919, Ok(Jump { nnn: 0x919 })),
            (0x2222, Ok(Call { nnn: 0x222 })),
            // Conditions on immediates
            (0x3123, Ok(SkipIfEqual { x: 0x1, nn: 0x23 })),
            (0x4123, Ok(SkipIfNotEqual { x: 0x1, nn: 0x23 })),
            (0x5120, Ok(SkipIfVxEqVy { x: 0x1, y: 0x2 })),
            (0x5121, Err("")),
            // Immediates
            (0x6123, Ok(LoadImmediate { x: 0x1, nn: 0x23 })),
            (0x7123, Ok(AddImmediate { x: 0x1, nn: 0x23 })),
            // Register arithmetic
            (0x8120, Ok(Move { x: 0x1, y: 0x2 })),
            (0x8121, Ok(Or { x: 0x1, y: 0x2 })),
            (0x8122, Ok(And { x: 0x1, y: 0x2 })),
            (0x8123, Ok(Xor { x: 0x1, y: 0x2 })),
            (0x8124, Ok(Add { x: 0x1, y: 0x2 })),
            (0x8125, Ok(SubXY { x: 0x1, y: 0x2 })),
            (0x8126, Ok(ShiftRight { x: 0x1 })),
            (0x8127, Ok(SubYX { x: 0x1, y: 0x2 })),
            (0x812E, Ok(ShiftLeft { x: 0x1 })),
            (0x8128, Err("")),
            // Nine
            (0x9120, Ok(SkipIfVxNeVy { x: 0x1, y: 0x2 })),
            (0x9121, Err("")),
            // A / B / C / D
            (0xA222, Ok(SetI { nnn: 0x222 })),
            (0xB222, Ok(JumpPlusV0 { nnn: 0x222 })),
            (0xC123, Ok(Random { x: 0x1, nn: 0x23 })),
            (0xD123, Ok(Draw { x: 0x1, y: 0x2, n: 0x3 })),
            // E
            (0xE19E, Ok(SkipIfKeyDown { x: 0x1 })),
            (0xE1A1, Ok(SkipIfKeyUp { x: 0x1 })),
            (0xE1F0, Err("")),
            // F
            (0xF007, Ok(LoadDelayTimer { x: 0x0 })),
            (0xF00A, Ok(WaitKey { x: 0x0 })),
            (0xF015, Ok(SetDelayTimer { x: 0x0 })),
            (0xF018, Ok(SetSoundTimer { x: 0x0 })),
            (0xF01E, Ok(AddToI { x: 0x0 })),
            (0xF029, Ok(LoadFontAddress { x: 0x0 })),
            (0xF033, Ok(StoreBcd { x: 0x0 })),
            (0xF055, Ok(StoreRegisters { x: 0x0 })),
            (0xF065, Ok(LoadRegisters { x: 0x0 })),
            (0xF0AA, Err("")),
        ];
        for (value, res) in tests {
            let conv: Result<Instruction, _> = value.try_into();
            assert_eq!(conv, res.map_err(|_| UndefinedOpcode(value)));
        }
    }

    #[test]
    fn test_advances_pc() {
        let jumping: [Instruction; 3] = [
            Instruction::Jump { nnn: 0x300 },
            Instruction::Call { nnn: 0x300 },
            Instruction::JumpPlusV0 { nnn: 0x300 },
        ];
        for instruction in jumping {
            assert!(!instruction.advances_pc());
        }
        // the return relies on the loop advance to land behind the call site
        assert!(Instruction::Return.advances_pc());
        assert!(Instruction::ClearScreen.advances_pc());
        assert!(Instruction::WaitKey { x: 1 }.advances_pc());
    }
}
