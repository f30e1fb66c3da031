//! The ALU operation family, as pure functions over [`Word`].
//!
//! Each operation shape fixes its parameter count at compile time: one
//! register in place, two registers in place, or register + literal. The
//! dispatcher reads the operand registers and writes the result back; nothing
//! here touches machine state.

use crate::memory::Word;
use crate::{Result, VmError};

/// Operations of the shape `r = f(r)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Inc,
    Dec,
    Not,
}

impl UnaryOp {
    pub fn apply(self, a: Word) -> Word {
        match self {
            UnaryOp::Inc => a.wrapping_add(1),
            UnaryOp::Dec => a.wrapping_sub(1),
            UnaryOp::Not => !a,
        }
    }
}

/// Operations of the shape `ra = f(ra, rb)`, also reused with a literal in
/// place of `rb` by the extended immediate instructions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

impl BinaryOp {
    /// Arithmetic wraps at the word width. A zero divisor is a fatal
    /// condition, not an uncomputable result: DIV and MOD must halt the
    /// machine with a diagnostic.
    pub fn apply(self, a: Word, b: Word) -> Result<Word> {
        Ok(match self {
            BinaryOp::Add => a.wrapping_add(b),
            BinaryOp::Sub => a.wrapping_sub(b),
            BinaryOp::Mul => a.wrapping_mul(b),
            BinaryOp::Div => {
                if b == 0 {
                    return Err(VmError::DivisionByZero);
                }
                a.wrapping_div(b)
            }
            BinaryOp::Mod => {
                if b == 0 {
                    return Err(VmError::DivisionByZero);
                }
                a.wrapping_rem(b)
            }
            BinaryOp::And => a & b,
            BinaryOp::Or => a | b,
            BinaryOp::Xor => a ^ b,
            // shifts are logical, low/high bits filled with 0; the shift
            // amount is taken mod the word width
            BinaryOp::Shl => (a as u32).wrapping_shl(b as u32) as Word,
            BinaryOp::Shr => (a as u32).wrapping_shr(b as u32) as Word,
        })
    }
}
