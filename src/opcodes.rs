//! The fixed opcode table.
//!
//! Every valid opcode byte maps to exactly one [`Opcode`]; the ALU family is
//! folded into [`UnaryOp`]/[`BinaryOp`] so the dispatcher can match on the
//! operand shape instead of carrying one handler per mnemonic.

use crate::alu::{BinaryOp, UnaryOp};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    Nop,
    Hlt,
    Ret,
    Iret,
    Push,
    Pop,
    Prn,
    Pra,
    Call,
    Int,
    Jmp,
    Jeq,
    Jne,
    Jgt,
    Jlt,
    Jle,
    Jge,
    Ldi,
    Ld,
    St,
    /// `reg` -> `reg`: INC, DEC, NOT.
    Unary(UnaryOp),
    /// `regA regB` -> `regA`: ADD through SHR.
    Binary(BinaryOp),
    /// `regA regB` -> flags only.
    Cmp,
    /// Extended set: `reg literal` -> `reg`, currently just ADDI.
    BinaryImmediate(BinaryOp),
}

impl Opcode {
    /// Look one opcode byte up in the table.
    pub fn decode(byte: u8) -> Option<Opcode> {
        match byte {
            0x00 => Some(Opcode::Nop),
            0x01 => Some(Opcode::Hlt),
            0x11 => Some(Opcode::Ret),
            0x13 => Some(Opcode::Iret),
            0x45 => Some(Opcode::Push),
            0x46 => Some(Opcode::Pop),
            0x47 => Some(Opcode::Prn),
            0x48 => Some(Opcode::Pra),
            0x50 => Some(Opcode::Call),
            0x52 => Some(Opcode::Int),
            0x54 => Some(Opcode::Jmp),
            0x55 => Some(Opcode::Jeq),
            0x56 => Some(Opcode::Jne),
            0x57 => Some(Opcode::Jgt),
            0x58 => Some(Opcode::Jlt),
            0x59 => Some(Opcode::Jle),
            0x5a => Some(Opcode::Jge),
            0x82 => Some(Opcode::Ldi),
            0x83 => Some(Opcode::Ld),
            0x84 => Some(Opcode::St),
            0xa0 => Some(Opcode::Binary(BinaryOp::Add)),
            0xa1 => Some(Opcode::Binary(BinaryOp::Sub)),
            0xa2 => Some(Opcode::Binary(BinaryOp::Mul)),
            0xa3 => Some(Opcode::Binary(BinaryOp::Div)),
            0xa4 => Some(Opcode::Binary(BinaryOp::Mod)),
            0xa5 => Some(Opcode::Unary(UnaryOp::Inc)),
            0xa6 => Some(Opcode::Unary(UnaryOp::Dec)),
            0xa7 => Some(Opcode::Cmp),
            0xa8 => Some(Opcode::Binary(BinaryOp::And)),
            0xa9 => Some(Opcode::Unary(UnaryOp::Not)),
            0xaa => Some(Opcode::Binary(BinaryOp::Or)),
            0xab => Some(Opcode::Binary(BinaryOp::Xor)),
            0xac => Some(Opcode::Binary(BinaryOp::Shl)),
            0xad => Some(Opcode::Binary(BinaryOp::Shr)),
            0xb0 => Some(Opcode::BinaryImmediate(BinaryOp::Add)),
            _ => None,
        }
    }

    /// Assembly name, for trace logging.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Nop => "NOP",
            Opcode::Hlt => "HLT",
            Opcode::Ret => "RET",
            Opcode::Iret => "IRET",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Prn => "PRN",
            Opcode::Pra => "PRA",
            Opcode::Call => "CALL",
            Opcode::Int => "INT",
            Opcode::Jmp => "JMP",
            Opcode::Jeq => "JEQ",
            Opcode::Jne => "JNE",
            Opcode::Jgt => "JGT",
            Opcode::Jlt => "JLT",
            Opcode::Jle => "JLE",
            Opcode::Jge => "JGE",
            Opcode::Ldi => "LDI",
            Opcode::Ld => "LD",
            Opcode::St => "ST",
            Opcode::Unary(UnaryOp::Inc) => "INC",
            Opcode::Unary(UnaryOp::Dec) => "DEC",
            Opcode::Unary(UnaryOp::Not) => "NOT",
            Opcode::Binary(BinaryOp::Add) => "ADD",
            Opcode::Binary(BinaryOp::Sub) => "SUB",
            Opcode::Binary(BinaryOp::Mul) => "MUL",
            Opcode::Binary(BinaryOp::Div) => "DIV",
            Opcode::Binary(BinaryOp::Mod) => "MOD",
            Opcode::Binary(BinaryOp::And) => "AND",
            Opcode::Binary(BinaryOp::Or) => "OR",
            Opcode::Binary(BinaryOp::Xor) => "XOR",
            Opcode::Binary(BinaryOp::Shl) => "SHL",
            Opcode::Binary(BinaryOp::Shr) => "SHR",
            Opcode::Cmp => "CMP",
            Opcode::BinaryImmediate(_) => "ADDI",
        }
    }
}
