//! Turns a textual `.ls8` listing into the byte sequence the engine runs.
//!
//! One instruction or operand byte per line, written in binary digits, with
//! optional `#` comments and blank lines:
//!
//! ```text
//! 10000010 # LDI R0,8
//! 00000000
//! 00001000
//! ```
//!
//! A terminating HLT is appended so a listing that falls off its own end
//! stops instead of executing leftover RAM.

use crate::cpu::Cpu;
use crate::{Result, VmError};
use std::io;

/// Appended after the last listing byte.
const TERMINATING_HLT: u8 = 0b0000_0001;

/// Parse a listing and feed it to the engine via `ram_load`.
pub fn load_listing(cpu: &mut Cpu, reader: &mut impl io::BufRead) -> Result<()> {
    for (index, line) in io::BufRead::lines(&mut *reader).enumerate() {
        let line = line?;
        let code = line.split('#').next().unwrap_or("").trim();
        if code.is_empty() {
            continue;
        }
        let byte = u8::from_str_radix(code, 2).map_err(|_| VmError::ListingParse {
            line: index + 1,
            text: code.to_string(),
        })?;
        cpu.ram_load(byte)?;
    }
    cpu.ram_load(TERMINATING_HLT)
}
