//! # ls8
//!
//! An emulator for the LS-8, an 8-bit educational CPU: 256 words of RAM, 8
//! registers, three condition flags, a downward-growing stack and an 8-line
//! interrupt subsystem fed by a one-second timer and the keyboard.
//!
//! ## Design
//!
//! * one instruction per run-loop iteration; no timing model beyond that
//! * interrupts are polled at instruction boundaries only, never delivered
//!   mid-instruction; programs are written assuming boundary-only preemption
//! * the program counter tracks the *most recently fetched* byte and is
//!   pre-incremented on every fetch, opcode and operand alike, which is the
//!   single rule that keeps jump/call targets and skipped operands honest
//! * peripherals sit behind traits so the engine can be driven entirely from
//!   tests: [`Clock`] (timer line), [`InputSource`] (keyboard line) and any
//!   `io::Write` for the PRN/PRA instructions
//!
//! Model
//!
//! ```text
//! main
//!  |-- WallClock, TerminalInput, stdout
//!  |-- loader (.ls8 listing -> ram_load bytes, appends HLT)
//!  `-- Cpu::run
//!       |-- maybe_preempt   // service lowest pending masked line
//!       |-- step            // fetch, decode, execute one instruction
//!       |-- poll_timer      // raise line 0 after each elapsed second
//!       `-- poll_keyboard   // stash byte at LAST_KEY, raise line 1
//! ```

use std::io;
use thiserror::Error;

pub mod alu;
pub mod clock;
pub mod cpu;
pub mod input;
pub mod interrupt;
pub mod loader;
pub mod memory;
pub mod opcodes;
pub mod registers;

pub use clock::{Clock, ManualClock, WallClock};
pub use cpu::{Cpu, Signal};
pub use input::{InputSource, ScriptedInput, TerminalInput};
pub use memory::{Ram, Word, LAST_KEY, RAM_SIZE, STACK_START, VECTOR_TABLE};
pub use opcodes::Opcode;
pub use registers::{Flags, RegisterFile};

pub type Result<T> = std::result::Result<T, VmError>;

/// Everything that can stop the machine. All of these are fatal: the run
/// loop terminates at the point of detection and nothing is retried.
#[derive(Debug, Error)]
pub enum VmError {
    #[error("unsupported instruction {opcode:#04x} at address {addr}")]
    UnsupportedInstruction { opcode: Word, addr: Word },

    #[error("stack overflow: stack pointer ran into the loaded program")]
    StackOverflow,

    #[error("stack underflow: pop from an empty stack")]
    StackUnderflow,

    #[error("RAM is full: program overran the reserved stack region")]
    MemoryFull,

    #[error("address {0} is outside RAM")]
    AddressOutOfRange(Word),

    #[error("division by zero")]
    DivisionByZero,

    #[error("listing line {line}: {text:?} is not an 8-bit binary value")]
    ListingParse { line: usize, text: String },

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
