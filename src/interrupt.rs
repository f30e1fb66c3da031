//! The interrupt subsystem: raising lines, boundary-only preemption with
//! full context save, and the matching restore on IRET.
//!
//! Mask and status live in registers 5 and 6; the eight vector-table cells
//! live at the top of RAM. Preemption is polled between instructions, never
//! delivered mid-instruction, and only one line is ever in service at a time.

use crate::cpu::Cpu;
use crate::memory::{vector_address, Word, LAST_KEY};
use crate::registers::{Flags, RegisterFile};
use crate::Result;
use std::time::Duration;

/// Line 0 is reserved for the periodic timer.
pub const TIMER_LINE: u8 = 0;

/// Line 1 is reserved for keyboard input. Lines 2-7 are software-raisable
/// via INT.
pub const KEYBOARD_LINE: u8 = 1;

/// How often the timer line fires while a handler is installed.
pub const TIMER_PERIOD: Duration = Duration::from_secs(1);

/// Mark `line` pending in the interrupt status register.
pub(crate) fn raise(cpu: &mut Cpu, line: u8) {
    let status = cpu.registers.get(RegisterFile::INTERRUPT_STATUS);
    cpu.registers
        .set(RegisterFile::INTERRUPT_STATUS, status | 1 << line);
}

/// Service the lowest-numbered pending, unmasked line, if any and if no
/// handler is already running. Entry protocol: clear the status bit, push
/// the program counter, the packed flags, then registers 0-6 (register 0
/// deepest), and jump to the line's vector entry.
pub(crate) fn maybe_preempt(cpu: &mut Cpu) -> Result<()> {
    if cpu.servicing_interrupt || cpu.registers.get(RegisterFile::INTERRUPT_STATUS) == 0 {
        return Ok(());
    }
    let masked = cpu.registers.get(RegisterFile::INTERRUPT_STATUS)
        & cpu.registers.get(RegisterFile::INTERRUPT_MASK);

    for line in 0..8u8 {
        if masked >> line & 1 != 1 {
            continue;
        }
        cpu.servicing_interrupt = true;
        let status = cpu.registers.get(RegisterFile::INTERRUPT_STATUS);
        cpu.registers
            .set(RegisterFile::INTERRUPT_STATUS, status ^ 1 << line);

        cpu.stack_push(cpu.pc)?;
        cpu.stack_push(cpu.flags.to_word())?;
        for reg in 0..=6 {
            cpu.stack_push(cpu.registers.get(reg))?;
        }

        let entry = cpu.ram.read(vector_address(line))?;
        log::debug!("servicing interrupt line {} at {:#04x}", line, entry);
        cpu.pc = entry - 1;
        break;
    }
    Ok(())
}

/// Exit protocol, the exact LIFO inverse of entry: pop registers 6 down to
/// 0, pop the flags, pop the program counter, re-enable preemption.
pub(crate) fn return_from_interrupt(cpu: &mut Cpu) -> Result<()> {
    for reg in (0..=6).rev() {
        let value = cpu.stack_pop()?;
        cpu.registers.set(reg, value);
    }
    cpu.flags = Flags::from_word(cpu.stack_pop()?);
    cpu.pc = cpu.stack_pop()?;
    cpu.servicing_interrupt = false;
    log::debug!("interrupt return to {:#04x}", cpu.pc + 1);
    Ok(())
}

/// Raise the timer line once per elapsed period, but only while a handler
/// is installed in its vector cell.
pub(crate) fn poll_timer(cpu: &mut Cpu) -> Result<()> {
    if cpu.clock.elapsed_since_last_tick() >= TIMER_PERIOD
        && cpu.ram.read(vector_address(TIMER_LINE))? != 0
    {
        cpu.clock.restart();
        raise(cpu, TIMER_LINE);
    }
    Ok(())
}

/// Stash any waiting keyboard byte at the reserved cell and raise line 1.
pub(crate) fn poll_keyboard(cpu: &mut Cpu) -> Result<()> {
    if let Some(byte) = cpu.input.poll_available_byte()? {
        cpu.ram.write(LAST_KEY, Word::from(byte))?;
        raise(cpu, KEYBOARD_LINE);
    }
    Ok(())
}
