//! The execution engine: fetch, decode, execute, one instruction per
//! run-loop iteration, with an interrupt check at every boundary.

use crate::interrupt;
use crate::memory::{Ram, Word};
use crate::opcodes::Opcode;
use crate::registers::{Flags, RegisterFile};
use crate::{Clock, InputSource, Result, VmError};
use std::io;

/// What a handler tells the dispatcher to do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    Continue,
    Halt,
}

/// The LS-8 machine. Owns all mutable state; the clock, keyboard and output
/// sink are borrowed seams so tests can substitute their own.
pub struct Cpu<'a> {
    pub(crate) ram: Ram,
    pub(crate) registers: RegisterFile,
    pub(crate) flags: Flags,
    /// Address of the most recently fetched byte; -1 before the first fetch.
    pub(crate) pc: Word,
    /// Set while an interrupt handler runs; suppresses further preemption.
    pub(crate) servicing_interrupt: bool,
    pub(crate) clock: &'a mut dyn Clock,
    pub(crate) input: &'a mut dyn InputSource,
    pub(crate) output: &'a mut dyn io::Write,
}

impl<'a> Cpu<'a> {
    pub fn new(
        clock: &'a mut dyn Clock,
        input: &'a mut dyn InputSource,
        output: &'a mut dyn io::Write,
    ) -> Self {
        Cpu {
            ram: Ram::new(),
            registers: RegisterFile::new(),
            flags: Flags::default(),
            pc: -1,
            servicing_interrupt: false,
            clock,
            input,
            output,
        }
    }

    /// Append one program byte at the next free RAM address. The loader's
    /// only way into the machine.
    pub fn ram_load(&mut self, byte: u8) -> Result<()> {
        self.ram.load(byte)
    }

    /// Load a textual `.ls8` listing.
    pub fn load_program(&mut self, reader: &mut impl io::BufRead) -> Result<()> {
        crate::loader::load_listing(self, reader)
    }

    /// Run the loaded program until HLT or a fatal condition.
    pub fn run(&mut self) -> Result<()> {
        loop {
            interrupt::maybe_preempt(self)?;
            if let Signal::Halt = self.step()? {
                return Ok(());
            }
            interrupt::poll_timer(self)?;
            interrupt::poll_keyboard(self)?;
        }
    }

    /// Fetch and execute one instruction.
    pub fn step(&mut self) -> Result<Signal> {
        let byte = self.next_byte()?;
        let opcode = u8::try_from(byte)
            .ok()
            .and_then(Opcode::decode)
            .ok_or(VmError::UnsupportedInstruction {
                opcode: byte,
                addr: self.pc,
            })?;
        log::trace!("{:#04x}: {}", self.pc, opcode.mnemonic());
        self.execute(opcode)
    }

    fn execute(&mut self, opcode: Opcode) -> Result<Signal> {
        match opcode {
            Opcode::Nop => {}
            Opcode::Hlt => return Ok(Signal::Halt),
            Opcode::Ret => self.pc = self.stack_pop()?,
            Opcode::Iret => interrupt::return_from_interrupt(self)?,
            Opcode::Push => {
                let reg = self.next_register()?;
                let value = self.registers.get(reg);
                self.stack_push(value)?;
            }
            Opcode::Pop => {
                let reg = self.next_register()?;
                let value = self.stack_pop()?;
                self.registers.set(reg, value);
            }
            Opcode::Prn => {
                let reg = self.next_register()?;
                writeln!(self.output, "{}", self.registers.get(reg))?;
            }
            Opcode::Pra => {
                let reg = self.next_register()?;
                let value = self.registers.get(reg);
                write!(self.output, "{}", (value as u8) as char)?;
            }
            Opcode::Call => {
                let reg = self.next_register()?;
                let target = self.registers.get(reg);
                // the return address is the operand byte just consumed; the
                // post-RET fetch pre-increments onto the next instruction
                self.stack_push(self.pc)?;
                self.pc = target - 1;
            }
            Opcode::Int => {
                let reg = self.next_register()?;
                let line = (self.registers.get(reg) & 0b111) as u8;
                interrupt::raise(self, line);
            }
            Opcode::Jmp => {
                let reg = self.next_register()?;
                self.pc = self.registers.get(reg) - 1;
            }
            Opcode::Jeq => self.jump_if(self.flags.equal)?,
            Opcode::Jne => self.jump_if(!self.flags.equal)?,
            Opcode::Jgt => self.jump_if(self.flags.greater)?,
            Opcode::Jlt => self.jump_if(self.flags.less)?,
            Opcode::Jle => self.jump_if(self.flags.less || self.flags.equal)?,
            Opcode::Jge => self.jump_if(self.flags.greater || self.flags.equal)?,
            Opcode::Ldi => {
                let reg = self.next_register()?;
                let value = self.next_byte()?;
                self.registers.set(reg, value);
            }
            Opcode::Ld => {
                let reg_a = self.next_register()?;
                let reg_b = self.next_register()?;
                let value = self.ram.read(self.registers.get(reg_b))?;
                self.registers.set(reg_a, value);
            }
            Opcode::St => {
                let reg_a = self.next_register()?;
                let reg_b = self.next_register()?;
                self.ram
                    .write(self.registers.get(reg_a), self.registers.get(reg_b))?;
            }
            Opcode::Unary(op) => {
                let reg = self.next_register()?;
                let result = op.apply(self.registers.get(reg));
                self.registers.set(reg, result);
            }
            Opcode::Binary(op) => {
                let reg_a = self.next_register()?;
                let reg_b = self.next_register()?;
                let result = op.apply(self.registers.get(reg_a), self.registers.get(reg_b))?;
                self.registers.set(reg_a, result);
            }
            Opcode::Cmp => {
                let reg_a = self.next_register()?;
                let reg_b = self.next_register()?;
                self.flags
                    .set_compare(self.registers.get(reg_a), self.registers.get(reg_b));
            }
            Opcode::BinaryImmediate(op) => {
                let reg = self.next_register()?;
                let literal = self.next_byte()?;
                let result = op.apply(self.registers.get(reg), literal)?;
                self.registers.set(reg, result);
            }
        }
        Ok(Signal::Continue)
    }

    /// Pre-increment the program counter and fetch the byte it lands on.
    /// Every byte consumed, opcode or operand, goes through here.
    fn next_byte(&mut self) -> Result<Word> {
        self.pc += 1;
        self.ram.read(self.pc)
    }

    /// Fetch a register operand; only the 3 encoded bits are significant.
    fn next_register(&mut self) -> Result<usize> {
        Ok((self.next_byte()? & 0b111) as usize)
    }

    /// A conditional jump that is not taken still consumes its operand byte,
    /// so the program counter skips the whole instruction.
    fn jump_if(&mut self, take: bool) -> Result<()> {
        let reg = self.next_register()?;
        if take {
            self.pc = self.registers.get(reg) - 1;
        }
        Ok(())
    }

    /// Write at the stack pointer, then decrement it. Refuses to grow down
    /// into the loaded program.
    pub(crate) fn stack_push(&mut self, value: Word) -> Result<()> {
        let sp = self.registers.get(RegisterFile::STACK_POINTER);
        if sp <= self.ram.loaded_len() as Word {
            return Err(VmError::StackOverflow);
        }
        self.ram.write(sp, value)?;
        self.registers.set(RegisterFile::STACK_POINTER, sp - 1);
        Ok(())
    }

    /// Increment the stack pointer, then read. Underflows at the sentinel.
    pub(crate) fn stack_pop(&mut self) -> Result<Word> {
        let sp = self.registers.get(RegisterFile::STACK_POINTER);
        if sp >= crate::memory::STACK_START {
            return Err(VmError::StackUnderflow);
        }
        self.registers.set(RegisterFile::STACK_POINTER, sp + 1);
        self.ram.read(sp + 1)
    }

    // state inspection, used by the tests

    pub fn register(&self, index: usize) -> Word {
        self.registers.get(index)
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn pc(&self) -> Word {
        self.pc
    }

    pub fn ram(&self) -> &Ram {
        &self.ram
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{LAST_KEY, STACK_START};
    use crate::{ManualClock, ScriptedInput};
    use std::time::Duration;

    fn load(cpu: &mut Cpu, bytes: &[u8]) {
        for byte in bytes {
            cpu.ram_load(*byte).unwrap();
        }
    }

    #[test]
    fn test_ldi_sets_register() {
        let mut clock = ManualClock::new();
        let mut input = ScriptedInput::empty();
        let mut out = Vec::new();
        let mut cpu = Cpu::new(&mut clock, &mut input, &mut out);
        load(&mut cpu, &[0x82, 0x00, 0x2a, 0x01]); // LDI R0,42; HLT
        cpu.run().unwrap();
        assert_eq!(cpu.register(0), 42);
    }

    #[test]
    fn test_add_prints_fifteen() {
        let mut clock = ManualClock::new();
        let mut input = ScriptedInput::empty();
        let mut out = Vec::new();
        let mut cpu = Cpu::new(&mut clock, &mut input, &mut out);
        // LDI R0,5; LDI R1,10; ADD R0,R1; PRN R0; HLT
        load(
            &mut cpu,
            &[0x82, 0x00, 0x05, 0x82, 0x01, 0x0a, 0xa0, 0x00, 0x01, 0x47, 0x00, 0x01],
        );
        cpu.run().unwrap();
        assert_eq!(cpu.register(0), 15);
        drop(cpu);
        assert_eq!(out, b"15\n");
    }

    #[test]
    fn test_div_by_zero_halts_before_printing() {
        let mut clock = ManualClock::new();
        let mut input = ScriptedInput::empty();
        let mut out = Vec::new();
        let mut cpu = Cpu::new(&mut clock, &mut input, &mut out);
        // LDI R0,5; LDI R1,0; DIV R0,R1; PRN R0; HLT
        load(
            &mut cpu,
            &[0x82, 0x00, 0x05, 0x82, 0x01, 0x00, 0xa3, 0x00, 0x01, 0x47, 0x00, 0x01],
        );
        assert!(matches!(cpu.run(), Err(VmError::DivisionByZero)));
        drop(cpu);
        assert!(out.is_empty());
    }

    #[test]
    fn test_pop_on_empty_stack_underflows() {
        let mut clock = ManualClock::new();
        let mut input = ScriptedInput::empty();
        let mut out = Vec::new();
        let mut cpu = Cpu::new(&mut clock, &mut input, &mut out);
        load(&mut cpu, &[0x46, 0x00, 0x01]); // POP R0; HLT
        assert!(matches!(cpu.run(), Err(VmError::StackUnderflow)));
    }

    #[test]
    fn test_push_pop_roundtrip_restores_stack_pointer() {
        let mut clock = ManualClock::new();
        let mut input = ScriptedInput::empty();
        let mut out = Vec::new();
        let mut cpu = Cpu::new(&mut clock, &mut input, &mut out);
        // LDI R0,42; PUSH R0; LDI R0,0; POP R1; HLT
        load(
            &mut cpu,
            &[0x82, 0x00, 0x2a, 0x45, 0x00, 0x82, 0x00, 0x00, 0x46, 0x01, 0x01],
        );
        cpu.run().unwrap();
        assert_eq!(cpu.register(1), 42);
        assert_eq!(cpu.register(RegisterFile::STACK_POINTER), STACK_START);
    }

    #[test]
    fn test_unbounded_pushes_hit_the_program() {
        let mut clock = ManualClock::new();
        let mut input = ScriptedInput::empty();
        let mut out = Vec::new();
        let mut cpu = Cpu::new(&mut clock, &mut input, &mut out);
        // LDI R0,3; loop: PUSH R0; JMP R0
        load(&mut cpu, &[0x82, 0x00, 0x03, 0x45, 0x00, 0x54, 0x00]);
        assert!(matches!(cpu.run(), Err(VmError::StackOverflow)));
    }

    #[test]
    fn test_call_ret_resumes_after_the_call() {
        let mut clock = ManualClock::new();
        let mut input = ScriptedInput::empty();
        let mut out = Vec::new();
        let mut cpu = Cpu::new(&mut clock, &mut input, &mut out);
        // LDI R0,9; CALL R0; LDI R1,99; HLT; sub: LDI R2,7; RET
        load(
            &mut cpu,
            &[0x82, 0x00, 0x09, 0x50, 0x00, 0x82, 0x01, 0x63, 0x01, 0x82, 0x02, 0x07, 0x11],
        );
        cpu.run().unwrap();
        assert_eq!(cpu.register(2), 7); // subroutine ran
        assert_eq!(cpu.register(1), 99); // and we came back
        assert_eq!(cpu.register(RegisterFile::STACK_POINTER), STACK_START);
    }

    #[test]
    fn test_untaken_jump_still_consumes_its_operand() {
        let mut clock = ManualClock::new();
        let mut input = ScriptedInput::empty();
        let mut out = Vec::new();
        let mut cpu = Cpu::new(&mut clock, &mut input, &mut out);
        // CMP R0,R0 sets E, so JNE falls through; its operand byte 0x01
        // must not be executed as HLT
        load(
            &mut cpu,
            &[0xa7, 0x00, 0x00, 0x56, 0x01, 0x82, 0x02, 0x05, 0x01],
        );
        cpu.run().unwrap();
        assert_eq!(cpu.register(2), 5);
    }

    #[test]
    fn test_taken_jump_lands_on_its_target() {
        let mut clock = ManualClock::new();
        let mut input = ScriptedInput::empty();
        let mut out = Vec::new();
        let mut cpu = Cpu::new(&mut clock, &mut input, &mut out);
        // CMP R0,R0; LDI R1,11; JEQ R1 skips the LDI R2,5 at address 8
        load(
            &mut cpu,
            &[0xa7, 0x00, 0x00, 0x82, 0x01, 0x0b, 0x55, 0x01, 0x82, 0x02, 0x05, 0x01],
        );
        cpu.run().unwrap();
        assert_eq!(cpu.register(2), RegisterFile::UNSET);
    }

    #[test]
    fn test_st_then_ld_through_memory() {
        let mut clock = ManualClock::new();
        let mut input = ScriptedInput::empty();
        let mut out = Vec::new();
        let mut cpu = Cpu::new(&mut clock, &mut input, &mut out);
        // LDI R0,100; LDI R1,77; ST R0,R1; LD R2,R0; HLT
        load(
            &mut cpu,
            &[0x82, 0x00, 0x64, 0x82, 0x01, 0x4d, 0x84, 0x00, 0x01, 0x83, 0x02, 0x00, 0x01],
        );
        cpu.run().unwrap();
        assert_eq!(cpu.register(2), 77);
        assert_eq!(cpu.ram().read(100).unwrap(), 77);
    }

    #[test]
    fn test_st_past_the_top_of_ram_is_fatal() {
        let mut clock = ManualClock::new();
        let mut input = ScriptedInput::empty();
        let mut out = Vec::new();
        let mut cpu = Cpu::new(&mut clock, &mut input, &mut out);
        // LDI R0,255; LDI R1,255; ADD R0,R1 -> 510; ST R0,R1
        load(
            &mut cpu,
            &[0x82, 0x00, 0xff, 0x82, 0x01, 0xff, 0xa0, 0x00, 0x01, 0x84, 0x00, 0x01, 0x01],
        );
        assert!(matches!(
            cpu.run(),
            Err(VmError::AddressOutOfRange(510))
        ));
    }

    #[test]
    fn test_unsupported_opcode_is_fatal() {
        let mut clock = ManualClock::new();
        let mut input = ScriptedInput::empty();
        let mut out = Vec::new();
        let mut cpu = Cpu::new(&mut clock, &mut input, &mut out);
        load(&mut cpu, &[0xff]);
        assert!(matches!(
            cpu.run(),
            Err(VmError::UnsupportedInstruction {
                opcode: 0xff,
                addr: 0
            })
        ));
    }

    #[test]
    fn test_addi_adds_a_literal_in_place() {
        let mut clock = ManualClock::new();
        let mut input = ScriptedInput::empty();
        let mut out = Vec::new();
        let mut cpu = Cpu::new(&mut clock, &mut input, &mut out);
        // LDI R0,5; ADDI R0,7; HLT
        load(&mut cpu, &[0x82, 0x00, 0x05, 0xb0, 0x00, 0x07, 0x01]);
        cpu.run().unwrap();
        assert_eq!(cpu.register(0), 12);
    }

    #[test]
    fn test_unary_op_rewrites_in_place() {
        let mut clock = ManualClock::new();
        let mut input = ScriptedInput::empty();
        let mut out = Vec::new();
        let mut cpu = Cpu::new(&mut clock, &mut input, &mut out);
        // LDI R0,9; INC R0; HLT
        load(&mut cpu, &[0x82, 0x00, 0x09, 0xa5, 0x00, 0x01]);
        cpu.run().unwrap();
        assert_eq!(cpu.register(0), 10);
    }

    #[test]
    fn test_pra_prints_raw_characters() {
        let mut clock = ManualClock::new();
        let mut input = ScriptedInput::empty();
        let mut out = Vec::new();
        let mut cpu = Cpu::new(&mut clock, &mut input, &mut out);
        // LDI R0,'H'; PRA R0; LDI R0,'i'; PRA R0; HLT
        load(
            &mut cpu,
            &[0x82, 0x00, 0x48, 0x48, 0x00, 0x82, 0x00, 0x69, 0x48, 0x00, 0x01],
        );
        cpu.run().unwrap();
        drop(cpu);
        assert_eq!(out, b"Hi");
    }

    #[test]
    fn test_software_interrupt_saves_and_restores_context() {
        let mut clock = ManualClock::new();
        let mut input = ScriptedInput::empty();
        let mut out = Vec::new();
        let mut cpu = Cpu::new(&mut clock, &mut input, &mut out);
        // vector line 2 at handler 21, unmask it, INT R0 with R0=2; the
        // handler clobbers R3/R4 and stores 99 at address 200, then IRET;
        // the main line then sets R3=42 and halts
        load(
            &mut cpu,
            &[
                0x82, 0x01, 0x15, // LDI R1,21 (handler)
                0x82, 0x02, 0xfa, // LDI R2,250 (vector cell for line 2)
                0x84, 0x02, 0x01, // ST R2,R1
                0x82, 0x05, 0x04, // LDI R5,0b100 (unmask line 2)
                0x82, 0x00, 0x02, // LDI R0,2
                0x52, 0x00, //       INT R0
                0x82, 0x03, 0x2a, // LDI R3,42 (first instruction after IRET)
                0x01, //             HLT
                0x82, 0x03, 0xc8, // handler: LDI R3,200
                0x82, 0x04, 0x63, // LDI R4,99
                0x84, 0x03, 0x04, // ST R3,R4
                0x13, //             IRET
            ],
        );
        cpu.run().unwrap();
        assert_eq!(cpu.ram().read(200).unwrap(), 99); // handler ran
        assert_eq!(cpu.register(3), 42); // resumed after INT
        assert_eq!(cpu.register(4), RegisterFile::UNSET); // restored
        assert_eq!(cpu.register(RegisterFile::INTERRUPT_STATUS), 0); // bit cleared
        assert_eq!(cpu.register(RegisterFile::STACK_POINTER), STACK_START);
        assert_eq!(cpu.flags(), Flags::default());
    }

    #[test]
    fn test_timer_preempts_once_the_vector_is_set() {
        let mut clock = ManualClock::new();
        clock.advance(Duration::from_secs(2));
        let mut input = ScriptedInput::empty();
        let mut out = Vec::new();
        let mut cpu = Cpu::new(&mut clock, &mut input, &mut out);
        // install a line-0 handler at 15, unmask the timer, then idle; the
        // handler stores 55 at address 200 and returns
        load(
            &mut cpu,
            &[
                0x82, 0x01, 0x0f, // LDI R1,15 (handler)
                0x82, 0x02, 0xf8, // LDI R2,248 (vector cell for line 0)
                0x84, 0x02, 0x01, // ST R2,R1
                0x82, 0x05, 0x01, // LDI R5,1 (unmask line 0)
                0x00, 0x00, //       NOP; NOP
                0x01, //             HLT
                0x82, 0x03, 0xc8, // handler: LDI R3,200
                0x82, 0x04, 0x37, // LDI R4,55
                0x84, 0x03, 0x04, // ST R3,R4
                0x13, //             IRET
            ],
        );
        cpu.run().unwrap();
        assert_eq!(cpu.ram().read(200).unwrap(), 55);
        assert_eq!(cpu.register(3), RegisterFile::UNSET); // restored
        assert_eq!(cpu.register(RegisterFile::INTERRUPT_STATUS), 0);
    }

    #[test]
    fn test_timer_does_not_fire_with_no_handler_installed() {
        let mut clock = ManualClock::new();
        clock.advance(Duration::from_secs(5));
        let mut input = ScriptedInput::empty();
        let mut out = Vec::new();
        let mut cpu = Cpu::new(&mut clock, &mut input, &mut out);
        load(&mut cpu, &[0x00, 0x00, 0x01]); // NOP; NOP; HLT
        cpu.run().unwrap();
        assert_eq!(cpu.register(RegisterFile::INTERRUPT_STATUS), 0);
    }

    #[test]
    fn test_keyboard_byte_lands_at_last_key() {
        let mut clock = ManualClock::new();
        let mut input = ScriptedInput::new(b"a");
        let mut out = Vec::new();
        let mut cpu = Cpu::new(&mut clock, &mut input, &mut out);
        // no handler and nothing unmasked: the byte is stashed and the
        // status bit stays pending
        load(&mut cpu, &[0x00, 0x00, 0x01]); // NOP; NOP; HLT
        cpu.run().unwrap();
        assert_eq!(cpu.ram().read(LAST_KEY).unwrap(), Word::from(b'a'));
        assert_eq!(cpu.register(RegisterFile::INTERRUPT_STATUS), 0b10);
    }
}
