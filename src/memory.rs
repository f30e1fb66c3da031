use crate::{Result, VmError};

// NB. cells are signed words, not u8: interrupt context save parks program
// counters, packed flags and register values (including the -1 "unset"
// sentinel) on the stack and must get them back bit-for-bit. The loader only
// ever appends byte values 0-255.

/// One memory cell / register value.
pub type Word = i32;

/// How much RAM we have.
pub const RAM_SIZE: usize = 256;

/// LS-8 memory map, reserved cells at the top of RAM:
///   0x00-0xf2  program, then free space the stack grows down into
///   0xf3       stack start sentinel (alias of -13); SP begins here
///   0xf4       last key pressed (alias of -12)
///   0xf8-0xff  interrupt vector table (aliases of -8..-1), one cell per line
pub const STACK_START: Word = RAM_SIZE as Word - 13;

/// Where the keyboard interrupt drops the byte it read.
pub const LAST_KEY: Word = RAM_SIZE as Word - 12;

/// First cell of the interrupt vector table; cell `VECTOR_TABLE + n` holds
/// the handler entry address for interrupt line `n`, 0 meaning "disabled".
pub const VECTOR_TABLE: Word = RAM_SIZE as Word - 8;

/// Handler-entry cell for one interrupt line.
pub fn vector_address(line: u8) -> Word {
    VECTOR_TABLE + Word::from(line)
}

/// Flat RAM plus a high-water mark for the loaded program, so the stack can
/// refuse to grow down into it.
pub struct Ram {
    cells: [Word; RAM_SIZE],
    used: usize,
}

impl Ram {
    pub fn new() -> Self {
        Ram {
            cells: [0; RAM_SIZE],
            used: 0,
        }
    }

    /// Small negative addresses alias the top of RAM, mirroring how the
    /// reserved cells above are usually written in listings. Anything that
    /// still lands outside RAM after that is an error.
    fn resolve(&self, addr: Word) -> Result<usize> {
        let resolved = if addr < 0 { addr + RAM_SIZE as Word } else { addr };
        if (0..RAM_SIZE as Word).contains(&resolved) {
            Ok(resolved as usize)
        } else {
            Err(VmError::AddressOutOfRange(addr))
        }
    }

    pub fn read(&self, addr: Word) -> Result<Word> {
        Ok(self.cells[self.resolve(addr)?])
    }

    pub fn write(&mut self, addr: Word, value: Word) -> Result<()> {
        let index = self.resolve(addr)?;
        self.cells[index] = value;
        Ok(())
    }

    /// Append one program byte at the next free address. This is the whole
    /// of the engine's contract with the loader.
    pub fn load(&mut self, byte: u8) -> Result<()> {
        if self.used >= STACK_START as usize {
            return Err(VmError::MemoryFull);
        }
        self.cells[self.used] = Word::from(byte);
        self.used += 1;
        Ok(())
    }

    /// Highest address holding loaded program bytes, plus one.
    pub fn loaded_len(&self) -> usize {
        self.used
    }
}

impl Default for Ram {
    fn default() -> Self {
        Self::new()
    }
}
