use crate::memory::{Word, STACK_START};

/// How many registers the LS-8 has. Register operands are 3 bits wide in the
/// instruction encoding, so handlers can never decode an index past this.
pub const REGISTER_COUNT: usize = 8;

/// The register file. Registers 0-4 are general purpose; 5-7 are reserved
/// for the interrupt mask, interrupt status and stack pointer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterFile {
    values: [Word; REGISTER_COUNT],
}

impl RegisterFile {
    /// Bit `n` set here makes interrupt line `n` deliverable.
    pub const INTERRUPT_MASK: usize = 5;
    /// Bit `n` set here means interrupt line `n` is pending.
    pub const INTERRUPT_STATUS: usize = 6;
    /// Address of the next free stack slot.
    pub const STACK_POINTER: usize = 7;

    /// What general registers hold before a program touches them.
    pub const UNSET: Word = -1;

    pub fn new() -> Self {
        let mut values = [Self::UNSET; REGISTER_COUNT];
        values[Self::INTERRUPT_MASK] = 0;
        values[Self::INTERRUPT_STATUS] = 0;
        values[Self::STACK_POINTER] = STACK_START;
        RegisterFile { values }
    }

    /// An out-of-range index is a bug in the caller, not a runtime
    /// condition: operands are masked to 3 bits at decode time.
    pub fn get(&self, index: usize) -> Word {
        self.values[index]
    }

    pub fn set(&mut self, index: usize, value: Word) {
        self.values[index] = value;
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

/// The three condition flags. Only the compare family writes these, and it
/// always assigns all three together.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Flags {
    pub equal: bool,
    pub less: bool,
    pub greater: bool,
}

impl Flags {
    /// Compare `a` against `b`; exactly one of the three bits comes out set.
    pub fn set_compare(&mut self, a: Word, b: Word) {
        self.equal = a == b;
        self.less = a < b;
        self.greater = a > b;
    }

    /// Pack as `00000LGE` for interrupt context save.
    pub fn to_word(self) -> Word {
        Word::from(self.equal) | Word::from(self.greater) << 1 | Word::from(self.less) << 2
    }

    pub fn from_word(word: Word) -> Self {
        Flags {
            equal: word & 0b001 != 0,
            greater: word & 0b010 != 0,
            less: word & 0b100 != 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_on_state() {
        let r = RegisterFile::new();
        for i in 0..=4 {
            assert_eq!(r.get(i), RegisterFile::UNSET);
        }
        assert_eq!(r.get(RegisterFile::INTERRUPT_MASK), 0);
        assert_eq!(r.get(RegisterFile::INTERRUPT_STATUS), 0);
        assert_eq!(r.get(RegisterFile::STACK_POINTER), STACK_START);
    }

    #[test]
    fn test_compare_sets_exactly_one_ordering() {
        let mut f = Flags::default();
        f.set_compare(3, 3);
        assert_eq!((f.equal, f.less, f.greater), (true, false, false));
        f.set_compare(-2, 7);
        assert_eq!((f.equal, f.less, f.greater), (false, true, false));
        f.set_compare(9, 1);
        assert_eq!((f.equal, f.less, f.greater), (false, false, true));
    }

    #[test]
    fn test_flags_pack_as_lge() {
        let mut f = Flags::default();
        f.set_compare(1, 2);
        assert_eq!(f.to_word(), 0b100);
        f.set_compare(2, 1);
        assert_eq!(f.to_word(), 0b010);
        f.set_compare(1, 1);
        assert_eq!(f.to_word(), 0b001);
        assert_eq!(Flags::from_word(f.to_word()), f);
    }
}
