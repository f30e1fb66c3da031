use crossterm::event::{poll, read, Event, KeyCode};
use crossterm::terminal;
use std::collections::VecDeque;
use std::io;
use std::time::Duration;

/// Source of keyboard bytes for the keyboard interrupt. Polled once per
/// run-loop iteration; must never block.
pub trait InputSource {
    /// The next available byte, if one is waiting.
    fn poll_available_byte(&mut self) -> Result<Option<u8>, io::Error>;
}

/// Reads keypresses from the controlling terminal via crossterm. Raw mode is
/// enabled for the lifetime of the value so keys arrive unbuffered.
pub struct TerminalInput;

impl TerminalInput {
    pub fn new() -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(TerminalInput)
    }
}

impl Drop for TerminalInput {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

impl InputSource for TerminalInput {
    fn poll_available_byte(&mut self) -> Result<Option<u8>, io::Error> {
        while poll(Duration::from_millis(0))? {
            match read()? {
                Event::Key(evt) => match evt.code {
                    KeyCode::Char(key) if key.is_ascii() => return Ok(Some(key as u8)),
                    KeyCode::Enter => return Ok(Some(b'\n')),
                    _ => log::warn!("ignoring key event with no LS-8 byte mapping"),
                },
                _ => log::warn!("ignoring non-key terminal event"),
            }
        }
        Ok(None)
    }
}

/// Canned input for tests: yields the given bytes one poll at a time.
pub struct ScriptedInput {
    bytes: VecDeque<u8>,
}

impl ScriptedInput {
    pub fn new(bytes: &[u8]) -> Self {
        ScriptedInput {
            bytes: bytes.iter().copied().collect(),
        }
    }

    pub fn empty() -> Self {
        Self::new(&[])
    }
}

impl InputSource for ScriptedInput {
    fn poll_available_byte(&mut self) -> Result<Option<u8>, io::Error> {
        Ok(self.bytes.pop_front())
    }
}
