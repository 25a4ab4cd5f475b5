//! Line accumulator for incoming command bytes

use heapless::Vec;

/// Storage size, including the slot reserved for the terminator
pub const CAPACITY: usize = 50;

/// Longest line that fits
pub const MAX_LINE: usize = CAPACITY - 1;

/// The line did not fit; nothing was appended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Overflow;

/// Fixed-capacity line buffer.
///
/// At most [`MAX_LINE`] bytes are accumulated so the terminator always has
/// a slot.
pub struct CommandBuffer {
    storage: Vec<u8, CAPACITY>,
    // the last stored byte is the terminator, not part of the line
    terminated: bool,
}

impl CommandBuffer {
    /// Empty buffer
    pub const fn new() -> Self {
        CommandBuffer {
            storage: Vec::new(),
            terminated: false,
        }
    }

    /// Appends `byte`, or reports [`Overflow`] when the line is full. A
    /// terminated line is reopened first.
    pub fn push(&mut self, byte: u8) -> Result<(), Overflow> {
        if self.terminated {
            self.storage.pop();
            self.terminated = false;
        }
        if self.storage.len() < MAX_LINE {
            self.storage.push(byte).map_err(|_| Overflow)
        } else {
            Err(Overflow)
        }
    }

    /// Bytes in the line, terminator excluded
    pub fn len(&self) -> usize {
        self.storage.len() - usize::from(self.terminated)
    }

    /// Whether no byte has been accumulated
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The line accumulated so far
    pub fn as_bytes(&self) -> &[u8] {
        &self.storage[..self.len()]
    }

    /// Every written slot, terminator included once written
    pub fn storage(&self) -> &[u8] {
        &self.storage
    }

    /// Writes the NUL terminator after the line, once, and hands out the
    /// line itself for in-place processing. Follow with
    /// [`clear`](Self::clear).
    pub fn terminate_and_take(&mut self) -> &mut [u8] {
        let len = self.len();
        if !self.terminated {
            // never full here: the line is at most MAX_LINE long
            self.terminated = self.storage.push(0).is_ok();
        }
        &mut self.storage[..len]
    }

    /// Zeroes the contents and empties the buffer
    pub fn clear(&mut self) {
        self.storage.iter_mut().for_each(|b| *b = 0);
        self.storage.clear();
        self.terminated = false;
    }
}

impl Default for CommandBuffer {
    fn default() -> Self {
        CommandBuffer::new()
    }
}
