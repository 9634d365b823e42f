//! Remembered Set
//!
//! A global, lock-protected list of Old-generation body addresses that hold
//! a pointer into the Young generation, populated by the write barrier and
//! drained at the start of a minor cycle to seed the mark stack. Duplicates
//! are permitted; there is no deduplication.

use parking_lot::Mutex;

pub struct RememberedSet {
    entries: Mutex<Vec<usize>>,
}

impl RememberedSet {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Record `body` as a possible source of an Old-to-Young reference.
    pub fn add(&self, body: usize) {
        self.entries.lock().push(body);
    }

    /// Pop one recorded body address, if any remain.
    pub fn pop(&self) -> Option<usize> {
        self.entries.lock().pop()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drain and return every recorded entry, leaving the set empty.
    pub fn drain(&self) -> Vec<usize> {
        std::mem::take(&mut *self.entries.lock())
    }
}

impl Default for RememberedSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_drain() {
        let set = RememberedSet::new();
        set.add(0x100);
        set.add(0x200);
        set.add(0x100);
        let drained = set.drain();
        assert_eq!(drained, vec![0x100, 0x200, 0x100]);
        assert!(set.is_empty());
    }

    #[test]
    fn pop_returns_none_when_empty() {
        let set = RememberedSet::new();
        assert_eq!(set.pop(), None);
    }
}
