//! Chunked Mark Stack
//!
//! A lock-protected LIFO of gray body addresses, internally a linked list
//! of fixed-size chunks. Popping an emptied chunk releases it back to the
//! allocator rather than keeping it around for reuse, mirroring the
//! reference collector's single-collector-thread design (process-global,
//! no per-worker sharding).

use parking_lot::Mutex;

const CHUNK_SIZE: usize = 1024;

struct Chunk {
    objects: Vec<usize>,
    next: Option<Box<Chunk>>,
}

impl Chunk {
    fn new() -> Self {
        Self {
            objects: Vec::with_capacity(CHUNK_SIZE),
            next: None,
        }
    }
}

struct Inner {
    head: Option<Box<Chunk>>,
}

/// Gray-set work list used during tracing.
pub struct MarkStack {
    inner: Mutex<Inner>,
}

impl MarkStack {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner { head: None }),
        }
    }

    /// Push a body address onto the stack.
    pub fn push(&self, body: usize) {
        let mut inner = self.inner.lock();

        let needs_new_chunk = match &inner.head {
            Some(chunk) => chunk.objects.len() >= CHUNK_SIZE,
            None => true,
        };

        if needs_new_chunk {
            let mut fresh = Box::new(Chunk::new());
            fresh.next = inner.head.take();
            inner.head = Some(fresh);
        }

        inner.head.as_mut().unwrap().objects.push(body);
    }

    /// Pop a body address, releasing the chunk if it becomes empty.
    pub fn pop(&self) -> Option<usize> {
        let mut inner = self.inner.lock();

        loop {
            let chunk = inner.head.as_mut()?;
            if let Some(obj) = chunk.objects.pop() {
                return Some(obj);
            }
            // Chunk is empty: release it and retry on the next one.
            inner.head = inner.head.take().unwrap().next;
        }
    }

    pub fn is_empty(&self) -> bool {
        let inner = self.inner.lock();
        match &inner.head {
            None => true,
            Some(chunk) => chunk.objects.is_empty() && chunk.next.is_none(),
        }
    }
}

impl Default for MarkStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_is_lifo() {
        let stack = MarkStack::new();
        stack.push(1);
        stack.push(2);
        stack.push(3);
        assert_eq!(stack.pop(), Some(3));
        assert_eq!(stack.pop(), Some(2));
        assert_eq!(stack.pop(), Some(1));
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn spans_multiple_chunks() {
        let stack = MarkStack::new();
        for i in 0..(CHUNK_SIZE * 3 + 7) {
            stack.push(i);
        }
        let mut popped = Vec::new();
        while let Some(v) = stack.pop() {
            popped.push(v);
        }
        assert_eq!(popped.len(), CHUNK_SIZE * 3 + 7);
        assert!(stack.is_empty());
    }
}
