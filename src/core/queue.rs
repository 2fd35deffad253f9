//! Lock-free SPSC ring queue
//!
//! Statically allocated queue for pass-through bytes. Safe for exactly
//! one producer and one consumer without locking: each cursor is written
//! by only one side, the slot contents are published by the
//! release-store of the write cursor and observed through the
//! acquire-load on the other side.

use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Fixed-capacity single-producer single-consumer queue.
///
/// `SLOTS` is the backing array size; one slot stays unused so that
/// empty (`read == write`) and full (`(write + 1) % SLOTS == read`) are
/// distinguishable. A queue of capacity `N` therefore uses `N + 1`
/// slots:
///
/// ```
/// use picolink::core::queue::SpscQueue;
///
/// let queue: SpscQueue<u8, 5> = SpscQueue::new(); // holds 4 bytes
/// assert_eq!(queue.capacity(), 4);
/// ```
pub struct SpscQueue<T, const SLOTS: usize> {
    slots: [UnsafeCell<MaybeUninit<T>>; SLOTS],
    // Next slot dequeue will read. Only the consumer advances it.
    read: AtomicUsize,
    // Next slot enqueue will write. Only the producer advances it.
    write: AtomicUsize,
}

// One producer and one consumer may hold shared references from
// different contexts; the cursor discipline keeps slot accesses
// disjoint.
unsafe impl<T: Send, const SLOTS: usize> Sync for SpscQueue<T, SLOTS> {}

impl<T: Copy, const SLOTS: usize> SpscQueue<T, SLOTS> {
    /// Create an empty queue.
    pub const fn new() -> Self {
        const {
            assert!(SLOTS >= 2, "queue needs at least one usable slot");
        }
        Self {
            slots: [const { UnsafeCell::new(MaybeUninit::uninit()) }; SLOTS],
            read: AtomicUsize::new(0),
            write: AtomicUsize::new(0),
        }
    }

    /// Number of elements the queue can hold.
    pub const fn capacity(&self) -> usize {
        SLOTS - 1
    }

    /// Returns true if the queue is empty (dequeue will return `None`).
    pub fn empty(&self) -> bool {
        self.read.load(Ordering::Acquire) == self.write.load(Ordering::Acquire)
    }

    /// Returns true if the queue is full (enqueue will return false).
    pub fn full(&self) -> bool {
        let write = self.write.load(Ordering::Acquire);
        (write + 1) % SLOTS == self.read.load(Ordering::Acquire)
    }

    /// Put a value at the tail of the queue.
    ///
    /// Returns false (value dropped) if the queue is full. Producer
    /// side only.
    pub fn enqueue(&self, value: T) -> bool {
        let write = self.write.load(Ordering::Relaxed);
        let next = (write + 1) % SLOTS;
        if next == self.read.load(Ordering::Acquire) {
            return false;
        }

        // SAFETY: `write` is owned by the producer and the slot is
        // outside the consumer's read..write window until the store
        // below publishes it.
        unsafe {
            (*self.slots[write].get()).write(value);
        }
        self.write.store(next, Ordering::Release);
        true
    }

    /// Take the value at the head of the queue.
    ///
    /// Returns `None` if the queue is empty. Consumer side only.
    pub fn dequeue(&self) -> Option<T> {
        let read = self.read.load(Ordering::Relaxed);
        if read == self.write.load(Ordering::Acquire) {
            return None;
        }

        // SAFETY: read != write, so this slot holds a value the
        // producer published before its release-store of `write`.
        let value = unsafe { (*self.slots[read].get()).assume_init() };
        self.read.store((read + 1) % SLOTS, Ordering::Release);
        Some(value)
    }
}

impl<T: Copy, const SLOTS: usize> Default for SpscQueue<T, SLOTS> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    #[test]
    fn test_new_queue_is_empty() {
        let queue: SpscQueue<u8, 5> = SpscQueue::new();
        assert!(queue.empty());
        assert!(!queue.full());
        assert_eq!(queue.dequeue(), None);
    }

    #[test]
    fn test_enqueue_dequeue_order() {
        let queue: SpscQueue<u8, 9> = SpscQueue::new();
        for byte in 10..15 {
            assert!(queue.enqueue(byte));
        }
        for byte in 10..15 {
            assert_eq!(queue.dequeue(), Some(byte));
        }
        assert!(queue.empty());
    }

    #[test]
    fn test_capacity_boundary() {
        // Capacity 4: four enqueues succeed, the fifth is rejected.
        let queue: SpscQueue<u8, 5> = SpscQueue::new();
        for byte in 1..=4 {
            assert!(queue.enqueue(byte));
        }
        assert!(queue.full());
        assert!(!queue.enqueue(5));

        for byte in 1..=4 {
            assert_eq!(queue.dequeue(), Some(byte));
        }
        assert_eq!(queue.dequeue(), None);
    }

    #[test]
    fn test_wraparound_reuse() {
        let queue: SpscQueue<u8, 4> = SpscQueue::new();
        // Cycle more values through than there are slots.
        for round in 0..20u8 {
            assert!(queue.enqueue(round));
            assert_eq!(queue.dequeue(), Some(round));
        }
        assert!(queue.empty());
    }

    #[test]
    fn test_interleaved_prefix_property() {
        // Dequeued sequence must always be a prefix of the enqueued
        // sequence, regardless of interleaving.
        let queue: SpscQueue<u16, 8> = SpscQueue::new();
        let mut enqueued = Vec::new();
        let mut dequeued = Vec::new();
        let mut next = 0u16;

        for step in 0..200 {
            // Uneven push/pop mix driven by a fixed pattern.
            let pushes = (step % 3) + 1;
            let pops = step % 4;
            for _ in 0..pushes {
                if queue.enqueue(next) {
                    enqueued.push(next);
                }
                next += 1;
            }
            for _ in 0..pops {
                if let Some(value) = queue.dequeue() {
                    dequeued.push(value);
                }
            }
            assert!(dequeued.len() <= enqueued.len());
            assert_eq!(&dequeued[..], &enqueued[..dequeued.len()]);
        }

        while let Some(value) = queue.dequeue() {
            dequeued.push(value);
        }
        assert_eq!(dequeued, enqueued);
    }

    #[test]
    fn test_cross_thread_producer_consumer() {
        let queue: SpscQueue<u16, 17> = SpscQueue::new();
        const COUNT: u16 = 5000;

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for value in 0..COUNT {
                    while !queue.enqueue(value) {
                        std::thread::yield_now();
                    }
                }
            });

            let mut received = Vec::new();
            while received.len() < COUNT as usize {
                if let Some(value) = queue.dequeue() {
                    received.push(value);
                } else {
                    std::thread::yield_now();
                }
            }
            let expected: Vec<u16> = (0..COUNT).collect();
            assert_eq!(received, expected);
        });
    }
}
