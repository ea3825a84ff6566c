//! Lock-free bounded tick ring
//!
//! Array-backed multi-producer/single-consumer queue of heap-allocated
//! ticks. Producers claim a slot by CAS-incrementing the tail counter and
//! publish by swinging the slot pointer from null to the tick; the single
//! consumer takes the pointer back to null and advances the head. Head and
//! tail live on separate cache lines to avoid false sharing, and both are
//! monotone counters masked into the power-of-two slot array.

use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

use crossbeam::utils::CachePadded;

use crate::data::Tick;
use crate::error::{EngineError, Result};

/// Bounded MP/SC ring of owned tick pointers.
///
/// The ring owns every pointer currently enqueued; teardown drains and
/// frees them.
pub struct TickRing {
    slots: Box<[AtomicPtr<Tick>]>,
    mask: usize,
    capacity: usize,
    head: CachePadded<AtomicUsize>,
    tail: CachePadded<AtomicUsize>,
}

impl TickRing {
    /// Create a ring with the given slot count.
    ///
    /// Capacity must be a power of two so slot indexing reduces to a mask.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(EngineError::InvalidArgument(format!(
                "ring capacity must be a power of two, got {capacity}"
            )));
        }

        let slots: Box<[AtomicPtr<Tick>]> = (0..capacity)
            .map(|_| AtomicPtr::new(ptr::null_mut()))
            .collect();

        Ok(Self {
            slots,
            mask: capacity - 1,
            capacity,
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
        })
    }

    /// Enqueue a tick. Fails and returns the tick when the ring is full.
    ///
    /// Safe to call from multiple producer threads; FIFO per producer.
    #[inline]
    pub fn push(&self, tick: Box<Tick>) -> std::result::Result<(), Box<Tick>> {
        let mut tail = self.tail.load(Ordering::Relaxed);
        loop {
            let head = self.head.load(Ordering::Acquire);
            if tail.wrapping_sub(head) >= self.capacity {
                return Err(tick);
            }
            match self.tail.compare_exchange_weak(
                tail,
                tail.wrapping_add(1),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => tail = current,
            }
        }

        // The claimed slot was cleared by the consumer before head moved
        // past it, so the publish CAS succeeds on the first attempt except
        // under a stale head read.
        let slot = &self.slots[tail & self.mask];
        let raw = Box::into_raw(tick);
        while slot
            .compare_exchange(ptr::null_mut(), raw, Ordering::Release, Ordering::Relaxed)
            .is_err()
        {
            std::hint::spin_loop();
        }
        Ok(())
    }

    /// Dequeue the oldest tick. Single consumer only.
    ///
    /// Returns `None` when the ring is empty, or when the head slot has
    /// been claimed by a producer that has not yet published.
    #[inline]
    pub fn pop(&self) -> Option<Box<Tick>> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head == tail {
            return None;
        }

        let slot = &self.slots[head & self.mask];
        let raw = slot.load(Ordering::Acquire);
        if raw.is_null() {
            return None;
        }
        if slot
            .compare_exchange(raw, ptr::null_mut(), Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return None;
        }
        self.head.store(head.wrapping_add(1), Ordering::Release);

        // The pointer was published via Box::into_raw and the CAS above
        // transferred sole ownership to this consumer.
        Some(unsafe { Box::from_raw(raw) })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Approximate occupancy; exact only when producers and consumer are
    /// quiescent.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        tail.wrapping_sub(head)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for TickRing {
    fn drop(&mut self) {
        for slot in self.slots.iter() {
            let raw = slot.swap(ptr::null_mut(), Ordering::Relaxed);
            if !raw.is_null() {
                // Still owned by the ring; reconstitute and free.
                drop(unsafe { Box::from_raw(raw) });
            }
        }
    }
}
