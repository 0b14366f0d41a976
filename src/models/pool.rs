//! Fixed-size pool of exclusively-used values (ONNX sessions)

use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Pool of independently locked slots.
///
/// `acquire` hands out the first idle slot; callers only wait when every
/// slot is in use.
pub struct SessionPool<T> {
    slots: Vec<Mutex<T>>,
    next: AtomicUsize,
}

impl<T> SessionPool<T> {
    /// Returns `None` for an empty pool
    pub fn new(items: Vec<T>) -> Option<Self> {
        if items.is_empty() {
            return None;
        }
        Some(Self {
            slots: items.into_iter().map(Mutex::new).collect(),
            next: AtomicUsize::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn acquire(&self) -> MutexGuard<'_, T> {
        for slot in &self.slots {
            if let Some(guard) = slot.try_lock() {
                return guard;
            }
        }

        // All busy: queue on slots round-robin
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.slots.len();
        self.slots[index].lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::time::Duration;

    #[test]
    fn test_empty_pool_rejected() {
        assert!(SessionPool::<u8>::new(Vec::new()).is_none());
    }

    #[test]
    fn test_held_slot_is_skipped() {
        let pool = SessionPool::new(vec![0, 1]).unwrap();
        let first = pool.acquire();
        let second = pool.acquire();
        assert_ne!(*first, *second);
    }

    #[test]
    fn test_two_callers_run_at_the_same_time() {
        let pool = SessionPool::new(vec![(), ()]).unwrap();
        let barrier = Barrier::new(2);

        // Each caller holds its slot until the other one also holds one
        std::thread::scope(|scope| {
            for _ in 0..2 {
                scope.spawn(|| {
                    let _slot = pool.acquire();
                    barrier.wait();
                });
            }
        });
    }

    #[test]
    fn test_busy_pool_waits_for_release() {
        let pool = SessionPool::new(vec![0u32]).unwrap();

        std::thread::scope(|scope| {
            let mut held = pool.acquire();
            let waiter = scope.spawn(|| *pool.acquire());
            std::thread::sleep(Duration::from_millis(20));
            *held = 7;
            drop(held);
            assert_eq!(waiter.join().unwrap(), 7);
        });
    }
}
