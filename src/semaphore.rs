use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

/// Counting semaphore bounding how many model sessions are alive at once.
///
/// Clones share the same permits.
#[derive(Clone)]
pub struct SessionGate {
    state: Arc<GateState>,
}

struct GateState {
    available: Mutex<usize>,
    condition: Condvar,
}

/// A held permit. Returned to the gate on drop.
pub struct SessionPermit {
    state: Arc<GateState>,
}

impl SessionGate {
    /// A gate with `permits` slots. Zero is raised to one so `acquire` can
    /// never block forever.
    pub fn new(permits: usize) -> Self {
        Self {
            state: Arc::new(GateState {
                available: Mutex::new(permits.max(1)),
                condition: Condvar::new(),
            }),
        }
    }

    /// Blocks until a permit is free.
    pub fn acquire(&self) -> SessionPermit {
        let mut available = self.state.available.lock();
        self.state
            .condition
            .wait_while(&mut available, |&mut c| c == 0);
        *available -= 1;
        SessionPermit {
            state: Arc::clone(&self.state),
        }
    }

    pub fn try_acquire(&self) -> Option<SessionPermit> {
        let mut available = self.state.available.lock();
        if *available == 0 {
            return None;
        }
        *available -= 1;
        Some(SessionPermit {
            state: Arc::clone(&self.state),
        })
    }

    pub fn available(&self) -> usize {
        *self.state.available.lock()
    }
}

impl Drop for SessionPermit {
    fn drop(&mut self) {
        let mut available = self.state.available.lock();
        *available += 1;
        self.state.condition.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn permits_return_on_drop() {
        let gate = SessionGate::new(2);
        let first = gate.acquire();
        let second = gate.acquire();
        assert_eq!(gate.available(), 0);
        assert!(gate.try_acquire().is_none());

        drop(first);
        assert_eq!(gate.available(), 1);
        drop(second);
        assert_eq!(gate.available(), 2);
    }

    #[test]
    fn zero_permits_means_one() {
        assert_eq!(SessionGate::new(0).available(), 1);
    }

    #[test]
    fn concurrent_holders_never_exceed_permits() {
        let gate = SessionGate::new(2);
        let live = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = gate.clone();
                let live = Arc::clone(&live);
                let peak = Arc::clone(&peak);
                thread::spawn(move || {
                    let _permit = gate.acquire();
                    let now = live.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(std::time::Duration::from_millis(5));
                    live.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(gate.available(), 2);
    }
}
