use parking_lot::{Condvar, Mutex};

/// A one-shot gate releasing every waiting thread at once.
///
/// Threads calling [`wait`] block until [`open`] is called.
/// Once open, the gate stays open and `wait` returns
/// immediately.
///
/// [`wait`]: StartGate::wait
/// [`open`]: StartGate::open
#[derive(Debug, Default)]
pub struct StartGate {
    open: Mutex<bool>,
    opened: Condvar,
}

impl StartGate {
    pub fn new() -> StartGate {
        StartGate::default()
    }

    /// Blocks until the gate is opened.
    pub fn wait(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.opened.wait(&mut open);
        }
    }

    /// Opens the gate, releasing all waiting threads.
    /// Returns `false` if it was already open.
    pub fn open(&self) -> bool {
        let mut open = self.open.lock();
        if *open {
            return false;
        }
        *open = true;
        self.opened.notify_all();
        true
    }

    /// Returns whether the gate has been opened.
    pub fn is_open(&self) -> bool {
        *self.open.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn releases_all_waiters_once() {
        let gate = StartGate::new();
        let released = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    gate.wait();
                    released.fetch_add(1, Ordering::Relaxed);
                });
            }
            assert!(gate.open());
            assert!(!gate.open());
        });

        assert_eq!(released.load(Ordering::Relaxed), 4);
        assert!(gate.is_open());
        gate.wait();
    }
}
