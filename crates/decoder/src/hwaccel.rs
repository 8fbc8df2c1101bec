//! Hardware-acceleration hooks for the frame-threaded pipeline.
//!
//! Accelerator backends differ in how much concurrency they survive, so
//! the pipeline carries two capability bits and two locks:
//!
//! - a backend that is not `thread_safe` gets its decode calls serialized
//!   under the pipeline's serial lock, and its per-stream state is handed
//!   from worker to worker as an exclusive token;
//! - a backend that is not `async_safe` must never see its entry points
//!   raced against the caller thread, so the caller drops the async lock
//!   while inside the pipeline and re-takes it on the way out.

use std::any::Any;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

// ─── Capabilities ────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct HwAccelCaps {
    /// Safe to call from several workers at once; state may be shared.
    pub thread_safe: bool,
    /// Safe to call concurrently with the caller thread.
    pub async_safe: bool,
}

// ─── Accelerator state ───────────────────────────────────────────────

/// Backend state, owned according to the backend's thread safety.
pub enum HwAccelState {
    /// Thread-safe backend: one instance shared by every worker.
    Shared(Arc<dyn Any + Send + Sync>),
    /// Thread-unsafe backend: a single token moved between workers.
    Exclusive(Box<dyn Any + Send>),
}

/// A bound accelerator backend.
pub struct HwAccel {
    pub name: &'static str,
    pub caps: HwAccelCaps,
    pub state: HwAccelState,
}

impl HwAccel {
    pub fn shared(
        name: &'static str,
        caps: HwAccelCaps,
        state: Arc<dyn Any + Send + Sync>,
    ) -> Self {
        assert!(caps.thread_safe, "shared state requires a thread-safe backend");
        Self {
            name,
            caps,
            state: HwAccelState::Shared(state),
        }
    }

    pub fn exclusive(name: &'static str, caps: HwAccelCaps, state: Box<dyn Any + Send>) -> Self {
        assert!(
            !caps.thread_safe,
            "thread-safe backends share state instead of passing a token"
        );
        Self {
            name,
            caps,
            state: HwAccelState::Exclusive(state),
        }
    }

    pub fn is_exclusive(&self) -> bool {
        matches!(self.state, HwAccelState::Exclusive(_))
    }
}

impl std::fmt::Debug for HwAccel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HwAccel")
            .field("name", &self.name)
            .field("caps", &self.caps)
            .field("exclusive", &self.is_exclusive())
            .finish()
    }
}

// ─── Serial lock ─────────────────────────────────────────────────────

/// A lock whose acquire and release may happen on different threads.
///
/// Both accelerator locks need this shape: the serial lock is taken by
/// whichever worker reaches its accelerator section next, and the async
/// lock is released inside the pipeline on behalf of the caller. A plain
/// mutex guard cannot cross threads, so this is a boolean under a mutex.
pub struct SerialLock {
    locked: Mutex<bool>,
    cond: Condvar,
}

impl Default for SerialLock {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialLock {
    pub fn new() -> Self {
        Self {
            locked: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    /// Start out held, for locks the caller conceptually owns from the
    /// moment the pipeline is built.
    pub fn new_locked() -> Self {
        Self {
            locked: Mutex::new(true),
            cond: Condvar::new(),
        }
    }

    pub fn lock(&self) {
        let mut locked = self.locked.lock();
        while *locked {
            self.cond.wait(&mut locked);
        }
        *locked = true;
    }

    pub fn unlock(&self) {
        let mut locked = self.locked.lock();
        debug_assert!(*locked, "unlock of an unheld serial lock");
        *locked = false;
        self.cond.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn lock_excludes_and_hands_over() {
        let lock = Arc::new(SerialLock::new());
        let token = Arc::new(Mutex::new(0u32));

        lock.lock();
        let other = {
            let lock = Arc::clone(&lock);
            let token = Arc::clone(&token);
            thread::spawn(move || {
                lock.lock();
                *token.lock() += 1;
                lock.unlock();
            })
        };
        thread::sleep(Duration::from_millis(10));
        assert_eq!(*token.lock(), 0);
        lock.unlock();
        other.join().unwrap();
        assert_eq!(*token.lock(), 1);
    }

    #[test]
    fn unlock_can_happen_on_another_thread() {
        let lock = Arc::new(SerialLock::new_locked());
        let releaser = {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                lock.unlock();
            })
        };
        // Blocks until the other thread releases.
        lock.lock();
        lock.unlock();
        releaser.join().unwrap();
    }

    #[test]
    fn exclusive_token_moves_state() {
        let accel = HwAccel::exclusive(
            "mock",
            HwAccelCaps {
                thread_safe: false,
                async_safe: false,
            },
            Box::new(42u32),
        );
        match accel.state {
            HwAccelState::Exclusive(state) => {
                assert_eq!(*state.downcast::<u32>().unwrap(), 42);
            }
            HwAccelState::Shared(_) => panic!("expected exclusive state"),
        }
    }
}
