//! Per-frame decode progress.
//!
//! A reference frame being decoded on one worker is consumed row-by-row by
//! the workers decoding frames that predict from it. The producer reports
//! how far it has got (in rows, per field); consumers wait until the rows
//! they need are in place. The fast path is a single atomic load, the slow
//! path parks on a condvar.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use fm_common::VideoFrame;

/// Number of independently tracked progress fields (top/bottom field for
/// interlaced content; progressive frames use field 0 only).
pub const PROGRESS_FIELDS: usize = 2;

/// Monotonic row counters for one frame, starting at -1 (nothing decoded).
pub struct FrameProgress {
    fields: [AtomicI32; PROGRESS_FIELDS],
    mutex: Mutex<()>,
    cond: Condvar,
}

impl Default for FrameProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameProgress {
    pub fn new() -> Self {
        Self {
            fields: [AtomicI32::new(-1), AtomicI32::new(-1)],
            mutex: Mutex::new(()),
            cond: Condvar::new(),
        }
    }

    /// Current progress of a field.
    pub fn current(&self, field: usize) -> i32 {
        self.fields[field].load(Ordering::Acquire)
    }

    /// Publish progress up to row `n`. Reports never move backwards; a
    /// stale report is ignored.
    pub fn report(&self, field: usize, n: i32) {
        if self.fields[field].load(Ordering::Relaxed) >= n {
            return;
        }
        let _guard = self.mutex.lock();
        self.fields[field].store(n, Ordering::Release);
        self.cond.notify_all();
    }

    /// Mark the whole frame complete (both fields).
    pub fn finish(&self) {
        for field in 0..PROGRESS_FIELDS {
            self.report(field, i32::MAX);
        }
    }

    /// Block until progress on `field` reaches at least `n`.
    pub fn wait_for(&self, field: usize, n: i32) {
        if self.fields[field].load(Ordering::Acquire) >= n {
            return;
        }
        let mut guard = self.mutex.lock();
        while self.fields[field].load(Ordering::Acquire) < n {
            self.cond.wait(&mut guard);
        }
    }
}

/// A decoded frame paired with its progress counters.
///
/// The producer worker holds one clone and reports into it; consumers hold
/// clones and wait on it. Frame pixel data is only read below the reported
/// row, so the release/acquire pair on the counter is what publishes it.
#[derive(Clone)]
pub struct ProgressFrame {
    pub frame: Arc<VideoFrame>,
    progress: Arc<FrameProgress>,
}

impl ProgressFrame {
    pub fn new(frame: VideoFrame) -> Self {
        Self {
            frame: Arc::new(frame),
            progress: Arc::new(FrameProgress::new()),
        }
    }

    pub fn progress(&self) -> &FrameProgress {
        &self.progress
    }
}
