//! Frame-parallel decode coordination.
//!
//! One packet in, at most one frame out, per call. Packets are submitted
//! to worker slots round-robin; each submission first waits for the
//! previous slot to announce setup-finished, adopts its published
//! parameters, and only then hands over the packet. Retrieval walks the
//! slots in the same order, so frames come out in submission order no
//! matter which worker finishes first.
//!
//! The first `thread_count - 1` packets (adjusted by the configured extra
//! delay) produce no output while the window fills; end-of-stream packets
//! drain the window.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, info, warn};

use fm_common::{
    CodecParams, DecodeError, EngineError, EngineResult, Packet, ThreadingConfig, UserParams,
    VideoFrame,
};

use crate::context::CodecContext;
use crate::decoder::{FrameAllocator, FrameDecoder};
use crate::hwaccel::{HwAccel, HwAccelState, SerialLock};
use crate::worker::{spawn_worker, HwCoordination, PipelineShared, SlotResult, SlotShared};

/// Re-acquires the caller-side lock of an async-unsafe accelerator when
/// the coordinator returns, whichever path it returns by.
struct AsyncGuard(Option<Arc<SerialLock>>);

impl Drop for AsyncGuard {
    fn drop(&mut self) {
        if let Some(lock) = self.0.take() {
            lock.lock();
        }
    }
}

pub struct FrameThreadCoordinator {
    slots: Vec<Arc<SlotShared>>,
    handles: Vec<JoinHandle<()>>,
    hw: Arc<HwCoordination>,
    /// Held by the caller whenever control is outside the coordinator;
    /// only used when the accelerator is not async safe.
    async_lock: Arc<SerialLock>,
    async_unsafe: bool,
    /// The codec carries inter-frame state between workers.
    stateful: bool,
    has_delay: bool,

    next_decoding: usize,
    next_finished: usize,
    prev_thread: Option<usize>,
    submitted: u64,
    delay_window: u64,
    delaying: bool,

    user: UserParams,
    /// Caller-visible stream parameters, refreshed at every retrieval.
    params: CodecParams,
}

impl FrameThreadCoordinator {
    /// Spin up `config.effective_thread_count()` workers, each with its
    /// own decoder instance from `factory` and a copy of `params`.
    pub fn new(
        config: &ThreadingConfig,
        params: CodecParams,
        factory: &mut dyn FnMut(usize) -> Box<dyn FrameDecoder>,
        hwaccel: Option<HwAccel>,
        allocator: Box<dyn FrameAllocator>,
    ) -> EngineResult<Self> {
        let thread_count = config.effective_thread_count();
        if thread_count < 2 {
            return Err(EngineError::Config(
                "frame threading needs at least 2 workers".into(),
            ));
        }
        // The extra delay only ever shrinks the window: a window wider
        // than the slot count would re-submit a slot whose output was
        // never retrieved, silently dropping its frame.
        if config.extra_delay > 0 {
            warn!(extra_delay = config.extra_delay, "positive extra delay ignored");
        }
        let delay_window = (thread_count as i64 - 1 + config.extra_delay.min(0) as i64).max(0) as u64;

        let shared = Arc::new(PipelineShared::new(allocator, config.debug_threads));
        let hw = Arc::new(HwCoordination::default());
        let mut async_unsafe = false;

        let mut slots = Vec::with_capacity(thread_count);
        let mut stateful = false;
        let mut has_delay = false;
        for index in 0..thread_count {
            let decoder = factory(index);
            if index == 0 {
                stateful = decoder.uses_inter_frame_state();
                has_delay = decoder.has_delay();
            }
            let mut ctx = CodecContext::new(params.clone());
            if let Some(accel) = hwaccel.as_ref() {
                async_unsafe = !accel.caps.async_safe;
                if let HwAccelState::Shared(state) = &accel.state {
                    // Thread-safe backend: every worker gets the same state.
                    ctx.hwaccel = Some(HwAccel::shared(accel.name, accel.caps, Arc::clone(state)));
                }
            }
            slots.push(Arc::new(SlotShared::new(index, ctx, decoder)));
        }
        if let Some(accel) = hwaccel {
            if accel.is_exclusive() {
                // Thread-unsafe backend: decode calls serialize and the
                // state token starts in the stash.
                hw.serial_active.store(true, Ordering::Release);
                *hw.stash.lock() = Some(accel);
            }
        }

        let mut handles = Vec::with_capacity(thread_count);
        for slot in &slots {
            match spawn_worker(Arc::clone(slot), Arc::clone(&shared), Arc::clone(&hw)) {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    Self::kill_workers(&slots, &mut handles);
                    return Err(EngineError::Io(err));
                }
            }
        }
        info!(
            threads = thread_count,
            delay = delay_window,
            stateful,
            "frame threading started"
        );

        Ok(Self {
            slots,
            handles,
            hw,
            async_lock: Arc::new(SerialLock::new_locked()),
            async_unsafe,
            stateful,
            has_delay,
            next_decoding: 0,
            next_finished: 0,
            prev_thread: None,
            submitted: 0,
            delay_window,
            delaying: true,
            user: UserParams::default(),
            params,
        })
    }

    /// Caller-settable fields for subsequent submissions.
    pub fn set_user_params(&mut self, user: UserParams) {
        self.user = user;
    }

    /// Stream parameters as of the last retrieved frame.
    pub fn params(&self) -> &CodecParams {
        &self.params
    }

    pub fn thread_count(&self) -> usize {
        self.slots.len()
    }

    /// Reclaim an exclusive accelerator token. Only meaningful once no
    /// decode is in flight; blocks until the workers are idle.
    pub fn take_hwaccel(&mut self) -> Option<HwAccel> {
        self.park();
        self.hw.stash.lock().take()
    }

    /// Feed one packet and retrieve at most one frame.
    ///
    /// Returns `Ok(None)` while the window is filling. An end-of-stream
    /// packet keeps draining: call it repeatedly until it returns `None`.
    pub fn decode(&mut self, packet: &Packet) -> Result<Option<VideoFrame>, DecodeError> {
        let _async = self.release_async();
        let eos = packet.is_eos();

        // Codecs without internal delay have nothing to drain on their
        // own; end-of-stream only collects what workers still hold.
        if !eos || self.has_delay {
            self.submit(packet);
        }

        if self.delaying && self.submitted > self.delay_window {
            self.delaying = false;
        }
        if self.delaying && !eos {
            return Ok(None);
        }
        self.retrieve(eos)
    }

    /// Discard all in-flight and buffered frames and reset ordering, for
    /// a seek. Blocks until every worker is idle.
    pub fn flush(&mut self) {
        let _async = self.release_async();
        self.park();

        // Slot 0 is the first to decode after the flush; seed it with the
        // most recent parameters so the stream picks up where it left off.
        if let Some(prev_idx) = self.prev_thread {
            if prev_idx != 0 {
                let prev = &self.slots[prev_idx];
                let snapshot = {
                    let ctx = prev.ctx.lock();
                    ctx.publish(prev.decoder.lock().export_state())
                };
                self.slots[0].ctx.lock().apply_published(&snapshot);
                if self.stateful {
                    if let Some(state) = snapshot.decoder_state.as_deref() {
                        self.slots[0].decoder.lock().import_state(state);
                    }
                }
            }
        }

        self.next_decoding = 0;
        self.next_finished = 0;
        self.prev_thread = None;
        self.submitted = 0;
        self.delaying = true;

        for slot in &self.slots {
            let mut ctx = slot.ctx.lock();
            slot.decoder.lock().flush(&mut ctx);
            *slot.published.lock() = None;
            *slot.output.lock() = SlotResult::Idle;
        }
        debug!("pipeline flushed");
    }

    // ─── Internals ───────────────────────────────────────────────────

    fn release_async(&self) -> AsyncGuard {
        if self.async_unsafe {
            self.async_lock.unlock();
            AsyncGuard(Some(Arc::clone(&self.async_lock)))
        } else {
            AsyncGuard(None)
        }
    }

    fn submit(&mut self, packet: &Packet) {
        let idx = self.next_decoding;
        let slot = Arc::clone(&self.slots[idx]);

        // Parameters flow strictly in submission order: wait for the
        // previous submission to fix its frame, then adopt its snapshot.
        if let Some(prev_idx) = self.prev_thread {
            let prev = &self.slots[prev_idx];
            prev.state.wait_setup_finished();
            if prev_idx != idx {
                let published = prev.published.lock();
                if let Some(snapshot) = published.as_ref() {
                    slot.ctx.lock().apply_published(snapshot);
                    if self.stateful {
                        if let Some(state) = snapshot.decoder_state.as_deref() {
                            slot.decoder.lock().import_state(state);
                        }
                    }
                }
            }
        }

        slot.state.wait_input_ready();
        slot.ctx.lock().merge_user(&self.user);

        slot.state.begin_setup();
        {
            let mut input = slot.input.lock();
            input.packet = Some(packet.clone());
            slot.input_cond.notify_one();
        }

        self.prev_thread = Some(idx);
        self.next_decoding = (idx + 1) % self.slots.len();
        self.submitted += 1;
    }

    /// Walk slots in submission order from the completion cursor. On a
    /// normal packet one slot is drained; on end-of-stream the walk
    /// continues until a frame or an error turns up, or every slot has
    /// been visited once.
    fn retrieve(&mut self, eos: bool) -> Result<Option<VideoFrame>, DecodeError> {
        let start = self.next_finished;
        let mut finished = self.next_finished;
        loop {
            let slot = Arc::clone(&self.slots[finished]);
            slot.state.wait_input_ready();
            finished = (finished + 1) % self.slots.len();

            // Worker is idle, its context is safe to read.
            self.params = slot.ctx.lock().params.clone();

            let result = std::mem::replace(&mut *slot.output.lock(), SlotResult::Idle);
            self.next_finished = finished;
            match result {
                SlotResult::Failed(err) => return Err(err),
                SlotResult::Done(Some(frame)) => return Ok(Some(frame)),
                SlotResult::Done(None) | SlotResult::Idle => {
                    if !eos || finished == start {
                        return Ok(None);
                    }
                }
            }
        }
    }

    /// Wait until every worker is idle.
    fn park(&self) {
        for slot in &self.slots {
            slot.state.wait_input_ready();
        }
    }

    fn kill_workers(slots: &[Arc<SlotShared>], handles: &mut Vec<JoinHandle<()>>) {
        for slot in slots {
            let mut input = slot.input.lock();
            input.die = true;
            slot.input_cond.notify_one();
        }
        for handle in handles.drain(..) {
            let _ = handle.join();
        }
    }

    fn shutdown(&mut self) {
        if self.handles.is_empty() {
            return;
        }
        self.park();
        Self::kill_workers(&self.slots, &mut self.handles);
        debug!("frame threading stopped");
    }
}

impl Drop for FrameThreadCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for FrameThreadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameThreadCoordinator")
            .field("threads", &self.slots.len())
            .field("submitted", &self.submitted)
            .field("delaying", &self.delaying)
            .finish()
    }
}
