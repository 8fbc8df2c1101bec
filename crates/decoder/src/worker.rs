//! Worker slots and the per-thread decode loop.
//!
//! One slot per worker thread. The coordinator owns the slots through
//! `Arc` and talks to each worker over its input mutex/condvar; results
//! come back through the output mutex and the slot's [`StateCell`].

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};
use tracing::trace;

use fm_common::{DecodeError, Packet, VideoFrame};

use crate::context::{CodecContext, PublishedState};
use crate::decoder::{DecodeSession, DefaultAllocator, FrameAllocator, FrameDecoder};
use crate::hwaccel::{HwAccel, SerialLock};
use crate::state::StateCell;

// ─── Shared pipeline services ────────────────────────────────────────

/// Services every decode call sees, independent of which slot runs it.
pub struct PipelineShared {
    /// Serializes frame buffer requests across workers.
    pub buffer_lock: Mutex<()>,
    pub allocator: Box<dyn FrameAllocator>,
    pub debug_threads: bool,
}

impl PipelineShared {
    pub fn new(allocator: Box<dyn FrameAllocator>, debug_threads: bool) -> Self {
        Self {
            buffer_lock: Mutex::new(()),
            allocator,
            debug_threads,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(Box::new(DefaultAllocator), false)
    }

    /// Whether cross-thread waits for this context get logged: the
    /// pipeline-wide flag or the caller's per-packet one.
    pub fn debug_for(&self, ctx: &CodecContext) -> bool {
        self.debug_threads || ctx.user.debug_threads
    }
}

/// Accelerator coordination shared by the workers.
///
/// When the bound accelerator is not thread safe, `serial_active` is set
/// and decode calls run one at a time under `serial`; the accelerator's
/// exclusive token parks in `stash` between calls and moves to whichever
/// worker takes the lock next.
pub struct HwCoordination {
    pub serial: SerialLock,
    pub stash: Mutex<Option<HwAccel>>,
    pub serial_active: AtomicBool,
}

impl Default for HwCoordination {
    fn default() -> Self {
        Self {
            serial: SerialLock::new(),
            stash: Mutex::new(None),
            serial_active: AtomicBool::new(false),
        }
    }
}

// ─── Slot state ──────────────────────────────────────────────────────

#[derive(Default)]
pub struct SlotInput {
    pub packet: Option<Packet>,
    pub die: bool,
}

/// Outcome of the last decode call on a slot.
pub enum SlotResult {
    /// No call has completed since the slot was last drained.
    Idle,
    Done(Option<VideoFrame>),
    Failed(DecodeError),
}

/// Everything the coordinator and one worker thread share.
pub struct SlotShared {
    pub index: usize,
    pub state: StateCell,
    pub input: Mutex<SlotInput>,
    pub input_cond: Condvar,
    pub output: Mutex<SlotResult>,
    pub ctx: Mutex<CodecContext>,
    pub decoder: Mutex<Box<dyn FrameDecoder>>,
    /// Snapshot taken at setup-finished, read by the next submission.
    pub published: Mutex<Option<PublishedState>>,
}

impl SlotShared {
    pub fn new(index: usize, ctx: CodecContext, decoder: Box<dyn FrameDecoder>) -> Self {
        Self {
            index,
            state: StateCell::new(),
            input: Mutex::new(SlotInput::default()),
            input_cond: Condvar::new(),
            output: Mutex::new(SlotResult::Idle),
            ctx: Mutex::new(ctx),
            decoder: Mutex::new(decoder),
            published: Mutex::new(None),
        }
    }
}

// ─── Worker loop ─────────────────────────────────────────────────────

pub(crate) fn spawn_worker(
    slot: Arc<SlotShared>,
    shared: Arc<PipelineShared>,
    hw: Arc<HwCoordination>,
) -> io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name(format!("fm-decode-{}", slot.index))
        .spawn(move || run_worker(slot, shared, hw))
}

fn run_worker(slot: Arc<SlotShared>, shared: Arc<PipelineShared>, hw: Arc<HwCoordination>) {
    loop {
        let packet = {
            let mut input = slot.input.lock();
            loop {
                if input.die {
                    return;
                }
                if let Some(packet) = input.packet.take() {
                    break packet;
                }
                slot.input_cond.wait(&mut input);
            }
        };
        trace!(slot = slot.index, bytes = packet.data.len(), "decoding");

        // Thread-unsafe accelerator: one decode at a time, and the state
        // token follows the lock.
        let serializing = hw.serial_active.load(Ordering::Acquire);
        if serializing {
            hw.serial.lock();
            if let Some(token) = hw.stash.lock().take() {
                slot.ctx.lock().hwaccel = Some(token);
            }
        }

        let mut ctx = slot.ctx.lock();
        let mut decoder = slot.decoder.lock();
        ctx.packet_props = packet.props;
        let stateful = decoder.uses_inter_frame_state();
        let debug = shared.debug_for(&ctx);
        let mut session = DecodeSession::for_slot(&slot, &shared, packet.props, stateful, debug);
        // A codec with no inter-frame state has nothing the next
        // submission could wait for; release it right away.
        if !stateful {
            session.finish_setup(&ctx, None);
        }
        let result = decoder.decode(&mut session, &mut ctx, &packet);

        // Codecs that never announce setup still need their parameters
        // visible to the next submission.
        if !session.setup_done() {
            *slot.published.lock() = Some(ctx.publish(decoder.export_state()));
        }
        if result.is_ok() {
            ctx.frame_count += 1;
        }

        if serializing {
            if let Some(token) = ctx.hwaccel.take() {
                *hw.stash.lock() = Some(token);
            }
            hw.serial.unlock();
        }
        drop(decoder);
        drop(ctx);

        *slot.output.lock() = match result {
            Ok(mut frame) => {
                if let Some(frame) = frame.as_mut() {
                    if frame.dts.is_none() {
                        frame.dts = packet.dts;
                    }
                }
                SlotResult::Done(frame)
            }
            Err(err) => SlotResult::Failed(err),
        };
        slot.state.finish_work();
    }
}
