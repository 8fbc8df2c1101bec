//! End-to-end tests of the frame-threaded pipeline with a mock codec.
//!
//! Packets carry their own decode timings: `data = [setup_ms, decode_ms,
//! frame_id, flags]`. The mock sleeps `setup_ms`, announces
//! setup-finished, sleeps `decode_ms`, then emits a frame tagged with
//! `frame_id`, so tests can force any completion order and check that
//! delivery stays in submission order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{unbounded, Sender};

use fm_common::{
    CodecParams, DecodeError, Packet, PixelFormat, Resolution, ThreadingConfig, TimeCode,
    VideoCodec, VideoFrame,
};
use fm_decoder::{
    CodecContext, DecodePipeline, DecodeSession, FrameDecoder, HwAccel, HwAccelCaps, HwAccelState,
};

const FLAG_FAIL: u8 = 1;

fn params() -> CodecParams {
    CodecParams::new(
        VideoCodec::H264,
        Resolution::new(64, 48),
        PixelFormat::Yuv420,
    )
}

fn config(threads: usize) -> ThreadingConfig {
    ThreadingConfig {
        thread_count: threads,
        ..Default::default()
    }
}

fn pkt(setup_ms: u8, decode_ms: u8, id: u8) -> Packet {
    let mut p = Packet::new(vec![setup_ms, decode_ms, id, 0]);
    p.pts = Some(TimeCode(id as f64));
    p.props.opaque = id as u64;
    p
}

fn bad_pkt(id: u8) -> Packet {
    Packet::new(vec![0, 0, id, FLAG_FAIL])
}

// ─── Mock codec ──────────────────────────────────────────────────────

#[derive(Default)]
struct MockCodec {
    stateful: bool,
    /// Last frame id imported from a predecessor, -1 when none.
    imported: i64,
    /// Reports `(imported, id)` pairs at every decode, in decode-start
    /// order per slot.
    events: Option<Sender<(i64, i64)>>,
    /// Incremented whenever decode runs with the exclusive accelerator
    /// token bound to its context.
    token_sightings: Option<Arc<AtomicUsize>>,
}

impl FrameDecoder for MockCodec {
    fn decode(
        &mut self,
        session: &mut DecodeSession<'_>,
        ctx: &mut CodecContext,
        packet: &Packet,
    ) -> Result<Option<VideoFrame>, DecodeError> {
        if packet.is_eos() {
            return Ok(None);
        }
        let &[setup_ms, decode_ms, id, flags] = &packet.data[..4] else {
            unreachable!()
        };

        thread::sleep(Duration::from_millis(setup_ms as u64));
        if let Some(events) = &self.events {
            let _ = events.send((self.imported, id as i64));
        }
        if let Some(sightings) = &self.token_sightings {
            if ctx.hwaccel.is_some() {
                sightings.fetch_add(1, Ordering::Relaxed);
            }
        }

        let mut frame = session.get_buffer(&ctx.params)?;
        // Make a decode-derived field visible to the caller.
        ctx.params.delay = id as i32;
        let state: Option<Box<dyn std::any::Any + Send>> = if self.stateful {
            Some(Box::new(id as i64))
        } else {
            None
        };
        session.finish_setup(ctx, state);

        if flags & FLAG_FAIL != 0 {
            return Err(DecodeError::CorruptData {
                packet: id as u64,
                reason: "forced failure".into(),
            });
        }
        thread::sleep(Duration::from_millis(decode_ms as u64));

        frame.pts = packet.pts;
        Ok(Some(frame))
    }

    fn flush(&mut self, _ctx: &mut CodecContext) {
        self.imported = -1;
    }

    fn uses_inter_frame_state(&self) -> bool {
        self.stateful
    }

    fn import_state(&mut self, state: &(dyn std::any::Any + Send)) {
        if let Some(id) = state.downcast_ref::<i64>() {
            self.imported = *id;
        }
    }
}

fn new_pipeline(threads: usize) -> DecodePipeline {
    DecodePipeline::new(
        &config(threads),
        params(),
        &mut |_| {
            Box::new(MockCodec {
                imported: -1,
                ..Default::default()
            })
        },
        None,
    )
    .unwrap()
}

/// Feed packets then drain with end-of-stream markers; returns all frame
/// ids in delivery order.
fn run_to_completion(pipeline: &mut DecodePipeline, packets: Vec<Packet>) -> Vec<u64> {
    let mut out = Vec::new();
    for packet in &packets {
        if let Some(frame) = pipeline.decode(packet).unwrap() {
            out.push(frame.opaque);
        }
    }
    while let Some(frame) = pipeline.decode(&Packet::eos()).unwrap() {
        out.push(frame.opaque);
    }
    out
}

// ─── Ordering ────────────────────────────────────────────────────────

#[test]
fn frames_deliver_in_submission_order() {
    let mut pipeline = new_pipeline(4);
    // Early frames are slow, late frames fast: completion order is
    // roughly reversed, delivery order must not be.
    let packets: Vec<_> = (0..8u8).map(|i| pkt(1, 80u8.saturating_sub(10 * i), i)).collect();
    let out = run_to_completion(&mut pipeline, packets);
    assert_eq!(out, (0..8).collect::<Vec<u64>>());
}

#[test]
fn slow_middle_frame_does_not_reorder() {
    let mut pipeline = new_pipeline(3);
    let packets = vec![
        pkt(1, 5, 0),
        pkt(1, 120, 1), // much slower than everything around it
        pkt(1, 5, 2),
        pkt(1, 5, 3),
        pkt(1, 5, 4),
        pkt(1, 5, 5),
    ];
    let out = run_to_completion(&mut pipeline, packets);
    assert_eq!(out, vec![0, 1, 2, 3, 4, 5]);
}

// ─── Delay window ────────────────────────────────────────────────────

#[test]
fn first_window_returns_no_frames() {
    let mut pipeline = new_pipeline(4);
    for i in 0..3u8 {
        assert!(pipeline.decode(&pkt(1, 5, i)).unwrap().is_none());
    }
    // Fourth packet produces the first frame.
    let frame = pipeline.decode(&pkt(1, 5, 3)).unwrap().unwrap();
    assert_eq!(frame.opaque, 0);
}

#[test]
fn extra_delay_shrinks_the_window() {
    let cfg = ThreadingConfig {
        thread_count: 4,
        extra_delay: -1,
        ..Default::default()
    };
    let mut pipeline = DecodePipeline::new(
        &cfg,
        params(),
        &mut |_| Box::new(MockCodec { imported: -1, ..Default::default() }),
        None,
    )
    .unwrap();

    assert!(pipeline.decode(&pkt(1, 5, 0)).unwrap().is_none());
    assert!(pipeline.decode(&pkt(1, 5, 1)).unwrap().is_none());
    let frame = pipeline.decode(&pkt(1, 5, 2)).unwrap().unwrap();
    assert_eq!(frame.opaque, 0);
}

#[test]
fn positive_extra_delay_cannot_widen_the_window() {
    // A window wider than the slot count would re-submit a slot before
    // its frame was retrieved; the excess is ignored and every frame
    // still comes out.
    let cfg = ThreadingConfig {
        thread_count: 2,
        extra_delay: 1,
        ..Default::default()
    };
    let mut pipeline = DecodePipeline::new(
        &cfg,
        params(),
        &mut |_| Box::new(MockCodec { imported: -1, ..Default::default() }),
        None,
    )
    .unwrap();

    let packets: Vec<_> = (0..4u8).map(|i| pkt(1, 5, i)).collect();
    let out = run_to_completion(&mut pipeline, packets);
    assert_eq!(out, vec![0, 1, 2, 3]);
}

#[test]
fn drain_returns_every_submitted_frame() {
    let mut pipeline = new_pipeline(4);
    let packets: Vec<_> = (0..5u8).map(|i| pkt(1, 10, i)).collect();
    let out = run_to_completion(&mut pipeline, packets);
    assert_eq!(out.len(), 5);
    assert_eq!(out, vec![0, 1, 2, 3, 4]);
}

#[test]
fn drain_of_empty_pipeline_is_none() {
    let mut pipeline = new_pipeline(2);
    assert!(pipeline.decode(&Packet::eos()).unwrap().is_none());
}

// ─── Flush ───────────────────────────────────────────────────────────

#[test]
fn flush_inside_the_delay_window_discards_frames() {
    let mut pipeline = new_pipeline(4);
    assert!(pipeline.decode(&pkt(1, 20, 0)).unwrap().is_none());
    assert!(pipeline.decode(&pkt(1, 20, 1)).unwrap().is_none());
    pipeline.flush();

    // Ordering restarts: a fresh sequence behaves like a fresh pipeline,
    // with no leftovers from before the flush.
    let packets: Vec<_> = (10..14u8).map(|i| pkt(1, 5, i)).collect();
    let out = run_to_completion(&mut pipeline, packets);
    assert_eq!(out, vec![10, 11, 12, 13]);
}

// ─── Errors ──────────────────────────────────────────────────────────

#[test]
fn decode_error_surfaces_at_its_position() {
    let mut pipeline = new_pipeline(3);
    assert!(pipeline.decode(&pkt(1, 5, 0)).unwrap().is_none());
    assert!(pipeline.decode(&bad_pkt(1)).unwrap().is_none());
    // Third call retrieves frame 0.
    assert_eq!(pipeline.decode(&pkt(1, 5, 2)).unwrap().unwrap().opaque, 0);
    // Fourth call retrieves the failed slot.
    let err = pipeline.decode(&pkt(1, 5, 3)).unwrap_err();
    assert!(matches!(err, DecodeError::CorruptData { packet: 1, .. }));
}

// ─── Propagation ─────────────────────────────────────────────────────

#[test]
fn stateful_codec_sees_predecessor_state() {
    let (tx, rx) = unbounded();
    let cfg = config(4);
    let mut pipeline = DecodePipeline::new(
        &cfg,
        params(),
        &mut |_| {
            Box::new(MockCodec {
                stateful: true,
                imported: -1,
                events: Some(tx.clone()),
                token_sightings: None,
            })
        },
        None,
    )
    .unwrap();
    drop(tx);

    let packets: Vec<_> = (0..6u8).map(|i| pkt(2, 10, i)).collect();
    run_to_completion(&mut pipeline, packets);
    drop(pipeline);

    let mut events: Vec<_> = rx.iter().collect();
    events.sort_by_key(|&(_, id)| id);
    for (imported, id) in events {
        assert_eq!(imported, id - 1, "frame {id} started from wrong state");
    }
}

#[test]
fn packet_side_data_rides_the_decoded_frame() {
    let mut pipeline = new_pipeline(2);
    let mut first = pkt(1, 5, 0);
    first.props.opaque = 100;
    let mut second = pkt(1, 5, 1);
    second.props.opaque = 200;
    let out = run_to_completion(&mut pipeline, vec![first, second]);
    assert_eq!(out, vec![100, 200]);
}

#[test]
fn caller_params_follow_the_retrieved_frame() {
    let mut pipeline = new_pipeline(4);
    let packets: Vec<_> = (0..4u8).map(|i| pkt(1, 5, i)).collect();
    for packet in &packets {
        pipeline.decode(packet).unwrap();
    }
    // The last retrieval was frame 0, which published delay = 0.
    assert_eq!(pipeline.params().delay, 0);
    let frame = pipeline.decode(&Packet::eos()).unwrap().unwrap();
    assert_eq!(frame.opaque, 1);
    assert_eq!(pipeline.params().delay, 1);
}

// ─── Hardware acceleration ───────────────────────────────────────────

#[test]
fn exclusive_accelerator_token_visits_every_decode() {
    // A thread-unsafe, async-unsafe backend: decode calls serialize and
    // the single state token hops between workers through the stash.
    let sightings = Arc::new(AtomicUsize::new(0));
    let accel = HwAccel::exclusive(
        "mock",
        HwAccelCaps {
            thread_safe: false,
            async_safe: false,
        },
        Box::new(7u32),
    );
    let mut pipeline = DecodePipeline::new(
        &config(3),
        params(),
        &mut |_| {
            Box::new(MockCodec {
                imported: -1,
                token_sightings: Some(Arc::clone(&sightings)),
                ..Default::default()
            })
        },
        Some(accel),
    )
    .unwrap();

    let packets: Vec<_> = (0..6u8).map(|i| pkt(1, 10, i)).collect();
    let out = run_to_completion(&mut pipeline, packets);
    assert_eq!(out, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(sightings.load(Ordering::Relaxed), 6);

    // The token parks in the stash between calls and can be reclaimed.
    let reclaimed = pipeline.take_hwaccel().unwrap();
    match reclaimed.state {
        HwAccelState::Exclusive(state) => {
            assert_eq!(*state.downcast::<u32>().unwrap(), 7);
        }
        HwAccelState::Shared(_) => panic!("expected the exclusive token back"),
    }
}

// ─── Single-threaded bypass ──────────────────────────────────────────

#[test]
fn direct_mode_has_no_delay_window() {
    let mut pipeline = new_pipeline(1);
    let frame = pipeline.decode(&pkt(0, 0, 7)).unwrap().unwrap();
    assert_eq!(frame.opaque, 7);
}
