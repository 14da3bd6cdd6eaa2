//! Producer-side hand-off into the pipeline owner.
//!
//! The capture thread and the classifier callback each hold a producer handle.
//! Producers do their per-message work on their own thread, then post a small
//! `Copy` message into a bounded channel with `try_send`; they never block.
//!
//! Every message is stamped with the session epoch seen at posting time. The
//! epoch is odd while a session runs and is bumped on both start and stop, so
//! the owner can discard anything posted under an earlier session even if it
//! was still in flight when `stop()` returned.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Sender, TrySendError};

use crate::classification::RankedBatch;
use crate::error::{PipelineError, Result};
use crate::loudness::{self, Calibration};
use crate::spectrum::{FrequencyBands, SpectralBandAnalyzer};

/// Session epoch shared between the owner and all producers
#[derive(Debug, Default)]
pub(crate) struct SessionGate {
    epoch: AtomicU64,
}

impl SessionGate {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Current epoch if a session is running
    pub(crate) fn active_epoch(&self) -> Option<u64> {
        let epoch = self.epoch();
        (epoch % 2 == 1).then_some(epoch)
    }

    /// Enter the running state. Returns false if already running.
    pub(crate) fn open(&self) -> bool {
        self.epoch
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |e| {
                (e % 2 == 0).then_some(e + 1)
            })
            .is_ok()
    }

    /// Leave the running state. Returns false if already stopped.
    pub(crate) fn close(&self) -> bool {
        self.epoch
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |e| {
                (e % 2 == 1).then_some(e + 1)
            })
            .is_ok()
    }
}

/// One mono capture buffer, borrowed for a single processing pass
#[derive(Debug, Clone, Copy)]
pub struct AudioFrame<'a> {
    pub samples: &'a [f32],
    pub sample_rate: f32,
}

impl<'a> AudioFrame<'a> {
    pub fn new(samples: &'a [f32], sample_rate: f32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }
}

/// Per-frame result posted from the capture thread
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameAnalysis {
    /// Instantaneous loudness, 0-1
    pub loudness: f32,
    /// Unsmoothed bands
    pub bands: FrequencyBands,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameMessage {
    pub(crate) epoch: u64,
    pub(crate) analysis: FrameAnalysis,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ClassificationMessage {
    pub(crate) epoch: u64,
    pub(crate) batch: RankedBatch,
}

/// Capture-thread handle: analyzes frames and posts the results.
///
/// Owns its FFT plan and buffers, so one producer belongs to one capture
/// thread. The sample rate is expected to stay fixed for the producer's
/// lifetime: a frame at a different rate rebuilds the analyzer, which
/// allocates on the calling thread. Create a new producer instead when a
/// device changes rate.
pub struct FrameProducer {
    gate: Arc<SessionGate>,
    tx: Sender<FrameMessage>,
    analyzer: SpectralBandAnalyzer,
    calibration: Calibration,
    fft_size: usize,
    dropped: u64,
    rebuilds: u32,
}

impl FrameProducer {
    pub(crate) fn new(
        gate: Arc<SessionGate>,
        tx: Sender<FrameMessage>,
        sample_rate: f32,
        fft_size: usize,
        calibration: Calibration,
    ) -> Self {
        Self {
            gate,
            tx,
            analyzer: SpectralBandAnalyzer::with_size(sample_rate, fft_size, calibration.band_gain),
            calibration,
            fft_size,
            dropped: 0,
            rebuilds: 0,
        }
    }

    /// Analyze one frame and post it to the owner.
    ///
    /// Returns `Ok(None)` for an empty frame (nothing is posted and prior
    /// state is left untouched) and `Err(Inactive)` outside a session.
    pub fn process(&mut self, frame: AudioFrame<'_>) -> Result<Option<FrameAnalysis>> {
        let epoch = self.gate.active_epoch().ok_or(PipelineError::Inactive)?;

        let Some(loudness) = loudness::instantaneous(frame.samples, self.calibration.db_floor)
        else {
            return Ok(None);
        };

        if frame.sample_rate.is_finite()
            && (frame.sample_rate - self.analyzer.sample_rate()).abs() > f32::EPSILON
        {
            if self.rebuilds == 0 {
                log::warn!(
                    "Frame producer sample rate changed {} -> {} Hz; rebuilding analyzer",
                    self.analyzer.sample_rate(),
                    frame.sample_rate
                );
            }
            self.rebuilds = self.rebuilds.saturating_add(1);
            self.analyzer = SpectralBandAnalyzer::with_size(
                frame.sample_rate,
                self.fft_size,
                self.calibration.band_gain,
            );
        }

        let analysis = FrameAnalysis {
            loudness,
            bands: self.analyzer.analyze(frame.samples),
        };

        match self.tx.try_send(FrameMessage { epoch, analysis }) {
            Ok(()) => Ok(Some(analysis)),
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                Err(PipelineError::QueueFull("frame"))
            }
            Err(TrySendError::Disconnected(_)) => Err(PipelineError::Disconnected),
        }
    }

    /// Frames dropped because the owner fell behind
    pub fn dropped_frames(&self) -> u64 {
        self.dropped
    }

    pub fn sample_rate(&self) -> f32 {
        self.analyzer.sample_rate()
    }

    /// Window length the analyzer actually runs at
    pub fn fft_size(&self) -> usize {
        self.analyzer.fft_size()
    }

    /// Times a sample-rate change forced a new analyzer
    pub fn analyzer_rebuilds(&self) -> u32 {
        self.rebuilds
    }
}

/// Classifier-callback handle. Cheap to clone.
#[derive(Clone)]
pub struct ClassificationProducer {
    gate: Arc<SessionGate>,
    tx: Sender<ClassificationMessage>,
}

impl ClassificationProducer {
    pub(crate) fn new(gate: Arc<SessionGate>, tx: Sender<ClassificationMessage>) -> Self {
        Self { gate, tx }
    }

    /// Rank a raw `(label, confidence)` batch and post it.
    /// Empty batches are not posted.
    pub fn post<'a, I>(&self, observations: I) -> Result<RankedBatch>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let batch = RankedBatch::from_observations(observations);
        self.post_ranked(batch)?;
        Ok(batch)
    }

    pub fn post_ranked(&self, batch: RankedBatch) -> Result<()> {
        let epoch = self.gate.active_epoch().ok_or(PipelineError::Inactive)?;
        if batch.is_empty() {
            return Ok(());
        }

        self.tx
            .try_send(ClassificationMessage { epoch, batch })
            .map_err(|e| match e {
                TrySendError::Full(_) => PipelineError::QueueFull("classification"),
                TrySendError::Disconnected(_) => PipelineError::Disconnected,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::FFT_SIZE;
    use crossbeam_channel::bounded;

    #[test]
    fn gate_open_close_are_idempotent() {
        let gate = SessionGate::new();
        assert_eq!(gate.active_epoch(), None);

        assert!(gate.open());
        assert!(!gate.open());
        assert_eq!(gate.active_epoch(), Some(1));

        assert!(gate.close());
        assert!(!gate.close());
        assert_eq!(gate.epoch(), 2);
        assert_eq!(gate.active_epoch(), None);

        assert!(gate.open());
        assert_eq!(gate.active_epoch(), Some(3));
    }

    #[test]
    fn producer_refuses_outside_session() {
        let gate = Arc::new(SessionGate::new());
        let (tx, rx) = bounded(4);
        let mut producer =
            FrameProducer::new(gate, tx, 44100.0, FFT_SIZE, Calibration::default());

        let samples = vec![0.5; FFT_SIZE];
        assert_eq!(
            producer.process(AudioFrame::new(&samples, 44100.0)),
            Err(PipelineError::Inactive)
        );
        assert!(rx.is_empty());
    }

    #[test]
    fn empty_frame_posts_nothing() {
        let gate = Arc::new(SessionGate::new());
        gate.open();
        let (tx, rx) = bounded(4);
        let mut producer =
            FrameProducer::new(gate, tx, 44100.0, FFT_SIZE, Calibration::default());

        assert_eq!(producer.process(AudioFrame::new(&[], 44100.0)), Ok(None));
        assert!(rx.is_empty());
    }

    #[test]
    fn full_queue_drops_and_counts() {
        let gate = Arc::new(SessionGate::new());
        gate.open();
        let (tx, rx) = bounded(1);
        let mut producer =
            FrameProducer::new(gate, tx, 44100.0, FFT_SIZE, Calibration::default());

        let samples = vec![0.1; FFT_SIZE];
        assert!(producer.process(AudioFrame::new(&samples, 44100.0)).is_ok());
        assert_eq!(
            producer.process(AudioFrame::new(&samples, 44100.0)),
            Err(PipelineError::QueueFull("frame"))
        );
        assert_eq!(producer.dropped_frames(), 1);
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn messages_carry_the_session_epoch() {
        let gate = Arc::new(SessionGate::new());
        gate.open();
        let (tx, rx) = bounded(4);
        let producer = ClassificationProducer::new(Arc::clone(&gate), tx);

        producer.post([("speech", 0.8)]).unwrap();
        assert_eq!(rx.try_recv().unwrap().epoch, 1);
    }

    #[test]
    fn sample_rate_change_rebuilds_analyzer() {
        let gate = Arc::new(SessionGate::new());
        gate.open();
        let (tx, _rx) = bounded(4);
        let mut producer =
            FrameProducer::new(gate, tx, 44100.0, FFT_SIZE, Calibration::default());

        let samples = vec![0.1; FFT_SIZE];
        producer.process(AudioFrame::new(&samples, 48000.0)).unwrap();
        assert_eq!(producer.sample_rate(), 48000.0);
        assert_eq!(producer.analyzer_rebuilds(), 1);

        // Same rate again keeps the analyzer
        producer.process(AudioFrame::new(&samples, 48000.0)).unwrap();
        assert_eq!(producer.analyzer_rebuilds(), 1);

        producer.process(AudioFrame::new(&samples, 44100.0)).unwrap();
        assert_eq!(producer.analyzer_rebuilds(), 2);
        assert_eq!(producer.fft_size(), FFT_SIZE);
    }
}
