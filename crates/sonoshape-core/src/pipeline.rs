//! Reactive state owner.
//!
//! `ReactivePipeline` is driven from one thread by a fixed-rate `tick()`. Each
//! tick drains what the producers posted, applies the UI-rate smoothing, feeds
//! the category trend and returns a read-only snapshot. Loudness/band state and
//! classification state update independently; there is no ordering between
//! the two producers.

use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::classification::{ClassificationAggregator, ClassificationResult, RankedBatch};
use crate::events::{EventBus, PipelineEvent};
use crate::haptics::HapticPattern;
use crate::loudness::{Calibration, LoudnessState};
use crate::session::{
    ClassificationMessage, ClassificationProducer, FrameMessage, FrameProducer, SessionGate,
};
use crate::spectrum::{BandSmoother, FrequencyBands, FFT_SIZE, MIN_FFT_SIZE};
use crate::trend::{CategoryTrendDetector, SoundCategory};
use crate::visual::VisualParams;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    /// FFT window length; frames shorter than this yield zero bands.
    /// Raised to `MIN_FFT_SIZE` when the pipeline is built.
    pub fft_size: usize,
    pub calibration: Calibration,
    /// Analyzed frames buffered between ticks
    pub frame_queue_capacity: usize,
    /// Classifier batches buffered between ticks
    pub classification_queue_capacity: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            fft_size: FFT_SIZE,
            calibration: Calibration::default(),
            frame_queue_capacity: 8,
            classification_queue_capacity: 4,
        }
    }
}

/// Everything a renderer or haptic driver polls, copied out of the owner
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReactiveSnapshot {
    pub running: bool,
    pub loudness: LoudnessState,
    /// Smoothed bands
    pub bands: FrequencyBands,
    /// Bands of the latest frame, unsmoothed
    pub raw_bands: FrequencyBands,
    pub classification: ClassificationResult,
    pub ranked: RankedBatch,
    pub category: Option<SoundCategory>,
    /// Ticks applied since the session started
    pub ticks: u64,
}

impl ReactiveSnapshot {
    /// Haptic pattern for the current classification
    pub fn haptic(&self) -> HapticPattern {
        HapticPattern::for_label(self.classification.label)
    }

    pub fn visuals(&self) -> VisualParams {
        VisualParams::from_snapshot(self)
    }
}

pub struct ReactivePipeline {
    settings: PipelineSettings,
    gate: Arc<SessionGate>,
    events: Arc<EventBus>,

    frame_tx: Sender<FrameMessage>,
    frame_rx: Receiver<FrameMessage>,
    classification_tx: Sender<ClassificationMessage>,
    classification_rx: Receiver<ClassificationMessage>,

    // Session state, reset on stop
    loudness: LoudnessState,
    raw_bands: FrequencyBands,
    band_smoother: BandSmoother,
    classifier: ClassificationAggregator,
    trend: CategoryTrendDetector,
    ticks: u64,
}

impl Default for ReactivePipeline {
    fn default() -> Self {
        Self::new(PipelineSettings::default())
    }
}

impl ReactivePipeline {
    pub fn new(settings: PipelineSettings) -> Self {
        let settings = PipelineSettings {
            fft_size: settings.fft_size.max(MIN_FFT_SIZE),
            frame_queue_capacity: settings.frame_queue_capacity.max(1),
            classification_queue_capacity: settings.classification_queue_capacity.max(1),
            ..settings
        };
        let (frame_tx, frame_rx) = bounded(settings.frame_queue_capacity);
        let (classification_tx, classification_rx) =
            bounded(settings.classification_queue_capacity);

        Self {
            settings,
            gate: Arc::new(SessionGate::new()),
            events: Arc::new(EventBus::new()),
            frame_tx,
            frame_rx,
            classification_tx,
            classification_rx,
            loudness: LoudnessState::default(),
            raw_bands: FrequencyBands::ZERO,
            band_smoother: BandSmoother::default(),
            classifier: ClassificationAggregator::new(),
            trend: CategoryTrendDetector::new(),
            ticks: 0,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Begin accepting producer messages. No-op while already running.
    pub fn start(&mut self) {
        if self.gate.open() {
            log::info!("Reactive session started (epoch {})", self.gate.epoch());
        }
    }

    /// Stop the session and reset to a clean baseline.
    ///
    /// Idempotent. Once this returns, nothing posted before it can be applied,
    /// including messages still in flight on a producer thread.
    pub fn stop(&mut self) {
        if self.gate.close() {
            log::info!("Reactive session stopped after {} ticks", self.ticks);
        }

        self.frame_rx
            .try_iter()
            .take(self.settings.frame_queue_capacity)
            .for_each(drop);
        self.classification_rx
            .try_iter()
            .take(self.settings.classification_queue_capacity)
            .for_each(drop);

        self.loudness.reset();
        self.raw_bands = FrequencyBands::ZERO;
        self.band_smoother.reset();
        self.classifier.reset();
        self.trend.reset();
        self.ticks = 0;
    }

    pub fn is_running(&self) -> bool {
        self.gate.active_epoch().is_some()
    }

    /// Handle for a capture thread delivering frames at `sample_rate`.
    /// Allocates the FFT plan and buffers; create one per capture stream.
    pub fn frame_producer(&self, sample_rate: f32) -> FrameProducer {
        FrameProducer::new(
            Arc::clone(&self.gate),
            self.frame_tx.clone(),
            sample_rate,
            self.settings.fft_size,
            self.settings.calibration,
        )
    }

    pub fn classification_producer(&self) -> ClassificationProducer {
        ClassificationProducer::new(Arc::clone(&self.gate), self.classification_tx.clone())
    }

    pub fn events(&self) -> Arc<EventBus> {
        Arc::clone(&self.events)
    }

    pub fn subscribe(&self) -> Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    /// Apply one UI-rate tick and return the new snapshot.
    ///
    /// Outside a session this is a no-op that returns the reset snapshot.
    pub fn tick(&mut self) -> ReactiveSnapshot {
        let Some(epoch) = self.gate.active_epoch() else {
            return self.snapshot();
        };

        // Latest frame wins; older frames in the queue are superseded
        for _ in 0..self.settings.frame_queue_capacity {
            let Ok(message) = self.frame_rx.try_recv() else {
                break;
            };
            if message.epoch != epoch {
                log::debug!("Discarding frame from session epoch {}", message.epoch);
                continue;
            }
            self.loudness.observe(message.analysis.loudness);
            self.raw_bands = message.analysis.bands;
        }

        for _ in 0..self.settings.classification_queue_capacity {
            let Ok(message) = self.classification_rx.try_recv() else {
                break;
            };
            if message.epoch != epoch {
                log::debug!("Discarding classification from session epoch {}", message.epoch);
                continue;
            }
            self.apply_classification(message.batch);
        }

        let smoothed = self.loudness.smooth();
        self.band_smoother.smooth(self.raw_bands);

        if let Some(transition) = self.trend.push(smoothed) {
            log::info!(
                "Sound category: {} -> {}",
                transition.from.map_or("none", |c| c.name()),
                transition.to.name()
            );
            self.events.emit(transition.into());
        }

        self.ticks += 1;
        self.snapshot()
    }

    fn apply_classification(&mut self, batch: RankedBatch) {
        let previous = self.classifier.current_label();
        if !self.classifier.observe(batch) {
            log::debug!(
                "Classification below gate discarded (top {:?})",
                batch.top().map(|r| r.confidence)
            );
            return;
        }

        let current = self.classifier.current();
        if current.label != previous {
            log::debug!(
                "Classification: {} ({:.2})",
                current.label.name(),
                current.confidence
            );
            self.events.emit(PipelineEvent::ClassificationChanged {
                label: current.label,
                confidence: current.confidence,
            });
        }
    }

    pub fn snapshot(&self) -> ReactiveSnapshot {
        ReactiveSnapshot {
            running: self.is_running(),
            loudness: self.loudness,
            bands: self.band_smoother.current(),
            raw_bands: self.raw_bands,
            classification: self.classifier.current(),
            ranked: *self.classifier.ranked(),
            category: self.trend.current(),
            ticks: self.ticks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::SoundLabel;
    use crate::session::{AudioFrame, FrameAnalysis};

    const SAMPLE_RATE: f32 = 44100.0;

    fn tone(amplitude: f32) -> Vec<f32> {
        (0..FFT_SIZE)
            .map(|i| amplitude * (std::f32::consts::TAU * 990.5 * i as f32 / SAMPLE_RATE).sin())
            .collect()
    }

    #[test]
    fn undersized_fft_setting_matches_the_analyzer() {
        for fft_size in [0, 1] {
            let pipeline = ReactivePipeline::new(PipelineSettings {
                fft_size,
                ..PipelineSettings::default()
            });
            let producer = pipeline.frame_producer(SAMPLE_RATE);
            assert_eq!(pipeline.settings().fft_size, MIN_FFT_SIZE);
            assert_eq!(pipeline.settings().fft_size, producer.fft_size());
        }
    }

    #[test]
    fn stop_drains_queued_messages() {
        let mut pipeline = ReactivePipeline::default();
        pipeline.start();
        let mut producer = pipeline.frame_producer(SAMPLE_RATE);
        let classifier = pipeline.classification_producer();

        let samples = tone(0.5);
        producer.process(AudioFrame::new(&samples, SAMPLE_RATE)).unwrap();
        classifier.post([("rain", 0.8)]).unwrap();
        pipeline.stop();

        assert!(pipeline.frame_rx.is_empty());
        assert!(pipeline.classification_rx.is_empty());
    }

    #[test]
    fn tick_before_start_is_a_noop() {
        let mut pipeline = ReactivePipeline::default();
        let snapshot = pipeline.tick();
        assert!(!snapshot.running);
        assert_eq!(snapshot.ticks, 0);
        assert_eq!(snapshot, ReactiveSnapshot::default());
    }

    #[test]
    fn frames_drive_smoothed_state() {
        let mut pipeline = ReactivePipeline::default();
        pipeline.start();
        let mut producer = pipeline.frame_producer(SAMPLE_RATE);

        let samples = tone(0.5);
        producer.process(AudioFrame::new(&samples, SAMPLE_RATE)).unwrap();
        let snapshot = pipeline.tick();

        assert!(snapshot.running);
        assert!(snapshot.loudness.instantaneous > 0.8);
        let expected = snapshot.loudness.instantaneous * 0.3;
        assert!((snapshot.loudness.smoothed - expected).abs() < 1e-6);
        assert!(snapshot.bands.mid > 0.0);
        assert_eq!(snapshot.raw_bands.dominant(), 1);
    }

    #[test]
    fn latest_frame_wins_within_a_tick() {
        let mut pipeline = ReactivePipeline::default();
        pipeline.start();
        let mut producer = pipeline.frame_producer(SAMPLE_RATE);

        let loud = tone(0.9);
        let quiet = vec![0.0; FFT_SIZE];
        producer.process(AudioFrame::new(&loud, SAMPLE_RATE)).unwrap();
        producer.process(AudioFrame::new(&quiet, SAMPLE_RATE)).unwrap();

        let snapshot = pipeline.tick();
        assert_eq!(snapshot.loudness.instantaneous, 0.0);
    }

    #[test]
    fn classification_gate_through_pipeline() {
        let mut pipeline = ReactivePipeline::default();
        let events = pipeline.subscribe();
        pipeline.start();
        let classifier = pipeline.classification_producer();

        classifier.post([("speech", 0.2), ("music", 0.25)]).unwrap();
        assert_eq!(pipeline.tick().classification.label, SoundLabel::Unknown);

        classifier.post([("speech", 0.1), ("music", 0.35)]).unwrap();
        let snapshot = pipeline.tick();
        assert_eq!(snapshot.classification.label, SoundLabel::Music);
        assert_eq!(snapshot.ranked.len(), 2);
        assert_eq!(snapshot.haptic(), HapticPattern::Rhythmic);

        let changes: Vec<_> = events
            .try_iter()
            .filter(|e| matches!(e, PipelineEvent::ClassificationChanged { .. }))
            .collect();
        assert_eq!(
            changes,
            vec![PipelineEvent::ClassificationChanged {
                label: SoundLabel::Music,
                confidence: 0.35,
            }]
        );
    }

    #[test]
    fn quiet_session_reports_silent_once() {
        let mut pipeline = ReactivePipeline::default();
        let events = pipeline.subscribe();
        pipeline.start();

        for _ in 0..40 {
            pipeline.tick();
        }

        let received: Vec<_> = events.try_iter().collect();
        assert_eq!(
            received,
            vec![PipelineEvent::CategoryChanged {
                from: None,
                to: SoundCategory::Silent,
            }]
        );
    }

    #[test]
    fn stop_is_idempotent_and_resets() {
        let mut pipeline = ReactivePipeline::default();
        pipeline.start();
        let mut producer = pipeline.frame_producer(SAMPLE_RATE);
        let classifier = pipeline.classification_producer();

        let samples = tone(0.5);
        for _ in 0..12 {
            producer.process(AudioFrame::new(&samples, SAMPLE_RATE)).unwrap();
            pipeline.tick();
        }
        classifier.post([("siren", 0.9)]).unwrap();
        pipeline.tick();

        pipeline.stop();
        let once = pipeline.snapshot();
        pipeline.stop();
        let twice = pipeline.snapshot();

        assert_eq!(once, twice);
        assert_eq!(once, ReactiveSnapshot::default());
        assert_eq!(once.classification.label, SoundLabel::Unknown);
        assert!(once.ranked.is_empty());
        assert!(pipeline.trend.is_empty());
    }

    #[test]
    fn posting_after_stop_is_refused() {
        let mut pipeline = ReactivePipeline::default();
        pipeline.start();
        let mut producer = pipeline.frame_producer(SAMPLE_RATE);
        pipeline.stop();

        let samples = tone(0.5);
        assert_eq!(
            producer.process(AudioFrame::new(&samples, SAMPLE_RATE)),
            Err(crate::PipelineError::Inactive)
        );
    }

    #[test]
    fn in_flight_messages_from_old_session_are_discarded() {
        let mut pipeline = ReactivePipeline::default();
        pipeline.start();
        let stale_epoch = pipeline.gate.epoch();
        pipeline.stop();
        pipeline.start();

        // A producer that read the epoch before stop() and sent afterwards
        pipeline
            .frame_tx
            .send(FrameMessage {
                epoch: stale_epoch,
                analysis: FrameAnalysis {
                    loudness: 1.0,
                    bands: FrequencyBands::from_array([1.0; 4]),
                },
            })
            .unwrap();

        let snapshot = pipeline.tick();
        assert_eq!(snapshot.loudness.instantaneous, 0.0);
        assert_eq!(snapshot.raw_bands, FrequencyBands::ZERO);
    }

    #[test]
    fn restart_begins_from_clean_baseline() {
        let mut pipeline = ReactivePipeline::default();
        let events = pipeline.subscribe();
        pipeline.start();
        for _ in 0..10 {
            pipeline.tick();
        }
        pipeline.stop();
        pipeline.start();
        for _ in 0..10 {
            pipeline.tick();
        }

        // Each session reports its first category afresh
        let categories = events
            .try_iter()
            .filter(|e| matches!(e, PipelineEvent::CategoryChanged { from: None, .. }))
            .count();
        assert_eq!(categories, 2);
    }
}
