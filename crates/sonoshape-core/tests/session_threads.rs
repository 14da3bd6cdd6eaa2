//! Producers on their own threads feeding a pipeline owned by the test thread.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sonoshape_core::{
    AudioFrame, PipelineError, PipelineEvent, ReactivePipeline, SoundCategory, SoundLabel,
    FFT_SIZE,
};

const SAMPLE_RATE: f32 = 48000.0;

fn tone(freq: f32, amplitude: f32) -> Vec<f32> {
    (0..FFT_SIZE)
        .map(|i| amplitude * (std::f32::consts::TAU * freq * i as f32 / SAMPLE_RATE).sin())
        .collect()
}

#[test]
fn capture_and_classifier_threads_feed_the_owner() {
    let mut pipeline = ReactivePipeline::default();
    let events = pipeline.subscribe();
    pipeline.start();

    let mut producer = pipeline.frame_producer(SAMPLE_RATE);
    let posted = Arc::new(AtomicUsize::new(0));
    let capture = {
        let posted = Arc::clone(&posted);
        thread::spawn(move || {
            let frame = tone(1000.0, 0.9);
            loop {
                match producer.process(AudioFrame::new(&frame, SAMPLE_RATE)) {
                    Ok(_) => {
                        posted.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(PipelineError::QueueFull(_)) => {}
                    Err(PipelineError::Inactive) | Err(PipelineError::Disconnected) => break,
                }
                thread::sleep(Duration::from_millis(2));
            }
        })
    };

    let classifier = pipeline.classification_producer();
    let classify = thread::spawn(move || {
        for _ in 0..5 {
            let _ = classifier.post([("Speech", 0.7), ("music", 0.2)]);
            thread::sleep(Duration::from_millis(5));
        }
    });
    classify.join().unwrap();

    for _ in 0..60 {
        thread::sleep(Duration::from_millis(3));
        pipeline.tick();
    }
    let snapshot = pipeline.snapshot();

    assert!(posted.load(Ordering::Relaxed) > 0);
    assert!(snapshot.loudness.smoothed > 0.8, "{:?}", snapshot.loudness);
    assert_eq!(snapshot.bands.dominant(), 1);
    assert_eq!(snapshot.classification.label, SoundLabel::Speech);

    pipeline.stop();
    capture.join().unwrap();

    let after = pipeline.tick();
    assert!(!after.running);
    assert_eq!(after.loudness.smoothed, 0.0);
    assert_eq!(after.classification.label, SoundLabel::Unknown);

    let received: Vec<PipelineEvent> = events.try_iter().collect();
    assert!(received.contains(&PipelineEvent::ClassificationChanged {
        label: SoundLabel::Speech,
        confidence: 0.7,
    }));
    let categories = received
        .iter()
        .filter(|e| matches!(e, PipelineEvent::CategoryChanged { .. }))
        .count();
    assert!(categories >= 1);
}

#[test]
fn loud_burst_after_quiet_start_fires_one_intense_event() {
    let mut pipeline = ReactivePipeline::default();
    let events = pipeline.subscribe();
    pipeline.start();
    let mut producer = pipeline.frame_producer(SAMPLE_RATE);

    // Quiet warm-up fills the trend window
    for _ in 0..12 {
        pipeline.tick();
    }

    let loud = tone(440.0, 1.0);
    for _ in 0..30 {
        producer.process(AudioFrame::new(&loud, SAMPLE_RATE)).unwrap();
        pipeline.tick();
    }

    let intense = events
        .try_iter()
        .filter(|e| {
            matches!(
                e,
                PipelineEvent::CategoryChanged {
                    to: SoundCategory::Intense,
                    ..
                }
            )
        })
        .count();
    assert_eq!(intense, 1);
    assert_eq!(pipeline.snapshot().category, Some(SoundCategory::Intense));
}

#[test]
fn classifier_that_never_reports_leaves_unknown() {
    let mut pipeline = ReactivePipeline::default();
    pipeline.start();
    for _ in 0..20 {
        pipeline.tick();
    }
    let snapshot = pipeline.snapshot();
    assert_eq!(snapshot.classification.label, SoundLabel::Unknown);
    assert!(snapshot.ranked.is_empty());
}
