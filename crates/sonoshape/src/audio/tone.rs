//! Synthetic input for running without a capture device.
//!
//! A sine with a slow amplitude swell and a little noise, posted at real-time
//! pace from its own thread so the trend detector sees quiet and loud spans.

use rand::Rng;
use sonoshape_core::{AudioFrame, PipelineError, ReactivePipeline};
use std::f32::consts::TAU;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Seconds for one quiet-loud-quiet swell
const SWELL_PERIOD_SECS: f32 = 8.0;
const NOISE_LEVEL: f32 = 0.02;

pub struct ToneGenerator {
    freq: f32,
    sample_rate: f32,
    phase: f32,
    swell_phase: f32,
}

impl ToneGenerator {
    pub fn new(freq: f32, sample_rate: f32) -> Self {
        Self {
            freq: freq.max(0.0),
            sample_rate: sample_rate.max(1.0),
            phase: 0.0,
            swell_phase: 0.0,
        }
    }

    pub fn fill<R: Rng>(&mut self, out: &mut [f32], rng: &mut R) {
        let step = TAU * self.freq / self.sample_rate;
        let swell_step = TAU / (SWELL_PERIOD_SECS * self.sample_rate);
        for sample in out.iter_mut() {
            let envelope = 0.5 - 0.5 * self.swell_phase.cos();
            let noise = rng.random_range(-NOISE_LEVEL..NOISE_LEVEL);
            *sample = (0.9 * envelope * self.phase.sin() + noise).clamp(-1.0, 1.0);
            self.phase = (self.phase + step) % TAU;
            self.swell_phase = (self.swell_phase + swell_step) % TAU;
        }
    }
}

pub struct ToneSource {
    handle: JoinHandle<()>,
}

impl ToneSource {
    /// Starts posting frames; the thread exits once the session stops.
    pub fn spawn(pipeline: &ReactivePipeline, freq: f32, sample_rate: f32) -> Self {
        let frame_len = pipeline.settings().fft_size;
        let mut producer = pipeline.frame_producer(sample_rate);
        let pace = Duration::from_secs_f32(frame_len as f32 / sample_rate.max(1.0));

        let handle = thread::spawn(move || {
            let mut generator = ToneGenerator::new(freq, sample_rate);
            let mut rng = rand::rng();
            let mut frame = vec![0.0; frame_len];
            log::debug!("Tone source started at {} Hz", freq);
            loop {
                generator.fill(&mut frame, &mut rng);
                match producer.process(AudioFrame::new(&frame, sample_rate)) {
                    Ok(_) | Err(PipelineError::QueueFull(_)) => {}
                    Err(PipelineError::Inactive) | Err(PipelineError::Disconnected) => break,
                }
                thread::sleep(pace);
            }
            log::debug!("Tone source stopped ({} frames dropped)", producer.dropped_frames());
        });

        Self { handle }
    }

    pub fn join(self) {
        if self.handle.join().is_err() {
            log::warn!("Tone source thread panicked");
        }
    }
}
