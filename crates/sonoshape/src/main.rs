//! sonoshape: live audio analysis host.
//!
//! Captures from an input device (or a synthetic tone), drives the reactive
//! pipeline at a fixed tick rate and logs the derived category, haptic
//! pattern and visual parameters.

mod audio;
mod cli;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use sonoshape_core::{HapticPattern, PipelineEvent, ReactivePipeline, ReactiveSnapshot, Ticker};
use std::time::{Duration, Instant};

use audio::{SourcePipe, ToneSource};
use cli::Cli;
use utils::Config;

enum Source {
    Device(SourcePipe),
    Tone(ToneSource),
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    if cli.list_devices {
        SourcePipe::list_devices();
        return Ok(());
    }

    let mut config = Config::load();
    let settings = config.pipeline_settings();
    let tick_rate = cli.tick_rate.unwrap_or_else(|| config.tick_rate_hz());

    let mut pipeline = ReactivePipeline::new(settings);
    let events = pipeline.subscribe();
    pipeline.start();

    let source = match cli.tone {
        Some(freq) => {
            log::info!(
                "Synthetic tone at {} Hz ({} Hz sample rate)",
                freq,
                cli.tone_sample_rate
            );
            Source::Tone(ToneSource::spawn(&pipeline, freq, cli.tone_sample_rate))
        }
        None => {
            let preferred = cli.device.as_deref().or(config.last_device.as_deref());
            let timeout = Duration::from_secs(config.device_timeout_secs());
            let pipe = SourcePipe::open(&pipeline, preferred, timeout)
                .context("no usable audio input device (try --list-devices or --tone)")?;
            log::info!("Capturing from {} at {} Hz", pipe.name(), pipe.sample_rate());
            if config.last_device.as_deref() != Some(pipe.name()) {
                config.set_device(pipe.name());
            }
            Source::Device(pipe)
        }
    };

    let classifier = pipeline.classification_producer();
    let label = cli.label.clone();
    let label_every = tick_rate.max(1.0).round() as u64;

    let report_every = ((cli.report_every.max(0.0) * tick_rate).round() as u64).max(1);
    let deadline = cli
        .duration
        .map(|secs| Instant::now() + Duration::from_secs_f32(secs.max(0.0)));

    let mut ticker = Ticker::new(tick_rate);
    log::info!("Ticking every {:?}", ticker.interval());

    loop {
        let skipped = ticker.wait();
        if skipped > 0 {
            log::debug!("Skipped {} ticks", skipped);
        }

        let snapshot = pipeline.tick();

        if let Some(raw) = label.as_deref() {
            if snapshot.ticks % label_every == 0 {
                if let Err(e) = classifier.post([(raw, cli.label_confidence)]) {
                    log::debug!("Classification not posted: {}", e);
                }
            }
        }

        for event in events.try_iter() {
            log_event(event);
        }

        if snapshot.ticks % report_every == 0 {
            log_snapshot(&snapshot);
        }

        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
    }

    pipeline.stop();
    match source {
        Source::Tone(tone) => tone.join(),
        Source::Device(pipe) => drop(pipe),
    }
    log::info!("Stopped");

    Ok(())
}

fn log_event(event: PipelineEvent) {
    match event {
        PipelineEvent::CategoryChanged { from, to } => {
            log::info!(
                "Category {} -> {} (haptic: {})",
                from.map_or("none", |c| c.name()),
                to.name(),
                HapticPattern::for_category(to).name()
            );
        }
        PipelineEvent::ClassificationChanged { label, confidence } => {
            log::info!(
                "Sound: {} ({:.0}%) -> haptic {}",
                label.name(),
                confidence * 100.0,
                HapticPattern::for_label(label).name()
            );
        }
    }
}

fn log_snapshot(snapshot: &ReactiveSnapshot) {
    let bands = snapshot.bands;
    let visuals = snapshot.visuals();
    log::info!(
        "loud {:.2} | bands {:.2} {:.2} {:.2} {:.2} | {} | {} | scale {:.2} rough {:.2} spin {:.2}",
        snapshot.loudness.smoothed,
        bands.low,
        bands.mid,
        bands.high,
        bands.very_high,
        snapshot.category.map_or("warming up", |c| c.name()),
        snapshot.haptic().name(),
        visuals.scale,
        visuals.roughness,
        visuals.spin
    );
}
