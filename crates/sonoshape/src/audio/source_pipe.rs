//! Audio device capture.
//!
//! Enumerates cpal input devices, opens one and downmixes its callback data
//! into fixed-size mono frames handed to a [`FrameProducer`]. Analysis runs
//! inside the callback; the stream never touches pipeline state directly.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use sonoshape_core::{AudioFrame, ReactivePipeline};
use std::time::Duration;

pub struct DeviceInfo {
    pub device: Device,
    pub name: String,
}

pub struct SourcePipe {
    name: String,
    sample_rate: f32,
    _stream: Stream,
}

impl SourcePipe {
    /// Opens `preferred` if present, otherwise the host's default input,
    /// otherwise the first input found.
    pub fn open(
        pipeline: &ReactivePipeline,
        preferred: Option<&str>,
        timeout: Duration,
    ) -> Option<Self> {
        let devices = Self::collect_devices();
        if devices.is_empty() {
            log::error!("No audio input devices found");
            return None;
        }

        let index = preferred
            .and_then(|name| {
                let found = devices.iter().position(|d| d.name == name);
                if found.is_none() {
                    log::warn!("Input device '{}' not found", name);
                }
                found
            })
            .or_else(|| {
                let host = cpal::default_host();
                let default_name = host.default_input_device().and_then(|d| d.name().ok());
                default_name.and_then(|name| devices.iter().position(|d| d.name == name))
            })
            .unwrap_or(0);

        let info = &devices[index];
        log::info!("[{}] Selecting: {}", index, info.name);

        let stream_config = Self::get_config_with_timeout(&info.device, timeout)?;
        let sample_rate = stream_config.sample_rate.0 as f32;
        let stream = Self::build_stream(info, &stream_config, pipeline)?;

        Some(Self {
            name: info.name.clone(),
            sample_rate,
            _stream: stream,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn list_devices() {
        let devices = Self::collect_devices();
        println!("\n=== Input Devices ===");
        for (idx, info) in devices.iter().enumerate() {
            println!("  [{}] {}", idx, info.name);
        }
        if devices.is_empty() {
            println!("  (none)");
        }
        println!("Use --device <name> to select one\n");
    }

    fn collect_devices() -> Vec<DeviceInfo> {
        let host = cpal::default_host();
        let mut devices = Vec::new();

        match host.input_devices() {
            Ok(inputs) => {
                for device in inputs {
                    if let Ok(name) = device.name() {
                        devices.push(DeviceInfo { device, name });
                    }
                }
            }
            Err(e) => log::warn!("Could not enumerate input devices: {}", e),
        }

        devices
    }

    /// Get device config with timeout (the config call often hangs on bad devices)
    fn get_config_with_timeout(device: &Device, timeout: Duration) -> Option<StreamConfig> {
        let device_clone = device.clone();
        let (tx, rx) = std::sync::mpsc::channel();

        std::thread::spawn(move || {
            let _ = tx.send(device_clone.default_input_config());
        });

        match rx.recv_timeout(timeout) {
            Ok(Ok(config)) => Some(config.into()),
            Ok(Err(e)) => {
                log::error!("Failed to get config: {}", e);
                None
            }
            Err(_) => {
                log::error!("Device config timed out after {:?}", timeout);
                None
            }
        }
    }

    fn build_stream(
        device_info: &DeviceInfo,
        stream_config: &StreamConfig,
        pipeline: &ReactivePipeline,
    ) -> Option<Stream> {
        let channels = (stream_config.channels as usize).max(1);
        let sample_rate = stream_config.sample_rate.0 as f32;
        let frame_len = pipeline.settings().fft_size;

        let mut producer = pipeline.frame_producer(sample_rate);
        let mut frame: Vec<f32> = Vec::with_capacity(frame_len);

        let err_fn = |err| log::error!("Audio stream error: {}", err);

        let stream = device_info.device.build_input_stream(
            stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                for chunk in data.chunks(channels) {
                    let sample: f32 = chunk.iter().sum::<f32>() / chunk.len() as f32;
                    frame.push(sample);
                    if frame.len() == frame_len {
                        // Full queue or a stopped session just drops the frame
                        let _ = producer.process(AudioFrame::new(&frame, sample_rate));
                        frame.clear();
                    }
                }
            },
            err_fn,
            None,
        );

        match stream {
            Ok(s) => {
                if let Err(e) = s.play() {
                    log::error!("Failed to play stream: {}", e);
                    return None;
                }
                Some(s)
            }
            Err(e) => {
                log::error!("Failed to build stream: {}", e);
                None
            }
        }
    }
}
