//! Four-band spectral energy via windowed FFT.
//!
//! The analyzer is stateless between frames: it owns only its FFT plan and
//! scratch buffers, allocated once at construction so the capture thread never
//! allocates per frame. Temporal smoothing lives in [`BandSmoother`].

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

use crate::loudness::Calibration;

/// Default FFT window length in samples
pub const FFT_SIZE: usize = 1024;

/// Smallest usable window; the symmetric Hann window divides by (size - 1)
pub const MIN_FFT_SIZE: usize = 2;

pub const NUM_BANDS: usize = 4;

/// Band boundaries (Hz): low, mid, high, very-high. Half-open ranges.
const BAND_EDGES: [f32; NUM_BANDS + 1] = [20.0, 250.0, 2000.0, 8000.0, 20000.0];

/// Smoothing factor for consumer-side band smoothing (0.8 old / 0.2 new)
pub const BAND_ALPHA: f32 = 0.2;

/// Normalized energy per frequency band, each in 0-1
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrequencyBands {
    /// 20-250 Hz
    pub low: f32,
    /// 250-2000 Hz
    pub mid: f32,
    /// 2-8 kHz
    pub high: f32,
    /// 8-20 kHz
    pub very_high: f32,
}

impl FrequencyBands {
    pub const ZERO: Self = Self {
        low: 0.0,
        mid: 0.0,
        high: 0.0,
        very_high: 0.0,
    };

    /// Build from raw values, clamping each into 0-1 (NaN becomes 0)
    pub fn from_array(values: [f32; NUM_BANDS]) -> Self {
        let [low, mid, high, very_high] = values.map(clamp_unit);
        Self {
            low,
            mid,
            high,
            very_high,
        }
    }

    pub fn as_array(&self) -> [f32; NUM_BANDS] {
        [self.low, self.mid, self.high, self.very_high]
    }

    /// Index of the strongest band (0 = low). Ties go to the lower band.
    pub fn dominant(&self) -> usize {
        let values = self.as_array();
        let mut best = 0;
        for i in 1..NUM_BANDS {
            if values[i] > values[best] {
                best = i;
            }
        }
        best
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Windowed FFT band analyzer with pre-allocated resources
pub struct SpectralBandAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    fft_buffer: Vec<Complex<f32>>,
    fft_scratch: Vec<Complex<f32>>,
    fft_window: Vec<f32>,
    /// Half-open bin range per band; an empty range means no contributing bins
    band_bins: [(usize, usize); NUM_BANDS],
    sample_rate: f32,
    gain: f32,
}

impl SpectralBandAnalyzer {
    pub fn new(sample_rate: f32) -> Self {
        Self::with_size(sample_rate, FFT_SIZE, Calibration::default().band_gain)
    }

    pub fn with_size(sample_rate: f32, fft_size: usize, gain: f32) -> Self {
        let fft_size = fft_size.max(MIN_FFT_SIZE);

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let scratch_len = fft.get_inplace_scratch_len();

        let fft_window: Vec<f32> = (0..fft_size)
            .map(|i| {
                0.5 - 0.5
                    * (2.0 * std::f32::consts::PI * i as f32 / (fft_size - 1) as f32).cos()
            })
            .collect();

        // Only the first half of the spectrum carries information for real input
        let half = fft_size / 2;
        let bin_width = sample_rate / fft_size as f32;
        let first_bin_at =
            |hz: f32| (0..half).find(|&i| i as f32 * bin_width >= hz).unwrap_or(half);

        let mut band_bins = [(0usize, 0usize); NUM_BANDS];
        for (i, bins) in band_bins.iter_mut().enumerate() {
            let low_bin = first_bin_at(BAND_EDGES[i]);
            let high_bin = first_bin_at(BAND_EDGES[i + 1]);
            *bins = (low_bin, high_bin.max(low_bin));
        }

        Self {
            fft,
            fft_buffer: vec![Complex::new(0.0, 0.0); fft_size],
            fft_scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            fft_window,
            band_bins,
            sample_rate,
            gain,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_buffer.len()
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Number of FFT bins feeding each band
    pub fn bins_per_band(&self) -> [usize; NUM_BANDS] {
        self.band_bins.map(|(low, high)| high - low)
    }

    /// Analyze the first `fft_size` samples of a frame.
    /// Frames shorter than the FFT window yield all-zero bands.
    pub fn analyze(&mut self, samples: &[f32]) -> FrequencyBands {
        if samples.len() < self.fft_size() {
            return FrequencyBands::ZERO;
        }

        for ((slot, &sample), &w) in self
            .fft_buffer
            .iter_mut()
            .zip(samples.iter())
            .zip(self.fft_window.iter())
        {
            let sample = if sample.is_finite() { sample } else { 0.0 };
            *slot = Complex::new(sample * w, 0.0);
        }

        self.fft.process_with_scratch(&mut self.fft_buffer, &mut self.fft_scratch);

        let mut values = [0.0f32; NUM_BANDS];
        for (value, &(low, high)) in values.iter_mut().zip(self.band_bins.iter()) {
            if high > low {
                let sum: f32 = self.fft_buffer[low..high].iter().map(|c| c.norm()).sum();
                let mean = sum / (high - low) as f32;
                *value = (mean * self.gain).min(1.0);
            }
        }

        FrequencyBands::from_array(values)
    }
}

/// Consumer-side exponential smoothing, independent per band
#[derive(Debug, Clone, Copy, Default)]
pub struct BandSmoother {
    smoothed: FrequencyBands,
}

impl BandSmoother {
    pub fn smooth(&mut self, raw: FrequencyBands) -> FrequencyBands {
        let previous = self.smoothed.as_array();
        let current = raw.as_array();
        let mut next = [0.0f32; NUM_BANDS];
        for i in 0..NUM_BANDS {
            next[i] = previous[i] * (1.0 - BAND_ALPHA) + current[i] * BAND_ALPHA;
        }
        self.smoothed = FrequencyBands::from_array(next);
        self.smoothed
    }

    pub fn current(&self) -> FrequencyBands {
        self.smoothed
    }

    pub fn reset(&mut self) {
        self.smoothed = FrequencyBands::ZERO;
    }
}
