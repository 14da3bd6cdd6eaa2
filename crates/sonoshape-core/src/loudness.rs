//! Frame loudness on a perceptual (dB) scale.
//!
//! RMS is converted to decibels, clamped to a fixed floor and mapped onto 0-1.
//! The smoothed value is a first-order low-pass applied at UI cadence.

/// Linear RMS floor, keeps `log10` away from zero
const RMS_EPSILON: f32 = 1e-7;

/// Smoothing factor applied once per UI tick
pub const LOUDNESS_ALPHA: f32 = 0.3;

/// Empirical calibration for a given capture chain.
///
/// Both values were tuned against one microphone gain; re-tune them per
/// deployment rather than treating them as physical constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Gain applied to mean band magnitude before clamping
    pub band_gain: f32,
    /// Quietest level (dB) treated as anything other than silence
    pub db_floor: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            band_gain: 10.0,
            db_floor: -60.0,
        }
    }
}

/// Instantaneous loudness of a frame in 0-1, or `None` for an empty frame.
pub fn instantaneous(samples: &[f32], db_floor: f32) -> Option<f32> {
    if samples.is_empty() {
        return None;
    }

    let mean_square = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    let rms = mean_square.sqrt();
    // NaN samples would otherwise survive the clamp below
    if !rms.is_finite() {
        return Some(if rms.is_nan() { 0.0 } else { 1.0 });
    }

    let floor = if db_floor < 0.0 { db_floor } else { -60.0 };
    let db = (20.0 * rms.max(RMS_EPSILON).log10()).clamp(floor, 0.0);
    Some(((db - floor) / (0.0 - floor)).clamp(0.0, 1.0))
}

/// Loudness carried across frames for one session
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoudnessState {
    /// Latest frame's loudness (0-1)
    pub instantaneous: f32,
    /// Exponential moving average of `instantaneous` (0-1)
    pub smoothed: f32,
}

impl LoudnessState {
    /// Record a new frame value without smoothing
    pub fn observe(&mut self, instantaneous: f32) {
        self.instantaneous = instantaneous.clamp(0.0, 1.0);
    }

    /// Advance the smoothed value by one UI tick
    pub fn smooth(&mut self) -> f32 {
        self.smoothed = (self.smoothed * (1.0 - LOUDNESS_ALPHA)
            + self.instantaneous * LOUDNESS_ALPHA)
            .clamp(0.0, 1.0);
        self.smoothed
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn sine(freq: f32, amplitude: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (std::f32::consts::TAU * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn empty_frame_has_no_value() {
        assert_eq!(instantaneous(&[], -60.0), None);
    }

    #[test]
    fn silence_sits_on_the_floor() {
        let frame = vec![0.0; 1024];
        assert_eq!(instantaneous(&frame, -60.0), Some(0.0));
    }

    #[test]
    fn full_scale_sine_is_near_top() {
        let frame = sine(441.0, 1.0, 44100.0, 4400);
        let value = instantaneous(&frame, -60.0).unwrap();
        // -3.01 dB -> (60 - 3.01) / 60
        assert!((value - 0.9498).abs() < 0.005, "got {}", value);
        assert!(value <= 1.0);
    }

    #[test]
    fn clipped_input_stays_in_range() {
        let frame = vec![8.0; 512];
        assert_eq!(instantaneous(&frame, -60.0), Some(1.0));
    }

    #[test]
    fn random_frames_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let len = rng.random_range(1..2048);
            let scale = rng.random_range(0.0f32..4.0);
            let frame: Vec<f32> = (0..len)
                .map(|_| rng.random_range(-1.0f32..1.0) * scale)
                .collect();
            let value = instantaneous(&frame, -60.0).unwrap();
            assert!((0.0..=1.0).contains(&value), "out of range: {}", value);
        }
    }

    #[test]
    fn nan_samples_do_not_escape() {
        let frame = vec![f32::NAN; 16];
        assert_eq!(instantaneous(&frame, -60.0), Some(0.0));
    }

    #[test]
    fn smoothing_converges_towards_input() {
        let mut state = LoudnessState::default();
        state.observe(1.0);
        assert!((state.smooth() - 0.3).abs() < 1e-6);
        assert!((state.smooth() - 0.51).abs() < 1e-6);
        for _ in 0..20 {
            state.smooth();
        }
        assert!(state.smoothed > 0.99 && state.smoothed <= 1.0);
    }

    #[test]
    fn reset_returns_to_zero() {
        let mut state = LoudnessState::default();
        state.observe(0.8);
        state.smooth();
        state.reset();
        assert_eq!(state, LoudnessState::default());
    }
}
