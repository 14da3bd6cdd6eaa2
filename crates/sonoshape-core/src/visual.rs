//! Visual parameters derived from a reactive snapshot.
//!
//! Deterministic: the same snapshot always yields the same parameters, so the
//! renderer can call this every frame without keeping its own state.

use crate::classification::SoundLabel;
use crate::pipeline::ReactiveSnapshot;

/// Shape scale at full loudness is `1.0 + MAX_SCALE_BOOST`
const MAX_SCALE_BOOST: f32 = 0.6;

/// Base rotation in rad/s and the extra spin driven by the mid band
const BASE_SPIN: f32 = 0.2;
const MID_SPIN: f32 = 1.5;

/// How far the low band pushes the tint toward white
const LOW_BAND_GLOW: f32 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualParams {
    /// Uniform mesh scale, 1.0-1.6
    pub scale: f32,
    /// Surface displacement amount, 0-1
    pub roughness: f32,
    /// Rotation rate in rad/s
    pub spin: f32,
    /// Linear RGB, each 0-1
    pub tint: [f32; 3],
}

impl VisualParams {
    pub fn from_snapshot(snapshot: &ReactiveSnapshot) -> Self {
        let loudness = snapshot.loudness.smoothed;
        let bands = snapshot.bands;

        let roughness = (0.6 * bands.high + 0.4 * bands.very_high).clamp(0.0, 1.0);

        let base = label_color(snapshot.classification.label);
        let glow = (LOW_BAND_GLOW * bands.low).clamp(0.0, 1.0);
        let tint = base.map(|c| (c + (1.0 - c) * glow).clamp(0.0, 1.0));

        Self {
            scale: 1.0 + MAX_SCALE_BOOST * loudness,
            roughness,
            spin: BASE_SPIN + MID_SPIN * bands.mid,
            tint,
        }
    }
}

/// Base color per label
fn label_color(label: SoundLabel) -> [f32; 3] {
    match label {
        SoundLabel::Speech => [0.95, 0.75, 0.30],
        SoundLabel::Music => [0.70, 0.30, 0.95],
        SoundLabel::Laughter => [1.00, 0.55, 0.70],
        SoundLabel::Applause => [1.00, 0.85, 0.20],
        SoundLabel::DogBark => [0.85, 0.45, 0.15],
        SoundLabel::Siren => [1.00, 0.15, 0.15],
        SoundLabel::Traffic => [0.55, 0.55, 0.60],
        SoundLabel::Rain => [0.25, 0.45, 0.90],
        SoundLabel::Nature => [0.25, 0.80, 0.40],
        SoundLabel::Doorbell => [0.95, 0.60, 0.10],
        SoundLabel::BabyCry => [0.95, 0.40, 0.55],
        SoundLabel::Footsteps => [0.60, 0.45, 0.35],
        SoundLabel::Silence => [0.15, 0.15, 0.25],
        SoundLabel::Ambient => [0.35, 0.70, 0.75],
        SoundLabel::Unknown => [0.50, 0.50, 0.55],
    }
}
