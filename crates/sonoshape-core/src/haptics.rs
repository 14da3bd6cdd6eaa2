//! Haptic pattern selection.
//!
//! Pattern identity is the only data here; turning a pattern into timed
//! pulses is the haptic player's job. Every table is an exhaustive `match`.

use crate::classification::SoundLabel;
use crate::trend::SoundCategory;

/// Roughness below which a sphere reads as smooth
const SMOOTH_SPHERE_ROUGHNESS: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HapticPattern {
    Calm,
    Heartbeat,
    Intense,
    Pulse,
    Rhythmic,
    Flutter,
    Idle,
}

/// Mesh families the renderer can morph between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeType {
    Sphere,
    Box,
    Pyramid,
    Torus,
    Cylinder,
}

/// Shape and surface roughness chosen by the external mood collaborator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoodDescriptor {
    pub shape: ShapeType,
    /// 0-1
    pub roughness: f32,
}

impl MoodDescriptor {
    pub fn new(shape: ShapeType, roughness: f32) -> Self {
        let roughness = if roughness.is_nan() {
            0.0
        } else {
            roughness.clamp(0.0, 1.0)
        };
        Self { shape, roughness }
    }

    pub fn haptic(&self) -> HapticPattern {
        HapticPattern::for_mood(self.shape, self.roughness)
    }
}

impl HapticPattern {
    pub fn for_label(label: SoundLabel) -> Self {
        match label {
            SoundLabel::Rain | SoundLabel::Nature | SoundLabel::Ambient => HapticPattern::Calm,
            SoundLabel::Siren | SoundLabel::DogBark | SoundLabel::Doorbell => {
                HapticPattern::Intense
            }
            SoundLabel::Speech | SoundLabel::Music | SoundLabel::Applause => {
                HapticPattern::Rhythmic
            }
            SoundLabel::Traffic | SoundLabel::BabyCry | SoundLabel::Footsteps => {
                HapticPattern::Pulse
            }
            SoundLabel::Laughter => HapticPattern::Flutter,
            SoundLabel::Silence | SoundLabel::Unknown => HapticPattern::Idle,
        }
    }

    pub fn for_mood(shape: ShapeType, roughness: f32) -> Self {
        match shape {
            ShapeType::Sphere if roughness < SMOOTH_SPHERE_ROUGHNESS => HapticPattern::Calm,
            ShapeType::Sphere => HapticPattern::Heartbeat,
            ShapeType::Box | ShapeType::Pyramid => HapticPattern::Intense,
            ShapeType::Torus => HapticPattern::Pulse,
            ShapeType::Cylinder => HapticPattern::Rhythmic,
        }
    }

    /// Pattern for hosts that pulse on category transitions without a classifier
    pub fn for_category(category: SoundCategory) -> Self {
        match category {
            SoundCategory::Silent => HapticPattern::Idle,
            SoundCategory::Calm | SoundCategory::Ambient => HapticPattern::Calm,
            SoundCategory::Speech | SoundCategory::Music => HapticPattern::Rhythmic,
            SoundCategory::Energetic => HapticPattern::Pulse,
            SoundCategory::Intense => HapticPattern::Intense,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HapticPattern::Calm => "calm",
            HapticPattern::Heartbeat => "heartbeat",
            HapticPattern::Intense => "intense",
            HapticPattern::Pulse => "pulse",
            HapticPattern::Rhythmic => "rhythmic",
            HapticPattern::Flutter => "flutter",
            HapticPattern::Idle => "idle",
        }
    }
}
