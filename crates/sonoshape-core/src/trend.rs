//! Coarse sound category from recent loudness history.
//!
//! Independent of the external classifier: only the smoothed loudness series
//! is used. The category is recomputed on every push, but a transition is
//! reported only when it differs from the last reported one.

/// Samples of smoothed loudness kept for the trend (one per UI tick)
pub const HISTORY_CAPACITY: usize = 30;

/// Samples required before any category is produced
pub const MIN_SAMPLES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCategory {
    Silent,
    Calm,
    Ambient,
    Speech,
    Music,
    Energetic,
    Intense,
}

impl SoundCategory {
    /// Ordered threshold rules; the first match wins
    pub fn classify(max: f32, variance: f32) -> Self {
        if max < 0.05 {
            SoundCategory::Silent
        } else if max < 0.2 && variance < 0.01 {
            SoundCategory::Calm
        } else if max < 0.4 && variance < 0.02 {
            SoundCategory::Ambient
        } else if max < 0.5 && variance > 0.03 {
            SoundCategory::Speech
        } else if max < 0.6 && variance > 0.02 {
            SoundCategory::Music
        } else if max < 0.8 {
            SoundCategory::Energetic
        } else {
            SoundCategory::Intense
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SoundCategory::Silent => "silent",
            SoundCategory::Calm => "calm",
            SoundCategory::Ambient => "ambient",
            SoundCategory::Speech => "speech",
            SoundCategory::Music => "music",
            SoundCategory::Energetic => "energetic",
            SoundCategory::Intense => "intense",
        }
    }
}

/// A change of reported category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryTransition {
    /// `None` for the first category of a session
    pub from: Option<SoundCategory>,
    pub to: SoundCategory,
}

/// Summary statistics over the history window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendStats {
    pub mean: f32,
    pub max: f32,
    /// Mean squared deviation from `mean`
    pub variance: f32,
}

/// Fixed-capacity FIFO of loudness samples plus the last reported category
#[derive(Debug, Clone)]
pub struct CategoryTrendDetector {
    history: [f32; HISTORY_CAPACITY],
    /// Next write position
    history_idx: usize,
    len: usize,
    current: Option<SoundCategory>,
}

impl Default for CategoryTrendDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryTrendDetector {
    pub fn new() -> Self {
        Self {
            history: [0.0; HISTORY_CAPACITY],
            history_idx: 0,
            len: 0,
            current: None,
        }
    }

    /// Append one sample, evicting the oldest once full.
    /// Returns a transition only when the category changed.
    pub fn push(&mut self, loudness: f32) -> Option<CategoryTransition> {
        let loudness = if loudness.is_nan() {
            0.0
        } else {
            loudness.clamp(0.0, 1.0)
        };

        self.history[self.history_idx] = loudness;
        self.history_idx = (self.history_idx + 1) % HISTORY_CAPACITY;
        self.len = (self.len + 1).min(HISTORY_CAPACITY);

        let stats = self.stats()?;
        let category = SoundCategory::classify(stats.max, stats.variance);
        if self.current == Some(category) {
            return None;
        }

        let transition = CategoryTransition {
            from: self.current,
            to: category,
        };
        self.current = Some(category);
        Some(transition)
    }

    /// Window statistics, or `None` while fewer than `MIN_SAMPLES` are held
    pub fn stats(&self) -> Option<TrendStats> {
        if self.len < MIN_SAMPLES {
            return None;
        }

        let n = self.len as f32;
        let mean = self.samples().sum::<f32>() / n;
        let max = self.samples().fold(0.0f32, f32::max);
        let variance = self.samples().map(|s| (s - mean) * (s - mean)).sum::<f32>() / n;

        Some(TrendStats {
            mean,
            max,
            variance,
        })
    }

    /// Held samples, oldest first
    pub fn samples(&self) -> impl Iterator<Item = f32> + '_ {
        let start = (self.history_idx + HISTORY_CAPACITY - self.len) % HISTORY_CAPACITY;
        (0..self.len).map(move |i| self.history[(start + i) % HISTORY_CAPACITY])
    }

    pub fn current(&self) -> Option<SoundCategory> {
        self.current
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
