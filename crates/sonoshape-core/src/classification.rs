//! Gated aggregation of external sound-classifier output.
//!
//! Classifier labels are free-form strings; they are folded onto a closed set
//! of [`SoundLabel`]s through an ordered keyword table. Each batch is ranked
//! into a fixed three-slot list on the classifier's own thread, so posting a
//! batch never allocates. The owner then applies the confidence gate.

/// Minimum top confidence for a batch to replace the current classification
pub const CLASSIFICATION_GATE: f32 = 0.3;

/// Length of the ranked result list
pub const MAX_RANKED: usize = 3;

/// Domain sound labels. `Unknown` means no classification has arrived yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundLabel {
    Speech,
    Music,
    Laughter,
    Applause,
    DogBark,
    Siren,
    Traffic,
    Rain,
    Nature,
    Doorbell,
    BabyCry,
    Footsteps,
    Silence,
    /// Catch-all for classifier labels that match no keyword
    Ambient,
    Unknown,
}

/// Ordered keyword table: the first keyword contained in a raw label wins.
/// Longer or more specific keywords precede the ones they contain
/// ("train" before "rain", "instrument" before "wind").
const LABEL_KEYWORDS: &[(&str, SoundLabel)] = &[
    ("silence", SoundLabel::Silence),
    ("speech", SoundLabel::Speech),
    ("conversation", SoundLabel::Speech),
    ("whisper", SoundLabel::Speech),
    ("laugh", SoundLabel::Laughter),
    ("giggl", SoundLabel::Laughter),
    ("applause", SoundLabel::Applause),
    ("clapping", SoundLabel::Applause),
    ("cheer", SoundLabel::Applause),
    ("baby", SoundLabel::BabyCry),
    ("crying", SoundLabel::BabyCry),
    ("dog", SoundLabel::DogBark),
    ("bark", SoundLabel::DogBark),
    ("siren", SoundLabel::Siren),
    ("ambulance", SoundLabel::Siren),
    ("alarm", SoundLabel::Siren),
    ("doorbell", SoundLabel::Doorbell),
    ("door_bell", SoundLabel::Doorbell),
    ("ding_dong", SoundLabel::Doorbell),
    ("footstep", SoundLabel::Footsteps),
    ("walking", SoundLabel::Footsteps),
    ("music", SoundLabel::Music),
    ("singing", SoundLabel::Music),
    ("instrument", SoundLabel::Music),
    ("guitar", SoundLabel::Music),
    ("piano", SoundLabel::Music),
    ("drum", SoundLabel::Music),
    ("train", SoundLabel::Traffic),
    ("traffic", SoundLabel::Traffic),
    ("vehicle", SoundLabel::Traffic),
    ("engine", SoundLabel::Traffic),
    ("car_", SoundLabel::Traffic),
    ("rain", SoundLabel::Rain),
    ("thunder", SoundLabel::Rain),
    ("bird", SoundLabel::Nature),
    ("insect", SoundLabel::Nature),
    ("wind", SoundLabel::Nature),
    ("water", SoundLabel::Nature),
    ("stream", SoundLabel::Nature),
    ("nature", SoundLabel::Nature),
];

impl SoundLabel {
    /// Map a raw classifier identifier onto a domain label.
    ///
    /// Matching is ASCII case-insensitive substring search in table order.
    /// Anything unmatched is `Ambient`; this never returns `Unknown`.
    pub fn from_raw(raw: &str) -> Self {
        LABEL_KEYWORDS
            .iter()
            .find(|(keyword, _)| contains_ignore_ascii_case(raw, keyword))
            .map(|&(_, label)| label)
            .unwrap_or(SoundLabel::Ambient)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SoundLabel::Speech => "speech",
            SoundLabel::Music => "music",
            SoundLabel::Laughter => "laughter",
            SoundLabel::Applause => "applause",
            SoundLabel::DogBark => "dog bark",
            SoundLabel::Siren => "siren",
            SoundLabel::Traffic => "traffic",
            SoundLabel::Rain => "rain",
            SoundLabel::Nature => "nature",
            SoundLabel::Doorbell => "doorbell",
            SoundLabel::BabyCry => "baby crying",
            SoundLabel::Footsteps => "footsteps",
            SoundLabel::Silence => "silence",
            SoundLabel::Ambient => "ambient",
            SoundLabel::Unknown => "unknown",
        }
    }
}

fn contains_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    let needle = needle.as_bytes();
    if needle.is_empty() {
        return true;
    }
    haystack
        .as_bytes()
        .windows(needle.len())
        .any(|window| window.eq_ignore_ascii_case(needle))
}

/// One label with its confidence (0-1)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassificationResult {
    pub label: SoundLabel,
    pub confidence: f32,
}

impl ClassificationResult {
    pub const UNKNOWN: Self = Self {
        label: SoundLabel::Unknown,
        confidence: 0.0,
    };

    pub fn new(label: SoundLabel, confidence: f64) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0) as f32
        } else {
            0.0
        };
        Self { label, confidence }
    }
}

impl Default for ClassificationResult {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

/// Up to three results of one classifier batch, highest confidence first.
/// Equal confidences keep delivery order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RankedBatch {
    slots: [Option<ClassificationResult>; MAX_RANKED],
}

impl RankedBatch {
    pub const EMPTY: Self = Self {
        slots: [None; MAX_RANKED],
    };

    /// Rank raw `(label, confidence)` observations without allocating
    pub fn from_observations<'a, I>(observations: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut batch = Self::EMPTY;
        for (raw, confidence) in observations {
            batch.insert(ClassificationResult::new(SoundLabel::from_raw(raw), confidence));
        }
        batch
    }

    fn insert(&mut self, result: ClassificationResult) {
        // Strict comparison keeps the first-seen entry ahead on ties
        let Some(pos) = self.slots.iter().position(|slot| match slot {
            None => true,
            Some(existing) => existing.confidence < result.confidence,
        }) else {
            return;
        };

        for i in (pos + 1..MAX_RANKED).rev() {
            self.slots[i] = self.slots[i - 1];
        }
        self.slots[pos] = Some(result);
    }

    pub fn top(&self) -> Option<ClassificationResult> {
        self.slots[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassificationResult> {
        self.slots.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots[0].is_none()
    }
}

/// Latest gated classification plus the ranked list it came from
#[derive(Debug, Clone, Default)]
pub struct ClassificationAggregator {
    current: ClassificationResult,
    ranked: RankedBatch,
}

impl ClassificationAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one batch. Returns true if it passed the gate and replaced both
    /// the current result and the ranked list; otherwise nothing changes.
    pub fn observe(&mut self, batch: RankedBatch) -> bool {
        match batch.top() {
            Some(top) if top.confidence > CLASSIFICATION_GATE => {
                self.current = top;
                self.ranked = batch;
                true
            }
            _ => false,
        }
    }

    pub fn observe_raw<'a, I>(&mut self, observations: I) -> bool
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        self.observe(RankedBatch::from_observations(observations))
    }

    pub fn current(&self) -> ClassificationResult {
        self.current
    }

    pub fn current_label(&self) -> SoundLabel {
        self.current.label
    }

    pub fn ranked(&self) -> &RankedBatch {
        &self.ranked
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
