//! Audio analysis and reactive-mapping pipeline for sonoshape
//!
//! Turns live mono audio frames and external classifier observations into
//! smoothed loudness, four frequency bands, a gated sound label, a coarse
//! sound category and the haptic/visual parameters derived from them.
//!
//! Frames are analyzed on the producer's thread and posted to a single
//! [`ReactivePipeline`] owner, which applies smoothing on its own fixed-rate
//! tick and exposes read-only [`ReactiveSnapshot`]s.

pub mod classification;
pub mod error;
pub mod events;
pub mod haptics;
pub mod loudness;
pub mod pipeline;
pub mod session;
pub mod spectrum;
pub mod ticker;
pub mod trend;
pub mod visual;

pub use classification::{ClassificationAggregator, ClassificationResult, RankedBatch, SoundLabel};
pub use error::{PipelineError, Result};
pub use events::{EventBus, PipelineEvent, EVENT_QUEUE_CAPACITY};
pub use haptics::{HapticPattern, MoodDescriptor, ShapeType};
pub use loudness::{Calibration, LoudnessState};
pub use pipeline::{PipelineSettings, ReactivePipeline, ReactiveSnapshot};
pub use session::{AudioFrame, ClassificationProducer, FrameAnalysis, FrameProducer};
pub use spectrum::{BandSmoother, FrequencyBands, SpectralBandAnalyzer, FFT_SIZE, MIN_FFT_SIZE};
pub use ticker::Ticker;
pub use trend::{CategoryTransition, CategoryTrendDetector, SoundCategory, TrendStats};
pub use visual::VisualParams;
