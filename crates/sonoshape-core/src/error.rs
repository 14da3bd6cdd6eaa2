//! Error types for the reactive pipeline
//!
//! Signal processing itself is total: degenerate input yields zero values.
//! Errors only describe hand-off failures between producers and the owner.

use thiserror::Error;

/// Reasons a producer could not hand a message to the pipeline owner
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineError {
    /// Posted before `start()` or after `stop()`; nothing was queued
    #[error("session is not running")]
    Inactive,

    /// The bounded queue is full; the message was dropped
    #[error("{0} queue is full, message dropped")]
    QueueFull(&'static str),

    /// The pipeline owner has been dropped
    #[error("pipeline owner disconnected")]
    Disconnected,
}

/// Result type alias for the pipeline
pub type Result<T> = std::result::Result<T, PipelineError>;
