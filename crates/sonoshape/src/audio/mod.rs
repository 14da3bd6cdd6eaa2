mod source_pipe;
mod tone;

pub use source_pipe::SourcePipe;
pub use tone::ToneSource;
