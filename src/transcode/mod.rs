//! Library transcoding: encoder invocation and the startup conversion
//! pipeline.

mod encoder;
mod pipeline;

pub use encoder::{EncodeError, FfmpegTranscoder, HlsProfile, Transcoder};
pub use pipeline::{ConversionOutcome, ConversionPipeline, ConversionReport};
