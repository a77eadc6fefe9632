//! Audio loading and output
//!
//! Decoding, format normalization to canonical stereo, scratch storage for
//! streamed playback, and the output device abstraction.

pub mod accumulator;
pub mod convert;
pub mod decoder;
pub mod normalizer;
pub mod output;
pub mod resampler;
pub mod scratch;
pub mod types;

pub use accumulator::ByteAccumulator;
pub use convert::FormatConverter;
pub use decoder::SimpleDecoder;
pub use normalizer::normalize;
pub use output::{CpalOutput, OutputDevice};
pub use resampler::Resampler;
pub use scratch::{ScratchFile, ScratchStore};
pub use types::{CanonicalPcm, PcmStream};
