//! `wordline` — long-form video/audio transcription and word-timestamped
//! subtitle generation built on top of Whisper.
//!
//! This crate provides:
//! - Decoding and byte-bounded segmentation of arbitrarily long input media
//! - A VAD gate that keeps the STT backend fed with only speech, reprojected
//!   back onto the original timeline
//! - Anti-repetition decode parameters and a repetition scrubber for the
//!   long-form failure mode where Whisper loops on itself
//! - Segment-boundary optimization, cross-segment overlap-aware combining,
//!   and prose normalization
//! - Word-grouped subtitle cue construction with SRT/VTT/ASS serializers
//!
//! [`coordinator::process_file`] is the single entry point tying all of the
//! above together; the individual stage modules are public so a caller can
//! also drive the pipeline by hand or substitute their own VAD/STT backend.

pub mod audio_pipeline;
pub mod backends;
pub mod cancel;
pub mod combiner;
pub mod config;
pub mod coordinator;
pub mod decode;
pub mod decoder;
pub mod demux;
pub mod error;
pub mod ingest;
pub mod lexicon;
pub mod logging;
pub mod normalizer;
pub mod optimizer;
pub mod orchestrator;
pub mod segmenter;
pub mod subtitles;
pub mod token;
pub mod types;
pub mod vad;
pub mod wav;

pub use config::PipelineOpts;
pub use coordinator::{JobOutput, process_file};
pub use error::{Error, ErrorKind, Result};
