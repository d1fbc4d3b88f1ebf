//! Data model shared across pipeline stages.

use serde::Serialize;

/// A contiguous slice of the source audio produced by the segmenter.
#[derive(Debug, Clone)]
pub struct AudioSegment {
    /// Path to the segment's decoded 16 kHz mono WAV file.
    pub path: std::path::PathBuf,
    /// Position in split order.
    pub index: usize,
    /// Start of this segment in the *pre-split* audio timeline, in seconds.
    pub start_s: f32,
    /// End of this segment in the pre-split timeline, in seconds.
    pub end_s: f32,
    pub has_start_overlap: bool,
    pub has_end_overlap: bool,
    /// Overlap width shared with the neighboring segment, in seconds.
    pub overlap_s: f32,
}

/// The full split ordering captured during segmentation.
///
/// Consumed by the combiner to know where overlap is expected.
#[derive(Debug, Clone, Default)]
pub struct SplitMetadata(pub Vec<AudioSegmentInfo>);

/// The subset of [`AudioSegment`] the combiner needs, kept separate so the
/// combiner doesn't need to hold onto (or outlive) segment files.
#[derive(Debug, Clone, Copy)]
pub struct AudioSegmentInfo {
    pub has_start_overlap: bool,
    pub overlap_s: f32,
}

impl SplitMetadata {
    pub fn from_segments(segments: &[AudioSegment]) -> Self {
        Self(
            segments
                .iter()
                .map(|s| AudioSegmentInfo {
                    has_start_overlap: s.has_start_overlap,
                    overlap_s: s.overlap_s,
                })
                .collect(),
        )
    }

    pub fn has_start_overlap(&self, index: usize) -> bool {
        self.0.get(index).is_some_and(|i| i.has_start_overlap)
    }
}

/// A speech region on the owning segment's timeline, produced by the VAD gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeechRegion {
    pub start_s: f32,
    pub end_s: f32,
}

impl SpeechRegion {
    pub fn duration_s(&self) -> f32 {
        self.end_s - self.start_s
    }

    pub fn padded(&self, pad_s: f32, clamp_end_s: f32) -> SpeechRegion {
        SpeechRegion {
            start_s: (self.start_s - pad_s).max(0.0),
            end_s: (self.end_s + pad_s).min(clamp_end_s),
        }
    }
}

/// A single word with timestamps on the original audio timeline.
#[derive(Debug, Clone, Serialize)]
pub struct Word {
    pub text: String,
    pub start_s: f32,
    pub end_s: f32,
    pub probability: Option<f32>,
}

/// A contiguous span of transcribed text, optionally with word-level timing.
#[derive(Debug, Clone, Serialize)]
pub struct TimedSegment {
    pub start_s: f32,
    pub end_s: f32,
    pub text: String,
    pub words: Vec<Word>,
}

impl TimedSegment {
    pub fn duration_s(&self) -> f32 {
        self.end_s - self.start_s
    }

    pub fn word_count(&self) -> usize {
        if self.words.is_empty() {
            self.text.split_whitespace().count()
        } else {
            self.words.len()
        }
    }
}

/// Which STT path produced a [`TranscriptionResult`]: region calls stitched
/// back together on the VAD's say-so, or a single whole-segment call used
/// when the VAD found nothing (or every region call failed outright).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptionMethod {
    #[default]
    RegionBased,
    WholeSegmentFallback,
}

/// The full result of transcribing one audio segment.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TranscriptionResult {
    pub segments: Vec<TimedSegment>,
    pub language: Option<String>,
    /// Duration of the source audio slice that was transcribed, in seconds.
    pub source_duration_s: f32,
    pub method: TranscriptionMethod,
}

/// A single subtitle display unit.
#[derive(Debug, Clone, Serialize)]
pub struct SubtitleCue {
    pub index: usize,
    pub start_s: f32,
    pub end_s: f32,
    pub lines: Vec<String>,
}

impl SubtitleCue {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Output subtitle container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    Srt,
    Vtt,
    Ass,
}

impl SubtitleFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SubtitleFormat::Srt => "srt",
            SubtitleFormat::Vtt => "vtt",
            SubtitleFormat::Ass => "ass",
        }
    }
}

/// Coarse stage labels used for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Decode,
    Segment,
    Transcribe,
    Optimize,
    Combine,
    Normalize,
    BuildSubtitles,
    Write,
}

/// A progress update emitted through the caller-supplied callback.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub stage: PipelineStage,
    pub percent: u8,
    pub message: Option<String>,
}

/// A non-fatal issue encountered while processing a region or segment.
///
/// These never escape as a public [`crate::error::Error`] — region- and
/// segment-local failures are expected to be recoverable.
#[derive(Debug, Clone, Serialize)]
pub struct StageWarning {
    pub stage: &'static str,
    pub reason: String,
}

/// Aggregate statistics collected over a single `process_file` run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobStats {
    pub stage_timings_ms: std::collections::BTreeMap<&'static str, u64>,
    pub segments_processed: usize,
    pub overlaps_detected: usize,
    pub words_removed: usize,
    pub regions_skipped: usize,
    pub segments_skipped: usize,
    pub warnings: Vec<StageWarning>,
}
