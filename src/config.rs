//! Layered configuration for the transcription pipeline.
//!
//! The library itself only knows about [`PipelineOpts`] and the stage-level
//! `*Opts` structs it's built from; a config file is purely a CLI concern
//! (see `bin/wordline-cli.rs`), consistent with the library remaining usable
//! outside of a CLI context.

use crate::types::SubtitleFormat;

/// Parameters controlling overlap detection in the text combiner (C5).
#[derive(Debug, Clone, Copy)]
pub struct CombinerOpts {
    pub min_overlap_words: usize,
    pub similarity_threshold: f32,
    pub max_overlap_search_words: usize,
}

impl Default for CombinerOpts {
    fn default() -> Self {
        Self {
            min_overlap_words: 3,
            similarity_threshold: 0.80,
            max_overlap_search_words: 50,
        }
    }
}

/// Parameters controlling the VAD gate (C2).
#[derive(Debug, Clone, Copy)]
pub struct VadOpts {
    pub threshold: f32,
    pub min_speech_ms: u32,
    pub min_silence_ms: u32,
    pub max_gap_merge_s: f32,
}

impl Default for VadOpts {
    fn default() -> Self {
        Self {
            threshold: 0.30,
            min_speech_ms: 100,
            min_silence_ms: 300,
            max_gap_merge_s: 0.5,
        }
    }
}

/// Parameters controlling the repetition scrubber inside the orchestrator (C3).
#[derive(Debug, Clone, Copy)]
pub struct RepetitionScrubberOpts {
    pub window_min: usize,
    pub window_max: usize,
    pub max_repeats: usize,
}

impl Default for RepetitionScrubberOpts {
    fn default() -> Self {
        Self {
            window_min: 2,
            window_max: 5,
            max_repeats: 3,
        }
    }
}

/// Parameters controlling the transcription orchestrator (C3).
#[derive(Debug, Clone)]
pub struct SttOpts {
    pub language: Option<String>,
    pub translate_to_english: bool,
    pub region_pad_s: f32,
    pub repetition: RepetitionScrubberOpts,
}

impl Default for SttOpts {
    fn default() -> Self {
        Self {
            language: None,
            translate_to_english: false,
            region_pad_s: 0.2,
            repetition: RepetitionScrubberOpts::default(),
        }
    }
}

/// Parameters controlling segment splitting (C1).
#[derive(Debug, Clone, Copy)]
pub struct SegmenterOpts {
    pub max_segment_bytes: u64,
    pub overlap_s: f32,
    pub min_segment_s: f32,
}

impl Default for SegmenterOpts {
    fn default() -> Self {
        Self {
            max_segment_bytes: 25 * 1024 * 1024,
            overlap_s: 2.5,
            min_segment_s: 30.0,
        }
    }
}

/// Parameters controlling the subtitle builder (C7).
#[derive(Debug, Clone, Copy)]
pub struct SubtitleOpts {
    pub max_chars_per_line: usize,
    pub max_words_per_cue: usize,
    pub max_cue_s: f32,
    pub min_cue_s: f32,
    pub max_gap_s: f32,
    pub min_gap_s: f32,
    pub speaking_wpm: f32,
    pub reading_wpm: f32,
}

impl Default for SubtitleOpts {
    fn default() -> Self {
        Self {
            max_chars_per_line: 42,
            max_words_per_cue: 10,
            max_cue_s: 7.0,
            min_cue_s: 1.0,
            max_gap_s: 0.30,
            min_gap_s: 0.05,
            speaking_wpm: 140.0,
            reading_wpm: 160.0,
        }
    }
}

/// Top-level options accepted by [`crate::coordinator::process_file`].
#[derive(Debug, Clone)]
pub struct PipelineOpts {
    pub language: Option<String>,
    pub write_transcript: bool,
    pub subtitle_formats: Vec<SubtitleFormat>,
    pub remove_fillers: bool,
    pub model_hint: Option<String>,
    pub segmenter: SegmenterOpts,
    pub vad: VadOpts,
    pub stt: SttOpts,
    pub combiner: CombinerOpts,
    pub subtitles: SubtitleOpts,
}

impl Default for PipelineOpts {
    fn default() -> Self {
        Self {
            language: None,
            write_transcript: true,
            subtitle_formats: vec![SubtitleFormat::Srt],
            remove_fillers: true,
            model_hint: None,
            segmenter: SegmenterOpts::default(),
            vad: VadOpts::default(),
            stt: SttOpts::default(),
            combiner: CombinerOpts::default(),
            subtitles: SubtitleOpts::default(),
        }
    }
}
