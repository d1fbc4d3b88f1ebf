//! C3 — Transcription Orchestrator.
//!
//! Runs the VAD gate (C2) over one audio segment, transcribes each padded
//! speech region independently with anti-repetition decode parameters, and
//! reprojects every timestamp back onto the original audio timeline. Falls
//! back to a single whole-segment call when VAD finds nothing or a region
//! call fails outright.

use anyhow::Result as AnyResult;

use crate::config::{RepetitionScrubberOpts, SttOpts, VadOpts};
use crate::types::{SpeechRegion, StageWarning, TimedSegment, TranscriptionMethod, Word};

/// External speech-to-text collaborator, specified only by interface.
pub trait Transcriber {
    fn transcribe(&mut self, samples_16k_mono: &[f32], opts: &SttOpts) -> AnyResult<RawTranscription>;
}

/// External VAD collaborator, specified only by interface.
pub trait SpeechDetector {
    fn detect(&mut self, samples_16k_mono: &[f32], opts: &VadOpts) -> AnyResult<Vec<SpeechRegion>>;
}

/// Optional external language-identification collaborator. The core never
/// implements language detection itself; this seam exists only so a caller
/// can plug in a dedicated detector ahead of the first STT call rather than
/// waiting on whatever language the STT backend reports back.
pub trait LanguageHint {
    fn detect(&self, samples_16k_mono: &[f32]) -> Option<String>;
}

/// Default [`LanguageHint`]: defers entirely to the STT backend's own
/// reported language, detecting nothing itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLanguageHint;

impl LanguageHint for NoopLanguageHint {
    fn detect(&self, _samples_16k_mono: &[f32]) -> Option<String> {
        None
    }
}

impl SpeechDetector for crate::vad::VadGate {
    fn detect(&mut self, samples_16k_mono: &[f32], opts: &VadOpts) -> AnyResult<Vec<SpeechRegion>> {
        crate::vad::VadGate::detect(self, samples_16k_mono, opts)
    }
}

/// Raw output from a [`Transcriber`] call, with timestamps relative to the
/// slice that was transcribed (not yet reprojected onto any larger timeline).
#[derive(Debug, Clone, Default)]
pub struct RawTranscription {
    pub language: Option<String>,
    pub segments: Vec<TimedSegment>,
}

/// The orchestrator's output for one audio segment, plus the warnings
/// accumulated while producing it.
#[derive(Debug, Clone, Default)]
pub struct OrchestratorOutcome {
    pub segments: Vec<TimedSegment>,
    pub language: Option<String>,
    pub warnings: Vec<StageWarning>,
    pub regions_skipped: usize,
    pub segments_skipped: usize,
    pub method: TranscriptionMethod,
}

pub struct Orchestrator<'a> {
    vad: &'a mut dyn SpeechDetector,
    stt: &'a mut dyn Transcriber,
}

impl<'a> Orchestrator<'a> {
    pub fn new(vad: &'a mut dyn SpeechDetector, stt: &'a mut dyn Transcriber) -> Self {
        Self { vad, stt }
    }

    /// Transcribe one audio segment's samples (16 kHz mono), where
    /// `segment_start_s` is the segment's own offset on the original audio
    /// timeline (see [`crate::types::AudioSegment::start_s`]).
    pub fn transcribe_segment(
        &mut self,
        samples: &[f32],
        segment_start_s: f32,
        vad_opts: &VadOpts,
        stt_opts: &SttOpts,
    ) -> OrchestratorOutcome {
        let mut outcome = OrchestratorOutcome::default();

        let regions = match self.vad.detect(samples, vad_opts) {
            Ok(regions) => regions,
            Err(err) => {
                outcome.warnings.push(StageWarning {
                    stage: "vad",
                    reason: format!("{err:#}"),
                });
                Vec::new()
            }
        };

        if regions.is_empty() {
            return self.whole_segment_fallback(samples, segment_start_s, stt_opts, outcome);
        }

        let pad_s = stt_opts.region_pad_s;
        let clamp_end_s = samples.len() as f32 / 16_000.0;
        let mut any_region_succeeded = false;
        let mut pinned_language: Option<String> = stt_opts.language.clone();

        for region in &regions {
            let padded = region.padded(pad_s, clamp_end_s);
            let start_idx = (padded.start_s * 16_000.0).round() as usize;
            let end_idx = ((padded.end_s * 16_000.0).round() as usize).min(samples.len());
            if start_idx >= end_idx {
                outcome.regions_skipped += 1;
                continue;
            }

            let mut region_opts = stt_opts.clone();
            region_opts.language = pinned_language.clone();

            match self.stt.transcribe(&samples[start_idx..end_idx], &region_opts) {
                Ok(raw) => {
                    any_region_succeeded = true;
                    if pinned_language.is_none() {
                        pinned_language = raw.language.clone();
                    }
                    // Offset by the *padded* region start plus the segment
                    // start: the region itself is expressed in padded-slice
                    // coordinates (the slice we actually handed to the STT
                    // backend started at `padded.start_s`), not the
                    // VAD-reported region start.
                    for mut seg in raw.segments {
                        reproject(&mut seg, padded.start_s + segment_start_s);
                        outcome.segments.push(seg);
                    }
                }
                Err(err) => {
                    outcome.regions_skipped += 1;
                    outcome.warnings.push(StageWarning {
                        stage: "region",
                        reason: format!("{err:#}"),
                    });
                }
            }
        }

        if !any_region_succeeded {
            return self.whole_segment_fallback(samples, segment_start_s, stt_opts, outcome);
        }

        outcome.language = pinned_language;
        scrub_repetition(&mut outcome.segments, &stt_opts.repetition);
        outcome
    }

    fn whole_segment_fallback(
        &mut self,
        samples: &[f32],
        segment_start_s: f32,
        stt_opts: &SttOpts,
        mut outcome: OrchestratorOutcome,
    ) -> OrchestratorOutcome {
        outcome.method = TranscriptionMethod::WholeSegmentFallback;
        if samples.is_empty() {
            return outcome;
        }

        match self.stt.transcribe(samples, stt_opts) {
            Ok(raw) => {
                outcome.language = raw.language;
                for mut seg in raw.segments {
                    reproject(&mut seg, segment_start_s);
                    outcome.segments.push(seg);
                }
                scrub_repetition(&mut outcome.segments, &stt_opts.repetition);
            }
            Err(err) => {
                outcome.segments_skipped += 1;
                outcome.warnings.push(StageWarning {
                    stage: "segment",
                    reason: format!("{err:#}"),
                });
            }
        }

        outcome
    }
}

fn reproject(segment: &mut TimedSegment, offset_s: f32) {
    segment.start_s += offset_s;
    segment.end_s += offset_s;
    for word in &mut segment.words {
        word.start_s += offset_s;
        word.end_s += offset_s;
    }
}

/// Common closing artifacts Whisper tends to hallucinate on trailing
/// silence; stripped only when they form the *entire* final sentence.
const CLOSING_ARTIFACTS: &[&str] = &[
    "thank you.",
    "thanks for watching.",
    "thank you for watching.",
];

/// Collapse runs where a window of `k` words repeats more than `max_repeats`
/// times consecutively, keeping a single copy. Operates in place on the word
/// stream of each segment; segments with no word timing are left untouched
/// (repetition without word timing can't be safely re-timed).
fn scrub_repetition(segments: &mut [TimedSegment], opts: &RepetitionScrubberOpts) {
    for segment in segments.iter_mut() {
        if segment.words.is_empty() {
            continue;
        }
        segment.words = dedupe_repeated_windows(std::mem::take(&mut segment.words), opts);
        segment.text = segment
            .words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
    }

    if let Some(last) = segments.last_mut() {
        strip_closing_artifact(last);
    }
}

fn dedupe_repeated_windows(words: Vec<Word>, opts: &RepetitionScrubberOpts) -> Vec<Word> {
    let normalized: Vec<String> = words.iter().map(|w| normalize_for_compare(&w.text)).collect();
    let mut out: Vec<Word> = Vec::with_capacity(words.len());
    let mut i = 0;

    'outer: while i < words.len() {
        for k in (opts.window_min..=opts.window_max.min(words.len() - i)).rev() {
            if k == 0 || i + k > normalized.len() {
                continue;
            }
            let window = &normalized[i..i + k];
            let mut repeats = 1;
            let mut j = i + k;
            while j + k <= normalized.len() && normalized[j..j + k] == *window {
                repeats += 1;
                j += k;
            }
            if repeats > opts.max_repeats {
                out.extend_from_slice(&words[i..i + k]);
                i = j;
                continue 'outer;
            }
        }
        out.push(words[i].clone());
        i += 1;
    }

    out
}

fn normalize_for_compare(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect()
}

fn strip_closing_artifact(segment: &mut TimedSegment) {
    let normalized = segment.text.trim().to_lowercase();
    if CLOSING_ARTIFACTS.iter().any(|a| normalized == *a) {
        segment.text.clear();
        segment.words.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SpeechRegion;

    struct FixedVad(Vec<SpeechRegion>);
    impl SpeechDetector for FixedVad {
        fn detect(&mut self, _samples: &[f32], _opts: &VadOpts) -> AnyResult<Vec<SpeechRegion>> {
            Ok(self.0.clone())
        }
    }

    struct StubStt {
        text: &'static str,
        words: Vec<(&'static str, f32, f32)>,
    }
    impl Transcriber for StubStt {
        fn transcribe(&mut self, _samples: &[f32], _opts: &SttOpts) -> AnyResult<RawTranscription> {
            Ok(RawTranscription {
                language: Some("en".to_owned()),
                segments: vec![TimedSegment {
                    start_s: self.words.first().map(|w| w.1).unwrap_or(0.0),
                    end_s: self.words.last().map(|w| w.2).unwrap_or(0.0),
                    text: self.text.to_owned(),
                    words: self
                        .words
                        .iter()
                        .map(|(t, s, e)| Word {
                            text: (*t).to_owned(),
                            start_s: *s,
                            end_s: *e,
                            probability: Some(1.0),
                        })
                        .collect(),
                }],
            })
        }
    }

    #[test]
    fn empty_regions_falls_back_to_whole_segment() {
        let mut vad = FixedVad(Vec::new());
        let mut stt = StubStt {
            text: "hello world",
            words: vec![("hello", 0.0, 0.3), ("world", 0.3, 0.6)],
        };
        let mut orch = Orchestrator::new(&mut vad, &mut stt);
        let samples = vec![0.0_f32; 16_000];
        let outcome = orch.transcribe_segment(&samples, 10.0, &VadOpts::default(), &SttOpts::default());
        assert_eq!(outcome.segments.len(), 1);
        assert!((outcome.segments[0].start_s - 10.0).abs() < 0.01);
    }

    #[test]
    fn region_offsets_are_applied() {
        let mut vad = FixedVad(vec![SpeechRegion { start_s: 1.0, end_s: 2.0 }]);
        let mut stt = StubStt {
            text: "hi",
            words: vec![("hi", 0.0, 0.2)],
        };
        let mut orch = Orchestrator::new(&mut vad, &mut stt);
        let samples = vec![0.0_f32; 16_000 * 3];
        let outcome = orch.transcribe_segment(&samples, 100.0, &VadOpts::default(), &SttOpts::default());
        assert_eq!(outcome.segments.len(), 1);
        // region starts at 1.0s, padded by default 0.2s -> 0.8s, plus the
        // 100.0s segment offset.
        assert!(outcome.segments[0].start_s > 100.0);
    }

    #[test]
    fn repetition_scrubber_collapses_long_runs() {
        let mut words = Vec::new();
        for i in 0..12 {
            words.push(Word {
                text: "thank".to_owned(),
                start_s: i as f32,
                end_s: i as f32 + 0.5,
                probability: Some(1.0),
            });
        }
        let mut segments = vec![TimedSegment {
            start_s: 0.0,
            end_s: 12.0,
            text: "thank thank thank ...".to_owned(),
            words,
        }];
        scrub_repetition(&mut segments, &RepetitionScrubberOpts::default());
        assert!(segments[0].words.len() < 12);
    }

    #[test]
    fn closing_artifact_is_stripped_when_it_is_the_whole_segment() {
        let mut segments = vec![TimedSegment {
            start_s: 0.0,
            end_s: 1.0,
            text: "Thank you for watching.".to_owned(),
            words: vec![],
        }];
        scrub_repetition(&mut segments, &RepetitionScrubberOpts::default());
        assert!(segments[0].text.is_empty());
    }
}
