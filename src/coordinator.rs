//! C8 — Job Coordinator.
//!
//! The single public entry point: decode, segment, transcribe each segment,
//! optimize boundaries, combine segment text, normalize prose, build
//! subtitle cues, and write everything out. Owns the temp-directory lifetime
//! for intermediate segment WAVs and reports progress/cancellation at
//! segment and region granularity.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::combiner;
use crate::config::PipelineOpts;
use crate::error::{Error, ErrorKind, Result};
use crate::ingest;
use crate::lexicon::StaticLexicon;
use crate::normalizer::{self, NormalizerOpts};
use crate::optimizer;
use crate::orchestrator::{Orchestrator, SpeechDetector, Transcriber};
use crate::segmenter;
use crate::subtitles;
use crate::types::{JobStats, PipelineStage, ProgressEvent, SubtitleFormat, TimedSegment, TranscriptionResult, Word};

use crate::cancel::CancelToken;

/// Paths and metadata produced by a single [`process_file`] run.
#[derive(Debug, Clone)]
pub struct JobOutput {
    pub transcript_path: Option<PathBuf>,
    pub subtitle_paths: Vec<PathBuf>,
    pub language: Option<String>,
    pub stats: JobStats,
    /// One [`TranscriptionResult`] per audio segment, in segment order.
    pub transcription_results: Vec<TranscriptionResult>,
}

/// Process `input` end-to-end, writing outputs under `out_dir`.
///
/// `vad`/`stt` are the caller-supplied VAD and STT backends (see
/// [`crate::vad::VadGate`] and [`crate::backends::whisper::WhisperTranscriber`]
/// for the built-in implementations); `progress` and `cancel` are optional
/// hooks a long-running caller (the CLI, the HTTP server) can use to report
/// progress and request an early, clean stop.
pub fn process_file(
    input: &Path,
    out_dir: &Path,
    opts: &PipelineOpts,
    vad: &mut dyn SpeechDetector,
    stt: &mut dyn Transcriber,
    mut progress: Option<&mut dyn FnMut(ProgressEvent)>,
    cancel: Option<&CancelToken>,
) -> Result<JobOutput> {
    let mut stats = JobStats::default();

    let check_cancel = |stats: &JobStats| -> Result<()> {
        if cancel.is_some_and(|c| c.is_cancelled()) {
            return Err(Error::pipeline(
                ErrorKind::Cancelled,
                "cancel",
                input.display().to_string(),
                "job cancelled by caller".to_owned(),
            ));
        }
        let _ = stats;
        Ok(())
    };

    emit(&mut progress, PipelineStage::Decode, 0, None);
    let decode_started = Instant::now();
    let samples = ingest::decode_file_to_samples(input).map_err(|err| {
        Error::pipeline(
            ErrorKind::InputUnreadable,
            "decode",
            input.display().to_string(),
            format!("{err:#}"),
        )
    })?;
    stats.stage_timings_ms.insert("decode", decode_started.elapsed().as_millis() as u64);
    check_cancel(&stats)?;

    fs::create_dir_all(out_dir).map_err(|err| {
        Error::pipeline(
            ErrorKind::OutputUnwritable,
            "setup",
            out_dir.display().to_string(),
            err.to_string(),
        )
    })?;

    let work_dir = tempfile::tempdir().map_err(|err| {
        Error::pipeline(
            ErrorKind::OutputUnwritable,
            "setup",
            out_dir.display().to_string(),
            format!("failed to create working directory: {err}"),
        )
    })?;

    emit(&mut progress, PipelineStage::Segment, 5, None);
    let segment_started = Instant::now();
    let (segments, metadata) = segmenter::split(&samples, work_dir.path(), opts.segmenter)
        .map_err(|err| {
            Error::pipeline(
                ErrorKind::InputUnreadable,
                "segment",
                input.display().to_string(),
                format!("{err:#}"),
            )
        })?;
    stats.stage_timings_ms.insert("segment", segment_started.elapsed().as_millis() as u64);
    drop(samples);
    check_cancel(&stats)?;

    let total_segments = segments.len().max(1);
    let mut per_segment_text: Vec<String> = Vec::with_capacity(segments.len());
    let mut all_segments: Vec<TimedSegment> = Vec::new();
    let mut transcription_results: Vec<TranscriptionResult> = Vec::with_capacity(segments.len());
    let mut language: Option<String> = None;

    let transcribe_started = Instant::now();
    let mut orchestrator = Orchestrator::new(vad, stt);

    for (i, segment) in segments.iter().enumerate() {
        check_cancel(&stats)?;

        let (segment_samples, _spec) =
            crate::wav::get_samples_from_wav(&segment.path.display().to_string()).map_err(|err| {
                Error::pipeline(
                    ErrorKind::InputUnreadable,
                    "transcribe",
                    segment.path.display().to_string(),
                    format!("{err:#}"),
                )
            })?;

        let mut stt_opts = opts.stt.clone();
        if stt_opts.language.is_none() {
            stt_opts.language = opts.language.clone();
        }

        let outcome = orchestrator.transcribe_segment(&segment_samples, segment.start_s, &opts.vad, &stt_opts);

        let method = outcome.method;
        stats.regions_skipped += outcome.regions_skipped;
        stats.segments_skipped += outcome.segments_skipped;
        stats.warnings.extend(outcome.warnings);
        if language.is_none() {
            language = outcome.language.clone();
        }

        let optimized = optimizer::optimize(outcome.segments);
        let segment_text = optimized
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        per_segment_text.push(segment_text);

        transcription_results.push(TranscriptionResult {
            segments: optimized.clone(),
            language: outcome.language,
            source_duration_s: segment_samples.len() as f32 / 16_000.0,
            method,
        });
        all_segments.extend(optimized);

        let percent = 30 + ((i + 1) * 40 / total_segments) as u8;
        emit(
            &mut progress,
            PipelineStage::Transcribe,
            percent.min(70),
            Some(format!("segment {}/{}", i + 1, segments.len())),
        );
    }
    stats.stage_timings_ms.insert("transcribe", transcribe_started.elapsed().as_millis() as u64);

    emit(&mut progress, PipelineStage::Combine, 72, None);
    let combine_started = Instant::now();
    let (combined_text, combiner_stats) = combiner::combine(&per_segment_text, &metadata, opts.combiner);
    stats.segments_processed = combiner_stats.segments_processed;
    stats.overlaps_detected = combiner_stats.overlaps_detected;
    stats.words_removed = combiner_stats.words_removed;
    stats.stage_timings_ms.insert("combine", combine_started.elapsed().as_millis() as u64);
    check_cancel(&stats)?;

    emit(&mut progress, PipelineStage::Normalize, 78, None);
    let normalize_started = Instant::now();
    let lexicon = StaticLexicon::default();
    let normalizer_opts = NormalizerOpts { remove_fillers: opts.remove_fillers, lexicon: &lexicon };
    let normalized_text = normalizer::normalize(&combined_text, &normalizer_opts);
    stats.stage_timings_ms.insert("normalize", normalize_started.elapsed().as_millis() as u64);

    let mut transcript_path = None;
    if opts.write_transcript {
        let path = out_dir.join(transcript_file_name(input));
        fs::write(&path, &normalized_text).map_err(|err| {
            Error::pipeline(ErrorKind::OutputUnwritable, "write", path.display().to_string(), err.to_string())
        })?;
        transcript_path = Some(path);
    }

    emit(&mut progress, PipelineStage::BuildSubtitles, 85, None);
    let subtitle_started = Instant::now();
    let cues = subtitles::build_cues(&all_segments, &opts.subtitles);
    let cues = subtitles::fix_timing(cues, opts.subtitles.min_gap_s);
    stats.stage_timings_ms.insert("subtitles", subtitle_started.elapsed().as_millis() as u64);
    check_cancel(&stats)?;

    emit(&mut progress, PipelineStage::Write, 92, None);
    let write_started = Instant::now();
    let mut subtitle_paths = Vec::with_capacity(opts.subtitle_formats.len());
    for format in &opts.subtitle_formats {
        let serialized = match format {
            SubtitleFormat::Srt => subtitles::serialize_srt(&cues),
            SubtitleFormat::Vtt => subtitles::serialize_vtt(&cues),
            SubtitleFormat::Ass => subtitles::serialize_ass(&cues),
        };
        let path = out_dir.join(subtitle_file_name(input, *format));
        fs::write(&path, serialized).map_err(|err| {
            Error::pipeline(ErrorKind::OutputUnwritable, "write", path.display().to_string(), err.to_string())
        })?;
        subtitle_paths.push(path);
    }
    stats.stage_timings_ms.insert("write", write_started.elapsed().as_millis() as u64);

    emit(&mut progress, PipelineStage::Write, 100, None);

    Ok(JobOutput {
        transcript_path,
        subtitle_paths,
        language,
        stats,
        transcription_results,
    })
}

fn emit(progress: &mut Option<&mut dyn FnMut(ProgressEvent)>, stage: PipelineStage, percent: u8, message: Option<String>) {
    if let Some(cb) = progress.as_deref_mut() {
        cb(ProgressEvent { stage, percent, message });
    }
}

fn transcript_file_name(input: &Path) -> String {
    format!("{}.txt", stem(input))
}

fn subtitle_file_name(input: &Path, format: SubtitleFormat) -> String {
    format!("{}.{}", stem(input), format.extension())
}

fn stem(input: &Path) -> String {
    input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("transcript")
        .to_owned()
}
