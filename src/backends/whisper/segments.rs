use anyhow::{Context, Result};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperSegment, WhisperState};

use crate::config::SttOpts;
use crate::orchestrator::RawTranscription;
use crate::token::centiseconds_to_seconds;
use crate::types::{TimedSegment, Word};

use super::token::tokens_from_segment;

pub(super) fn transcribe(
    ctx: &WhisperContext,
    opts: &SttOpts,
    samples: &[f32],
) -> Result<RawTranscription> {
    let state = run_whisper_full(ctx, opts, samples)?;

    let mut segments = Vec::new();
    for whisper_segment in state.as_iter() {
        segments.push(to_timed_segment(whisper_segment)?);
    }

    Ok(RawTranscription {
        language: opts.language.clone(),
        segments,
    })
}

fn to_timed_segment(segment: WhisperSegment) -> Result<TimedSegment> {
    let text = segment
        .to_str()
        .context("failed to get segment text")?
        .to_owned();

    let tokens = tokens_from_segment(&segment)?;
    let words: Vec<Word> = tokens
        .iter()
        .filter(|t| !is_special_token(&t.text) && (t.start_seconds > 0.0 || t.end_seconds > 0.0))
        .map(|t| Word {
            text: t.text.trim().to_owned(),
            start_s: t.start_seconds,
            end_s: t.end_seconds,
            probability: Some(t.probability),
        })
        .filter(|w| !w.text.is_empty())
        .collect();

    let (start_s, end_s) = segment_seconds_from_words_or_fallback(&segment, &words);

    Ok(TimedSegment {
        start_s,
        end_s,
        text,
        words,
    })
}

fn is_special_token(text: &str) -> bool {
    text.starts_with("[_") && text.ends_with("_]")
}

// Prefer word-derived timing when available to avoid long segments that
// include leading/trailing silence; fall back to whisper's own
// segment-level timestamps when word timing is unavailable.
fn segment_seconds_from_words_or_fallback(segment: &WhisperSegment, words: &[Word]) -> (f32, f32) {
    if let (Some(first), Some(last)) = (words.first(), words.last()) {
        if last.end_s >= first.start_s {
            return (first.start_s, last.end_s);
        }
    }
    (
        centiseconds_to_seconds(segment.start_timestamp()),
        centiseconds_to_seconds(segment.end_timestamp()),
    )
}

/// Build decode parameters tuned to suppress the repetition loops Whisper
/// tends to fall into on long, context-bleeding inputs: greedy-leaning
/// temperature, no cross-call context, no initial prompt.
fn build_full_params(opts: &SttOpts) -> FullParams<'_, '_> {
    let mut params = FullParams::new(SamplingStrategy::BeamSearch {
        beam_size: 5,
        patience: 1.0,
    });

    params.set_n_threads(num_cpus::get() as i32);
    params.set_translate(opts.translate_to_english);
    params.set_language(opts.language.as_deref());

    // Disables cross-region context bleed, the single biggest contributor to
    // repetition loops when segments are transcribed independently.
    params.set_no_context(true);
    params.set_single_segment(false);

    params.set_temperature(0.0);
    params.set_logprob_thold(-1.0);
    params.set_entropy_thold(2.4);
    params.set_suppress_blank(true);
    params.set_suppress_nst(true);

    params.set_print_progress(false);
    params.set_print_special(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);

    params.set_token_timestamps(true);

    params
}

fn run_whisper_full(ctx: &WhisperContext, opts: &SttOpts, samples: &[f32]) -> Result<WhisperState> {
    let params = build_full_params(opts);

    let mut state = ctx
        .create_state()
        .context("failed to create whisper state")?;

    state
        .full(params, samples)
        .context("failed to run whisper full()")?;

    Ok(state)
}
