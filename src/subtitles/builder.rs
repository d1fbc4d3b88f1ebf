//! Word-grouping algorithm: turns a flat word stream into display-bounded cues.
//!
//! Grounded on the original implementation's `WordBasedSubtitleGenerator`
//! (`subtitles/word_based_subtitle_generator.py`). A break is forced whenever
//! a cue would exceed the word-count, duration, character, or inter-word-gap
//! limits; cue timing is word-anchored with a short lead-in and trailing hang
//! time, and long lines are wrapped at the word boundary closest to the
//! midpoint.

use crate::config::SubtitleOpts;
use crate::subtitles::timing::estimate_cue_duration;
use crate::types::{SubtitleCue, TimedSegment, Word};

const ORPHAN_WORD_MAX: usize = 3;
const ORPHAN_BACKWARD_GAP_S: f32 = 1.0;
const ORPHAN_FORWARD_GAP_S: f32 = 1.5;
const LEAD_IN_S: f32 = 0.1;
const HANG_TIME_S: f32 = 0.3;

/// Builds subtitle cues from the full, time-ordered segment stream for a
/// file (already stitched together across every audio segment/region).
///
/// Segments with word-level timing are grouped word-by-word; a segment with
/// no word timing (the STT backend returned plain text only) becomes its own
/// cue with a duration estimated from speaking/reading rate.
pub fn build_cues(segments: &[TimedSegment], opts: &SubtitleOpts) -> Vec<SubtitleCue> {
    if segments.is_empty() {
        return Vec::new();
    }

    let mut ordered = segments.to_vec();
    ordered.sort_by(|a, b| a.start_s.partial_cmp(&b.start_s).unwrap());
    let merged = merge_orphan_segments(ordered);

    let mut cues: Vec<SubtitleCue> = Vec::new();
    let mut pending: Vec<Word> = Vec::new();

    for segment in &merged {
        if segment.words.is_empty() {
            if segment.text.trim().is_empty() {
                continue;
            }
            flush_pending(&mut pending, opts, &mut cues);
            cues.push(estimate_cue(segment, opts));
        } else {
            pending.extend(segment.words.iter().cloned());
        }
    }
    flush_pending(&mut pending, opts, &mut cues);

    cues.sort_by(|a, b| a.start_s.partial_cmp(&b.start_s).unwrap());
    for (i, cue) in cues.iter_mut().enumerate() {
        cue.index = i + 1;
    }
    cues
}

fn flush_pending(pending: &mut Vec<Word>, opts: &SubtitleOpts, cues: &mut Vec<SubtitleCue>) {
    if pending.is_empty() {
        return;
    }
    cues.extend(cues_from_words(&std::mem::take(pending), opts));
}

fn cues_from_words(words: &[Word], opts: &SubtitleOpts) -> Vec<SubtitleCue> {
    let groups = group_words(words, opts);
    let mut cues = Vec::with_capacity(groups.len());

    for (i, group) in groups.iter().enumerate() {
        let first = group.first().expect("group is never empty");
        let last = group.last().expect("group is never empty");

        let prev_end = i
            .checked_sub(1)
            .and_then(|p| groups.get(p))
            .and_then(|g| g.last())
            .map(|w| w.end_s);
        let next_start = groups.get(i + 1).and_then(|g| g.first()).map(|w| w.start_s);

        let mut start_s = first.start_s - LEAD_IN_S;
        if let Some(prev_end) = prev_end {
            start_s = start_s.max(prev_end + opts.min_gap_s);
        }
        start_s = start_s.max(0.0);

        let mut end_s = last.end_s + HANG_TIME_S;
        if let Some(next_start) = next_start {
            end_s = end_s.min(next_start - opts.min_gap_s);
        }
        if end_s < start_s + opts.min_gap_s {
            end_s = start_s + opts.min_gap_s;
        }

        let text: Vec<&str> = group.iter().map(|w| w.text.as_str()).collect();
        let lines = layout_lines(&text, opts.max_chars_per_line);

        cues.push(SubtitleCue { index: 0, start_s, end_s, lines });
    }

    cues
}

/// Synthesizes a single cue for a segment that has no word-level timing,
/// using the speaking/reading-rate estimator. Only ever extends past the
/// segment's own reported end, never contracts it; the caller-side
/// `fix_timing` pass still clamps against whatever cue follows.
fn estimate_cue(segment: &TimedSegment, opts: &SubtitleOpts) -> SubtitleCue {
    let text: Vec<&str> = segment.text.split_whitespace().collect();
    let lines = layout_lines(&text, opts.max_chars_per_line);
    let two_lines = lines.len() > 1;
    let duration = estimate_cue_duration(segment.word_count(), two_lines, opts);

    let start_s = segment.start_s.max(0.0);
    let end_s = (start_s + duration).max(segment.end_s);

    SubtitleCue { index: 0, start_s, end_s, lines }
}

fn group_words<'a>(words: &'a [Word], opts: &SubtitleOpts) -> Vec<Vec<&'a Word>> {
    let mut groups: Vec<Vec<&Word>> = Vec::new();
    let mut current: Vec<&Word> = Vec::new();
    let mut current_chars = 0usize;

    for word in words {
        let would_chars = current_chars + word.text.len() + if current.is_empty() { 0 } else { 1 };
        let gap_from_prev = current.last().map(|w: &&Word| word.start_s - w.end_s);

        let forced_break = !current.is_empty()
            && (current.len() >= opts.max_words_per_cue
                || (word.end_s - current[0].start_s) > opts.max_cue_s
                || would_chars > opts.max_chars_per_line * 2
                || gap_from_prev.is_some_and(|gap| gap > opts.max_gap_s));

        if forced_break {
            groups.push(std::mem::take(&mut current));
            current_chars = 0;
        }

        current_chars += word.text.len() + if current.is_empty() { 0 } else { 1 };
        current.push(word);
    }

    if !current.is_empty() {
        groups.push(current);
    }

    groups
}

/// Pre-pass over the full per-file segment stream, before any word-grouping
/// runs: folds a segment with at most [`ORPHAN_WORD_MAX`] words into a close
/// neighbor, trying the predecessor first and then the successor. Distinct
/// from the optimizer's (C4) per-audio-segment orphan merge: by the time this
/// runs, segments from different audio segments/regions have already been
/// concatenated, so short fragments can appear at join seams C4 never saw.
fn merge_orphan_segments(segments: Vec<TimedSegment>) -> Vec<TimedSegment> {
    if segments.is_empty() {
        return segments;
    }

    let mut backward: Vec<TimedSegment> = Vec::with_capacity(segments.len());
    for seg in segments {
        if let Some(prev) = backward.last_mut() {
            if seg.word_count() <= ORPHAN_WORD_MAX && seg.start_s - prev.end_s < ORPHAN_BACKWARD_GAP_S {
                merge_into_back(prev, seg);
                continue;
            }
        }
        backward.push(seg);
    }

    let mut forward: Vec<TimedSegment> = Vec::with_capacity(backward.len());
    let mut iter = backward.into_iter().peekable();
    while let Some(seg) = iter.next() {
        if seg.word_count() <= ORPHAN_WORD_MAX {
            if let Some(next) = iter.peek() {
                if next.start_s - seg.end_s < ORPHAN_FORWARD_GAP_S {
                    let mut next = iter.next().unwrap();
                    merge_into_front(seg, &mut next);
                    forward.push(next);
                    continue;
                }
            }
        }
        forward.push(seg);
    }

    forward
}

fn merge_into_back(into: &mut TimedSegment, other: TimedSegment) {
    into.end_s = other.end_s;
    if into.text.is_empty() {
        into.text = other.text;
    } else if !other.text.is_empty() {
        into.text.push(' ');
        into.text.push_str(&other.text);
    }
    into.words.extend(other.words);
}

fn merge_into_front(orphan: TimedSegment, into: &mut TimedSegment) {
    into.start_s = orphan.start_s;
    if !orphan.text.is_empty() {
        if into.text.is_empty() {
            into.text = orphan.text;
        } else {
            into.text = format!("{} {}", orphan.text, into.text);
        }
    }
    let mut words = orphan.words;
    words.extend(std::mem::take(&mut into.words));
    into.words = words;
}

/// Splits word tokens into at most two lines, breaking at the word boundary
/// whose split minimizes the length difference between the two lines,
/// subject to both lines fitting within `max_chars_per_line`. Falls back to
/// a single (possibly over-length) line when no split satisfies that, e.g.
/// one token longer than the limit on its own, or too few break points.
fn layout_lines(words: &[&str], max_chars_per_line: usize) -> Vec<String> {
    let joined = words.join(" ");
    if joined.len() <= max_chars_per_line {
        return vec![joined];
    }

    let midpoint = joined.len() / 2;
    let mut best_break: Option<usize> = None;
    let mut best_distance = usize::MAX;

    for split_at in 1..words.len() {
        let first_line = words[..split_at].join(" ");
        let second_line = words[split_at..].join(" ");
        if first_line.len() > max_chars_per_line || second_line.len() > max_chars_per_line {
            continue;
        }
        let distance = first_line.len().abs_diff(midpoint);
        if distance < best_distance {
            best_distance = distance;
            best_break = Some(split_at);
        }
    }

    match best_break {
        Some(split_at) => vec![words[..split_at].join(" "), words[split_at..].join(" ")],
        None => vec![joined],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, start: f32, end: f32) -> Word {
        Word { text: text.to_owned(), start_s: start, end_s: end, probability: Some(0.9) }
    }

    fn timed(start: f32, end: f32, words: Vec<Word>) -> TimedSegment {
        let text = words.iter().map(|w| w.text.as_str()).collect::<Vec<_>>().join(" ");
        TimedSegment { start_s: start, end_s: end, text, words }
    }

    #[test]
    fn empty_input_yields_no_cues() {
        assert!(build_cues(&[], &SubtitleOpts::default()).is_empty());
    }

    #[test]
    fn short_run_becomes_a_single_cue() {
        let words = vec![word("hello", 0.0, 0.3), word("world", 0.4, 0.8)];
        let cues = build_cues(&[timed(0.0, 0.8, words)], &SubtitleOpts::default());
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text(), "hello world");
    }

    #[test]
    fn cue_start_gets_lead_in_and_end_gets_hang_time() {
        let words = vec![word("hello", 1.0, 1.3)];
        let cues = build_cues(&[timed(1.0, 1.3, words)], &SubtitleOpts::default());
        assert!(cues[0].start_s < 1.0);
        assert!(cues[0].end_s > 1.3);
    }

    #[test]
    fn large_gap_forces_a_new_cue() {
        let opts = SubtitleOpts::default();
        let words = vec![
            word("hello", 0.0, 0.3),
            word("there", 10.0, 10.3),
            word("friend", 10.4, 10.8),
        ];
        let cues = build_cues(&[timed(0.0, 10.8, words)], &opts);
        assert!(cues.len() >= 2);
    }

    #[test]
    fn word_count_limit_forces_a_break() {
        let mut opts = SubtitleOpts::default();
        opts.max_words_per_cue = 3;
        let words: Vec<Word> = (0..7)
            .map(|i| word("word", i as f32 * 0.3, i as f32 * 0.3 + 0.2))
            .collect();
        let end = words.last().unwrap().end_s;
        let cues = build_cues(&[timed(0.0, end, words)], &opts);
        assert!(cues.len() >= 2);
    }

    #[test]
    fn long_line_wraps_into_two_lines() {
        let words: Vec<Word> = "the quick brown fox jumps over the lazy dog today in the park"
            .split_whitespace()
            .enumerate()
            .map(|(i, w)| word(w, i as f32 * 0.3, i as f32 * 0.3 + 0.2))
            .collect();
        let end = words.last().unwrap().end_s;
        let mut opts = SubtitleOpts::default();
        opts.max_words_per_cue = 20;
        opts.max_cue_s = 100.0;
        let cues = build_cues(&[timed(0.0, end, words)], &opts);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].lines.len(), 2);
    }

    #[test]
    fn cues_never_overlap() {
        let words = vec![
            word("one", 0.0, 0.3),
            word("two", 0.35, 0.6),
            word("three", 5.0, 5.3),
        ];
        let cues = build_cues(&[timed(0.0, 5.3, words)], &SubtitleOpts::default());
        for pair in cues.windows(2) {
            assert!(pair[0].end_s <= pair[1].start_s);
        }
    }

    #[test]
    fn layout_lines_falls_back_to_one_line_when_no_split_fits() {
        // 43 one-letter words plus one two-letter word: only one candidate
        // break point, and it still leaves an over-length first line.
        let mut words: Vec<&str> = vec!["a"; 43];
        words.push("bb");
        let lines = layout_lines(&words, 42);
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn layout_lines_splits_when_a_valid_break_exists() {
        let words: Vec<&str> = "one two three four five six seven eight".split_whitespace().collect();
        let lines = layout_lines(&words, 20);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].len() <= 20);
        assert!(lines[1].len() <= 20);
    }

    #[test]
    fn orphan_segment_merges_backward_before_grouping() {
        let opts = SubtitleOpts::default();
        let segments = vec![
            timed(0.0, 0.6, vec![word("hello", 0.0, 0.3), word("there", 0.35, 0.6)]),
            timed(0.9, 1.2, vec![word("ok", 0.9, 1.2)]),
        ];
        let cues = build_cues(&segments, &opts);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text(), "hello there ok");
    }

    #[test]
    fn orphan_segment_merges_forward_when_closer_to_successor() {
        let opts = SubtitleOpts::default();
        let segments = vec![
            timed(0.0, 0.3, vec![word("hi", 0.0, 0.3)]),
            timed(0.35, 1.55, vec![
                word("friend", 0.35, 0.65),
                word("how", 0.65, 0.95),
                word("are", 0.95, 1.25),
                word("you", 1.25, 1.55),
            ]),
        ];
        let cues = build_cues(&segments, &opts);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text(), "hi friend how are you");
    }

    #[test]
    fn segment_without_word_timing_gets_an_estimated_cue() {
        let segments = vec![TimedSegment {
            start_s: 0.0,
            end_s: 0.2,
            text: "a whole sentence with no word timestamps at all".to_owned(),
            words: Vec::new(),
        }];
        let cues = build_cues(&segments, &SubtitleOpts::default());
        assert_eq!(cues.len(), 1);
        assert!(cues[0].end_s - cues[0].start_s >= SubtitleOpts::default().min_cue_s);
    }
}
