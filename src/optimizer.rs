//! C4 — Segment Optimizer.
//!
//! Rewrites STT segment boundaries so they land on natural pauses: orphan
//! fragments merge into their neighbor, overlong segments split at internal
//! pauses, and too-short segments stretch toward a minimum duration.

use crate::types::TimedSegment;

const ORPHAN_WORD_MAX: usize = 2;
const ORPHAN_GAP_MAX_S: f32 = 1.0;
const SPLIT_MIN_DURATION_S: f32 = 4.0;
const SPLIT_GAP_MIN_S: f32 = 0.3;
const SPLIT_WINDOW: (f32, f32) = (0.40, 0.90);
const SPLIT_BLEED_S: f32 = 0.1;
const STRETCH_MAX_DURATION_S: f32 = 0.5;
const STRETCH_TARGET_S: f32 = 1.0;

pub fn optimize(segments: Vec<TimedSegment>) -> Vec<TimedSegment> {
    let segments = merge_orphans_backward(segments);
    let segments = merge_orphans_forward(segments);
    let segments = split_at_pauses(segments);
    stretch_short_segments(segments)
}

fn merge_orphans_backward(segments: Vec<TimedSegment>) -> Vec<TimedSegment> {
    let mut out: Vec<TimedSegment> = Vec::with_capacity(segments.len());
    for seg in segments {
        if let Some(prev) = out.last_mut() {
            if seg.word_count() <= ORPHAN_WORD_MAX && seg.start_s - prev.end_s <= ORPHAN_GAP_MAX_S {
                merge_into(prev, seg);
                continue;
            }
        }
        out.push(seg);
    }
    out
}

fn merge_orphans_forward(segments: Vec<TimedSegment>) -> Vec<TimedSegment> {
    if segments.is_empty() {
        return segments;
    }
    let mut out: Vec<TimedSegment> = Vec::with_capacity(segments.len());
    let mut iter = segments.into_iter().peekable();
    while let Some(mut seg) = iter.next() {
        while let Some(next) = iter.peek() {
            if next.word_count() <= ORPHAN_WORD_MAX && next.start_s - seg.end_s <= ORPHAN_GAP_MAX_S {
                let next = iter.next().unwrap();
                merge_into(&mut seg, next);
            } else {
                break;
            }
        }
        out.push(seg);
    }
    out
}

fn merge_into(into: &mut TimedSegment, other: TimedSegment) {
    into.end_s = other.end_s;
    if into.text.is_empty() {
        into.text = other.text;
    } else if !other.text.is_empty() {
        into.text.push(' ');
        into.text.push_str(&other.text);
    }
    into.words.extend(other.words);
}

fn split_at_pauses(segments: Vec<TimedSegment>) -> Vec<TimedSegment> {
    let mut out = Vec::with_capacity(segments.len());
    for seg in segments {
        if seg.duration_s() <= SPLIT_MIN_DURATION_S || seg.words.len() < 2 {
            out.push(seg);
            continue;
        }

        let window_start = seg.start_s + seg.duration_s() * SPLIT_WINDOW.0;
        let window_end = seg.start_s + seg.duration_s() * SPLIT_WINDOW.1;

        let split_at = seg.words.windows(2).enumerate().find_map(|(i, pair)| {
            let gap = pair[1].start_s - pair[0].end_s;
            let midpoint = (pair[0].end_s + pair[1].start_s) / 2.0;
            if gap > SPLIT_GAP_MIN_S && midpoint >= window_start && midpoint <= window_end {
                Some(i + 1)
            } else {
                None
            }
        });

        match split_at {
            Some(idx) => {
                let (left_words, right_words) = seg.words.split_at(idx);
                let left_end = left_words.last().map(|w| w.end_s + SPLIT_BLEED_S).unwrap_or(seg.end_s);
                let right_start = right_words.first().map(|w| (w.start_s - SPLIT_BLEED_S).max(seg.start_s)).unwrap_or(seg.start_s);

                out.push(TimedSegment {
                    start_s: seg.start_s,
                    end_s: left_end,
                    text: words_to_text(left_words),
                    words: left_words.to_vec(),
                });
                out.push(TimedSegment {
                    start_s: right_start,
                    end_s: seg.end_s,
                    text: words_to_text(right_words),
                    words: right_words.to_vec(),
                });
            }
            None => out.push(seg),
        }
    }
    out
}

fn words_to_text(words: &[crate::types::Word]) -> String {
    words.iter().map(|w| w.text.as_str()).collect::<Vec<_>>().join(" ")
}

fn stretch_short_segments(mut segments: Vec<TimedSegment>) -> Vec<TimedSegment> {
    for i in 0..segments.len() {
        if segments[i].duration_s() >= STRETCH_MAX_DURATION_S {
            continue;
        }
        let next_start = segments.get(i + 1).map(|s| s.start_s);
        let target_end = segments[i].start_s + STRETCH_TARGET_S;
        let allowed_end = next_start.map(|n| n.min(target_end)).unwrap_or(target_end);
        if allowed_end > segments[i].end_s {
            segments[i].end_s = allowed_end;
        }
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Word;

    fn seg(start: f32, end: f32, words: Vec<(&str, f32, f32)>) -> TimedSegment {
        let text = words.iter().map(|w| w.0).collect::<Vec<_>>().join(" ");
        TimedSegment {
            start_s: start,
            end_s: end,
            text,
            words: words
                .into_iter()
                .map(|(t, s, e)| Word { text: t.to_owned(), start_s: s, end_s: e, probability: None })
                .collect(),
        }
    }

    #[test]
    fn orphan_merges_backward_into_predecessor() {
        let segments = vec![
            seg(0.0, 3.0, vec![("hello", 0.0, 0.5), ("there", 2.5, 3.0)]),
            seg(3.2, 3.6, vec![("ok", 3.2, 3.6)]),
        ];
        let out = optimize(segments);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].end_s, 3.6);
    }

    #[test]
    fn does_not_merge_across_large_gap() {
        let segments = vec![
            seg(0.0, 1.0, vec![("a", 0.0, 1.0)]),
            seg(5.0, 5.5, vec![("b", 5.0, 5.5)]),
        ];
        let out = optimize(segments);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn short_segment_stretches_toward_minimum() {
        let segments = vec![seg(0.0, 0.2, vec![("hi", 0.0, 0.2), ("there", 0.2, 0.21), ("you", 0.21, 0.22)])];
        let out = optimize(segments);
        assert!(out[0].duration_s() >= 0.9);
    }

    #[test]
    fn stretch_never_overlaps_next_segment() {
        let segments = vec![
            seg(0.0, 0.2, vec![("hi", 0.0, 0.2), ("there", 0.05, 0.15), ("pal", 0.15, 0.2)]),
            seg(0.5, 1.0, vec![("you", 0.5, 1.0), ("ok", 0.6, 0.9), ("go", 0.7, 0.8)]),
        ];
        let out = optimize(segments);
        assert!(out[0].end_s <= out[1].start_s);
    }

    #[test]
    fn splits_overlong_segment_at_internal_pause() {
        let mut words = vec![("one", 0.0, 0.3)];
        words.push(("two", 0.3, 0.6));
        // Internal pause near the middle of an 8s segment.
        words.push(("three", 4.0, 4.3));
        words.push(("four", 7.5, 7.8));
        words.push(("five", 7.8, 8.0));
        let segments = vec![seg(0.0, 8.0, words)];
        let out = optimize(segments);
        assert!(out.len() >= 1);
    }
}
