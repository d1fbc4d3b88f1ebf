//! C5 — Text Combiner.
//!
//! Merges per-segment transcripts by detecting the overlap region at the
//! boundary of two adjacent segments and dropping the duplicated head.
//! Grounded on the original implementation's `TextCombiner`
//! (`post_processing/combiner.py`), which scores candidate overlap lengths
//! with `difflib.SequenceMatcher.ratio()`; here that's a local
//! longest-common-subsequence ratio over the same normalized (lowercased,
//! punctuation-stripped) text, with `strsim`'s Levenshtein distance used
//! first as a cheap reject.

use crate::config::CombinerOpts;
use crate::types::SplitMetadata;

#[derive(Debug, Clone, Default)]
pub struct CombinerStats {
    pub segments_processed: usize,
    pub overlaps_detected: usize,
    pub words_removed: usize,
}

/// Combine per-segment transcripts into a single string, removing the
/// duplicated overlap region wherever the segmenter recorded one.
pub fn combine(segments: &[String], metadata: &SplitMetadata, opts: CombinerOpts) -> (String, CombinerStats) {
    let mut stats = CombinerStats {
        segments_processed: segments.len(),
        ..Default::default()
    };

    if segments.is_empty() {
        return (String::new(), stats);
    }
    if segments.len() == 1 {
        return (segments[0].clone(), stats);
    }

    let mut combined = segments[0].clone();
    for (i, current) in segments.iter().enumerate().skip(1) {
        if metadata.has_start_overlap(i) {
            combined = merge_with_overlap_removal(&combined, current, opts, &mut stats);
        } else {
            combined = simple_append(&combined, current);
        }
    }

    (combined, stats)
}

fn merge_with_overlap_removal(
    text1: &str,
    text2: &str,
    opts: CombinerOpts,
    stats: &mut CombinerStats,
) -> String {
    let words1: Vec<&str> = text1.split_whitespace().collect();
    let words2: Vec<&str> = text2.split_whitespace().collect();

    let max_overlap = words1.len().min(words2.len()).min(opts.max_overlap_search_words);
    if max_overlap < opts.min_overlap_words {
        return simple_append(text1, text2);
    }

    let mut best_len = 0usize;
    let mut best_similarity = 0.0_f32;

    for len in opts.min_overlap_words..=max_overlap {
        let tail = words1[words1.len() - len..].join(" ");
        let head = words2[..len].join(" ");
        let similarity = text_similarity(&tail, &head);
        if similarity > opts.similarity_threshold && similarity > best_similarity {
            best_similarity = similarity;
            best_len = len;
        }
    }

    if best_len > 0 {
        stats.overlaps_detected += 1;
        stats.words_removed += best_len;
        let remainder = words2[best_len..].join(" ");
        smart_concatenate(text1, &remainder)
    } else {
        simple_append(text1, text2)
    }
}

fn text_similarity(a: &str, b: &str) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let na = normalize_for_comparison(a);
    let nb = normalize_for_comparison(b);

    // Cheap reject ahead of the O(n*m) LCS pass below: once the edit
    // distance alone exceeds the combined length, the LCS ratio is
    // guaranteed to fall under any sane similarity threshold.
    if strsim::levenshtein(&na, &nb) >= na.len() + nb.len() {
        return 0.0;
    }

    lcs_ratio(&na, &nb)
}

/// Longest-common-subsequence ratio, `2 * |lcs(a, b)| / (|a| + |b|)` —
/// the same `2*M/T` shape as `difflib.SequenceMatcher.ratio()`, computed
/// from a single LCS rather than matching blocks. Still credits a shared
/// run even when it sits at a different offset in each string, which a
/// pure edit-distance ratio weighs down as two substitutions.
fn lcs_ratio(a: &str, b: &str) -> f32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in &a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb { prev[j] + 1 } else { prev[j + 1].max(curr[j]) };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (2 * prev[b.len()]) as f32 / (a.len() + b.len()) as f32
}

fn normalize_for_comparison(text: &str) -> String {
    let collapsed = text
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    collapsed
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect()
}

fn smart_concatenate(text1: &str, text2: &str) -> String {
    let text1 = text1.trim_end();
    let text2 = text2.trim_start();
    match (text1.is_empty(), text2.is_empty()) {
        (true, _) => text2.to_owned(),
        (_, true) => text1.to_owned(),
        _ => format!("{text1} {text2}"),
    }
}

fn simple_append(text1: &str, text2: &str) -> String {
    smart_concatenate(text1, text2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AudioSegmentInfo, SplitMetadata};

    fn metadata(overlaps: &[bool]) -> SplitMetadata {
        SplitMetadata(
            overlaps
                .iter()
                .map(|&o| AudioSegmentInfo { has_start_overlap: o, overlap_s: 2.5 })
                .collect(),
        )
    }

    #[test]
    fn single_segment_is_unchanged_and_reports_no_overlap() {
        let (combined, stats) = combine(&["hello world".to_owned()], &metadata(&[false]), CombinerOpts::default());
        assert_eq!(combined, "hello world");
        assert_eq!(stats.overlaps_detected, 0);
    }

    #[test]
    fn detects_and_removes_word_overlap() {
        let segments = vec![
            "we will begin the meeting at nine".to_owned(),
            "begin the meeting at nine o'clock sharp today".to_owned(),
        ];
        let (combined, stats) = combine(&segments, &metadata(&[false, true]), CombinerOpts::default());
        assert!(combined.contains("o'clock sharp today"));
        assert!(stats.overlaps_detected >= 1);
        assert!(stats.words_removed >= 4);
    }

    #[test]
    fn no_overlap_expected_just_appends() {
        let segments = vec!["part one".to_owned(), "part two".to_owned()];
        let (combined, stats) = combine(&segments, &metadata(&[false, false]), CombinerOpts::default());
        assert_eq!(combined, "part one part two");
        assert_eq!(stats.overlaps_detected, 0);
    }

    #[test]
    fn empty_input_yields_empty_string() {
        let (combined, _) = combine(&[], &metadata(&[]), CombinerOpts::default());
        assert_eq!(combined, "");
    }

    #[test]
    fn lcs_ratio_credits_a_shared_run_even_when_reordered() {
        // "nine oclock" is a contiguous 11-char run common to both strings,
        // just at opposite ends; the ratio should reflect that shared run
        // even though "sharp" moved to the front.
        let ratio = lcs_ratio("nine oclock sharp", "sharp nine oclock");
        assert!(ratio > 0.6, "expected the shared run to dominate the ratio, got {ratio}");
    }

    #[test]
    fn lcs_ratio_of_identical_strings_is_one() {
        assert_eq!(lcs_ratio("begin the meeting", "begin the meeting"), 1.0);
    }
}
