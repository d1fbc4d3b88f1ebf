//! Fallback cue-duration estimation for segments without word timestamps.
//!
//! Grounded on `subtitles/smart_timing_estimator.py`: duration is the max of
//! an assumed speaking rate, an assumed reading rate, and a floor, with an
//! extra allowance for two-line cues. Estimates only ever extend a cue's
//! display time, never contract it, and never claim time from the next cue.

use crate::config::SubtitleOpts;

pub fn estimate_cue_duration(word_count: usize, two_lines: bool, opts: &SubtitleOpts) -> f32 {
    let words = word_count.max(1) as f32;
    let speaking_time = words / opts.speaking_wpm * 60.0;
    let mut reading_time = words / opts.reading_wpm * 60.0;

    if two_lines {
        reading_time = reading_time * 1.4 + 0.6;
    }

    speaking_time.max(reading_time).max(opts.min_cue_s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_word_meets_minimum_duration() {
        let opts = SubtitleOpts::default();
        let d = estimate_cue_duration(1, false, &opts);
        assert!(d >= opts.min_cue_s);
    }

    #[test]
    fn two_line_cues_get_extra_allowance() {
        let opts = SubtitleOpts::default();
        let one_line = estimate_cue_duration(10, false, &opts);
        let two_line = estimate_cue_duration(10, true, &opts);
        assert!(two_line > one_line);
    }

    #[test]
    fn more_words_take_longer() {
        let opts = SubtitleOpts::default();
        assert!(estimate_cue_duration(20, false, &opts) > estimate_cue_duration(5, false, &opts));
    }
}
