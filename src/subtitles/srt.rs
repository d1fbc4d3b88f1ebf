//! SubRip (`.srt`) serialization.

use crate::types::SubtitleCue;

pub fn serialize(cues: &[SubtitleCue]) -> String {
    let mut out = String::new();
    for cue in cues {
        out.push_str(&cue.index.to_string());
        out.push('\n');
        out.push_str(&format!(
            "{} --> {}\n",
            format_timestamp(cue.start_s),
            format_timestamp(cue.end_s)
        ));
        out.push_str(&cue.text());
        out.push_str("\n\n");
    }
    out
}

fn format_timestamp(seconds: f32) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_s = total_ms / 1000;
    let s = total_s % 60;
    let total_m = total_s / 60;
    let m = total_m % 60;
    let h = total_m / 60;
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue(index: usize, start: f32, end: f32, text: &str) -> SubtitleCue {
        SubtitleCue { index, start_s: start, end_s: end, lines: vec![text.to_owned()] }
    }

    #[test]
    fn formats_timestamp_with_comma_millis() {
        assert_eq!(format_timestamp(3661.5), "01:01:01,500");
    }

    #[test]
    fn serializes_a_single_cue() {
        let out = serialize(&[cue(1, 0.0, 1.5, "hello")]);
        assert_eq!(out, "1\n00:00:00,000 --> 00:00:01,500\nhello\n\n");
    }

    #[test]
    fn joins_multiple_lines_with_newline() {
        let c = SubtitleCue { index: 1, start_s: 0.0, end_s: 1.0, lines: vec!["line one".to_owned(), "line two".to_owned()] };
        let out = serialize(&[c]);
        assert!(out.contains("line one\nline two"));
    }

    #[test]
    fn separates_consecutive_cues_with_blank_line() {
        let out = serialize(&[cue(1, 0.0, 1.0, "a"), cue(2, 1.0, 2.0, "b")]);
        assert_eq!(out, "1\n00:00:00,000 --> 00:00:01,000\na\n\n2\n00:00:01,000 --> 00:00:02,000\nb\n\n");
    }
}
