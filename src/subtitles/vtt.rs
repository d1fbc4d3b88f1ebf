//! WebVTT (`.vtt`) serialization.

use crate::types::SubtitleCue;

pub fn serialize(cues: &[SubtitleCue]) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for cue in cues {
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
    format!("{h:02}:{m:02}:{s:02}.{ms:03}")
}
