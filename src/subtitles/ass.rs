//! Advanced SubStation Alpha (`.ass`) serialization.
//!
//! Emits a minimal `[Script Info]` / `[V4+ Styles]` / `[Events]` document
//! with a single default style, which is all downstream players need to
//! render plain two-line cues.

use crate::types::SubtitleCue;

const HEADER: &str = "\
[Script Info]
ScriptType: v4.00+
WrapStyle: 0
ScaledBorderAndShadow: yes
YCbCr Matrix: None

[V4+ Styles]
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding
Style: Default,Arial,20,&H00FFFFFF,&H000000FF,&H00000000,&H80000000,0,0,0,0,100,100,0,0,1,2,0,2,10,10,10,1

[Events]
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text
";

pub fn serialize(cues: &[SubtitleCue]) -> String {
    let mut out = String::from(HEADER);
    for cue in cues {
        let text = cue.lines.join("\\N");
        out.push_str(&format!(
            "Dialogue: 0,{},{},Default,,0,0,0,,{}\n",
            format_timestamp(cue.start_s),
            format_timestamp(cue.end_s),
            text
        ));
    }
    out
}

fn format_timestamp(seconds: f32) -> String {
    let total_cs = (seconds.max(0.0) * 100.0).round() as u64;
    let cs = total_cs % 100;
    let total_s = total_cs / 100;
    let s = total_s % 60;
    let total_m = total_s / 60;
    let m = total_m % 60;
    let h = total_m / 60;
    format!("{h}:{m:02}:{s:02}.{cs:02}")
}
