//! C2 — VAD Gate.
//!
//! Detects speech regions on the input's own timeline so the orchestrator
//! (C3) can transcribe only where there's something to transcribe, and never
//! needs to reconstruct timing from a shortened buffer.

mod detector;

pub use detector::VadGate;

use crate::types::SpeechRegion;

/// Fold speech regions whose inter-gap is `<= max_gap_s` into a single region.
///
/// Kept as an independently callable pass (distinct from the gate's own
/// internal `min_silence_ms` merge) so callers/tests can apply a different
/// gap threshold than the gate's own defaults.
pub fn merge_close_regions(mut regions: Vec<SpeechRegion>, max_gap_s: f32) -> Vec<SpeechRegion> {
    regions.sort_by(|a, b| a.start_s.partial_cmp(&b.start_s).unwrap());

    let mut merged: Vec<SpeechRegion> = Vec::with_capacity(regions.len());
    for region in regions {
        if let Some(last) = merged.last_mut() {
            let gap = region.start_s - last.end_s;
            if gap <= max_gap_s {
                last.end_s = last.end_s.max(region.end_s);
                continue;
            }
        }
        merged.push(region);
    }
    merged
}
