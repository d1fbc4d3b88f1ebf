use anyhow::{Result, anyhow};
use whisper_rs::{WhisperVadContext, WhisperVadContextParams, WhisperVadParams, WhisperVadSegments};

use crate::config::VadOpts;
use crate::types::SpeechRegion;

/// Wraps a loaded Silero VAD model (via `whisper-rs`'s `WhisperVadContext`) and
/// reports speech regions on the caller's timeline, rather than mutating the
/// sample buffer in place.
pub struct VadGate {
    ctx: WhisperVadContext,
}

impl VadGate {
    pub fn new(model_path: &str) -> Result<Self> {
        let params = WhisperVadContextParams::default();
        let ctx = WhisperVadContext::new(model_path, params)?;
        Ok(Self { ctx })
    }

    /// Detect speech regions in `samples_16k_mono`, in seconds, on the sample
    /// buffer's own timeline.
    pub fn detect(&mut self, samples_16k_mono: &[f32], opts: &VadOpts) -> Result<Vec<SpeechRegion>> {
        if samples_16k_mono.is_empty() {
            return Ok(Vec::new());
        }

        let mut vad_params = WhisperVadParams::default();
        vad_params.set_max_speech_duration(15.0);
        vad_params.set_threshold(opts.threshold);
        vad_params.set_min_speech_duration(opts.min_speech_ms as i32);

        let segments = self.ctx.segments_from_samples(vad_params, samples_16k_mono)?;
        let regions = regions_from_vad_segments(&segments, samples_16k_mono.len() as f32 / 16_000.0)?;
        Ok(merge_under_min_silence(regions, opts.min_silence_ms))
    }
}

/// Convert raw VAD segments into seconds-based regions.
///
/// whisper_rs VAD timestamps are in centiseconds (1/100s units).
fn regions_from_vad_segments(
    segments: &WhisperVadSegments,
    clamp_end_s: f32,
) -> Result<Vec<SpeechRegion>> {
    let n = segments.num_segments();
    let mut regions = Vec::with_capacity(n as usize);

    for i in 0..n {
        let start_cs = segments
            .get_segment_start_timestamp(i)
            .ok_or_else(|| anyhow!("missing start timestamp for VAD segment {i}"))?;
        let end_cs = segments
            .get_segment_end_timestamp(i)
            .ok_or_else(|| anyhow!("missing end timestamp for VAD segment {i}"))?;

        let start_s = (start_cs / 100.0).max(0.0);
        let end_s = (end_cs / 100.0).min(clamp_end_s);
        if end_s > start_s {
            regions.push(SpeechRegion { start_s, end_s });
        }
    }

    Ok(regions)
}

/// Merge directly-adjacent regions closer than `min_silence_ms` apart.
///
/// whisper.cpp's VAD only exposes a speech-duration floor, not a silence
/// floor, so the `min_silence_ms` invariant is enforced here as a post-pass
/// over the raw segment boundaries, ahead of any caller-driven
/// `merge_close_regions` pass.
fn merge_under_min_silence(regions: Vec<SpeechRegion>, min_silence_ms: u32) -> Vec<SpeechRegion> {
    super::merge_close_regions(regions, min_silence_ms as f32 / 1000.0)
}
