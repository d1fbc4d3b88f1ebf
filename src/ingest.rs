//! Decode an input video/audio file into 16 kHz mono samples.
//!
//! Builds on [`crate::demux`], [`crate::decode`] and [`crate::audio_pipeline`],
//! the same Symphonia-based stack the decode-from-stream path uses, but against
//! a seekable `File` source since every pipeline entry point works from a path
//! on disk rather than a live stream.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, anyhow};

use crate::audio_pipeline::AudioPipeline;
use crate::decode::{decode_packet_and_then, make_decoder_for_track};
use crate::demux::{next_packet, probe_source_and_pick_default_track};

/// Fully decode `path` into mono 16 kHz `f32` samples.
///
/// The whole file is decoded into memory; callers working with very large
/// inputs should rely on [`crate::segmenter`] to bound per-segment memory use
/// further upstream (segmenting happens on the decoded sample buffer).
pub fn decode_file_to_samples(path: &Path) -> Result<Vec<f32>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open input file '{}'", path.display()))?;

    let hint_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_owned());

    let (mut format, track) =
        probe_source_and_pick_default_track(Box::new(file), hint_extension.as_deref())
            .context("failed to probe input file")?;

    let mut decoder = make_decoder_for_track(&track)?;
    let mut pipeline = AudioPipeline::new();
    let mut samples = Vec::new();

    loop {
        let Some(packet) = next_packet(&mut format)? else {
            break;
        };
        if packet.track_id() != track.id {
            continue;
        }

        decode_packet_and_then(&mut decoder, &packet, |decoded| {
            pipeline
                .push_decoded_and_emit(&decoded, 16_384, |chunk| {
                    samples.extend_from_slice(chunk);
                    Ok(true)
                })
                .context("audio pipeline failed while processing decoded samples")
        })?;
    }

    pipeline
        .finalize(16_384, |chunk| {
            samples.extend_from_slice(chunk);
            Ok(true)
        })
        .context("audio pipeline failed during finalize")?;

    if samples.is_empty() {
        return Err(anyhow!("no audio samples were decoded from '{}'", path.display()));
    }

    Ok(samples)
}

/// Write mono 16 kHz `f32` samples to a WAV file at `path`.
pub fn write_wav_16k_mono(path: &Path, samples: &[f32]) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("failed to create wav file '{}'", path.display()))?;
    for &s in samples {
        let clamped = s.clamp(-1.0, 1.0);
        let v = (clamped * i16::MAX as f32) as i16;
        writer.write_sample(v)?;
    }
    writer.finalize().context("failed to finalize wav file")?;
    Ok(())
}
