//! C1 — Audio Segmenter.
//!
//! Splits long audio into bounded-size, overlapping segments so a single
//! file never exceeds the downstream STT model's comfortable input size.
//! Grounded on the original implementation's `AudioSplitter`
//! (`audio_processing/splitter.py`), which bounds segments by estimated byte
//! size but never implemented overlap — the overlap formulas here come
//! straight from the segmenter's own contract rather than a translation.

use std::path::{Path, PathBuf};

use crate::config::SegmenterOpts;
use crate::error::Result;
use crate::ingest::write_wav_16k_mono;
use crate::types::{AudioSegment, SplitMetadata};

const SAMPLE_RATE: f32 = 16_000.0;
const BYTES_PER_SAMPLE: u64 = 4; // f32 PCM, matching the decoded format the core works in.

/// Split `samples` (mono 16 kHz) into one or more [`AudioSegment`]s under
/// `work_dir`, returning them in order along with shareable [`SplitMetadata`].
///
/// Byte size is estimated from decoded PCM (`samples.len() * 4`) rather than
/// a container-encoded size, since the core never re-encodes to a lossy
/// container — this keeps the size estimate exact instead of depending on an
/// external encoder's bitrate.
pub fn split(samples: &[f32], work_dir: &Path, opts: SegmenterOpts) -> Result<(Vec<AudioSegment>, SplitMetadata)> {
    let total_bytes = samples.len() as u64 * BYTES_PER_SAMPLE;
    let duration_s = samples.len() as f32 / SAMPLE_RATE;

    if total_bytes <= opts.max_segment_bytes || samples.is_empty() {
        let path = work_dir.join("segment_000.wav");
        write_wav_16k_mono(&path, samples)?;
        let segment = AudioSegment {
            path,
            index: 0,
            start_s: 0.0,
            end_s: duration_s,
            has_start_overlap: false,
            has_end_overlap: false,
            overlap_s: opts.overlap_s,
        };
        let metadata = SplitMetadata::from_segments(std::slice::from_ref(&segment));
        return Ok((vec![segment], metadata));
    }

    let n = (total_bytes as f64 / opts.max_segment_bytes as f64).ceil() as usize;
    let n = n.max(1);
    let raw_segment_s = duration_s / n as f32;
    let segment_s = raw_segment_s.max(opts.min_segment_s).min(duration_s.max(opts.min_segment_s));
    let n = ((duration_s / segment_s).ceil() as usize).max(1);

    let mut segments = Vec::with_capacity(n);
    for i in 0..n {
        let has_start_overlap = i > 0;
        let has_end_overlap = i < n - 1;

        let start_s = if has_start_overlap {
            (i as f32 * segment_s - opts.overlap_s).max(0.0)
        } else {
            0.0
        };
        let end_s = if has_end_overlap {
            ((i + 1) as f32 * segment_s + opts.overlap_s).min(duration_s)
        } else {
            duration_s
        };

        let start_idx = (start_s * SAMPLE_RATE).round() as usize;
        let end_idx = ((end_s * SAMPLE_RATE).round() as usize).min(samples.len());
        let slice = &samples[start_idx.min(end_idx)..end_idx];

        let path = segment_path(work_dir, i);
        write_wav_16k_mono(&path, slice)?;

        segments.push(AudioSegment {
            path,
            index: i,
            start_s,
            end_s,
            has_start_overlap,
            has_end_overlap,
            overlap_s: opts.overlap_s,
        });
    }

    let metadata = SplitMetadata::from_segments(&segments);
    Ok((segments, metadata))
}

fn segment_path(work_dir: &Path, index: usize) -> PathBuf {
    work_dir.join(format!("segment_{index:03}.wav"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silence(duration_s: f32) -> Vec<f32> {
        vec![0.0; (duration_s * SAMPLE_RATE) as usize]
    }

    #[test]
    fn small_input_yields_single_unsplit_segment() {
        let dir = tempfile::tempdir().unwrap();
        let samples = silence(5.0);
        let (segments, metadata) = split(&samples, dir.path(), SegmenterOpts::default()).unwrap();

        assert_eq!(segments.len(), 1);
        assert!(!segments[0].has_start_overlap);
        assert!(!segments[0].has_end_overlap);
        assert!(!metadata.has_start_overlap(0));
    }

    #[test]
    fn large_input_splits_with_overlap() {
        let dir = tempfile::tempdir().unwrap();
        // ~26s of 16kHz mono f32 is well over 1 MiB; force a tiny threshold
        // so we deterministically get multiple segments without huge fixtures.
        let opts = SegmenterOpts {
            max_segment_bytes: 64 * 1024,
            overlap_s: 1.0,
            min_segment_s: 1.0,
        };
        let samples = silence(20.0);
        let (segments, metadata) = split(&samples, dir.path(), opts).unwrap();

        assert!(segments.len() > 1);
        assert!(!segments[0].has_start_overlap);
        assert!(segments[0].has_end_overlap);
        assert!(segments.last().unwrap().has_end_overlap == false);
        for i in 1..segments.len() {
            assert!(segments[i].has_start_overlap);
            assert!(metadata.has_start_overlap(i));
            // adjacent segments actually overlap on the original timeline.
            assert!(segments[i].start_s < segments[i - 1].end_s);
        }
    }

    #[test]
    fn segments_are_written_as_valid_wav() {
        let dir = tempfile::tempdir().unwrap();
        let opts = SegmenterOpts {
            max_segment_bytes: 64 * 1024,
            overlap_s: 1.0,
            min_segment_s: 1.0,
        };
        let samples = silence(10.0);
        let (segments, _) = split(&samples, dir.path(), opts).unwrap();
        for seg in &segments {
            let (read_back, spec) =
                crate::wav::get_samples_from_wav(&seg.path.display().to_string()).unwrap();
            assert_eq!(spec.sample_rate, 16_000);
            assert!(!read_back.is_empty());
        }
    }
}
