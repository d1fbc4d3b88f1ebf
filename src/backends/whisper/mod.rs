use std::path::Path;

use anyhow::{Result, ensure};
use whisper_rs::WhisperContext;

use crate::config::SttOpts;
use crate::orchestrator::{RawTranscription, Transcriber};

mod ctx;
mod logging;
mod segments;
mod token;

/// Built-in [`Transcriber`] powered by `whisper-rs` / `whisper.cpp`.
pub struct WhisperTranscriber {
    ctx: WhisperContext,
}

impl WhisperTranscriber {
    /// Load a whisper.cpp model from disk.
    pub fn new(model_path: impl AsRef<str>) -> Result<Self> {
        let model_path = model_path.as_ref();
        ensure!(!model_path.trim().is_empty(), "model path must be provided");
        ensure!(
            Path::new(model_path).is_file(),
            "whisper model not found at '{model_path}'"
        );

        let ctx = ctx::get_context(model_path)?;
        Ok(Self { ctx })
    }

    /// Access the underlying Whisper context.
    pub fn context(&self) -> &WhisperContext {
        &self.ctx
    }
}

impl Transcriber for WhisperTranscriber {
    fn transcribe(&mut self, samples_16k_mono: &[f32], opts: &SttOpts) -> Result<RawTranscription> {
        if samples_16k_mono.is_empty() {
            return Ok(RawTranscription::default());
        }

        segments::transcribe(&self.ctx, opts, samples_16k_mono)
    }
}
