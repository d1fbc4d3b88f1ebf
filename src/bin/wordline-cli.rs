// src/bin/wordline-cli.rs

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use wordline::backends::whisper::WhisperTranscriber;
use wordline::config::PipelineOpts;
use wordline::types::{ProgressEvent, SubtitleFormat};
use wordline::vad::VadGate;

fn main() -> Result<()> {
    wordline::logging::init();

    let params = Params::parse();
    let file_opts = params.config.as_deref().map(load_config_file).transpose()?;
    let opts = build_pipeline_opts(&params, file_opts);

    let mut vad = VadGate::new(&params.vad_model_path)
        .with_context(|| format!("failed to load VAD model from '{}'", params.vad_model_path))?;
    let mut stt = WhisperTranscriber::new(&params.model_path)
        .with_context(|| format!("failed to load whisper model from '{}'", params.model_path))?;

    let mut progress_cb = |event: ProgressEvent| {
        eprintln!("[{:>3}%] {:?} {}", event.percent, event.stage, event.message.unwrap_or_default());
    };

    let result = wordline::process_file(
        &params.input,
        &params.out_dir,
        &opts,
        &mut vad,
        &mut stt,
        Some(&mut progress_cb),
        None,
    );

    match result {
        Ok(output) => {
            if let Some(path) = &output.transcript_path {
                println!("transcript: {}", path.display());
            }
            for path in &output.subtitle_paths {
                println!("subtitle: {}", path.display());
            }
            if let Some(lang) = &output.language {
                println!("language: {lang}");
            }
            Ok(())
        }
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn load_config_file(path: &std::path::Path) -> Result<FileOpts> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file '{}'", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("failed to parse config file '{}'", path.display()))
}

fn build_pipeline_opts(params: &Params, file_opts: Option<FileOpts>) -> PipelineOpts {
    let mut opts = PipelineOpts::default();

    if let Some(file) = file_opts {
        if let Some(v) = file.remove_fillers {
            opts.remove_fillers = v;
        }
        if let Some(v) = file.language {
            opts.language = Some(v);
        }
    }

    if let Some(lang) = &params.language {
        opts.language = Some(lang.clone());
    }
    if params.no_fillers {
        opts.remove_fillers = false;
    }
    if params.translate {
        opts.stt.translate_to_english = true;
    }

    opts.write_transcript = !params.no_transcript;
    opts.subtitle_formats = params.format.clone();
    if opts.subtitle_formats.is_empty() {
        opts.subtitle_formats = vec![SubtitleFormat::Srt];
    }

    opts.stt.language = opts.language.clone();
    opts
}

/// Subset of [`PipelineOpts`] a TOML config file may set; CLI flags take
/// precedence over these when both are given.
#[derive(Debug, Default, serde::Deserialize)]
struct FileOpts {
    remove_fillers: Option<bool>,
    language: Option<String>,
}

/// CLI parameters for `wordline`.
#[derive(Parser, Debug)]
#[command(name = "wordline")]
#[command(about = "Long-form video/audio transcription and subtitle generation")]
struct Params {
    /// Path to a whisper.cpp model file (e.g. `ggml-large-v3.bin`).
    #[arg(short = 'm', long = "model", required = true)]
    pub model_path: String,

    /// Path to a Whisper-VAD model file.
    #[arg(short = 'v', long = "vad-model", required = true)]
    pub vad_model_path: String,

    /// Input media path (audio or video).
    #[arg(short = 'i', long = "input", required = true)]
    pub input: PathBuf,

    /// Directory to write the transcript and subtitle files into.
    #[arg(short = 'd', long = "out-dir", default_value = "./out")]
    pub out_dir: PathBuf,

    /// Subtitle formats to emit; may be given multiple times.
    #[arg(short = 'f', long = "format", value_enum)]
    pub format: Vec<SubtitleFormat>,

    /// Skip writing the plain-text transcript.
    #[arg(long = "no-transcript", default_value_t = false)]
    pub no_transcript: bool,

    /// Keep filler words ("um", "uh", "you know") instead of removing them.
    #[arg(long = "no-fillers", default_value_t = false)]
    pub no_fillers: bool,

    /// Translate speech to English.
    #[arg(short = 't', long = "translate", default_value_t = false)]
    pub translate: bool,

    /// Optional language hint (e.g. "en", "es").
    #[arg(short = 'l', long = "language")]
    pub language: Option<String>,

    /// Optional TOML config file; CLI flags override its values.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
}
