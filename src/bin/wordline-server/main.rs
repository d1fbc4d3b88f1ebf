use std::collections::HashMap;
use std::io::Cursor;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use axum::Router;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use base64::Engine;
use clap::Parser;
use serde::{Deserialize, Serialize};
use symphonia::core::io::ReadOnlySource;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnResponse, TraceLayer};
use tracing::{Level, error, info, warn};

use wordline::backends::whisper::WhisperTranscriber;
use wordline::cancel::CancelToken;
use wordline::config::PipelineOpts;
use wordline::types::SubtitleFormat;
use wordline::vad::VadGate;

mod metrics;

#[derive(Parser, Debug)]
#[command(name = "wordline-server")]
#[command(about = "HTTP server for audio/video transcription")]
struct Params {
    /// Path(s) to whisper.cpp model file(s) (e.g. `ggml-large-v3.bin`); the
    /// first model given becomes the default.
    #[arg(short = 'm', long = "model", required = true, num_args = 1..)]
    model_paths: Vec<String>,

    /// Path to a Whisper-VAD model file.
    #[arg(short = 'v', long = "vad-model", required = true)]
    vad_model_path: String,

    /// Host interface to bind to.
    #[arg(long = "host", default_value = "127.0.0.1")]
    host: String,

    /// TCP port to listen on.
    #[arg(long = "port", default_value_t = 8080)]
    port: u16,

    /// Maximum request body size (bytes).
    #[arg(long = "max-bytes", default_value_t = 100 * 1024 * 1024)]
    max_bytes: usize,
}

struct ModelRegistry {
    default_key: String,
    paths: HashMap<String, PathBuf>,
}

impl ModelRegistry {
    fn new(model_paths: &[String]) -> Self {
        let mut paths = HashMap::new();
        let mut default_key = String::new();
        for (i, path) in model_paths.iter().enumerate() {
            let key = PathBuf::from(path)
                .file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_owned)
                .unwrap_or_else(|| format!("model-{i}"));
            if i == 0 {
                default_key = key.clone();
            }
            paths.insert(key, PathBuf::from(path));
        }
        Self { default_key, paths }
    }

    fn resolve(&self, key: Option<&str>) -> Option<&PathBuf> {
        self.paths.get(key.unwrap_or(&self.default_key))
    }
}

#[derive(Clone)]
struct AppState {
    models: Arc<ModelRegistry>,
    vad_model_path: Arc<String>,
}

#[derive(Debug, Deserialize)]
struct TranscribeQuery {
    #[serde(default)]
    model_key: Option<String>,
    #[serde(default)]
    translate_to_english: Option<bool>,
    #[serde(default)]
    remove_fillers: Option<bool>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    format: Option<String>,
}

#[derive(Debug, Serialize)]
struct ModelsResponse {
    default_model_key: String,
    model_keys: Vec<String>,
    vad_model_path: String,
}

#[derive(Debug, Serialize)]
struct TranscribeResponse {
    language: Option<String>,
    transcript_path: Option<String>,
    subtitle_paths: Vec<String>,
    content_type: &'static str,
    content_base64: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }

    fn unsupported_media(message: impl Into<String>) -> Self {
        Self { status: StatusCode::UNSUPPORTED_MEDIA_TYPE, message: message.into() }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: message.into() }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody { error: self.message });
        (self.status, body).into_response()
    }
}

#[tokio::main]
async fn main() {
    wordline::logging::init();

    if let Err(err) = run().await {
        error!(error = ?err, "wordline-server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let params = Params::parse();

    if let Err(err) = metrics::init() {
        warn!(error = ?err, "metrics disabled (init failed)");
    }

    let addr: SocketAddr = format!("{}:{}", params.host, params.port)
        .parse()
        .context("invalid host/port bind address")?;

    let state = AppState {
        models: Arc::new(ModelRegistry::new(&params.model_paths)),
        vad_model_path: Arc::new(params.vad_model_path),
    };

    let app = Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics::prometheus_metrics))
        .route("/v1/models", get(models))
        .route("/v1/transcribe", post(transcribe))
        .route_layer(from_fn(metrics::track_http_metrics))
        .with_state(state)
        .layer(DefaultBodyLimit::max(params.max_bytes))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_response(DefaultOnResponse::new().level(Level::INFO))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        );

    let listener = TcpListener::bind(addr).await.context("bind failed")?;
    info!(%addr, "listening");
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

async fn root() -> &'static str {
    "wordline-server: POST /v1/transcribe (multipart field: file)"
}

async fn healthz() -> &'static str {
    "ok"
}

async fn models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        default_model_key: state.models.default_key.clone(),
        model_keys: state.models.paths.keys().cloned().collect(),
        vad_model_path: state.vad_model_path.as_str().to_owned(),
    })
}

async fn transcribe(
    State(state): State<AppState>,
    Query(query): Query<TranscribeQuery>,
    mut multipart: Multipart,
) -> std::result::Result<Response, AppError> {
    const MAX_PROBE_BYTES: usize = 512 * 1024;

    let mut field = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(err.to_string()))?
        .ok_or_else(|| AppError::bad_request("expected a multipart field named 'file'"))?;

    let work_dir = tempfile::tempdir().map_err(|err| AppError::internal(err.to_string()))?;
    let input_path = work_dir.path().join("upload.bin");
    let mut prefix = Vec::<u8>::new();
    let mut file = tokio::fs::File::create(&input_path)
        .await
        .map_err(|err| AppError::internal(err.to_string()))?;

    use tokio::io::AsyncWriteExt;
    while let Some(chunk) = field.chunk().await.map_err(|err| AppError::bad_request(err.to_string()))? {
        if prefix.len() < MAX_PROBE_BYTES {
            let take = (MAX_PROBE_BYTES - prefix.len()).min(chunk.len());
            prefix.extend_from_slice(&chunk[..take]);
        }
        file.write_all(&chunk).await.map_err(|err| AppError::internal(err.to_string()))?;
    }
    file.flush().await.map_err(|err| AppError::internal(err.to_string()))?;

    if prefix.is_empty() {
        return Err(AppError::bad_request("uploaded file was empty"));
    }
    validate_media_prefix(&prefix)?;

    let model_path = state
        .models
        .resolve(query.model_key.as_deref())
        .ok_or_else(|| AppError::bad_request("unknown model_key"))?
        .clone();
    let vad_model_path = state.vad_model_path.as_str().to_owned();

    let format = parse_format(query.format.as_deref()).map_err(|err| AppError::bad_request(err.to_string()))?;

    let mut opts = PipelineOpts::default();
    opts.language = query.language;
    opts.stt.translate_to_english = query.translate_to_english.unwrap_or(false);
    opts.remove_fillers = query.remove_fillers.unwrap_or(true);
    opts.subtitle_formats = vec![format];

    let out_dir = work_dir.path().join("out");
    let cancel = CancelToken::new();

    let job = tokio::task::spawn_blocking(move || -> Result<wordline::JobOutput> {
        let mut vad = VadGate::new(&vad_model_path)?;
        let mut stt = WhisperTranscriber::new(model_path.to_string_lossy())?;
        wordline::process_file(&input_path, &out_dir, &opts, &mut vad, &mut stt, None, Some(&cancel))
            .map_err(|err| anyhow!(err.to_string()))
    })
    .await
    .map_err(|err| AppError::internal(err.to_string()))?
    .map_err(|err| AppError::internal(err.to_string()))?;

    let content_type = content_type_for(format);
    let first_path = job
        .subtitle_paths
        .first()
        .ok_or_else(|| AppError::internal("no subtitle output was produced"))?;
    let bytes = std::fs::read(first_path).map_err(|err| AppError::internal(err.to_string()))?;
    let content_base64 = base64::engine::general_purpose::STANDARD.encode(bytes);

    Ok(Json(TranscribeResponse {
        language: job.language,
        transcript_path: job.transcript_path.map(|p| p.display().to_string()),
        subtitle_paths: job.subtitle_paths.iter().map(|p| p.display().to_string()).collect(),
        content_type,
        content_base64,
    })
    .into_response())
}

fn content_type_for(format: SubtitleFormat) -> &'static str {
    match format {
        SubtitleFormat::Srt => "application/x-subrip; charset=utf-8",
        SubtitleFormat::Vtt => "text/vtt; charset=utf-8",
        SubtitleFormat::Ass => "text/x-ass; charset=utf-8",
    }
}

fn parse_format(raw: Option<&str>) -> Result<SubtitleFormat> {
    match raw {
        None => Ok(SubtitleFormat::Srt),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "srt" => Ok(SubtitleFormat::Srt),
            "vtt" => Ok(SubtitleFormat::Vtt),
            "ass" => Ok(SubtitleFormat::Ass),
            other => Err(anyhow!("unknown subtitle format '{other}' (expected 'srt', 'vtt', or 'ass')")),
        },
    }
}

fn validate_media_prefix(prefix: &[u8]) -> std::result::Result<(), AppError> {
    let source = ReadOnlySource::new(Cursor::new(prefix.to_vec()));
    if let Err(err) = probe_source_and_pick_default_track(Box::new(source)) {
        return Err(AppError::unsupported_media(format!(
            "unsupported or unrecognized media container: {err}"
        )));
    }
    Ok(())
}

fn probe_source_and_pick_default_track(
    source: Box<dyn symphonia::core::io::MediaSource>,
) -> Result<(Box<dyn symphonia::core::formats::FormatReader>, symphonia::core::formats::Track)> {
    use symphonia::core::codecs::CODEC_TYPE_NULL;
    use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
    use symphonia::core::meta::MetadataOptions;
    use symphonia::core::probe::Hint;

    let mss_opts = MediaSourceStreamOptions { buffer_len: 256 * 1024 };
    let mss = MediaSourceStream::new(source, mss_opts);
    let hint = Hint::new();
    let format_opts: symphonia::core::formats::FormatOptions = Default::default();
    let metadata_opts: MetadataOptions = Default::default();

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &format_opts, &metadata_opts)
        .map_err(|e| anyhow!(e))
        .context("failed to probe media stream")?;

    let format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL && t.codec_params.sample_rate.is_some())
        .cloned()
        .ok_or_else(|| anyhow!("no audio track found"))?;

    Ok((format, track))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_format_defaults_to_srt() {
        assert!(matches!(parse_format(None).unwrap(), SubtitleFormat::Srt));
    }

    #[test]
    fn parse_format_accepts_known_values_case_insensitively() {
        assert!(matches!(parse_format(Some(" VTT ")).unwrap(), SubtitleFormat::Vtt));
        assert!(matches!(parse_format(Some("ass")).unwrap(), SubtitleFormat::Ass));
    }

    #[test]
    fn parse_format_rejects_unknown_value() {
        let err = parse_format(Some("nope")).unwrap_err();
        assert!(err.to_string().contains("unknown subtitle format"));
    }

    #[test]
    fn model_registry_resolves_default_and_named_keys() {
        let registry = ModelRegistry::new(&["models/ggml-base.bin".to_owned(), "models/ggml-small.bin".to_owned()]);
        assert_eq!(registry.default_key, "ggml-base");
        assert!(registry.resolve(None).is_some());
        assert!(registry.resolve(Some("ggml-small")).is_some());
        assert!(registry.resolve(Some("nonexistent")).is_none());
    }

    #[test]
    fn validate_media_prefix_accepts_wav_bytes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).expect("create wav");
        for i in 0..16_000i16 {
            writer.write_sample(i % 100).expect("write sample");
        }
        writer.finalize().expect("finalize wav");

        let bytes = std::fs::read(&path).expect("read wav");
        if let Err(err) = validate_media_prefix(&bytes) {
            panic!("expected WAV bytes to probe successfully: {}", err.message);
        }
    }

    #[test]
    fn validate_media_prefix_rejects_garbage() {
        let bytes = vec![0u8; 64];
        assert!(validate_media_prefix(&bytes).is_err());
    }
}
