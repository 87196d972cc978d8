//! Pure Rust OCR engine wrapper using `pure-onnx-ocr`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use image::GenericImageView;
use tokio::sync::{mpsc, oneshot, OnceCell};
use tracing::{debug, info};

use crate::error::OcrError;
use crate::models::config::OcrConfig;

use super::OcrCapability;

/// Languages covered by the Latin-script recognition model.
const SUPPORTED_LANGUAGES: &[&str] = &[
    "eng", "deu", "fra", "spa", "ita", "por", "nld", "pol", "latin",
];

type Engine = pure_onnx_ocr::engine::OcrEngine;

/// Image bytes plus the channel the recognized text goes back on.
type Job = (Vec<u8>, oneshot::Sender<Result<String, OcrError>>);

/// OCR engine backed by `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).
///
/// The engine is not `Send`, so it lives on a dedicated worker thread that is
/// started on first use and serves requests one at a time. Only the request
/// channel is shared.
pub struct PureOcrEngine {
    det_path: PathBuf,
    rec_path: PathBuf,
    dict_path: PathBuf,
    keep_unk: bool,
    worker: OnceCell<mpsc::UnboundedSender<Job>>,
}

impl PureOcrEngine {
    /// Create an engine reading model files from the configured model directory.
    pub fn from_config(config: &OcrConfig) -> Self {
        Self::from_dir(&config.model_dir, config)
    }

    /// Create an engine from model files in a directory.
    pub fn from_dir(model_dir: &Path, config: &OcrConfig) -> Self {
        Self {
            det_path: model_dir.join(&config.detection_model),
            rec_path: model_dir.join(&config.recognition_model),
            dict_path: model_dir.join(&config.dictionary),
            keep_unk: config.keep_unk,
            worker: OnceCell::new(),
        }
    }

    /// Whether all model files are present.
    pub fn models_available(&self) -> bool {
        self.det_path.exists() && self.rec_path.exists() && self.dict_path.exists()
    }

    async fn worker(&self) -> Result<&mpsc::UnboundedSender<Job>, OcrError> {
        self.worker.get_or_try_init(|| self.spawn_worker()).await
    }

    /// Start the worker thread and wait until its models are loaded. A load
    /// failure ends the thread, so the next request tries again.
    async fn spawn_worker(&self) -> Result<mpsc::UnboundedSender<Job>, OcrError> {
        let (jobs_tx, mut jobs_rx) = mpsc::unbounded_channel::<Job>();
        let (ready_tx, ready_rx) = oneshot::channel();

        let det_path = self.det_path.clone();
        let rec_path = self.rec_path.clone();
        let dict_path = self.dict_path.clone();
        let keep_unk = self.keep_unk;

        std::thread::Builder::new()
            .name("till-ocr".to_string())
            .spawn(move || {
                let engine = match load_engine(&det_path, &rec_path, &dict_path) {
                    Ok(engine) => {
                        let _ = ready_tx.send(Ok(()));
                        engine
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                while let Some((bytes, reply)) = jobs_rx.blocking_recv() {
                    let _ = reply.send(run_ocr(&engine, &bytes, keep_unk));
                }
                debug!("OCR worker stopped");
            })
            .map_err(|e| OcrError::ModelLoad(format!("cannot start OCR worker: {}", e)))?;

        ready_rx
            .await
            .map_err(|_| OcrError::ModelLoad("model loader panicked".to_string()))??;

        Ok(jobs_tx)
    }
}

#[async_trait]
impl OcrCapability for PureOcrEngine {
    async fn recognize(&self, image: &[u8], language: &str) -> Result<String, OcrError> {
        if !SUPPORTED_LANGUAGES.contains(&language) {
            return Err(OcrError::UnsupportedLanguage(language.to_string()));
        }

        let worker = self.worker().await?;
        let (reply_tx, reply_rx) = oneshot::channel();
        worker
            .send((image.to_vec(), reply_tx))
            .map_err(|_| OcrError::Recognition("OCR worker stopped".to_string()))?;

        reply_rx
            .await
            .map_err(|_| OcrError::Recognition("OCR worker panicked".to_string()))?
    }
}

fn load_engine(det_path: &Path, rec_path: &Path, dict_path: &Path) -> Result<Engine, OcrError> {
    for path in [det_path, rec_path, dict_path] {
        if !path.exists() {
            return Err(OcrError::ModelLoad(format!(
                "model file not found: {}",
                path.display()
            )));
        }
    }

    let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
        .det_model_path(det_path)
        .rec_model_path(rec_path)
        .dictionary_path(dict_path)
        .build()
        .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

    info!(
        "Loaded pure-onnx-ocr engine from {}",
        det_path.parent().unwrap_or(det_path).display()
    );
    Ok(engine)
}

fn run_ocr(engine: &Engine, bytes: &[u8], keep_unk: bool) -> Result<String, OcrError> {
    let start = Instant::now();

    let image =
        image::load_from_memory(bytes).map_err(|e| OcrError::InvalidImage(e.to_string()))?;
    let (width, height) = image.dimensions();
    debug!("Running OCR on {}x{} image", width, height);

    let results = engine
        .run_from_image(&image)
        .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

    let mut lines: Vec<([f32; 8], String)> = results
        .iter()
        .map(|r| {
            let text = if keep_unk {
                r.text.clone()
            } else {
                r.text.replace("[UNK]", " ")
            };
            (polygon_to_bbox(&r.bounding_box), text)
        })
        .collect();

    // Reading order: 20px rows top to bottom, then left to right
    lines.sort_by(|(a, _), (b, _)| {
        let row_a = (min_y(a) / 20.0) as i32;
        let row_b = (min_y(b) / 20.0) as i32;
        row_a.cmp(&row_b).then_with(|| {
            min_x(a)
                .partial_cmp(&min_x(b))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    });

    info!(
        "OCR complete: {} text regions in {}ms",
        lines.len(),
        start.elapsed().as_millis()
    );

    Ok(lines
        .into_iter()
        .map(|(_, text)| text)
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Convert a `Polygon<f64>` to `[x1, y1, x2, y2, x3, y3, x4, y4]`.
fn polygon_to_bbox(polygon: &pure_onnx_ocr::Polygon<f64>) -> [f32; 8] {
    let mut bbox = [0.0f32; 8];
    for (i, coord) in polygon.exterior().coords().take(4).enumerate() {
        bbox[i * 2] = coord.x as f32;
        bbox[i * 2 + 1] = coord.y as f32;
    }
    bbox
}

fn min_x(bbox: &[f32; 8]) -> f32 {
    [bbox[0], bbox[2], bbox[4], bbox[6]]
        .into_iter()
        .fold(f32::INFINITY, f32::min)
}

fn min_y(bbox: &[f32; 8]) -> f32 {
    [bbox[1], bbox[3], bbox[5], bbox[7]]
        .into_iter()
        .fold(f32::INFINITY, f32::min)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_engine_is_shareable_across_tasks() {
        assert_send_sync::<PureOcrEngine>();
    }

    #[tokio::test]
    async fn test_rejects_unsupported_language() {
        let engine = PureOcrEngine::from_dir(Path::new("/nonexistent"), &OcrConfig::default());
        let err = engine.recognize(b"", "jpn").await.unwrap_err();
        assert!(matches!(err, OcrError::UnsupportedLanguage(l) if l == "jpn"));
    }

    #[tokio::test]
    async fn test_missing_models_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let engine = PureOcrEngine::from_dir(dir.path(), &OcrConfig::default());
        assert!(!engine.models_available());

        let err = engine.recognize(b"not an image", "eng").await.unwrap_err();
        assert!(matches!(err, OcrError::ModelLoad(_)));

        // Nothing is cached after a failed load
        let err = engine.recognize(b"not an image", "eng").await.unwrap_err();
        assert!(matches!(err, OcrError::ModelLoad(_)));
    }
}
