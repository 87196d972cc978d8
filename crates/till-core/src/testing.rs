//! Scripted OCR and rasterizer doubles shared by the unit tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use crate::error::{OcrError, PdfError};
use crate::extraction::TextExtractor;
use crate::models::config::TillConfig;
use crate::models::receipt::StoredFile;
use crate::ocr::OcrCapability;
use crate::pdf::Rasterizer;
use crate::service::ReceiptService;
use crate::storage::FileStorage;
use crate::store::MemoryStore;

enum Script {
    Text(String),
    Fail(String),
    Hang,
}

pub(crate) struct FakeOcr {
    script: Script,
    calls: AtomicUsize,
}

impl FakeOcr {
    pub(crate) fn text(text: &str) -> Self {
        Self::scripted(Script::Text(text.to_string()))
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self::scripted(Script::Fail(message.to_string()))
    }

    pub(crate) fn hanging() -> Self {
        Self::scripted(Script::Hang)
    }

    fn scripted(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrCapability for FakeOcr {
    async fn recognize(&self, _image: &[u8], _language: &str) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Text(text) => Ok(text.clone()),
            Script::Fail(message) => Err(OcrError::Recognition(message.clone())),
            Script::Hang => std::future::pending().await,
        }
    }
}

/// Writes a placeholder raster and remembers where it put it.
pub(crate) struct FakeRasterizer {
    fail: bool,
    produced: Mutex<Vec<PathBuf>>,
}

impl FakeRasterizer {
    pub(crate) fn new() -> Self {
        Self {
            fail: false,
            produced: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub(crate) fn produced(&self) -> Vec<PathBuf> {
        self.produced.lock().unwrap().clone()
    }
}

#[async_trait]
impl Rasterizer for FakeRasterizer {
    async fn rasterize(
        &self,
        _pdf_path: &Path,
        page: u32,
        out_dir: &Path,
    ) -> Result<PathBuf, PdfError> {
        if self.fail {
            return Err(PdfError::NoPages);
        }
        let path = out_dir.join(format!("page-{}.png", page));
        std::fs::write(&path, b"raster").map_err(|e| PdfError::Render(e.to_string()))?;
        self.produced.lock().unwrap().push(path.clone());
        Ok(path)
    }
}

/// A [`ReceiptService`] over a memory store, scripted OCR and a scratch
/// upload directory.
pub(crate) struct Harness {
    pub(crate) service: ReceiptService,
    pub(crate) store: Arc<MemoryStore>,
    pub(crate) ocr: Arc<FakeOcr>,
    _dir: TempDir,
}

impl Harness {
    pub(crate) fn new(ocr: FakeOcr) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = TillConfig::default();

        let store = Arc::new(MemoryStore::new());
        let ocr = Arc::new(ocr);
        let extractor = TextExtractor::new(ocr.clone(), Arc::new(FakeRasterizer::new()), &config);
        let files = FileStorage::new(dir.path().join("uploads"));

        let service = ReceiptService::new(store.clone(), store.clone(), files, extractor, &config);
        Self {
            service,
            store,
            ocr,
            _dir: dir,
        }
    }

    /// Store a placeholder upload.
    pub(crate) async fn stored(&self, name: &str, mime_type: &str) -> StoredFile {
        self.service
            .files()
            .store(b"receipt bytes", name, mime_type)
            .await
            .unwrap()
    }
}
