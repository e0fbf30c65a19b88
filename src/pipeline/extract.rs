//! Document collaborators: text extraction and first-page rasterisation.
//!
//! Both run inside `tokio::task::spawn_blocking` because pdfium wraps a
//! C++ library with thread-local state that must not be driven from async
//! worker threads.
//!
//! Extraction deliberately returns `Ok(None)` — not an empty string — when
//! the text layer is below [`MIN_EXTRACTED_CHARS`]: a near-empty layer
//! almost always means a scanned image, and the orchestrator treats that
//! the same as an empty-input validation failure.

use async_trait::async_trait;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{StageError, TailorError};

/// Below this many extracted characters the document is treated as "likely
/// a scanned image, not real text".
pub const MIN_EXTRACTED_CHARS: usize = 80;

/// Longest edge of the rendered first page, in pixels. Enough for a vision
/// model to read résumé-sized type without blowing up the request body.
const RENDER_MAX_PIXELS: i32 = 1400;

/// First-page rendering collaborator.
///
/// The orchestrator treats any `Err` as "render unavailable" and records
/// the visual check as absent; rendering failures never fail the run.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render_first_page(&self, document: &Path) -> Result<DynamicImage, StageError>;
}

/// Production renderer backed by pdfium.
pub struct PdfiumRenderer;

#[async_trait]
impl PageRenderer for PdfiumRenderer {
    async fn render_first_page(&self, document: &Path) -> Result<DynamicImage, StageError> {
        let path = document.to_path_buf();
        tokio::task::spawn_blocking(move || render_first_page_blocking(&path))
            .await
            .map_err(|e| StageError::RenderUnavailable {
                detail: format!("render task panicked: {e}"),
            })?
    }
}

fn render_first_page_blocking(path: &Path) -> Result<DynamicImage, StageError> {
    let pdfium = Pdfium::default();
    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| StageError::RenderUnavailable {
            detail: format!("{e:?}"),
        })?;

    let page = document
        .pages()
        .get(0)
        .map_err(|e| StageError::RenderUnavailable {
            detail: format!("{e:?}"),
        })?;

    let render_config = PdfRenderConfig::new()
        .set_target_width(RENDER_MAX_PIXELS)
        .set_maximum_height(RENDER_MAX_PIXELS);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| StageError::RenderUnavailable {
            detail: format!("{e:?}"),
        })?;

    let image = bitmap.as_image();
    debug!("rendered first page → {}x{} px", image.width(), image.height());
    Ok(image)
}

/// Validate that `path` points at a readable PDF (existence, permission,
/// `%PDF` magic bytes), returning the canonical path.
pub fn resolve_document(path: &Path) -> Result<PathBuf, TailorError> {
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(TailorError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            use std::io::Read;
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(TailorError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(TailorError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(TailorError::FileNotFound { path });
        }
    }

    Ok(path)
}

/// Extract the full text layer of a PDF.
///
/// Returns `Ok(None)` when the extracted content is below
/// [`MIN_EXTRACTED_CHARS`]. Errors only for file-level problems (corrupt
/// document, unreadable file).
pub async fn extract_text(document: &Path) -> Result<Option<String>, TailorError> {
    let path = document.to_path_buf();
    tokio::task::spawn_blocking(move || extract_text_blocking(&path))
        .await
        .map_err(|e| TailorError::Internal(format!("extract task panicked: {e}")))?
}

fn extract_text_blocking(path: &Path) -> Result<Option<String>, TailorError> {
    let pdfium = Pdfium::default();
    let document =
        pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| TailorError::DocumentUnreadable {
                path: path.to_path_buf(),
                detail: format!("{e:?}"),
            })?;

    let mut text = String::new();
    for page in document.pages().iter() {
        if let Ok(page_text) = page.text() {
            text.push_str(&page_text.all());
            text.push('\n');
        }
    }

    let trimmed_len = text.trim().chars().count();
    debug!("extracted {} chars from {}", trimmed_len, path.display());

    if trimmed_len < MIN_EXTRACTED_CHARS {
        return Ok(None);
    }
    Ok(Some(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn resolve_missing_file() {
        let err = resolve_document(Path::new("/no/such/resume.pdf")).unwrap_err();
        assert!(matches!(err, TailorError::FileNotFound { .. }));
    }

    #[test]
    fn resolve_rejects_non_pdf_magic() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"PK\x03\x04 definitely a zip").unwrap();
        let err = resolve_document(f.path()).unwrap_err();
        assert!(matches!(err, TailorError::NotAPdf { .. }));
    }

    #[test]
    fn resolve_accepts_pdf_magic() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7 rest of file").unwrap();
        assert!(resolve_document(f.path()).is_ok());
    }
}
