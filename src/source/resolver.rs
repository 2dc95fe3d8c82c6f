//! Source resolution for PDF data
//!
//! pdftk works on files, so every source resolves to a path on disk. Uploaded
//! (base64) documents are stored in the upload directory under a fresh UUID
//! name; the returned path stays valid for later fills of the same form.

use crate::error::{Error, Result};
use base64::Engine;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

const PDF_MAGIC: &[u8] = b"%PDF";

/// A PDF available on disk
#[derive(Debug, Clone)]
pub struct ResolvedPdf {
    /// Absolute path of the document
    pub path: PathBuf,
    /// Caller-facing name of the source
    pub source_name: String,
}

/// Resolve a file path to an absolute path of an existing PDF
pub fn resolve_path<P: AsRef<Path>>(path: P) -> Result<ResolvedPdf> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(Error::InputNotFound {
            path: path.display().to_string(),
        });
    }

    // Validate PDF header
    let mut header = [0u8; 4];
    let readable = std::fs::File::open(path)
        .and_then(|mut f| f.read_exact(&mut header))
        .is_ok();
    if !readable || header != PDF_MAGIC {
        return Err(Error::InvalidPdf {
            reason: "Not a valid PDF file".to_string(),
        });
    }

    Ok(ResolvedPdf {
        path: std::fs::canonicalize(path)?,
        source_name: path.display().to_string(),
    })
}

/// Decode a base64 upload and store it as `<upload_dir>/<uuid>.pdf`
pub fn resolve_base64(base64_data: &str, upload_dir: &Path) -> Result<ResolvedPdf> {
    let engine = base64::engine::general_purpose::STANDARD;
    let data = engine.decode(base64_data)?;

    // Validate PDF header
    if data.len() < 4 || &data[0..4] != PDF_MAGIC {
        return Err(Error::InvalidPdf {
            reason: "Decoded data is not a valid PDF file".to_string(),
        });
    }

    std::fs::create_dir_all(upload_dir)?;
    let path = upload_dir.join(format!("{}.pdf", uuid::Uuid::new_v4()));
    std::fs::write(&path, &data)?;

    tracing::info!(path = %path.display(), bytes = data.len(), "stored uploaded PDF");

    Ok(ResolvedPdf {
        path: std::fs::canonicalize(&path)?,
        source_name: "<base64>".to_string(),
    })
}

/// Remove stored uploads (`*.pdf` directly in `upload_dir`) last modified more
/// than `max_age` ago. Returns how many were removed; a missing directory
/// counts as empty.
pub fn sweep_uploads(upload_dir: &Path, max_age: Duration) -> Result<usize> {
    let entries = match std::fs::read_dir(upload_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(Error::Io(e)),
    };

    let now = SystemTime::now();
    let mut removed = 0;

    for entry in entries.flatten() {
        let path = entry.path();
        let is_pdf = path.extension().map(|ext| ext == "pdf").unwrap_or(false);
        if !is_pdf || !path.is_file() {
            continue;
        }

        let age = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());
        if !matches!(age, Some(age) if age > max_age) {
            continue;
        }

        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove old upload")
            }
        }
    }

    if removed > 0 {
        tracing::info!(dir = %upload_dir.display(), removed, "removed old uploads");
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    // "%PDF-1.4\n"
    const MINIMAL_PDF_BASE64: &str = "JVBERi0xLjQK";

    #[test]
    fn test_resolve_base64_invalid() {
        let dir = tempfile::tempdir().unwrap();
        // Valid base64 but not PDF
        let result = resolve_base64("SGVsbG8gV29ybGQ=", dir.path()); // "Hello World"
        assert!(matches!(result, Err(Error::InvalidPdf { .. })));
    }

    #[test]
    fn test_resolve_base64_invalid_base64() {
        let dir = tempfile::tempdir().unwrap();
        let result = resolve_base64("not valid base64!!!", dir.path());
        assert!(matches!(result, Err(Error::Base64Decode(_))));
    }

    #[test]
    fn test_resolve_base64_stores_upload() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("uploads");

        let first = resolve_base64(MINIMAL_PDF_BASE64, &uploads).unwrap();
        let second = resolve_base64(MINIMAL_PDF_BASE64, &uploads).unwrap();

        assert_eq!(first.source_name, "<base64>");
        assert!(first.path.is_absolute());
        assert_eq!(first.path.extension().unwrap(), "pdf");
        assert_eq!(std::fs::read(&first.path).unwrap(), b"%PDF-1.4\n");
        assert_ne!(first.path, second.path);
    }

    fn age_file(path: &Path, age: Duration) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[test]
    fn test_sweep_uploads_removes_only_old_pdfs() {
        let dir = tempfile::tempdir().unwrap();
        let day = Duration::from_secs(24 * 60 * 60);

        let old = resolve_base64(MINIMAL_PDF_BASE64, dir.path()).unwrap();
        let fresh = resolve_base64(MINIMAL_PDF_BASE64, dir.path()).unwrap();
        let old_notes = dir.path().join("notes.txt");
        std::fs::write(&old_notes, b"keep").unwrap();
        age_file(&old.path, 2 * day);
        age_file(&old_notes, 2 * day);

        assert_eq!(sweep_uploads(dir.path(), day).unwrap(), 1);
        assert!(!old.path.exists());
        assert!(fresh.path.exists());
        assert!(old_notes.exists());
    }

    #[test]
    fn test_sweep_uploads_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            sweep_uploads(&dir.path().join("never-created"), Duration::ZERO).unwrap(),
            0
        );
    }

    #[test]
    fn test_resolve_path_not_found() {
        let result = resolve_path("/nonexistent/path/file.pdf");
        assert!(matches!(result, Err(Error::InputNotFound { .. })));
    }

    #[test]
    fn test_resolve_path_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = resolve_path(dir.path());
        assert!(matches!(result, Err(Error::InputNotFound { .. })));
    }

    #[test]
    fn test_resolve_path_not_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"just text").unwrap();
        let result = resolve_path(&path);
        assert!(matches!(result, Err(Error::InvalidPdf { .. })));
    }

    #[test]
    fn test_resolve_path_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("form.pdf");
        std::fs::write(&path, b"%PDF-1.7\n%%EOF\n").unwrap();

        let resolved = resolve_path(&path).unwrap();
        assert!(resolved.path.is_absolute());
        assert_eq!(resolved.source_name, path.display().to_string());
    }
}
