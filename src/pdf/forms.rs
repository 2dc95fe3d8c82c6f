//! Form operations
//!
//! Extraction runs pdftk twice (field dump and FDF export) in one private
//! workspace, parses both outputs and fuses them. Filling writes an FDF next
//! to the pdftk output in a private workspace and copies the filled document
//! to its destination. Workspaces are removed when the operation returns.

use crate::error::{Error, Result};
use crate::pdf::dump::parse_dump;
use crate::pdf::fdf::build_fdf;
use crate::pdf::fields::{fuse, FieldInfo};
use crate::pdf::hierarchy::parse_keys;
use crate::pdf::pdftk::{Pdftk, PdftkMode};
use crate::pdf::workspace::Workspace;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

const DUMP_FILE: &str = "fields.dump";
const FDF_EXPORT_FILE: &str = "fields.fdf";
const FILL_DATA_FILE: &str = "data.fdf";
const FILLED_FILE: &str = "output.pdf";

/// Check that the input exists and make its path absolute for pdftk.
fn absolute_input(pdf: &Path) -> Result<PathBuf> {
    if !pdf.exists() {
        return Err(Error::InputNotFound {
            path: pdf.display().to_string(),
        });
    }
    Ok(std::fs::canonicalize(pdf)?)
}

async fn read_output(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Error::ParseFailed {
            reason: format!("{}: {}", path.display(), e),
        })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Extract the form field model of a PDF.
pub async fn extract_form_fields(pdftk: &Pdftk, pdf: &Path) -> Result<FieldInfo> {
    let input = absolute_input(pdf)?;
    let workspace = Workspace::new("pdf-fields-")?;

    let dump_path = workspace.file(DUMP_FILE);
    let export_path = workspace.file(FDF_EXPORT_FILE);
    let dump_mode = PdftkMode::DumpDataFields;
    let export_mode = PdftkMode::GenerateFdf;

    tokio::try_join!(
        pdftk.run(workspace.path(), &input, &dump_mode, &dump_path),
        pdftk.run(workspace.path(), &input, &export_mode, &export_path),
    )?;

    let dump_fields = parse_dump(&read_output(&dump_path).await?);
    let keys = parse_keys(&read_output(&export_path).await?);
    let records = dump_fields.len();
    let key_count = keys.len();

    let info = fuse(pdf.display().to_string(), dump_fields, &keys);

    tracing::info!(
        pdf = %pdf.display(),
        records,
        keys = key_count,
        fields = info.total_fields(),
        groups = info.group_fields.len(),
        "extracted form fields"
    );

    Ok(info)
}

/// Fill a form with `values` and write the result to `dest`.
///
/// Values must be JSON scalars. An existing file at `dest` is replaced.
pub async fn fill_form(
    pdftk: &Pdftk,
    pdf: &Path,
    values: &Map<String, Value>,
    dest: &Path,
) -> Result<PathBuf> {
    let input = absolute_input(pdf)?;
    let fdf = build_fdf(values)?;

    let workspace = Workspace::new("pdf-fill-")?;
    let data_path = workspace.file(FILL_DATA_FILE);
    tokio::fs::write(&data_path, fdf)
        .await
        .map_err(|e| Error::TempResourceFailed {
            reason: format!("Failed to write fill data: {}", e),
        })?;

    let output_path = workspace.file(FILLED_FILE);
    let mode = PdftkMode::FillForm { fdf: data_path };
    pdftk
        .run(workspace.path(), &input, &mode, &output_path)
        .await?;

    place_output(&output_path, dest).await?;

    tracing::info!(
        pdf = %pdf.display(),
        output = %dest.display(),
        fields = values.len(),
        "filled form"
    );

    Ok(dest.to_path_buf())
}

async fn place_output(src: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    match tokio::fs::remove_file(dest).await {
        Ok(()) => tracing::debug!(path = %dest.display(), "replaced existing output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::Io(e)),
    }

    tokio::fs::copy(src, dest).await?;
    Ok(())
}

/// Location of the saved field model for a PDF: `<stem>.json` beside it.
pub fn sidecar_path(pdf: &Path) -> PathBuf {
    pdf.with_extension("json")
}

/// Save a field model beside its PDF.
pub async fn save_field_info(pdf: &Path, info: &FieldInfo) -> Result<PathBuf> {
    let path = sidecar_path(pdf);
    let json = serde_json::to_vec_pretty(info)?;
    tokio::fs::write(&path, json).await?;
    tracing::debug!(path = %path.display(), "saved field info");
    Ok(path)
}

/// Load a previously saved field model for a PDF.
///
/// Both the PDF and its sidecar must exist. The stored `pdf_path` is replaced
/// by `pdf` so the result can be passed straight to a fill.
pub async fn load_field_info(pdf: &Path) -> Result<FieldInfo> {
    if !pdf.exists() {
        return Err(Error::InputNotFound {
            path: pdf.display().to_string(),
        });
    }

    let path = sidecar_path(pdf);
    let data = match tokio::fs::read(&path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::InputNotFound {
                path: path.display().to_string(),
            })
        }
        Err(e) => return Err(Error::Io(e)),
    };

    let mut info: FieldInfo = serde_json::from_slice(&data)?;
    info.pdf_path = pdf.display().to_string();
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fields::Field;
    use crate::pdf::pdftk::PdftkConfig;
    use serde_json::json;
    use std::time::Duration;

    fn missing_pdftk() -> Pdftk {
        Pdftk::new(PdftkConfig {
            binary: PathBuf::from("definitely-not-a-real-pdftk"),
            timeout: Duration::from_secs(5),
        })
    }

    #[test]
    fn test_sidecar_path() {
        assert_eq!(
            sidecar_path(Path::new("/forms/w9.pdf")),
            PathBuf::from("/forms/w9.json")
        );
        assert_eq!(
            sidecar_path(Path::new("/forms/w9")),
            PathBuf::from("/forms/w9.json")
        );
    }

    #[tokio::test]
    async fn test_extract_missing_input() {
        let result = extract_form_fields(&missing_pdftk(), Path::new("/nonexistent/form.pdf")).await;
        assert!(matches!(result, Err(Error::InputNotFound { .. })));
    }

    #[tokio::test]
    async fn test_extract_surfaces_tool_failure() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("form.pdf");
        std::fs::write(&pdf, b"%PDF-1.4\n").unwrap();

        let result = extract_form_fields(&missing_pdftk(), &pdf).await;
        assert!(matches!(result, Err(Error::ToolExecutionFailed { .. })));
    }

    #[tokio::test]
    async fn test_fill_rejects_nested_value_before_running_tool() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("form.pdf");
        std::fs::write(&pdf, b"%PDF-1.4\n").unwrap();

        let values = match json!({"name": {"first": "Alice"}}) {
            Value::Object(m) => m,
            _ => unreachable!(),
        };
        let result = fill_form(&missing_pdftk(), &pdf, &values, &dir.path().join("out.pdf")).await;
        assert!(matches!(result, Err(Error::InvalidFieldValue { .. })));
    }

    #[tokio::test]
    async fn test_save_and_load_field_info() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("form.pdf");
        std::fs::write(&pdf, b"%PDF-1.4\n").unwrap();

        let info = FieldInfo {
            pdf_path: "/original/location.pdf".to_string(),
            group_fields: vec![],
            single_fields: vec![Field {
                field_type: "Text".to_string(),
                field_name: "name".to_string(),
                view_name: None,
                field_options: vec![],
            }],
        };

        let saved = save_field_info(&pdf, &info).await.unwrap();
        assert_eq!(saved, dir.path().join("form.json"));

        let loaded = load_field_info(&pdf).await.unwrap();
        assert_eq!(loaded.pdf_path, pdf.display().to_string());
        assert_eq!(loaded.single_fields, info.single_fields);
    }

    #[tokio::test]
    async fn test_load_without_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("form.pdf");
        std::fs::write(&pdf, b"%PDF-1.4\n").unwrap();

        let result = load_field_info(&pdf).await;
        assert!(matches!(result, Err(Error::InputNotFound { .. })));
    }
}
