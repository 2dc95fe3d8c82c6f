//! MCP Server implementation using rmcp

use crate::pdf::{
    extract_form_fields, fill_form, load_field_info, save_field_info, sidecar_path, Field,
    FieldInfo, GroupField, Pdftk, PdftkConfig, NAME_SEPARATOR,
};
use crate::source::{resolve_base64, resolve_path, sweep_uploads, ResolvedPdf};
use anyhow::Result;
use rmcp::{
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters, model::*,
    schemars::JsonSchema, service::RequestContext, tool, tool_handler, tool_router, RoleServer,
    ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Stand-in for the name separator in caller-facing JSON
pub const NAME_PLACEHOLDER: char = '#';

/// Replace the name separator with the transport placeholder.
pub fn escape_field_name(name: &str) -> String {
    name.chars()
        .map(|c| if c == NAME_SEPARATOR { NAME_PLACEHOLDER } else { c })
        .collect()
}

/// Undo [`escape_field_name`].
pub fn restore_field_name(name: &str) -> String {
    name.chars()
        .map(|c| if c == NAME_PLACEHOLDER { NAME_SEPARATOR } else { c })
        .collect()
}

/// PDF source specification
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum PdfSource {
    /// File path (absolute or relative)
    Path {
        /// Path to the PDF file
        path: String,
    },
    /// Base64 encoded PDF upload
    Base64 {
        /// Base64 encoded PDF content
        base64: String,
    },
}

impl<'de> serde::Deserialize<'de> for PdfSource {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;

        if let Some(obj) = value.as_object() {
            if let Some(v) = obj.get("path") {
                if let Some(s) = v.as_str() {
                    return Ok(PdfSource::Path {
                        path: s.to_string(),
                    });
                }
                return Err(serde::de::Error::custom("\"path\" must be a string"));
            }
            if let Some(v) = obj.get("base64") {
                if let Some(s) = v.as_str() {
                    return Ok(PdfSource::Base64 {
                        base64: s.to_string(),
                    });
                }
                return Err(serde::de::Error::custom("\"base64\" must be a string"));
            }
            let keys: Vec<&String> = obj.keys().collect();
            Err(serde::de::Error::custom(format!(
                "Invalid source: expected an object with \"path\" or \"base64\", but got keys: {:?}",
                keys
            )))
        } else {
            Err(serde::de::Error::custom(format!(
                "Invalid source: expected an object with \"path\" or \"base64\", but got {}",
                match &value {
                    serde_json::Value::Array(_) => "an array",
                    serde_json::Value::String(_) => "a string",
                    serde_json::Value::Number(_) => "a number",
                    serde_json::Value::Bool(_) => "a boolean",
                    serde_json::Value::Null => "null",
                    _ => "unknown type",
                }
            )))
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directories to expose as form resources and to sandbox paths into.
    /// Empty means no sandbox.
    pub resource_dirs: Vec<String>,
    /// Where base64 uploads are stored
    pub upload_dir: PathBuf,
    /// Where filled forms are written when no output path is given
    pub output_dir: PathBuf,
    /// Stored uploads older than this are removed at startup. `None` keeps
    /// them forever.
    pub upload_max_age: Option<Duration>,
    /// pdftk executable and time budget
    pub pdftk: PdftkConfig,
}

/// Default retention for stored uploads
pub const DEFAULT_UPLOAD_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

impl Default for ServerConfig {
    fn default() -> Self {
        let base = std::env::temp_dir().join("pdf-form-mcp-server");
        Self {
            resource_dirs: Vec::new(),
            upload_dir: base.join("uploads"),
            output_dir: base.join("filled"),
            upload_max_age: Some(DEFAULT_UPLOAD_MAX_AGE),
            pdftk: PdftkConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Build a configuration from environment variables:
    ///
    /// - `PDF_FORM_RESOURCE_DIRS`: resource directories, separated like `PATH`
    /// - `PDF_FORM_UPLOAD_DIR`, `PDF_FORM_OUTPUT_DIR`
    /// - `PDF_FORM_UPLOAD_MAX_AGE_SECS`: upload retention, `0` keeps uploads
    /// - `PDFTK_PATH`: pdftk executable
    /// - `PDFTK_TIMEOUT_SECS`: per-invocation budget in seconds
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let mut config = Self::default();

        if let Some(dirs) = lookup("PDF_FORM_RESOURCE_DIRS") {
            config.resource_dirs = std::env::split_paths(&dirs)
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| p.display().to_string())
                .collect();
        }
        if let Some(dir) = lookup("PDF_FORM_UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("PDF_FORM_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(secs) = lookup("PDF_FORM_UPLOAD_MAX_AGE_SECS") {
            let secs = secs.to_string_lossy().to_string();
            match secs.trim().parse::<u64>() {
                Ok(0) => config.upload_max_age = None,
                Ok(n) => config.upload_max_age = Some(Duration::from_secs(n)),
                Err(_) => {
                    tracing::warn!(value = %secs, "ignoring invalid PDF_FORM_UPLOAD_MAX_AGE_SECS")
                }
            }
        }
        if let Some(binary) = lookup("PDFTK_PATH") {
            config.pdftk.binary = PathBuf::from(binary);
        }
        if let Some(secs) = lookup("PDFTK_TIMEOUT_SECS") {
            let secs = secs.to_string_lossy().to_string();
            match secs.trim().parse::<u64>() {
                Ok(n) if n > 0 => config.pdftk.timeout = Duration::from_secs(n),
                _ => tracing::warn!(value = %secs, "ignoring invalid PDFTK_TIMEOUT_SECS"),
            }
        }

        config
    }
}

/// PDF Form MCP Server
#[derive(Clone)]
pub struct PdfFormServer {
    pdftk: Pdftk,
    tool_router: ToolRouter<Self>,
    /// Server configuration
    config: Arc<ServerConfig>,
}

// ============================================================================
// Request/Response types for extract_form_fields and load_saved_fields
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExtractFormFieldsParams {
    /// PDF sources to process
    pub sources: Vec<PdfSource>,
    /// Save the extracted fields as `<name>.json` next to the PDF
    #[serde(default)]
    pub save_sidecar: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LoadSavedFieldsParams {
    /// Path to a PDF that has a saved `<name>.json` field file beside it
    pub path: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct FormFieldsResult {
    pub source: String,
    /// Path to pass to fill_form
    pub pdf_path: String,
    /// Fields sharing a name prefix with siblings
    pub group_fields: Vec<GroupField>,
    /// Fields alone under their name prefix
    pub single_fields: Vec<Field>,
    pub total_fields: usize,
    /// Where the field file was saved (save_sidecar only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FormFieldsResult {
    fn from_info(source: String, info: FieldInfo, saved_to: Option<String>) -> Self {
        let total_fields = info.total_fields();
        let info = info.map_names(escape_field_name);
        Self {
            source,
            pdf_path: info.pdf_path,
            group_fields: info.group_fields,
            single_fields: info.single_fields,
            total_fields,
            saved_to,
            error: None,
        }
    }

    fn failed(source: String, message: String) -> Self {
        Self {
            source,
            pdf_path: String::new(),
            group_fields: vec![],
            single_fields: vec![],
            total_fields: 0,
            saved_to: None,
            error: Some(message),
        }
    }
}

// ============================================================================
// Request/Response types for fill_form
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FillFormParams {
    /// Source PDF containing form fields
    pub source: PdfSource,
    /// Field values keyed by field name as returned by extract_form_fields
    /// (`#` in place of `.`). Values must be strings, numbers, booleans or null.
    pub fields: BTreeMap<String, serde_json::Value>,
    /// Output file path (optional). Defaults to a new file in the output directory.
    #[serde(default)]
    pub output_path: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct FillFormResult {
    /// Source identifier
    pub source: String,
    /// Path of the filled PDF
    pub output_path: String,
    /// Number of field values handed to pdftk
    pub fields_submitted: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for list_forms
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListFormsParams {
    /// Directory to search for PDF forms
    pub directory: String,
    /// Search subdirectories recursively (default: false)
    #[serde(default)]
    pub recursive: bool,
    /// Filename pattern to filter (e.g., "w*.pdf"). Supports glob patterns.
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct FormFileInfo {
    /// Full path to the PDF file
    pub path: String,
    /// Filename only
    pub name: String,
    /// File size in bytes
    pub size: u64,
    /// Last modified time (RFC 3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    /// Whether a saved field file exists (usable with load_saved_fields)
    pub has_saved_fields: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ListFormsResult {
    /// Directory that was searched
    pub directory: String,
    /// PDF files found
    pub files: Vec<FormFileInfo>,
    /// Total number of files found
    pub total_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Response type for check_toolkit
// ============================================================================

#[derive(Debug, Serialize, JsonSchema)]
pub struct CheckToolkitResult {
    /// Configured pdftk executable
    pub binary: String,
    /// Whether pdftk could be started
    pub ready: bool,
    /// First line of `pdftk --version`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Tool implementations
// ============================================================================

#[tool_router]
impl PdfFormServer {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    /// Create a new PdfFormServer with full configuration
    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            pdftk: Pdftk::new(config.pdftk.clone()),
            tool_router: Self::tool_router(),
            config: Arc::new(config),
        }
    }

    /// Extract form fields from PDF files
    #[tool(
        description = "Extract the form fields of PDF files using pdftk. Returns each field's type, name, optional display label and options (checkbox states, choice values).

Fields whose names share a first segment (e.g. table rows) are returned in group_fields; all others in single_fields. In field names, '.' is replaced by '#'; use the names unchanged with fill_form.

Set save_sidecar to store the result as <name>.json beside the PDF for load_saved_fields.

Source format: each element must be one of {\"path\": \"/absolute/path.pdf\"} or {\"base64\": \"...\"}. Uploaded PDFs are stored and their pdf_path can be passed to fill_form."
    )]
    async fn extract_form_fields(
        &self,
        Parameters(params): Parameters<ExtractFormFieldsParams>,
    ) -> String {
        let mut results = Vec::new();

        for source in &params.sources {
            let result = self
                .process_extract_form_fields(source, &params)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "extract_form_fields failed");
                    FormFieldsResult::failed(Self::source_name(source), e.client_message())
                });
            results.push(result);
        }

        let response = serde_json::json!({ "results": results });
        serde_json::to_string_pretty(&response).unwrap_or_default()
    }

    /// Fill form fields in a PDF
    #[tool(
        description = "Fill form fields in a PDF with pdftk and write a new PDF. Returns the path of the filled document.

fields maps field names (as returned by extract_form_fields, '#' in place of '.') to values. Values may be strings, numbers, booleans or null; checkboxes take one of the field's options (e.g. \"Yes\" / \"Off\").

Source format: must be one of {\"path\": \"/absolute/path.pdf\"} or {\"base64\": \"...\"}"
    )]
    async fn fill_form(&self, Parameters(params): Parameters<FillFormParams>) -> String {
        let result = self.process_fill_form(&params).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "fill_form failed");
            FillFormResult {
                source: Self::source_name(&params.source),
                output_path: String::new(),
                fields_submitted: 0,
                error: Some(e.client_message()),
            }
        });

        let response = serde_json::json!({ "results": [result] });
        serde_json::to_string_pretty(&response).unwrap_or_default()
    }

    /// Load saved form fields
    #[tool(
        description = "Load the saved form fields of a PDF (the <name>.json file written by extract_form_fields with save_sidecar) without running pdftk. Useful for prepared example forms."
    )]
    async fn load_saved_fields(
        &self,
        Parameters(params): Parameters<LoadSavedFieldsParams>,
    ) -> String {
        let result = self
            .process_load_saved_fields(&params)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "load_saved_fields failed");
                FormFieldsResult::failed(params.path.clone(), e.client_message())
            });

        let response = serde_json::json!({ "results": [result] });
        serde_json::to_string_pretty(&response).unwrap_or_default()
    }

    /// List PDF forms in a directory
    #[tool(
        description = "List PDF files in a directory.

Returns for each file:
- Full path (can be used directly with other tools)
- Filename
- File size in bytes
- Last modified time
- Whether saved form fields exist for it

Supports recursive search and glob pattern filtering."
    )]
    async fn list_forms(&self, Parameters(params): Parameters<ListFormsParams>) -> String {
        let result = self.process_list_forms(&params).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "list_forms failed");
            ListFormsResult {
                directory: params.directory.clone(),
                files: vec![],
                total_count: 0,
                error: Some(e.client_message()),
            }
        });

        let response = serde_json::json!({ "results": [result] });
        serde_json::to_string_pretty(&response).unwrap_or_default()
    }

    /// Check that pdftk is available
    #[tool(description = "Check that the pdftk toolkit is installed and report its version.")]
    async fn check_toolkit(&self) -> String {
        let result = self.process_check_toolkit().await;
        let response = serde_json::json!({ "results": [result] });
        serde_json::to_string_pretty(&response).unwrap_or_default()
    }
}

impl PdfFormServer {
    fn source_name(source: &PdfSource) -> String {
        match source {
            PdfSource::Path { path } => path.clone(),
            PdfSource::Base64 { .. } => "<base64>".to_string(),
        }
    }

    fn resolve_source(&self, source: &PdfSource) -> crate::error::Result<ResolvedPdf> {
        match source {
            PdfSource::Path { path } => {
                self.validate_path_access(path)?;
                resolve_path(path)
            }
            PdfSource::Base64 { base64 } => resolve_base64(base64, &self.config.upload_dir),
        }
    }

    /// Directories a sandboxed path may live in: resource directories plus
    /// the server's own upload and output directories.
    fn allowed_roots(&self) -> Vec<PathBuf> {
        self.config
            .resource_dirs
            .iter()
            .map(PathBuf::from)
            .chain([self.config.upload_dir.clone(), self.config.output_dir.clone()])
            .filter_map(|dir| std::fs::canonicalize(dir).ok())
            .collect()
    }

    /// Validate that a path is within allowed directories.
    /// If no resource_dirs are configured, all paths are allowed.
    fn validate_path_access(&self, path: &str) -> crate::error::Result<PathBuf> {
        if self.config.resource_dirs.is_empty() {
            return Ok(PathBuf::from(path));
        }

        let canonical =
            std::fs::canonicalize(path).map_err(|_| crate::error::Error::PathAccessDenied {
                path: path.to_string(),
            })?;

        if self
            .allowed_roots()
            .iter()
            .any(|root| canonical.starts_with(root))
        {
            return Ok(canonical);
        }

        Err(crate::error::Error::PathAccessDenied {
            path: path.to_string(),
        })
    }

    /// Validate that an output path is within allowed directories.
    /// Canonicalizes the parent directory since the output file may not exist yet.
    fn validate_output_path_access(&self, path: &str) -> crate::error::Result<PathBuf> {
        if self.config.resource_dirs.is_empty() {
            return Ok(PathBuf::from(path));
        }

        let path_obj = Path::new(path);
        let parent = path_obj.parent().unwrap_or(Path::new("."));

        let canonical_parent =
            std::fs::canonicalize(parent).map_err(|_| crate::error::Error::PathAccessDenied {
                path: path.to_string(),
            })?;

        let canonical_target =
            canonical_parent.join(path_obj.file_name().unwrap_or(std::ffi::OsStr::new("")));

        if self
            .allowed_roots()
            .iter()
            .any(|root| canonical_target.starts_with(root))
        {
            return Ok(canonical_target);
        }

        Err(crate::error::Error::PathAccessDenied {
            path: path.to_string(),
        })
    }

    pub async fn process_extract_form_fields(
        &self,
        source: &PdfSource,
        params: &ExtractFormFieldsParams,
    ) -> crate::error::Result<FormFieldsResult> {
        let resolved = self.resolve_source(source)?;

        let info = extract_form_fields(&self.pdftk, &resolved.path).await?;

        let saved_to = if params.save_sidecar {
            let path = save_field_info(&resolved.path, &info).await?;
            Some(path.display().to_string())
        } else {
            None
        };

        Ok(FormFieldsResult::from_info(
            resolved.source_name,
            info,
            saved_to,
        ))
    }

    pub async fn process_fill_form(
        &self,
        params: &FillFormParams,
    ) -> crate::error::Result<FillFormResult> {
        let resolved = self.resolve_source(&params.source)?;

        let values: serde_json::Map<String, serde_json::Value> = params
            .fields
            .iter()
            .map(|(name, value)| (restore_field_name(name), value.clone()))
            .collect();

        let dest = match &params.output_path {
            Some(path) => self.validate_output_path_access(path)?,
            None => self
                .config
                .output_dir
                .join(format!("{}.pdf", uuid::Uuid::new_v4())),
        };

        let output = fill_form(&self.pdftk, &resolved.path, &values, &dest).await?;

        Ok(FillFormResult {
            source: resolved.source_name,
            output_path: output.display().to_string(),
            fields_submitted: values.len() as u32,
            error: None,
        })
    }

    pub async fn process_load_saved_fields(
        &self,
        params: &LoadSavedFieldsParams,
    ) -> crate::error::Result<FormFieldsResult> {
        let path = self.validate_path_access(&params.path)?;
        let info = load_field_info(&path).await?;
        Ok(FormFieldsResult::from_info(params.path.clone(), info, None))
    }

    pub async fn process_check_toolkit(&self) -> CheckToolkitResult {
        let binary = self.config.pdftk.binary.display().to_string();
        match self.pdftk.check_installed().await {
            Ok(version) => CheckToolkitResult {
                binary,
                ready: true,
                version: Some(version),
                error: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "pdftk readiness check failed");
                CheckToolkitResult {
                    binary,
                    ready: false,
                    version: None,
                    error: Some(e.client_message()),
                }
            }
        }
    }

    /// List PDF forms in a directory (public for testing)
    pub fn process_list_forms_public(
        &self,
        params: &ListFormsParams,
    ) -> crate::error::Result<ListFormsResult> {
        self.process_list_forms(params)
    }

    fn process_list_forms(&self, params: &ListFormsParams) -> crate::error::Result<ListFormsResult> {
        let dir_path = Path::new(&params.directory);

        if !dir_path.exists() {
            return Err(crate::error::Error::InputNotFound {
                path: params.directory.clone(),
            });
        }

        // Sandbox check: if resource_dirs are configured, directory must be within them
        self.validate_path_access(&params.directory)?;

        if !dir_path.is_dir() {
            return Err(crate::error::Error::InputNotFound {
                path: params.directory.clone(),
            });
        }

        let mut files = Vec::new();

        // Compile glob pattern if provided
        let pattern = params
            .pattern
            .as_ref()
            .and_then(|p| glob::Pattern::new(p).ok());

        Self::collect_forms(dir_path, params.recursive, &pattern, &mut files)?;

        // Sort by path for consistent ordering
        files.sort_by(|a, b| a.path.cmp(&b.path));

        let total_count = files.len() as u32;

        Ok(ListFormsResult {
            directory: params.directory.clone(),
            files,
            total_count,
            error: None,
        })
    }

    fn collect_forms(
        dir: &Path,
        recursive: bool,
        pattern: &Option<glob::Pattern>,
        files: &mut Vec<FormFileInfo>,
    ) -> crate::error::Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let Ok(entry) = entry else {
                continue;
            };
            let path = entry.path();

            if path.is_dir() {
                if recursive {
                    let _ = Self::collect_forms(&path, recursive, pattern, files);
                }
                continue;
            }

            let is_pdf = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("pdf"))
                .unwrap_or(false);
            if !path.is_file() || !is_pdf {
                continue;
            }

            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            if let Some(ref pat) = pattern {
                if !pat.matches(&name) {
                    continue;
                }
            }

            let metadata = std::fs::metadata(&path).ok();
            let size = metadata.as_ref().map(|m| m.len()).unwrap_or(0);
            let modified = metadata
                .as_ref()
                .and_then(|m| m.modified().ok())
                .map(|t| chrono::DateTime::<chrono::Utc>::from(t).to_rfc3339());

            files.push(FormFileInfo {
                has_saved_fields: sidecar_path(&path).is_file(),
                path: path.to_string_lossy().to_string(),
                name,
                size,
                modified,
            });
        }

        Ok(())
    }
}

impl Default for PdfFormServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_handler]
impl ServerHandler for PdfFormServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "PDF Form MCP Server extracts PDF form fields and fills forms using pdftk. \
                 PDF files in configured directories are exposed as resources whose content \
                 is the extracted field list."
                    .into(),
            ),
        }
    }

    /// List available PDF forms from configured directories
    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        let mut resources = Vec::new();

        for dir in self.config.resource_dirs.iter() {
            let params = ListFormsParams {
                directory: dir.clone(),
                recursive: true,
                pattern: None,
            };

            if let Ok(list_result) = self.process_list_forms_public(&params) {
                for file in list_result.files {
                    let uri = format!("file://{}", file.path);
                    let mut resource = RawResource::new(uri.clone(), file.name.clone());
                    resource.mime_type = Some("application/pdf".to_string());
                    resource.description = Some(format!(
                        "PDF form ({} bytes){}",
                        file.size,
                        if file.has_saved_fields {
                            ", saved fields available"
                        } else {
                            ""
                        }
                    ));
                    resource.size = Some(file.size as u32);

                    resources.push(Annotated {
                        raw: resource,
                        annotations: None,
                    });
                }
            }
        }

        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
            meta: Default::default(),
        })
    }

    /// Read a PDF form resource and return its field list as JSON
    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        let uri = &request.uri;

        let Some(path) = uri.strip_prefix("file://") else {
            return Err(ErrorData::invalid_params(
                "Only file:// URIs are supported",
                None,
            ));
        };

        let is_allowed = if self.config.resource_dirs.is_empty() {
            true
        } else if let Ok(canonical_path) = std::fs::canonicalize(path) {
            self.config.resource_dirs.iter().any(|dir| {
                std::fs::canonicalize(dir)
                    .map(|cd| canonical_path.starts_with(&cd))
                    .unwrap_or(false)
            })
        } else {
            false
        };

        if !is_allowed {
            return Err(ErrorData::invalid_params(
                "Resource not found in configured directories",
                None,
            ));
        }

        let source = PdfSource::Path {
            path: path.to_string(),
        };
        let params = ExtractFormFieldsParams {
            sources: vec![source.clone()],
            save_sidecar: false,
        };

        match self.process_extract_form_fields(&source, &params).await {
            Ok(result) => {
                let text = serde_json::to_string_pretty(&result)
                    .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;

                Ok(ReadResourceResult {
                    contents: vec![ResourceContents::TextResourceContents {
                        uri: uri.clone(),
                        mime_type: Some("application/json".to_string()),
                        text,
                        meta: Default::default(),
                    }],
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "read_resource failed");
                Err(ErrorData::internal_error(e.client_message(), None))
            }
        }
    }
}

/// Run the MCP server with configuration from the environment
pub async fn run_server() -> Result<()> {
    run_server_with_config(ServerConfig::from_env()).await
}

/// Run the MCP server with full configuration
pub async fn run_server_with_config(config: ServerConfig) -> Result<()> {
    if let Some(max_age) = config.upload_max_age {
        if let Err(e) = sweep_uploads(&config.upload_dir, max_age) {
            tracing::warn!(error = %e, "failed to sweep old uploads");
        }
    }

    let server = PdfFormServer::with_config(config);

    match server.pdftk.check_installed().await {
        Ok(version) => tracing::info!(version = %version, "pdftk available"),
        Err(e) => tracing::error!(
            error = %e,
            "pdftk readiness check failed, form tools will fail until it is installed"
        ),
    }

    tracing::info!("PDF Form MCP Server ready, waiting for connections...");

    let service = server.serve(rmcp::transport::io::stdio()).await?;
    service.waiting().await?;

    Ok(())
}
