//! PDF Form MCP Server Library
//!
//! This crate provides MCP tools for working with fillable PDF forms through pdftk:
//! - `extract_form_fields`: Extract the grouped field model of a form
//! - `fill_form`: Fill form fields and write a new PDF
//! - `load_saved_fields`: Load a previously saved field model
//! - `list_forms`: List PDF files in a directory
//! - `check_toolkit`: Report whether pdftk is available

pub mod error;
pub mod pdf;
pub mod server;
pub mod source;

pub use error::{Error, Result};
pub use server::{
    escape_field_name, restore_field_name, run_server, run_server_with_config, FillFormParams,
    FillFormResult, FormFieldsResult, FormFileInfo, ListFormsParams, ListFormsResult,
    PdfFormServer, PdfSource, ServerConfig,
};
