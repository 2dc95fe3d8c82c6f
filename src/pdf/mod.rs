//! PDF form processing layer
//!
//! This module provides form field extraction and form filling by driving
//! the pdftk command-line toolkit and interpreting its text outputs.

mod dump;
mod fdf;
mod fields;
mod forms;
mod hierarchy;
mod pdftk;
mod workspace;

pub use dump::parse_dump;
pub use fdf::{build_fdf, render_value, FDF_FOOTER, FDF_HEADER};
pub use fields::{fuse, Field, FieldInfo, GroupField, NAME_SEPARATOR};
pub use forms::{
    extract_form_fields, fill_form, load_field_info, save_field_info, sidecar_path,
};
pub use hierarchy::parse_keys;
pub use pdftk::{run_command, Pdftk, PdftkConfig, PdftkMode, DEFAULT_TIMEOUT};
pub use workspace::Workspace;
