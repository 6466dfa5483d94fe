//! Shared runtime utilities for GeoFill.
//!
//! This crate re-exports the data contracts from `geofill_schema` and adds the
//! pure helpers that operate on them (endpoint normalization, model output
//! extraction, form-mapping cleanup, command text) without pulling in the
//! network or storage layers of `geofill_core`.

pub use geofill_schema::*;

pub mod command_text;
pub mod commands;
pub mod endpoint;
pub mod model_json;
pub mod sanitize;
pub mod width;

pub use command_text::{parse_command_line, CommandParseError};
pub use commands::{ArchiveAction, FillMode, HistoryAction, ProfileCommand, ThemeChoice};
pub use endpoint::normalize_api_url;
pub use model_json::{extract_model_json, parse_model_json, ModelJsonError};
pub use sanitize::{classify_field, sanitize_form_mapping, CanonicalValues, FieldClass};
pub use width::to_halfwidth;
