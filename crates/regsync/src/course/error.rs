//! Data-shape errors raised while normalizing extracted course fields.
//!
//! These indicate a malformed source page that needs manual correction, so
//! they are fatal to the caller rather than degraded to "unavailable".

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CourseDataError {
    /// A numeric field's raw value did not parse as a number.
    #[error("field `{field}`: expected a numeric value, got `{raw}`")]
    NotNumeric { field: String, raw: String },

    /// A coercion received a raw-value shape it cannot handle.
    #[error("field `{field}`: unexpected raw value shape")]
    ShapeMismatch { field: String },

    /// A teacher block on the page carries no image source.
    #[error("teacher block `{display_name}` is missing an image")]
    TeacherImageMissing { display_name: String },

    /// An image path could not be resolved against the platform base URL.
    #[error("cannot resolve image path `{path}`: {message}")]
    BadImageUrl { path: String, message: String },
}
