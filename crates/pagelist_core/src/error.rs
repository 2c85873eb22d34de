//! Error types

use thiserror::Error;

use crate::context::ElementId;

/// Errors raised by layout context and configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    /// The element was never registered or has already been unmounted
    #[error("Unknown element: {0:?}")]
    UnknownElement(ElementId),

    /// A configuration value is out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for layout operations
pub type Result<T> = std::result::Result<T, LayoutError>;
