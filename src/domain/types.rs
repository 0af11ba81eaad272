//! Shared domain enumerations aligned with persisted database enums.

pub use postline_api_types::{UnknownVisibility, Visibility};
