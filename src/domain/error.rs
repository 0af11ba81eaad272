use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
}

impl DomainError {
    pub fn missing(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    pub fn too_long(field: &'static str, max: usize) -> Self {
        Self::TooLong { field, max }
    }
}
