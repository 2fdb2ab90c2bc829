// bistro/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BistroError {
    /// One combined error for every missing or malformed booking field.
    #[error("{}", problems.join(", "))]
    Validation { problems: Vec<String> },

    #[error("Invalid {field} format: '{value}'")]
    InvalidReference { field: &'static str, value: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Store operation failed. Source: {source}")]
    Persistence {
        #[source]
        source: AnyhowError,
    },

    #[error("No handler registered for job type '{job_type}'")]
    HandlerMissing { job_type: String },

    #[error("Malformed payload for job type '{job_type}'. Source: {source}")]
    Payload {
        job_type: String,
        #[source]
        source: AnyhowError,
    },

    #[error("Internal bistro error: {0}")]
    Internal(String),
}

impl BistroError {
    pub fn validation(problem: impl Into<String>) -> Self {
        BistroError::Validation {
            problems: vec![problem.into()],
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        BistroError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Wraps any backend error (sqlx, io, ...) as a persistence failure.
    pub fn persistence<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        BistroError::Persistence {
            source: AnyhowError::new(err),
        }
    }
}

impl From<AnyhowError> for BistroError {
  fn from(err: AnyhowError) -> Self {
    // Avoid Persistence(Persistence(..)) when a BistroError went through anyhow.
    match err.downcast::<BistroError>() {
      Ok(inner) => inner,
      Err(err) => BistroError::Persistence { source: err },
    }
  }
}

pub type BistroResult<T, E = BistroError> = std::result::Result<T, E>;
