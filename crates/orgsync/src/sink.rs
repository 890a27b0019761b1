//! Downstream boundary for publishing sync results.

use async_trait::async_trait;
use thiserror::Error;

use crate::entity::DeferredEntity;

/// Failure reported by the downstream catalog. Opaque to this crate.
#[derive(Debug, Error)]
#[error("entity sink rejected the mutation: {message}")]
pub struct SinkError {
    message: String,
}

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Receives the complete output of a sync pass.
#[async_trait]
pub trait EntitySink: Send + Sync {
    /// Replace all previously published entities with `entities`.
    ///
    /// Full-replacement semantics: anything published earlier and absent
    /// from this batch disappears downstream.
    async fn apply_full_mutation(&self, entities: Vec<DeferredEntity>) -> Result<(), SinkError>;
}
