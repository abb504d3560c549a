//! Error kinds surfaced by the diff core.
//!
//! Validation errors (`UnsavedChanges`, `NoSuitableWindow`,
//! `UnsupportedRuntime`) are reported before any state is created. Setup
//! errors wrap the underlying cause and are only returned after partial
//! state has been rolled back. Failures inside UI teardown are never
//! surfaced at all; cleanup logs and keeps going.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
  #[error("{} has unsaved changes, save or discard them first", path.display())]
  UnsavedChanges { path: PathBuf },

  #[error("no suitable editor window to host the diff")]
  NoSuitableWindow,

  #[error("editor refused to allocate a buffer for {name}")]
  BufferCreationFailed { name: String },

  #[error("inline layout requires a line-diff primitive")]
  UnsupportedRuntime,

  #[error("internal error: {0}")]
  Internal(String),

  #[error("diff setup failed: {source}")]
  SetupFailed {
    #[source]
    source: Box<BridgeError>,
  },
}

impl BridgeError {
  pub fn internal(message: impl Into<String>) -> Self {
    BridgeError::Internal(message.into())
  }

  /// Wrap a post-validation failure once rollback has completed.
  pub fn setup(source: BridgeError) -> Self {
    BridgeError::SetupFailed {
      source: Box::new(source),
    }
  }
}
