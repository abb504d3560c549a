//! Protocol payloads exchanged with the assistant CLI.
//!
//! The transport itself lives outside this crate; these are the shapes it
//! carries. Tool replies are lists of content blocks, errors use the
//! JSON-RPC style `{ code, message, data }` envelope.

use serde::{
  Deserialize,
  Serialize,
};

use crate::error::BridgeError;

pub const FILE_SAVED: &str = "FILE_SAVED";
pub const DIFF_REJECTED: &str = "DIFF_REJECTED";
pub const TAB_CLOSED: &str = "TAB_CLOSED";

pub const INVALID_PARAMS_ERROR_CODE: i64 = -32602;
pub const METHOD_NOT_FOUND_ERROR_CODE: i64 = -32601;
pub const INTERNAL_ERROR_CODE: i64 = -32603;
pub const REQUEST_FAILED_ERROR_CODE: i64 = -32000;

/// One block of a tool reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
  Text { text: String },
}

impl ContentBlock {
  pub fn text(text: impl Into<String>) -> Self {
    ContentBlock::Text { text: text.into() }
  }

  pub fn as_text(&self) -> &str {
    match self {
      ContentBlock::Text { text } => text,
    }
  }
}

/// A successful tool reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
  pub content: Vec<ContentBlock>,
}

impl ToolResult {
  pub fn text_blocks<I, S>(blocks: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    ToolResult {
      content: blocks.into_iter().map(ContentBlock::text).collect(),
    }
  }

  /// `[FILE_SAVED, <final file content>]`
  pub fn file_saved(content: &str) -> Self {
    Self::text_blocks([FILE_SAVED, content])
  }

  /// `[DIFF_REJECTED, <tab_name>]`
  pub fn diff_rejected(tab_name: &str) -> Self {
    Self::text_blocks([DIFF_REJECTED, tab_name])
  }

  pub fn tab_closed() -> Self {
    Self::text_blocks([TAB_CLOSED])
  }

  pub fn closed_diff_tabs(count: usize) -> Self {
    Self::text_blocks([format!("CLOSED_{count}_DIFF_TABS")])
  }
}

/// Error envelope returned to the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
  pub code:    i64,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data:    Option<String>,
}

impl RpcError {
  pub fn invalid_params(message: impl Into<String>) -> Self {
    RpcError {
      code:    INVALID_PARAMS_ERROR_CODE,
      message: message.into(),
      data:    None,
    }
  }

  pub fn method_not_found(method: &str) -> Self {
    RpcError {
      code:    METHOD_NOT_FOUND_ERROR_CODE,
      message: format!("unknown method: {method}"),
      data:    None,
    }
  }

  pub fn internal(message: impl Into<String>) -> Self {
    RpcError {
      code:    INTERNAL_ERROR_CODE,
      message: message.into(),
      data:    None,
    }
  }
}

impl From<BridgeError> for RpcError {
  fn from(err: BridgeError) -> Self {
    match err {
      BridgeError::Internal(message) => RpcError {
        code: INTERNAL_ERROR_CODE,
        message,
        data: None,
      },
      BridgeError::SetupFailed { source } => RpcError {
        code:    REQUEST_FAILED_ERROR_CODE,
        message: "diff setup failed".to_string(),
        data:    Some(source.to_string()),
      },
      other => RpcError {
        code:    REQUEST_FAILED_ERROR_CODE,
        message: other.to_string(),
        data:    None,
      },
    }
  }
}
