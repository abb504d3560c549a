//! The interactive diff subsystem.
//!
//! An assistant sends `openDiff`; the controller materializes the diff in
//! the editor, registers its state under the caller-chosen tab name, and
//! suspends the reply on a one-shot channel. Editor events (save, buffer
//! close) resolve the state through the registry, which fires the
//! suspended reply. Cleanup of the UI footprint happens separately, driven
//! by the `closeTab` RPC, user commands, replacement, or shutdown.

mod controller;
mod layout;
mod registry;

use std::path::PathBuf;

use serde::Deserialize;
use tempfile::TempDir;
use the_linediff::InlineDiff;
use tokio::sync::oneshot;

pub use controller::open_diff;
pub use registry::{
  CleanupReason,
  DiffRegistry,
};

use crate::{
  editor::{
    DocumentId,
    HookId,
    TabId,
    WindowId,
  },
  rpc::ToolResult,
};

/// An `openDiff` request as sent by the assistant.
#[derive(Debug, Clone, Deserialize)]
pub struct DiffRequest {
  pub old_file_path:     PathBuf,
  pub new_file_path:     PathBuf,
  pub new_file_contents: String,
  /// Caller-chosen stable identifier; reusing it replaces the live diff.
  pub tab_name:          String,
}

/// Lifecycle of a single diff. Transitions only move away from `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffStatus {
  Pending,
  Saved,
  Rejected,
}

/// The materialized UI of a diff. Which windows and buffers exist depends
/// on the variant, so resolve and cleanup match exhaustively.
#[derive(Debug)]
pub enum Layout {
  Split {
    original_window:        WindowId,
    original_document:      DocumentId,
    /// We fabricated an empty placeholder buffer for a new-file diff.
    original_created_by_us: bool,
    proposed_document:      DocumentId,
    diff_window:            WindowId,
  },
  Inline {
    document: DocumentId,
    window:   WindowId,
    diff:     InlineDiff,
  },
}

impl Layout {
  /// The buffer whose save resolves this diff.
  pub fn proposed_document(&self) -> DocumentId {
    match self {
      Layout::Split {
        proposed_document, ..
      } => *proposed_document,
      Layout::Inline { document, .. } => *document,
    }
  }
}

/// Recorded when a diff opened in a fresh tab, so cleanup can put the
/// editor back the way it found it.
#[derive(Debug, Clone, Copy)]
pub struct TabPlacement {
  pub new_tab:                TabId,
  pub original_tab:           TabId,
  pub had_assistant_terminal: bool,
  pub terminal_width:         Option<u16>,
}

/// One-shot handle that completes the suspended `openDiff` reply.
///
/// Move semantics make double-resolution impossible; a receiver that went
/// away (the RPC task died) is logged and otherwise ignored.
pub struct Resumer {
  tab_name: String,
  tx:       oneshot::Sender<ToolResult>,
}

impl Resumer {
  pub fn resume(self, result: ToolResult) {
    log::debug!("resuming diff '{}'", self.tab_name);
    if self.tx.send(result).is_err() {
      log::warn!("diff '{}': suspended caller is gone", self.tab_name);
    }
  }
}

impl std::fmt::Debug for Resumer {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Resumer")
      .field("tab_name", &self.tab_name)
      .finish()
  }
}

/// Create the suspension pair for one diff request.
pub fn suspension(tab_name: &str) -> (Resumer, oneshot::Receiver<ToolResult>) {
  let (tx, rx) = oneshot::channel();
  (
    Resumer {
      tab_name: tab_name.to_string(),
      tx,
    },
    rx,
  )
}

/// Live state of one diff, owned by the registry.
#[derive(Debug)]
pub struct DiffState {
  pub tab_name:        String,
  pub status:          DiffStatus,
  pub request:         DiffRequest,
  pub is_new_file:     bool,
  pub layout:          Layout,
  pub placement:       Option<TabPlacement>,
  pub hook_ids:        Vec<HookId>,
  pub original_cursor: Option<(usize, usize)>,
  pub resumer:         Option<Resumer>,
  /// Set exactly once, on the first transition out of `Pending`.
  pub result:          Option<ToolResult>,
  /// Scratch mirror of the proposed content; removed when the state goes.
  pub scratch_dir:     Option<TempDir>,
}

impl DiffState {
  pub fn proposed_document(&self) -> DocumentId {
    self.layout.proposed_document()
  }

  pub fn is_pending(&self) -> bool {
    self.status == DiffStatus::Pending
  }
}

/// Display name of the proposed buffer in a split diff.
pub fn proposed_buffer_name(tab_name: &str, is_new_file: bool) -> String {
  if is_new_file {
    "(NEW FILE - proposed)".to_string()
  } else {
    format!("{tab_name} (proposed)")
  }
}

/// Display name of the unified buffer in an inline diff.
pub fn inline_buffer_name(tab_name: &str) -> String {
  format!("{tab_name} (inline diff)")
}

/// True for buffer names produced by either layout; `closeAllDiffTabs`
/// uses this to sweep up stray windows.
pub fn is_diff_buffer_name(name: &str) -> bool {
  name.ends_with(" (proposed)") || name.ends_with(" (inline diff)") || name == "(NEW FILE - proposed)"
}
