//! Process-wide map from tab name to live diff state.
//!
//! The registry owns every `DiffState` exclusively. Resolution (saved /
//! rejected) transitions the status, records the result, and fires the
//! resumer; it never tears down UI. Cleanup removes the UI footprint and
//! the entry, and tolerates editor state that is already half gone —
//! a stale window or buffer id is skipped, never an error.

use std::collections::HashMap;

use crate::{
  config::{
    DiffOptions,
    NewFileReject,
  },
  diff::{
    DiffState,
    DiffStatus,
    Layout,
  },
  editor::{
    DocumentId,
    Editor,
  },
  rpc::ToolResult,
};

/// Why a diff's UI is being torn down; logged for traceability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupReason {
  TabClosed,
  AllTabsClosed,
  Replaced,
  Shutdown,
  EagerReject,
}

#[derive(Debug, Default)]
pub struct DiffRegistry {
  diffs: HashMap<String, DiffState>,
}

impl DiffRegistry {
  pub fn contains(&self, tab_name: &str) -> bool {
    self.diffs.contains_key(tab_name)
  }

  pub fn get(&self, tab_name: &str) -> Option<&DiffState> {
    self.diffs.get(tab_name)
  }

  pub fn len(&self) -> usize {
    self.diffs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.diffs.is_empty()
  }

  pub fn tab_names(&self) -> Vec<String> {
    self.diffs.keys().cloned().collect()
  }

  /// Register a fresh diff. The key must be free: callers force-reject a
  /// live duplicate before building the replacement.
  pub fn register(&mut self, state: DiffState) {
    let tab_name = state.tab_name.clone();
    let previous = self.diffs.insert(tab_name.clone(), state);
    assert!(
      previous.is_none(),
      "diff '{tab_name}' registered while still live"
    );
    log::info!("diff '{tab_name}' registered");
  }

  /// Transition a pending diff to `Saved`, extracting the final content
  /// from `buffer`, and fire the suspended reply. Returns false when the
  /// diff is unknown or already resolved.
  ///
  /// The old file is not revalidated against disk here: the content the
  /// user approved is what the reply carries, and the assistant performs
  /// the actual write.
  pub fn resolve_saved(&mut self, editor: &Editor, tab_name: &str, buffer: DocumentId) -> bool {
    let Some(state) = self.diffs.get_mut(tab_name) else {
      log::warn!("resolve_saved: no diff named '{tab_name}'");
      return false;
    };
    if state.status != DiffStatus::Pending {
      return false;
    }

    let content = match &state.layout {
      Layout::Split { .. } => {
        let Some(doc) = editor.document(buffer) else {
          log::warn!("resolve_saved: buffer of diff '{tab_name}' is gone");
          return false;
        };
        doc.content()
      },
      Layout::Inline { diff, .. } => diff.accepted_content(),
    };

    let result = ToolResult::file_saved(&content);
    state.status = DiffStatus::Saved;
    state.result = Some(result.clone());
    if let Some(resumer) = state.resumer.take() {
      resumer.resume(result);
    }
    log::info!("diff '{tab_name}' saved");
    true
  }

  /// Transition a pending diff to `Rejected` and fire the suspended reply.
  /// Returns false when the diff is unknown or already resolved.
  ///
  /// A rejected new-file diff in the current tab is torn down eagerly
  /// under `on-new-file-reject = keep-empty`, leaving the placeholder
  /// buffer in place; everything else waits for `closeTab`.
  pub fn resolve_rejected(
    &mut self,
    editor: &mut Editor,
    opts: &DiffOptions,
    tab_name: &str,
  ) -> bool {
    let Some(state) = self.diffs.get_mut(tab_name) else {
      log::warn!("resolve_rejected: no diff named '{tab_name}'");
      return false;
    };
    if state.status != DiffStatus::Pending {
      return false;
    }

    let result = ToolResult::diff_rejected(tab_name);
    state.status = DiffStatus::Rejected;
    state.result = Some(result.clone());
    if let Some(resumer) = state.resumer.take() {
      resumer.resume(result);
    }
    log::info!("diff '{tab_name}' rejected");

    if state.is_new_file
      && state.placement.is_none()
      && opts.on_new_file_reject == NewFileReject::KeepEmpty
    {
      self.cleanup(editor, opts, tab_name, CleanupReason::EagerReject);
    }
    true
  }

  /// Remove a diff's UI footprint and deregister it. Idempotent; every
  /// step tolerates editor state that already disappeared.
  pub fn cleanup(
    &mut self,
    editor: &mut Editor,
    opts: &DiffOptions,
    tab_name: &str,
    reason: CleanupReason,
  ) -> bool {
    let Some(state) = self.diffs.remove(tab_name) else {
      return false;
    };
    log::info!("diff '{tab_name}' cleanup ({reason:?})");

    for hook in &state.hook_ids {
      editor.detach_hook(*hook);
    }

    match &state.layout {
      Layout::Split {
        original_window,
        original_document,
        original_created_by_us,
        proposed_document,
        diff_window,
      } => {
        editor.close_window(*diff_window);
        editor.remove_document(*proposed_document);
        if let Some(window) = editor.window_mut(*original_window) {
          window.set_diff_mode(false);
        }
        let drop_placeholder = *original_created_by_us
          && state.status == DiffStatus::Rejected
          && opts.on_new_file_reject == NewFileReject::CloseWindow;
        if drop_placeholder {
          editor.close_window(*original_window);
          editor.remove_document(*original_document);
        }
      },
      Layout::Inline { document, window, .. } => {
        editor.close_window(*window);
        editor.remove_document(*document);
      },
    }

    if let Some(placement) = state.placement {
      editor.switch_tab(placement.original_tab);
      editor.close_tab(placement.new_tab);
      if placement.had_assistant_terminal {
        if let Some(width) = placement.terminal_width {
          editor.set_terminal_width(placement.original_tab, width);
        }
      }
    }

    // Dropping the state removes the scratch mirror directory with it.
    drop(state);
    true
  }

  /// Reject every pending diff, then tear everything down. Used on
  /// process shutdown so that no suspended caller leaks. Returns how many
  /// diffs were closed.
  pub fn cleanup_all(
    &mut self,
    editor: &mut Editor,
    opts: &DiffOptions,
    reason: CleanupReason,
  ) -> usize {
    let tab_names = self.tab_names();
    let mut closed = 0;
    for tab_name in tab_names {
      if self.get(&tab_name).is_some_and(DiffState::is_pending) {
        self.resolve_rejected(editor, opts, &tab_name);
      }
      // Eager rejection may already have removed the entry.
      self.cleanup(editor, opts, &tab_name, reason);
      closed += 1;
    }
    closed
  }
}

#[cfg(test)]
mod tests {
  use std::path::PathBuf;

  use tokio::sync::oneshot::Receiver;

  use super::*;
  use crate::{
    diff::{
      DiffRequest,
      proposed_buffer_name,
      suspension,
    },
    editor::Document,
    rpc::{
      DIFF_REJECTED,
      FILE_SAVED,
    },
  };

  fn split_state(editor: &mut Editor, tab_name: &str, contents: &str) -> (DiffState, Receiver<ToolResult>) {
    let original_window = editor.focused_window().unwrap();
    let original_document = editor.window(original_window).unwrap().doc();
    let proposed_document = editor.create_document(Document::scratch(
      proposed_buffer_name(tab_name, false),
      contents,
    ));
    let diff_window = editor.split_window(proposed_document);
    let (resumer, receiver) = suspension(tab_name);
    let state = DiffState {
      tab_name: tab_name.to_string(),
      status: DiffStatus::Pending,
      request: DiffRequest {
        old_file_path:     PathBuf::from("/t/a.txt"),
        new_file_path:     PathBuf::from("/t/a.txt"),
        new_file_contents: contents.to_string(),
        tab_name:          tab_name.to_string(),
      },
      is_new_file: false,
      layout: Layout::Split {
        original_window,
        original_document,
        original_created_by_us: false,
        proposed_document,
        diff_window,
      },
      placement: None,
      hook_ids: Vec::new(),
      original_cursor: None,
      resumer: Some(resumer),
      result: None,
      scratch_dir: None,
    };
    (state, receiver)
  }

  #[test]
  fn resolve_saved_records_the_result_and_fires_the_resumer() {
    let mut editor = Editor::new();
    let mut registry = DiffRegistry::default();
    let (state, mut receiver) = split_state(&mut editor, "tab", "new text\n");
    let proposed = state.proposed_document();
    registry.register(state);

    assert!(registry.resolve_saved(&editor, "tab", proposed));

    let state = registry.get("tab").unwrap();
    assert_eq!(state.status, DiffStatus::Saved);
    let result = state.result.as_ref().unwrap();
    assert_eq!(result.content[0].as_text(), FILE_SAVED);
    assert_eq!(result.content[1].as_text(), "new text\n");
    assert_eq!(receiver.try_recv().unwrap(), result.clone());
  }

  #[test]
  fn resolution_is_final() {
    let mut editor = Editor::new();
    let opts = DiffOptions::default();
    let mut registry = DiffRegistry::default();
    let (state, mut receiver) = split_state(&mut editor, "tab", "x\n");
    let proposed = state.proposed_document();
    registry.register(state);

    assert!(registry.resolve_rejected(&mut editor, &opts, "tab"));
    assert!(!registry.resolve_saved(&editor, "tab", proposed));
    assert!(!registry.resolve_rejected(&mut editor, &opts, "tab"));

    let result = receiver.try_recv().unwrap();
    assert_eq!(result.content[0].as_text(), DIFF_REJECTED);
    assert_eq!(result.content[1].as_text(), "tab");
    assert_eq!(registry.get("tab").unwrap().status, DiffStatus::Rejected);
  }

  #[test]
  fn cleanup_removes_the_entry_and_its_buffers() {
    let mut editor = Editor::new();
    let opts = DiffOptions::default();
    let mut registry = DiffRegistry::default();
    let (state, _receiver) = split_state(&mut editor, "tab", "x\n");
    let proposed = state.proposed_document();
    registry.register(state);
    registry.resolve_rejected(&mut editor, &opts, "tab");

    assert!(registry.cleanup(&mut editor, &opts, "tab", CleanupReason::TabClosed));
    assert!(registry.get("tab").is_none());
    assert!(editor.document(proposed).is_none());

    // Cleaning up twice is a quiet no-op.
    assert!(!registry.cleanup(&mut editor, &opts, "tab", CleanupReason::TabClosed));
  }

  #[test]
  fn cleanup_all_rejects_pending_diffs_first() {
    let mut editor = Editor::new();
    let opts = DiffOptions::default();
    let mut registry = DiffRegistry::default();
    let (first, mut first_rx) = split_state(&mut editor, "one", "x\n");
    registry.register(first);
    let (second, mut second_rx) = split_state(&mut editor, "two", "y\n");
    registry.register(second);

    assert_eq!(
      registry.cleanup_all(&mut editor, &opts, CleanupReason::Shutdown),
      2
    );
    assert!(registry.is_empty());
    assert_eq!(first_rx.try_recv().unwrap().content[0].as_text(), DIFF_REJECTED);
    assert_eq!(second_rx.try_recv().unwrap().content[0].as_text(), DIFF_REJECTED);

    assert_eq!(
      registry.cleanup_all(&mut editor, &opts, CleanupReason::Shutdown),
      0
    );
  }

  #[test]
  #[should_panic(expected = "registered while still live")]
  fn duplicate_registration_is_a_programmer_error() {
    let mut editor = Editor::new();
    let mut registry = DiffRegistry::default();
    let (first, _rx1) = split_state(&mut editor, "dup", "x\n");
    registry.register(first);
    let (second, _rx2) = split_state(&mut editor, "dup", "y\n");
    registry.register(second);
  }
}
