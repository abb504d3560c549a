//! The per-process service object.
//!
//! One `Session` owns the editor state, the diff registry, and the
//! resolved configuration. Everything runs event-loop-serialized behind a
//! single mutex; the only suspension point in the whole diff core is the
//! controller's await, which never holds the lock.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
  config::Config,
  diff::{
    CleanupReason,
    DiffRegistry,
  },
  editor::{
    DIFF_TAB_NAME_VAR,
    DocumentId,
    Editor,
    HookAction,
    SaveOutcome,
  },
};

pub struct Session {
  pub editor: Editor,
  pub diffs:  DiffRegistry,
  pub config: Config,
}

pub type SharedSession = Arc<Mutex<Session>>;

impl Session {
  pub fn new(config: Config) -> Self {
    Self {
      editor: Editor::new(),
      diffs: DiffRegistry::default(),
      config,
    }
  }

  pub fn shared(config: Config) -> SharedSession {
    Arc::new(Mutex::new(Self::new(config)))
  }

  /// Route hook actions into the diff registry.
  pub fn apply_hook_actions(&mut self, actions: Vec<HookAction>) {
    for action in actions {
      match action {
        HookAction::ResolveSaved { tab_name, buffer } => {
          self.diffs.resolve_saved(&self.editor, &tab_name, buffer);
        },
        HookAction::ResolveRejected { tab_name } => {
          self
            .diffs
            .resolve_rejected(&mut self.editor, &self.config.diff, &tab_name);
        },
      }
    }
  }

  /// Save a buffer the way the user's `:w` does. Intercepted writes feed
  /// straight into diff resolution.
  pub fn save_document(&mut self, doc: DocumentId) -> std::io::Result<()> {
    match self.editor.save_document(doc)? {
      SaveOutcome::Written => {},
      SaveOutcome::Intercepted(actions) => self.apply_hook_actions(actions),
    }
    Ok(())
  }

  /// Close a buffer the way the user's `:bd` does.
  pub fn close_document(&mut self, doc: DocumentId) {
    let actions = self.editor.close_document(doc);
    self.apply_hook_actions(actions);
  }

  /// Accept the diff owning the focused buffer, if any. Bound to an editor
  /// command, so it works without knowing the tab name.
  pub fn accept_current_diff(&mut self) -> bool {
    let Some((doc, tab_name)) = self.focused_diff() else {
      return false;
    };
    self.diffs.resolve_saved(&self.editor, &tab_name, doc)
  }

  /// Reject the diff owning the focused buffer, if any.
  pub fn reject_current_diff(&mut self) -> bool {
    let Some((_, tab_name)) = self.focused_diff() else {
      return false;
    };
    self
      .diffs
      .resolve_rejected(&mut self.editor, &self.config.diff, &tab_name)
  }

  /// The focused buffer's diff back-reference, read from its buffer-local
  /// tag.
  fn focused_diff(&self) -> Option<(DocumentId, String)> {
    let window = self.editor.focused_window()?;
    let doc = self.editor.window(window)?.doc();
    let tab_name = self.editor.document(doc)?.var(DIFF_TAB_NAME_VAR)?;
    Some((doc, tab_name.to_string()))
  }

  /// Force-reject and tear down every live diff. Runs on process shutdown
  /// so no suspended RPC handler leaks.
  pub fn shutdown(&mut self) -> usize {
    self
      .diffs
      .cleanup_all(&mut self.editor, &self.config.diff, CleanupReason::Shutdown)
  }
}
