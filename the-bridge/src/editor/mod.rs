//! Headless editor state.
//!
//! The bridge does not render anything; it manipulates the same state a
//! real editor maintains — documents, windows, tab pages, focus, buffer
//! events — and the diff core is written against this surface. Saving and
//! closing documents are the two entry points that fire hooks; they return
//! the resulting actions instead of applying them, so the session decides
//! what happens to the diff registry.

mod document;
mod hooks;
mod tabs;
mod window;

use std::{
  fs,
  io,
  path::Path,
};

use slotmap::SlotMap;

pub use document::{
  DIFF_TAB_NAME_VAR,
  Document,
  INLINE_DIFF_VAR,
  LineDecoration,
  filetype_from_path,
};
pub use hooks::{
  Hook,
  HookAction,
  HookEvent,
  HookId,
  HookRegistry,
};
pub use tabs::Tab;
pub use window::{
  Window,
  WindowKind,
};

slotmap::new_key_type! {
  pub struct DocumentId;
  pub struct WindowId;
  pub struct TabId;
}

/// Total columns available to a tab page; window widths divide this up.
const TOTAL_COLUMNS: u16 = 240;
/// Default width of the embedded assistant terminal split.
pub const DEFAULT_TERMINAL_WIDTH: u16 = 80;

const ASSISTANT_TERMINAL_NAME: &str = "*assistant*";

/// Result of asking the editor to save a buffer.
#[derive(Debug)]
pub enum SaveOutcome {
  /// The buffer was written to its backing file.
  Written,
  /// The buffer intercepts writes; nothing touched disk and these hook
  /// actions fired instead.
  Intercepted(Vec<HookAction>),
}

pub struct Editor {
  documents:   SlotMap<DocumentId, Document>,
  windows:     SlotMap<WindowId, Window>,
  tabs:        SlotMap<TabId, Tab>,
  tab_order:   Vec<TabId>,
  current_tab: TabId,
  hooks:       HookRegistry,
}

impl Editor {
  /// A fresh editor: one tab, one window, an empty scratch buffer.
  pub fn new() -> Self {
    let mut documents = SlotMap::with_key();
    let mut windows = SlotMap::with_key();
    let mut tabs: SlotMap<TabId, Tab> = SlotMap::with_key();

    let doc = documents.insert(Document::empty_scratch());
    let window = windows.insert(Window::new(doc, WindowKind::File, TOTAL_COLUMNS));
    let mut tab = Tab::default();
    tab.push(window);
    let tab_id = tabs.insert(tab);

    Self {
      documents,
      windows,
      tabs,
      tab_order: vec![tab_id],
      current_tab: tab_id,
      hooks: HookRegistry::default(),
    }
  }

  // ---- documents ----------------------------------------------------------

  pub fn document(&self, id: DocumentId) -> Option<&Document> {
    self.documents.get(id)
  }

  pub fn document_mut(&mut self, id: DocumentId) -> Option<&mut Document> {
    self.documents.get_mut(id)
  }

  pub fn create_document(&mut self, doc: Document) -> DocumentId {
    self.documents.insert(doc)
  }

  pub fn documents(&self) -> impl Iterator<Item = (DocumentId, &Document)> {
    self.documents.iter()
  }

  pub fn document_by_path(&self, path: &Path) -> Option<DocumentId> {
    self
      .documents
      .iter()
      .find(|(_, doc)| doc.path() == Some(path))
      .map(|(id, _)| id)
  }

  /// True iff a buffer for `path` is open and carries unsaved edits.
  pub fn is_path_modified(&self, path: &Path) -> bool {
    self
      .documents
      .values()
      .any(|doc| doc.path() == Some(path) && doc.is_modified())
  }

  /// Open `path` into the focused window, reusing an existing buffer for
  /// the same file.
  pub fn open_file(&mut self, path: &Path) -> io::Result<DocumentId> {
    let doc = self.load_document(path)?;
    if let Some(window) = self.focused_window() {
      self.show_document(window, doc);
    } else {
      self.new_window(doc, WindowKind::File);
    }
    Ok(doc)
  }

  /// Load `path` into a document without showing it anywhere.
  pub fn load_document(&mut self, path: &Path) -> io::Result<DocumentId> {
    if let Some(existing) = self.document_by_path(path) {
      return Ok(existing);
    }
    let text = fs::read_to_string(path)?;
    Ok(
      self
        .documents
        .insert(Document::from_file(path.to_path_buf(), &text)),
    )
  }

  /// Reload every open buffer backed by `path` from disk. Returns how many
  /// buffers were refreshed.
  pub fn reload_documents_at(&mut self, path: &Path) -> io::Result<usize> {
    let text = fs::read_to_string(path)?;
    let mut count = 0;
    for doc in self.documents.values_mut() {
      if doc.path() == Some(path) {
        doc.replace_text(&text);
        count += 1;
      }
    }
    Ok(count)
  }

  /// Save a buffer. Write-intercepting buffers never reach disk; their
  /// hook actions are returned for the caller to apply.
  pub fn save_document(&mut self, id: DocumentId) -> io::Result<SaveOutcome> {
    let doc = self
      .documents
      .get_mut(id)
      .ok_or_else(|| io::Error::other("no such buffer"))?;
    if doc.is_write_intercepted() {
      return Ok(SaveOutcome::Intercepted(
        self.hooks.fire(id, HookEvent::WriteRequested),
      ));
    }
    let Some(path) = doc.path().map(Path::to_path_buf) else {
      return Err(io::Error::other("buffer has no backing file"));
    };
    fs::write(path, doc.content())?;
    doc.set_modified(false);
    Ok(SaveOutcome::Written)
  }

  /// Close a buffer the way a user would: fire close hooks, drop every
  /// window showing it, remove it.
  pub fn close_document(&mut self, id: DocumentId) -> Vec<HookAction> {
    let actions = self.hooks.fire(id, HookEvent::BufferClosed);
    self.drop_windows_showing(id);
    self.documents.remove(id);
    actions
  }

  /// Remove a buffer silently (teardown path, no hooks).
  pub fn remove_document(&mut self, id: DocumentId) -> bool {
    if self.documents.remove(id).is_none() {
      return false;
    }
    self.drop_windows_showing(id);
    true
  }

  fn drop_windows_showing(&mut self, doc: DocumentId) {
    let stale: Vec<WindowId> = self
      .windows
      .iter()
      .filter(|(_, window)| window.doc() == doc)
      .map(|(id, _)| id)
      .collect();
    for window in stale {
      self.close_window(window);
    }
  }

  // ---- windows ------------------------------------------------------------

  pub fn window(&self, id: WindowId) -> Option<&Window> {
    self.windows.get(id)
  }

  pub fn window_mut(&mut self, id: WindowId) -> Option<&mut Window> {
    self.windows.get_mut(id)
  }

  pub fn windows(&self) -> impl Iterator<Item = (WindowId, &Window)> {
    self.windows.iter()
  }

  pub fn windows_showing_doc(&self, doc: DocumentId) -> Vec<WindowId> {
    self
      .windows
      .iter()
      .filter(|(_, window)| window.doc() == doc)
      .map(|(id, _)| id)
      .collect()
  }

  pub fn focused_window(&self) -> Option<WindowId> {
    self.tabs.get(self.current_tab)?.focus()
  }

  pub fn focus_window(&mut self, id: WindowId) -> bool {
    match self.tabs.get_mut(self.current_tab) {
      Some(tab) => tab.set_focus(id),
      None => false,
    }
  }

  /// Create a window in the current tab.
  pub fn new_window(&mut self, doc: DocumentId, kind: WindowKind) -> WindowId {
    let window = self.windows.insert(Window::new(doc, kind, TOTAL_COLUMNS));
    if let Some(tab) = self.tabs.get_mut(self.current_tab) {
      tab.push(window);
    }
    self.equalize_widths();
    window
  }

  /// Split the current tab with a new file window showing `doc`.
  pub fn split_window(&mut self, doc: DocumentId) -> WindowId {
    self.new_window(doc, WindowKind::File)
  }

  /// Close a window wherever it lives. The document stays open.
  pub fn close_window(&mut self, id: WindowId) -> bool {
    if self.windows.remove(id).is_none() {
      return false;
    }
    for tab in self.tabs.values_mut() {
      tab.remove(id);
    }
    self.equalize_widths();
    true
  }

  pub fn show_document(&mut self, window: WindowId, doc: DocumentId) {
    if let Some(win) = self.windows.get_mut(window) {
      win.set_doc(doc);
    }
  }

  /// A window in the current tab already showing `path`, if any.
  pub fn window_showing(&self, path: &Path) -> Option<WindowId> {
    let tab = self.tabs.get(self.current_tab)?;
    tab.windows().iter().copied().find(|id| {
      self
        .windows
        .get(*id)
        .and_then(|window| self.documents.get(window.doc()))
        .and_then(|doc| doc.path())
        == Some(path)
    })
  }

  /// The main editing window of the current tab: the focused window if it
  /// is a plain file view, else the first file window. Terminals, tree
  /// explorers, floating windows, and windows already serving a diff
  /// never qualify.
  pub fn main_window(&self) -> Option<WindowId> {
    let qualifies = |id: WindowId| {
      self
        .windows
        .get(id)
        .is_some_and(|window| window.is_file() && !window.diff_mode())
    };
    let tab = self.tabs.get(self.current_tab)?;
    if let Some(focus) = tab.focus() {
      if qualifies(focus) {
        return Some(focus);
      }
    }
    tab.windows().iter().copied().find(|id| qualifies(*id))
  }

  /// Give every file window in the current tab an equal share of the
  /// columns.
  pub fn equalize_widths(&mut self) {
    let Some(tab) = self.tabs.get(self.current_tab) else {
      return;
    };
    let file_windows: Vec<WindowId> = tab
      .windows()
      .iter()
      .copied()
      .filter(|id| self.windows.get(*id).is_some_and(Window::is_file))
      .collect();
    if file_windows.is_empty() {
      return;
    }
    let terminal_width: u16 = tab
      .windows()
      .iter()
      .filter_map(|id| self.windows.get(*id))
      .filter(|window| !window.is_file())
      .map(Window::width)
      .sum();
    let share = TOTAL_COLUMNS.saturating_sub(terminal_width) / file_windows.len() as u16;
    for id in file_windows {
      if let Some(window) = self.windows.get_mut(id) {
        window.set_width(share);
      }
    }
  }

  // ---- tabs ---------------------------------------------------------------

  pub fn current_tab(&self) -> TabId {
    self.current_tab
  }

  pub fn tab(&self, id: TabId) -> Option<&Tab> {
    self.tabs.get(id)
  }

  pub fn tab_count(&self) -> usize {
    self.tab_order.len()
  }

  /// Create a tab with a single empty scratch window and switch to it.
  pub fn create_tab(&mut self) -> TabId {
    let doc = self.documents.insert(Document::empty_scratch());
    let window = self.windows.insert(Window::new(doc, WindowKind::File, TOTAL_COLUMNS));
    let mut tab = Tab::default();
    tab.push(window);
    let id = self.tabs.insert(tab);
    self.tab_order.push(id);
    self.current_tab = id;
    id
  }

  pub fn switch_tab(&mut self, id: TabId) -> bool {
    if self.tabs.contains_key(id) {
      self.current_tab = id;
      true
    } else {
      false
    }
  }

  /// Close a tab and its windows. Scratch buffers left without a window
  /// are dropped. The last remaining tab cannot be closed.
  pub fn close_tab(&mut self, id: TabId) -> bool {
    if self.tab_order.len() <= 1 || !self.tabs.contains_key(id) {
      return false;
    }
    let tab = self.tabs.remove(id).expect("tab checked above");
    self.tab_order.retain(|t| *t != id);
    for window in tab.windows() {
      self.windows.remove(*window);
    }
    // Garbage-collect scratch buffers that lost their last window.
    let orphaned: Vec<DocumentId> = self
      .documents
      .iter()
      .filter(|(doc_id, doc)| {
        doc.is_scratch()
          && doc.path().is_none()
          && !self.windows.values().any(|window| window.doc() == *doc_id)
      })
      .map(|(doc_id, _)| doc_id)
      .collect();
    for doc in orphaned {
      self.documents.remove(doc);
    }
    if self.current_tab == id {
      self.current_tab = *self.tab_order.first().expect("at least one tab remains");
    }
    true
  }

  // ---- assistant terminal -------------------------------------------------

  /// The assistant-terminal window embedded in `tab`, if any.
  pub fn assistant_terminal_in(&self, tab: TabId) -> Option<WindowId> {
    let tab = self.tabs.get(tab)?;
    tab.windows().iter().copied().find(|id| {
      self
        .windows
        .get(*id)
        .is_some_and(|window| window.kind() == WindowKind::AssistantTerminal)
    })
  }

  /// Embed the assistant terminal as a side split in the current tab.
  pub fn embed_assistant_terminal(&mut self, width: u16) -> WindowId {
    let doc = self
      .documents
      .iter()
      .find(|(_, doc)| doc.display_name() == ASSISTANT_TERMINAL_NAME)
      .map(|(id, _)| id)
      .unwrap_or_else(|| {
        self
          .documents
          .insert(Document::scratch(ASSISTANT_TERMINAL_NAME, ""))
      });
    let window = self.new_window(doc, WindowKind::AssistantTerminal);
    if let Some(win) = self.windows.get_mut(window) {
      win.set_width(width);
    }
    self.equalize_widths();
    window
  }

  pub fn set_terminal_width(&mut self, tab: TabId, width: u16) {
    if let Some(terminal) = self.assistant_terminal_in(tab) {
      if let Some(window) = self.windows.get_mut(terminal) {
        window.set_width(width);
      }
    }
  }

  // ---- hooks --------------------------------------------------------------

  pub fn install_hook(&mut self, hook: Hook) -> HookId {
    self.hooks.install(hook)
  }

  pub fn detach_hook(&mut self, id: HookId) {
    self.hooks.detach(id);
  }

  pub fn hook_count(&self) -> usize {
    self.hooks.len()
  }
}

impl Default for Editor {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fresh_editor_has_one_scratch_window() {
    let editor = Editor::new();
    let window = editor.focused_window().unwrap();
    let doc = editor.window(window).unwrap().doc();
    assert!(editor.document(doc).unwrap().is_empty_scratch());
    assert_eq!(editor.tab_count(), 1);
  }

  #[test]
  fn main_window_skips_terminals() {
    let mut editor = Editor::new();
    let terminal = editor.embed_assistant_terminal(DEFAULT_TERMINAL_WIDTH);
    editor.focus_window(terminal);
    let main = editor.main_window().unwrap();
    assert_ne!(main, terminal);
    assert!(editor.window(main).unwrap().is_file());
  }

  #[test]
  fn closing_a_tab_collects_orphaned_scratch_buffers() {
    let mut editor = Editor::new();
    let original = editor.current_tab();
    let tab = editor.create_tab();
    let scratch = editor
      .window(editor.focused_window().unwrap())
      .unwrap()
      .doc();

    editor.switch_tab(original);
    assert!(editor.close_tab(tab));
    assert!(editor.document(scratch).is_none());
  }

  #[test]
  fn last_tab_cannot_be_closed() {
    let mut editor = Editor::new();
    let only = editor.current_tab();
    assert!(!editor.close_tab(only));
  }

  #[test]
  fn write_intercepted_buffers_never_touch_disk() {
    let mut editor = Editor::new();
    let doc = editor.create_document(Document::scratch("x (proposed)", "hello"));
    editor
      .document_mut(doc)
      .unwrap()
      .set_write_intercepted(true);
    editor.install_hook(Hook {
      doc,
      event: HookEvent::WriteRequested,
      action: HookAction::ResolveSaved {
        tab_name: "x".into(),
        buffer:   doc,
      },
    });

    match editor.save_document(doc).unwrap() {
      SaveOutcome::Intercepted(actions) => assert_eq!(actions.len(), 1),
      SaveOutcome::Written => panic!("write should have been intercepted"),
    }
  }

  #[test]
  fn equalized_widths_leave_room_for_the_terminal() {
    let mut editor = Editor::new();
    editor.embed_assistant_terminal(80);
    let doc = editor.create_document(Document::scratch("two", ""));
    editor.split_window(doc);

    let tab = editor.tab(editor.current_tab()).unwrap();
    let file_widths: Vec<u16> = tab
      .windows()
      .iter()
      .filter_map(|id| editor.window(*id))
      .filter(|window| window.is_file())
      .map(Window::width)
      .collect();
    assert_eq!(file_widths, vec![80, 80]);
  }
}
