//! A single text buffer: file-backed or scratch.

use std::{
  collections::HashMap,
  path::{
    Path,
    PathBuf,
  },
};

use ropey::Rope;

use the_linediff::LineKind;

/// Buffer-local variable carrying the owning diff's tab name.
pub const DIFF_TAB_NAME_VAR: &str = "diff_tab_name";
/// Buffer-local marker set on inline diff buffers.
pub const INLINE_DIFF_VAR: &str = "inline_diff";

/// A gutter sign plus background highlight attached to one line of an
/// inline diff buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineDecoration {
  pub line: usize,
  pub kind: LineKind,
}

impl LineDecoration {
  pub fn sign(&self) -> Option<char> {
    self.kind.sign()
  }

  pub fn highlight(&self) -> Option<&'static str> {
    self.kind.highlight()
  }
}

pub struct Document {
  text:              Rope,
  path:              Option<PathBuf>,
  /// Display name for buffers without a backing file.
  name:              Option<String>,
  filetype:          Option<String>,
  modified:          bool,
  readonly:          bool,
  /// Writes never touch disk; they fire hooks instead.
  write_intercepted: bool,
  vars:              HashMap<String, String>,
  decorations:       Vec<LineDecoration>,
}

impl Document {
  /// An empty scratch buffer, as shown by a freshly opened editor.
  pub fn empty_scratch() -> Self {
    Self::scratch("[scratch]", "")
  }

  pub fn scratch(name: impl Into<String>, text: &str) -> Self {
    Self {
      text:              Rope::from_str(text),
      path:              None,
      name:              Some(name.into()),
      filetype:          None,
      modified:          false,
      readonly:          false,
      write_intercepted: false,
      vars:              HashMap::new(),
      decorations:       Vec::new(),
    }
  }

  pub fn from_file(path: PathBuf, text: &str) -> Self {
    let filetype = filetype_from_path(&path);
    Self {
      text: Rope::from_str(text),
      path: Some(path),
      name: None,
      filetype,
      modified: false,
      readonly: false,
      write_intercepted: false,
      vars: HashMap::new(),
      decorations: Vec::new(),
    }
  }

  pub fn text(&self) -> &Rope {
    &self.text
  }

  pub fn content(&self) -> String {
    self.text.to_string()
  }

  /// Replace the buffer content, marking it modified.
  pub fn set_text(&mut self, text: &str) {
    self.text = Rope::from_str(text);
    self.modified = true;
  }

  /// Replace the buffer content without marking it modified, as a reload
  /// from disk does.
  pub fn replace_text(&mut self, text: &str) {
    self.text = Rope::from_str(text);
    self.modified = false;
  }

  pub fn len_lines(&self) -> usize {
    self.text.len_lines()
  }

  pub fn path(&self) -> Option<&Path> {
    self.path.as_deref()
  }

  pub fn set_path(&mut self, path: PathBuf) {
    if self.filetype.is_none() {
      self.filetype = filetype_from_path(&path);
    }
    self.path = Some(path);
    self.name = None;
  }

  pub fn display_name(&self) -> String {
    if let Some(name) = &self.name {
      name.clone()
    } else if let Some(path) = &self.path {
      path.display().to_string()
    } else {
      "[no name]".to_string()
    }
  }

  pub fn is_modified(&self) -> bool {
    self.modified
  }

  pub fn set_modified(&mut self, modified: bool) {
    self.modified = modified;
  }

  pub fn is_readonly(&self) -> bool {
    self.readonly
  }

  pub fn set_readonly(&mut self, readonly: bool) {
    self.readonly = readonly;
  }

  pub fn is_write_intercepted(&self) -> bool {
    self.write_intercepted
  }

  pub fn set_write_intercepted(&mut self, intercepted: bool) {
    self.write_intercepted = intercepted;
  }

  /// A scratch buffer has no backing file.
  pub fn is_scratch(&self) -> bool {
    self.name.is_some()
  }

  /// True for a scratch buffer holding nothing, reusable as a diff target.
  pub fn is_empty_scratch(&self) -> bool {
    self.is_scratch() && !self.modified && self.text.len_chars() == 0
  }

  pub fn filetype(&self) -> Option<&str> {
    self.filetype.as_deref()
  }

  pub fn set_filetype(&mut self, filetype: Option<String>) {
    self.filetype = filetype;
  }

  pub fn var(&self, key: &str) -> Option<&str> {
    self.vars.get(key).map(String::as_str)
  }

  pub fn set_var(&mut self, key: impl Into<String>, value: impl Into<String>) {
    self.vars.insert(key.into(), value.into());
  }

  pub fn decorations(&self) -> &[LineDecoration] {
    &self.decorations
  }

  pub fn set_decorations(&mut self, decorations: Vec<LineDecoration>) {
    self.decorations = decorations;
  }
}

pub fn filetype_from_path(path: &Path) -> Option<String> {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(str::to_owned)
}
