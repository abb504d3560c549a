//! Tab pages: ordered window lists with a focused window each.

use crate::editor::WindowId;

#[derive(Debug, Default)]
pub struct Tab {
  windows: Vec<WindowId>,
  focus:   Option<WindowId>,
}

impl Tab {
  pub fn windows(&self) -> &[WindowId] {
    &self.windows
  }

  pub fn focus(&self) -> Option<WindowId> {
    self.focus
  }

  pub fn contains(&self, window: WindowId) -> bool {
    self.windows.contains(&window)
  }

  pub fn push(&mut self, window: WindowId) {
    self.windows.push(window);
    if self.focus.is_none() {
      self.focus = Some(window);
    }
  }

  pub fn set_focus(&mut self, window: WindowId) -> bool {
    if self.contains(window) {
      self.focus = Some(window);
      true
    } else {
      false
    }
  }

  /// Remove a window from this tab, moving focus to a survivor.
  pub fn remove(&mut self, window: WindowId) -> bool {
    let Some(index) = self.windows.iter().position(|w| *w == window) else {
      return false;
    };
    self.windows.remove(index);
    if self.focus == Some(window) {
      self.focus = self.windows.first().copied();
    }
    true
  }

  pub fn is_empty(&self) -> bool {
    self.windows.is_empty()
  }
}
