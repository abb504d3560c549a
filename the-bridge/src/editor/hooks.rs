//! Buffer event hooks installed by the diff core.
//!
//! Hooks are declarative: each one names the buffer it watches, the event
//! it reacts to, and the action to take. Firing an event returns the
//! matching actions; the session applies them to the diff registry. Hooks
//! never mutate the editor themselves, so a half-torn-down diff cannot
//! wedge the event path.

use slotmap::SlotMap;

use crate::editor::DocumentId;

slotmap::new_key_type! {
  pub struct HookId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
  /// The user asked to save the buffer.
  WriteRequested,
  /// The buffer is being closed, unloaded, or wiped.
  BufferClosed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookAction {
  ResolveSaved {
    tab_name: String,
    buffer:   DocumentId,
  },
  ResolveRejected {
    tab_name: String,
  },
}

#[derive(Debug, Clone)]
pub struct Hook {
  pub doc:    DocumentId,
  pub event:  HookEvent,
  pub action: HookAction,
}

#[derive(Debug, Default)]
pub struct HookRegistry {
  hooks: SlotMap<HookId, Hook>,
}

impl HookRegistry {
  pub fn install(&mut self, hook: Hook) -> HookId {
    self.hooks.insert(hook)
  }

  /// Remove a hook; detaching an already-removed hook is a no-op.
  pub fn detach(&mut self, id: HookId) {
    self.hooks.remove(id);
  }

  /// Collect the actions of every hook watching `doc` for `event`.
  pub fn fire(&self, doc: DocumentId, event: HookEvent) -> Vec<HookAction> {
    self
      .hooks
      .values()
      .filter(|hook| hook.doc == doc && hook.event == event)
      .map(|hook| hook.action.clone())
      .collect()
  }

  pub fn len(&self) -> usize {
    self.hooks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.hooks.is_empty()
  }
}
