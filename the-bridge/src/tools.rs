//! The three diff tools exposed to the assistant.
//!
//! `openDiff` blocks on the user's decision (see `diff::controller`);
//! `closeTab` and `closeAllDiffTabs` run to completion immediately. After
//! an accepted diff the assistant writes the file itself, so `closeTab`
//! schedules a short-delayed reload of any open buffers for that path.

use std::{
  path::PathBuf,
  time::Duration,
};

use serde::Deserialize;
use serde_json::Value;

use crate::{
  diff::{
    self,
    CleanupReason,
    DiffRequest,
    DiffStatus,
    is_diff_buffer_name,
  },
  editor::WindowId,
  rpc::{
    RpcError,
    ToolResult,
  },
  session::SharedSession,
};

/// How long to wait before rereading an accepted file from disk. The
/// assistant performs its write between consuming the reply and sending
/// `closeTab`; this window tolerates that ordering.
pub const RELOAD_DELAY: Duration = Duration::from_millis(100);

pub async fn open_diff(session: SharedSession, params: Value) -> Result<ToolResult, RpcError> {
  let request: DiffRequest = serde_json::from_value(params)
    .map_err(|err| RpcError::invalid_params(format!("openDiff: {err}")))?;
  diff::open_diff(session, request).await.map_err(RpcError::from)
}

#[derive(Debug, Deserialize)]
struct CloseTabParams {
  tab_name: String,
}

pub fn close_tab(session: &SharedSession, params: Value) -> Result<ToolResult, RpcError> {
  let params: CloseTabParams = serde_json::from_value(params)
    .map_err(|err| RpcError::invalid_params(format!("closeTab: {err}")))?;

  let mut guard = session.lock();
  let sess = &mut *guard;

  let Some(state) = sess.diffs.get(&params.tab_name) else {
    log::warn!("closeTab: no diff named '{}'", params.tab_name);
    return Ok(ToolResult::tab_closed());
  };
  let pending = state.is_pending();
  let reload = (state.status == DiffStatus::Saved)
    .then(|| (state.request.old_file_path.clone(), state.original_cursor));

  if pending {
    sess
      .diffs
      .resolve_rejected(&mut sess.editor, &sess.config.diff, &params.tab_name);
  }
  sess.diffs.cleanup(
    &mut sess.editor,
    &sess.config.diff,
    &params.tab_name,
    CleanupReason::TabClosed,
  );
  drop(guard);

  if let Some((path, cursor)) = reload {
    schedule_reload(session.clone(), path, cursor);
  }
  Ok(ToolResult::tab_closed())
}

pub fn close_all_diff_tabs(session: &SharedSession) -> Result<ToolResult, RpcError> {
  let mut guard = session.lock();
  let sess = &mut *guard;

  let mut closed = sess.diffs.cleanup_all(
    &mut sess.editor,
    &sess.config.diff,
    CleanupReason::AllTabsClosed,
  );

  // Sweep up stray windows that still show diff-named buffers, e.g. after
  // a half-finished manual teardown.
  let stray: Vec<WindowId> = sess
    .editor
    .windows()
    .filter(|(_, window)| {
      sess
        .editor
        .document(window.doc())
        .is_some_and(|doc| is_diff_buffer_name(&doc.display_name()))
    })
    .map(|(id, _)| id)
    .collect();
  for window in stray {
    sess.editor.close_window(window);
    closed += 1;
  }

  Ok(ToolResult::closed_diff_tabs(closed))
}

/// Reread `path` into any open buffers after [`RELOAD_DELAY`], restoring
/// the cursor the original window had when the diff opened.
fn schedule_reload(session: SharedSession, path: PathBuf, cursor: Option<(usize, usize)>) {
  tokio::spawn(async move {
    tokio::time::sleep(RELOAD_DELAY).await;
    let mut guard = session.lock();
    let sess = &mut *guard;
    match sess.editor.reload_documents_at(&path) {
      Ok(count) if count > 0 => {
        log::debug!("reloaded {count} buffer(s) for {}", path.display());
        if let (Some(cursor), Some(doc)) = (cursor, sess.editor.document_by_path(&path)) {
          let lines = sess
            .editor
            .document(doc)
            .map(|doc| doc.len_lines())
            .unwrap_or(1);
          let clamped = (cursor.0.min(lines.saturating_sub(1)), cursor.1);
          for window in sess.editor.windows_showing_doc(doc) {
            if let Some(window) = sess.editor.window_mut(window) {
              window.set_cursor(clamped);
            }
          }
        }
      },
      Ok(_) => {},
      Err(err) => log::warn!("reload of {} failed: {err}", path.display()),
    }
  });
}
