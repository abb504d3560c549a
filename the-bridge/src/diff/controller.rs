//! The `openDiff` entry point.
//!
//! `open_diff` validates, materializes the layout, registers the state,
//! and then suspends until some resolver fires the one-shot. The session
//! lock is only held for the setup phase, never across the await.

use std::{
  fs,
  io,
  sync::Arc,
};

use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::sync::oneshot;

use crate::{
  config::DiffLayout,
  diff::{
    CleanupReason,
    DiffRequest,
    DiffState,
    DiffStatus,
    layout,
    suspension,
  },
  editor::{
    Hook,
    HookAction,
    HookEvent,
  },
  error::BridgeError,
  rpc::ToolResult,
  session::Session,
};

/// Open an interactive diff and block until the user accepts or rejects
/// it. The returned payload is the RPC reply.
///
/// Must be awaited on a suspendable dispatcher task; the dispatcher
/// enforces that and reports the violation as an internal error.
pub async fn open_diff(
  session: Arc<Mutex<Session>>,
  request: DiffRequest,
) -> Result<ToolResult, BridgeError> {
  let tab_name = request.tab_name.clone();
  let receiver = {
    let mut guard = session.lock();
    prepare(&mut guard, request)?
  };

  log::debug!("diff '{tab_name}' suspended, waiting for the user");
  receiver
    .await
    .map_err(|_| BridgeError::internal(format!("diff '{tab_name}' torn down without resolving")))
}

/// Everything up to the suspension point, under the session lock.
fn prepare(
  sess: &mut Session,
  request: DiffRequest,
) -> Result<oneshot::Receiver<ToolResult>, BridgeError> {
  // Re-using a live tab name replaces the old diff: force-reject it and
  // tear its UI down before building the new one, so the previous caller
  // observes DIFF_REJECTED before our state becomes visible.
  if sess.diffs.contains(&request.tab_name) {
    log::info!("diff '{}' replaced by a new request", request.tab_name);
    sess
      .diffs
      .resolve_rejected(&mut sess.editor, &sess.config.diff, &request.tab_name);
    sess.diffs.cleanup(
      &mut sess.editor,
      &sess.config.diff,
      &request.tab_name,
      CleanupReason::Replaced,
    );
  }

  let is_new_file = !request.old_file_path.exists();
  if !is_new_file && sess.editor.is_path_modified(&request.old_file_path) {
    return Err(BridgeError::UnsavedChanges {
      path: request.old_file_path.clone(),
    });
  }

  // The scratch mirror only exists for split layouts; its directory lives
  // and dies with the DiffState.
  let scratch_dir = match sess.config.diff.layout {
    DiffLayout::Inline => None,
    DiffLayout::Vertical | DiffLayout::Horizontal => Some(
      write_scratch_mirror(&request)
        .map_err(|err| BridgeError::setup(BridgeError::internal(err.to_string())))?,
    ),
  };

  let built = layout::build(&mut sess.editor, &sess.config.diff, &request, is_new_file)
    .map_err(|err| match err {
      validation @ (BridgeError::UnsavedChanges { .. }
      | BridgeError::NoSuitableWindow
      | BridgeError::UnsupportedRuntime) => validation,
      other => BridgeError::setup(other),
    })?;

  let proposed = built.layout.proposed_document();
  let hook_ids = vec![
    sess.editor.install_hook(Hook {
      doc:    proposed,
      event:  HookEvent::WriteRequested,
      action: HookAction::ResolveSaved {
        tab_name: request.tab_name.clone(),
        buffer:   proposed,
      },
    }),
    sess.editor.install_hook(Hook {
      doc:    proposed,
      event:  HookEvent::BufferClosed,
      action: HookAction::ResolveRejected {
        tab_name: request.tab_name.clone(),
      },
    }),
  ];

  let (resumer, receiver) = suspension(&request.tab_name);
  sess.diffs.register(DiffState {
    tab_name: request.tab_name.clone(),
    status: DiffStatus::Pending,
    is_new_file,
    layout: built.layout,
    placement: built.placement,
    hook_ids,
    original_cursor: built.original_cursor,
    resumer: Some(resumer),
    result: None,
    scratch_dir,
    request,
  });

  Ok(receiver)
}

/// Mirror the proposed content into a private scratch directory, so
/// external tooling can inspect what is on review.
fn write_scratch_mirror(request: &DiffRequest) -> io::Result<TempDir> {
  let dir = tempfile::Builder::new()
    .prefix("the-bridge-diff-")
    .tempdir()?;
  let file_name = request
    .new_file_path
    .file_name()
    .map(|name| name.to_os_string())
    .unwrap_or_else(|| "proposed".into());
  fs::write(dir.path().join(file_name), &request.new_file_contents)?;
  Ok(dir)
}
