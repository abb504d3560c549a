//! End-to-end diff scenarios: an assistant opens a diff, the user acts,
//! the suspended reply resolves, and `closeTab` tears the UI down.

use std::{
  path::{
    Path,
    PathBuf,
  },
  time::Duration,
};

use the_bridge::{
  BridgeError,
  Config,
  DiffLayout,
  DiffOptions,
  NewFileReject,
  Session,
  SharedSession,
  diff::{
    self,
    DiffRequest,
    DiffStatus,
    Layout,
  },
  editor::DocumentId,
  rpc::{
    DIFF_REJECTED,
    FILE_SAVED,
    ToolResult,
  },
  tools,
};
use the_linediff::LineKind;
use tokio::task::JoinHandle;

fn request(old: &Path, contents: &str, tab_name: &str) -> DiffRequest {
  DiffRequest {
    old_file_path:     old.to_path_buf(),
    new_file_path:     old.to_path_buf(),
    new_file_contents: contents.to_string(),
    tab_name:          tab_name.to_string(),
  }
}

fn spawn_open_diff(
  session: &SharedSession,
  request: DiffRequest,
) -> JoinHandle<Result<ToolResult, BridgeError>> {
  let session = session.clone();
  tokio::spawn(diff::open_diff(session, request))
}

/// Spin until the controller has registered the diff and suspended.
async fn wait_registered(session: &SharedSession, tab_name: &str) {
  for _ in 0..1000 {
    if session.lock().diffs.contains(tab_name) {
      return;
    }
    tokio::task::yield_now().await;
  }
  panic!("diff '{tab_name}' never registered");
}

fn proposed_doc(session: &SharedSession, tab_name: &str) -> DocumentId {
  session
    .lock()
    .diffs
    .get(tab_name)
    .expect("diff should be registered")
    .proposed_document()
}

fn texts(result: &ToolResult) -> Vec<&str> {
  result.content.iter().map(|block| block.as_text()).collect()
}

#[tokio::test]
async fn accepting_a_diff_returns_the_saved_content() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("a.txt");
  std::fs::write(&path, "one\ntwo\n").unwrap();

  let session = Session::shared(Config::default());
  let handle = spawn_open_diff(&session, request(&path, "one\ntwo_x\n", "tab1"));
  wait_registered(&session, "tab1").await;

  let doc = proposed_doc(&session, "tab1");
  session.lock().save_document(doc).unwrap();

  let result = handle.await.unwrap().unwrap();
  assert_eq!(texts(&result), vec![FILE_SAVED, "one\ntwo_x\n"]);

  // The diff core never writes the file itself.
  assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\ntwo\n");
}

#[tokio::test]
async fn closing_the_proposed_buffer_rejects_the_diff() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("a.txt");
  std::fs::write(&path, "one\ntwo\n").unwrap();

  let session = Session::shared(Config::default());
  let handle = spawn_open_diff(&session, request(&path, "one\ntwo_x\n", "tab1"));
  wait_registered(&session, "tab1").await;

  let doc = proposed_doc(&session, "tab1");
  session.lock().close_document(doc);

  let result = handle.await.unwrap().unwrap();
  assert_eq!(texts(&result), vec![DIFF_REJECTED, "tab1"]);
  assert_eq!(
    session.lock().diffs.get("tab1").unwrap().status,
    DiffStatus::Rejected
  );
}

#[tokio::test]
async fn new_file_diffs_accept_the_edited_content() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("new.txt");

  let session = Session::shared(Config::default());
  let handle = spawn_open_diff(&session, request(&path, "hello\n", "tab2"));
  wait_registered(&session, "tab2").await;

  let doc = proposed_doc(&session, "tab2");
  {
    let mut sess = session.lock();
    assert!(sess.diffs.get("tab2").unwrap().is_new_file);
    sess
      .editor
      .document_mut(doc)
      .unwrap()
      .set_text("hello world\n");
  }
  session.lock().save_document(doc).unwrap();

  let result = handle.await.unwrap().unwrap();
  assert_eq!(texts(&result), vec![FILE_SAVED, "hello world\n"]);
}

#[tokio::test]
async fn unsaved_changes_refuse_the_diff_without_creating_state() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("a.txt");
  std::fs::write(&path, "one\ntwo\n").unwrap();

  let session = Session::shared(Config::default());
  {
    let mut sess = session.lock();
    let doc = sess.editor.open_file(&path).unwrap();
    sess.editor.document_mut(doc).unwrap().set_text("one\nedited");
  }

  let err = diff::open_diff(session.clone(), request(&path, "one\ntwo_x\n", "tab1"))
    .await
    .unwrap_err();
  assert!(matches!(err, BridgeError::UnsavedChanges { .. }));
  assert!(session.lock().diffs.is_empty());
}

#[tokio::test]
async fn reusing_a_tab_name_rejects_the_previous_diff_first() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("a.txt");
  std::fs::write(&path, "one\n").unwrap();

  let session = Session::shared(Config::default());
  let first = spawn_open_diff(&session, request(&path, "one\nfirst\n", "dup"));
  wait_registered(&session, "dup").await;

  let second = spawn_open_diff(&session, request(&path, "one\nsecond\n", "dup"));

  // The first caller observes the rejection caused by the replacement.
  let result = first.await.unwrap().unwrap();
  assert_eq!(texts(&result), vec![DIFF_REJECTED, "dup"]);

  wait_registered(&session, "dup").await;
  let doc = proposed_doc(&session, "dup");
  session.lock().save_document(doc).unwrap();

  let result = second.await.unwrap().unwrap();
  assert_eq!(texts(&result), vec![FILE_SAVED, "one\nsecond\n"]);
}

#[tokio::test]
async fn inline_layout_interleaves_and_accepts() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("a.txt");
  std::fs::write(&path, "a\nb\nc\n").unwrap();

  let config = Config::with_diff(DiffOptions {
    layout: DiffLayout::Inline,
    ..DiffOptions::default()
  });
  let session = Session::shared(config);
  let handle = spawn_open_diff(&session, request(&path, "a\nB\nc\n", "tab6"));
  wait_registered(&session, "tab6").await;

  {
    let sess = session.lock();
    let state = sess.diffs.get("tab6").unwrap();
    match &state.layout {
      Layout::Inline { diff, .. } => {
        assert_eq!(diff.lines, vec!["a", "b", "B", "c"]);
        assert_eq!(diff.kinds, vec![
          LineKind::Unchanged,
          LineKind::Deleted,
          LineKind::Added,
          LineKind::Unchanged,
        ]);
      },
      Layout::Split { .. } => panic!("expected an inline layout"),
    }
  }

  let doc = proposed_doc(&session, "tab6");
  session.lock().save_document(doc).unwrap();

  let result = handle.await.unwrap().unwrap();
  assert_eq!(texts(&result), vec![FILE_SAVED, "a\nB\nc\n"]);
}

#[tokio::test]
async fn close_tab_reloads_saved_files_after_the_assistant_writes() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("a.txt");
  std::fs::write(&path, "one\ntwo\n").unwrap();

  let session = Session::shared(Config::default());
  let handle = spawn_open_diff(&session, request(&path, "one\ntwo_x\n", "tab1"));
  wait_registered(&session, "tab1").await;

  let doc = proposed_doc(&session, "tab1");
  session.lock().save_document(doc).unwrap();
  handle.await.unwrap().unwrap();

  // The assistant consumes the reply and writes the file itself.
  std::fs::write(&path, "one\ntwo_x\n").unwrap();

  let result = tools::close_tab(
    &session,
    serde_json::json!({ "tab_name": "tab1" }),
  )
  .unwrap();
  assert_eq!(texts(&result), vec!["TAB_CLOSED"]);
  assert!(session.lock().diffs.is_empty());

  // The reload is deliberately deferred past the assistant's write.
  tokio::time::sleep(tools::RELOAD_DELAY + Duration::from_millis(50)).await;
  let sess = session.lock();
  let reloaded = sess.editor.document_by_path(&path).unwrap();
  assert_eq!(sess.editor.document(reloaded).unwrap().content(), "one\ntwo_x\n");
}

#[tokio::test]
async fn close_tab_rejects_a_still_pending_diff() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("a.txt");
  std::fs::write(&path, "one\n").unwrap();

  let session = Session::shared(Config::default());
  let handle = spawn_open_diff(&session, request(&path, "two\n", "tab1"));
  wait_registered(&session, "tab1").await;

  tools::close_tab(&session, serde_json::json!({ "tab_name": "tab1" })).unwrap();

  let result = handle.await.unwrap().unwrap();
  assert_eq!(texts(&result), vec![DIFF_REJECTED, "tab1"]);
  assert!(session.lock().diffs.is_empty());
}

#[tokio::test]
async fn close_all_diff_tabs_counts_what_it_closed() {
  let dir = tempfile::tempdir().unwrap();
  let path_a = dir.path().join("a.txt");
  let path_b = dir.path().join("b.txt");
  std::fs::write(&path_a, "a\n").unwrap();
  std::fs::write(&path_b, "b\n").unwrap();

  let session = Session::shared(Config::default());
  let first = spawn_open_diff(&session, request(&path_a, "a2\n", "one"));
  wait_registered(&session, "one").await;
  let second = spawn_open_diff(&session, request(&path_b, "b2\n", "two"));
  wait_registered(&session, "two").await;

  let result = tools::close_all_diff_tabs(&session).unwrap();
  assert_eq!(texts(&result), vec!["CLOSED_2_DIFF_TABS"]);

  assert_eq!(texts(&first.await.unwrap().unwrap())[0], DIFF_REJECTED);
  assert_eq!(texts(&second.await.unwrap().unwrap())[0], DIFF_REJECTED);
  assert!(session.lock().diffs.is_empty());
}

#[tokio::test]
async fn rejecting_a_new_file_diff_keeps_the_empty_placeholder() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("new.txt");

  let session = Session::shared(Config::default());
  let handle = spawn_open_diff(&session, request(&path, "hello\n", "tab2"));
  wait_registered(&session, "tab2").await;

  assert!(session.lock().reject_current_diff());

  let result = handle.await.unwrap().unwrap();
  assert_eq!(texts(&result), vec![DIFF_REJECTED, "tab2"]);

  // Eager teardown under keep-empty: the registry entry is gone already,
  // but the placeholder buffer survives, empty.
  let sess = session.lock();
  assert!(sess.diffs.is_empty());
  let placeholder = sess.editor.document_by_path(&path).unwrap();
  assert_eq!(sess.editor.document(placeholder).unwrap().content(), "");
}

#[tokio::test]
async fn shutdown_rejects_every_pending_diff() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("a.txt");
  std::fs::write(&path, "a\n").unwrap();

  let session = Session::shared(Config::default());
  let handle = spawn_open_diff(&session, request(&path, "a2\n", "tab1"));
  wait_registered(&session, "tab1").await;

  assert_eq!(session.lock().shutdown(), 1);

  let result = handle.await.unwrap().unwrap();
  assert_eq!(texts(&result)[0], DIFF_REJECTED);
  assert!(session.lock().diffs.is_empty());
}

#[tokio::test]
async fn new_tab_placement_is_restored_on_cleanup() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("a.txt");
  std::fs::write(&path, "a\n").unwrap();

  let config = Config::with_diff(DiffOptions {
    open_in_new_tab: true,
    ..DiffOptions::default()
  });
  let session = Session::shared(config);
  let original_tab = session.lock().editor.current_tab();

  let handle = spawn_open_diff(&session, request(&path, "a2\n", "tab1"));
  wait_registered(&session, "tab1").await;

  {
    let sess = session.lock();
    assert_eq!(sess.editor.tab_count(), 2);
    assert_ne!(sess.editor.current_tab(), original_tab);
    let state = sess.diffs.get("tab1").unwrap();
    let placement = state.placement.as_ref().unwrap();
    assert_eq!(placement.original_tab, original_tab);
  }

  let doc = proposed_doc(&session, "tab1");
  session.lock().save_document(doc).unwrap();
  handle.await.unwrap().unwrap();

  std::fs::write(&path, "a2\n").unwrap();
  tools::close_tab(&session, serde_json::json!({ "tab_name": "tab1" })).unwrap();

  let sess = session.lock();
  assert_eq!(sess.editor.tab_count(), 1);
  assert_eq!(sess.editor.current_tab(), original_tab);
}

#[tokio::test]
async fn close_window_config_drops_the_rejected_placeholder() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("new.txt");

  let config = Config::with_diff(DiffOptions {
    on_new_file_reject: NewFileReject::CloseWindow,
    ..DiffOptions::default()
  });
  let session = Session::shared(config);
  let handle = spawn_open_diff(&session, request(&path, "hello\n", "tab2"));
  wait_registered(&session, "tab2").await;

  assert!(session.lock().reject_current_diff());
  handle.await.unwrap().unwrap();

  // No eager teardown under close-window; the assistant's closeTab does it
  // and takes the placeholder along.
  assert!(session.lock().diffs.contains("tab2"));
  tools::close_tab(&session, serde_json::json!({ "tab_name": "tab2" })).unwrap();

  let sess = session.lock();
  assert!(sess.diffs.is_empty());
  assert!(sess.editor.document_by_path(&path).is_none());
}

#[tokio::test]
async fn keep_terminal_focus_returns_focus_to_the_assistant() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("a.txt");
  std::fs::write(&path, "a\n").unwrap();

  let config = Config::with_diff(DiffOptions {
    keep_terminal_focus: true,
    ..DiffOptions::default()
  });
  let session = Session::shared(config);
  let terminal = session
    .lock()
    .editor
    .embed_assistant_terminal(the_bridge::editor::DEFAULT_TERMINAL_WIDTH);

  let _handle = spawn_open_diff(&session, request(&path, "a2\n", "tab1"));
  wait_registered(&session, "tab1").await;

  assert_eq!(session.lock().editor.focused_window(), Some(terminal));
}

#[tokio::test]
async fn accept_current_diff_finds_the_owner_through_the_buffer_tag() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("a.txt");
  std::fs::write(&path, "one\n").unwrap();

  let session = Session::shared(Config::default());
  let handle = spawn_open_diff(&session, request(&path, "one\nmore\n", "tab1"));
  wait_registered(&session, "tab1").await;

  // The diff window is focused after layout; the command needs no argument.
  assert!(session.lock().accept_current_diff());

  let result = handle.await.unwrap().unwrap();
  assert_eq!(texts(&result), vec![FILE_SAVED, "one\nmore\n"]);
}
