//! Materializing a diff in the editor.
//!
//! The split path shows the original file on one side and the proposed
//! content in a write-intercepting scratch buffer on the other, both in
//! diff mode. The inline path renders a single read-only buffer
//! interleaving deleted and added lines. Both honor the new-tab and
//! assistant-terminal placement options.
//!
//! Everything fallible (file reads) happens before the first editor
//! mutation, so a failure here only ever has the tab placement to unwind.

use std::fs;

use the_linediff::LineKind;

use crate::{
  config::{
    DiffLayout,
    DiffOptions,
  },
  diff::{
    DiffRequest,
    Layout,
    TabPlacement,
    inline_buffer_name,
    proposed_buffer_name,
  },
  editor::{
    DEFAULT_TERMINAL_WIDTH,
    Document,
    DocumentId,
    DIFF_TAB_NAME_VAR,
    Editor,
    INLINE_DIFF_VAR,
    LineDecoration,
    Window,
    WindowId,
    filetype_from_path,
  },
  error::BridgeError,
};

pub(crate) struct BuiltLayout {
  pub layout:          Layout,
  pub placement:       Option<TabPlacement>,
  pub original_cursor: Option<(usize, usize)>,
}

/// Build the configured layout for `request`, including tab placement and
/// focus policy. On failure the tab placement is unwound before the error
/// propagates.
pub(crate) fn build(
  editor: &mut Editor,
  opts: &DiffOptions,
  request: &DiffRequest,
  is_new_file: bool,
) -> Result<BuiltLayout, BridgeError> {
  if editor.tab(editor.current_tab()).is_none() {
    return Err(BridgeError::NoSuitableWindow);
  }

  let placement = opts
    .open_in_new_tab
    .then(|| place_in_new_tab(editor, opts));

  let built = match opts.layout {
    DiffLayout::Inline => build_inline(editor, request, is_new_file),
    DiffLayout::Vertical | DiffLayout::Horizontal => {
      build_split(editor, request, is_new_file)
    },
  };

  match built {
    Ok((layout, original_cursor)) => {
      if opts.keep_terminal_focus {
        if let Some(terminal) = editor.assistant_terminal_in(editor.current_tab()) {
          editor.focus_window(terminal);
        }
      }
      Ok(BuiltLayout {
        layout,
        placement,
        original_cursor,
      })
    },
    Err(err) => {
      if let Some(placement) = placement {
        editor.switch_tab(placement.original_tab);
        editor.close_tab(placement.new_tab);
      }
      Err(err)
    },
  }
}

/// Snapshot the assistant terminal, open a fresh tab, and re-embed the
/// terminal there unless configured not to.
fn place_in_new_tab(editor: &mut Editor, opts: &DiffOptions) -> TabPlacement {
  let original_tab = editor.current_tab();
  let terminal = editor.assistant_terminal_in(original_tab);
  let terminal_width = terminal
    .and_then(|id| editor.window(id))
    .map(Window::width);
  let had_assistant_terminal = terminal.is_some();

  let new_tab = editor.create_tab();
  if had_assistant_terminal && !opts.hide_terminal_in_new_tab {
    editor.embed_assistant_terminal(terminal_width.unwrap_or(DEFAULT_TERMINAL_WIDTH));
  }

  TabPlacement {
    new_tab,
    original_tab,
    had_assistant_terminal,
    terminal_width,
  }
}

fn build_split(
  editor: &mut Editor,
  request: &DiffRequest,
  is_new_file: bool,
) -> Result<(Layout, Option<(usize, usize)>), BridgeError> {
  let (original_window, original_document, original_created_by_us) =
    select_original_side(editor, request, is_new_file)?;
  let original_cursor = editor.window(original_window).map(Window::cursor);

  let name = proposed_buffer_name(&request.tab_name, is_new_file);
  let mut doc = Document::scratch(&name, &request.new_file_contents);
  doc.set_write_intercepted(true);
  doc.set_var(DIFF_TAB_NAME_VAR, &request.tab_name);
  doc.set_filetype(
    editor
      .document(original_document)
      .and_then(|original| original.filetype().map(str::to_owned))
      .or_else(|| filetype_from_path(&request.new_file_path)),
  );
  let proposed_document = editor.create_document(doc);
  let diff_window = editor.split_window(proposed_document);

  for window in [original_window, diff_window] {
    if let Some(window) = editor.window_mut(window) {
      window.set_diff_mode(true);
    }
  }
  editor.equalize_widths();
  editor.focus_window(diff_window);

  Ok((
    Layout::Split {
      original_window,
      original_document,
      original_created_by_us,
      proposed_document,
      diff_window,
    },
    original_cursor,
  ))
}

/// Pick (or create) the window hosting the original side of a split diff.
///
/// A window already showing the file wins. A new-file diff reuses the
/// focused window's pristine scratch buffer as the placeholder rather
/// than splitting for nothing. Otherwise the file lands in the main
/// window, or in a fresh split when the tab has no file window at all.
fn select_original_side(
  editor: &mut Editor,
  request: &DiffRequest,
  is_new_file: bool,
) -> Result<(WindowId, DocumentId, bool), BridgeError> {
  if !is_new_file {
    if let Some(window) = editor.window_showing(&request.old_file_path) {
      let doc = editor
        .window(window)
        .map(Window::doc)
        .ok_or(BridgeError::NoSuitableWindow)?;
      return Ok((window, doc, false));
    }

    let doc = editor
      .load_document(&request.old_file_path)
      .map_err(|err| {
        BridgeError::internal(format!(
          "failed to read {}: {err}",
          request.old_file_path.display()
        ))
      })?;
    let window = match editor.main_window() {
      Some(window) => {
        editor.show_document(window, doc);
        window
      },
      None => editor.split_window(doc),
    };
    return Ok((window, doc, false));
  }

  // New file: there is nothing on disk to show.
  if let Some(window) = editor.focused_window() {
    let reusable = editor
      .window(window)
      .is_some_and(|win| win.is_file() && !win.diff_mode());
    if let (true, Some(doc)) = (reusable, editor.window(window).map(Window::doc)) {
      if editor
        .document(doc)
        .is_some_and(Document::is_empty_scratch)
      {
        if let Some(doc_mut) = editor.document_mut(doc) {
          doc_mut.set_path(request.old_file_path.clone());
        }
        return Ok((window, doc, true));
      }
    }
  }

  let mut placeholder = Document::from_file(request.old_file_path.clone(), "");
  placeholder.set_filetype(filetype_from_path(&request.new_file_path));
  let doc = editor.create_document(placeholder);
  let window = editor.split_window(doc);
  Ok((window, doc, true))
}

fn build_inline(
  editor: &mut Editor,
  request: &DiffRequest,
  is_new_file: bool,
) -> Result<(Layout, Option<(usize, usize)>), BridgeError> {
  let old_text = if is_new_file {
    String::new()
  } else if let Some(doc) = editor.document_by_path(&request.old_file_path) {
    editor
      .document(doc)
      .map(Document::content)
      .unwrap_or_default()
  } else {
    fs::read_to_string(&request.old_file_path).map_err(|err| {
      BridgeError::internal(format!(
        "failed to read {}: {err}",
        request.old_file_path.display()
      ))
    })?
  };

  let diff = the_linediff::compute(&old_text, &request.new_file_contents);

  let name = inline_buffer_name(&request.tab_name);
  let mut doc = Document::scratch(&name, &diff.lines.join("\n"));
  doc.set_readonly(true);
  doc.set_write_intercepted(true);
  doc.set_var(DIFF_TAB_NAME_VAR, &request.tab_name);
  doc.set_var(INLINE_DIFF_VAR, "true");
  doc.set_filetype(
    filetype_from_path(&request.new_file_path)
      .or_else(|| filetype_from_path(&request.old_file_path)),
  );
  doc.set_decorations(
    diff
      .iter()
      .enumerate()
      .filter(|(_, (_, kind))| *kind != LineKind::Unchanged)
      .map(|(line, (_, kind))| LineDecoration { line, kind })
      .collect(),
  );
  let document = editor.create_document(doc);
  let window = editor.split_window(document);

  if let Some(line) = diff.first_change() {
    if let Some(win) = editor.window_mut(window) {
      win.set_cursor((line, 0));
    }
  }
  editor.focus_window(window);

  Ok((
    Layout::Inline {
      document,
      window,
      diff,
    },
    None,
  ))
}
