//! Line-level diff of two texts into a single interleaved view.
//!
//! Given the old and new contents of a file, [`compute`] produces the
//! sequence of lines an inline (unified) diff buffer displays: unchanged
//! lines once, deleted old lines followed by the added new lines that
//! replace them. The result keeps a parallel [`LineKind`] per line so a
//! renderer can decorate it, and [`InlineDiff::accepted_content`] recovers
//! the new text when the user accepts the proposal.

use imara_diff::{
  Algorithm,
  Diff,
  Hunk,
  IndentHeuristic,
  IndentLevel,
  InternedInput,
};

const INDENT_WIDTH: u8 = 4;

/// Classification of a single line in an inline diff view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
  Unchanged,
  Added,
  Deleted,
}

impl LineKind {
  /// Sign-column marker for this kind, if any.
  pub const fn sign(self) -> Option<char> {
    match self {
      LineKind::Unchanged => None,
      LineKind::Added => Some('+'),
      LineKind::Deleted => Some('-'),
    }
  }

  /// Highlight group used for the line background.
  pub const fn highlight(self) -> Option<&'static str> {
    match self {
      LineKind::Unchanged => None,
      LineKind::Added => Some("DiffAdd"),
      LineKind::Deleted => Some("DiffDelete"),
    }
  }
}

/// An interleaved line diff, ready for rendering.
///
/// `lines` and `kinds` are parallel; `trailing_newline` records whether the
/// new text ended with a newline so that accepted content round-trips
/// exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineDiff {
  pub lines:            Vec<String>,
  pub kinds:            Vec<LineKind>,
  pub trailing_newline: bool,
}

impl InlineDiff {
  /// The content the user accepted: every line that is not a deletion,
  /// joined by newlines, with the trailing newline restored iff the
  /// proposed text carried one.
  pub fn accepted_content(&self) -> String {
    let mut out = self
      .lines
      .iter()
      .zip(&self.kinds)
      .filter(|(_, kind)| **kind != LineKind::Deleted)
      .map(|(line, _)| line.as_str())
      .collect::<Vec<_>>()
      .join("\n");
    if self.trailing_newline && !self.lines.is_empty() {
      out.push('\n');
    }
    out
  }

  /// Index of the first added or deleted line, for initial cursor placement.
  pub fn first_change(&self) -> Option<usize> {
    self.kinds.iter().position(|kind| *kind != LineKind::Unchanged)
  }

  pub fn len(&self) -> usize {
    self.lines.len()
  }

  pub fn is_empty(&self) -> bool {
    self.lines.is_empty()
  }

  /// Iterate over `(line, kind)` pairs.
  pub fn iter(&self) -> impl Iterator<Item = (&str, LineKind)> + '_ {
    self
      .lines
      .iter()
      .map(String::as_str)
      .zip(self.kinds.iter().copied())
  }
}

/// Split into lines, dropping the empty element a final newline produces:
/// `"a\nb\n"` is two lines, not three, and `""` is no lines at all.
fn split_lines(text: &str) -> Vec<&str> {
  if text.is_empty() {
    return Vec::new();
  }
  let mut lines: Vec<&str> = text.split('\n').collect();
  if text.ends_with('\n') {
    lines.pop();
  }
  lines
}

/// Compute the interleaved line diff between `old_text` and `new_text`.
///
/// Hunks come from imara-diff over interned lines (histogram algorithm,
/// with the indent heuristic so hunk boundaries land where a human would
/// put them). Walking the hunks in order emits the unchanged run before
/// each hunk, then the hunk's deleted old lines, then its added new lines;
/// whatever follows the last hunk is unchanged.
pub fn compute(old_text: &str, new_text: &str) -> InlineDiff {
  let old_lines = split_lines(old_text);
  let new_lines = split_lines(new_text);

  let mut input = InternedInput::default();
  input.update_before(old_lines.iter().copied());
  input.update_after(new_lines.iter().copied());

  let mut diff = Diff::compute(Algorithm::Histogram, &input);
  diff.postprocess_with_heuristic(
    &input,
    IndentHeuristic::new(|token| {
      IndentLevel::for_ascii_line(input.interner[token].bytes(), INDENT_WIDTH)
    }),
  );

  let mut lines = Vec::with_capacity(old_lines.len().max(new_lines.len()));
  let mut kinds = Vec::with_capacity(lines.capacity());
  let mut push = |line: &str, kind: LineKind| {
    lines.push(line.to_owned());
    kinds.push(kind);
  };

  let mut old_pos = 0;
  for Hunk { before, after } in diff.hunks() {
    for &line in &old_lines[old_pos..before.start as usize] {
      push(line, LineKind::Unchanged);
    }
    for &line in &old_lines[before.start as usize..before.end as usize] {
      push(line, LineKind::Deleted);
    }
    for &line in &new_lines[after.start as usize..after.end as usize] {
      push(line, LineKind::Added);
    }
    old_pos = before.end as usize;
  }
  for &line in &old_lines[old_pos..] {
    push(line, LineKind::Unchanged);
  }

  InlineDiff {
    lines,
    kinds,
    trailing_newline: new_text.ends_with('\n'),
  }
}
