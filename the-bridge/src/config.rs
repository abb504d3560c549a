//! Bridge configuration.
//!
//! Loaded from a global config file plus an optional workspace-local one,
//! the local file overriding the global per key. Only the `[diff]` table is
//! consumed by the diff core; its shape is documented in the README.
//!
//! Legacy keys from earlier releases (`vertical-split`,
//! `open-in-current-tab`, `auto-close-on-accept`, `show-diff-stats`) are
//! still accepted: the first two map onto their modern equivalents, the
//! others are ignored with a warning. Anything else unknown is an error.

use std::{
  env,
  fs,
  io::Error as IoError,
  path::PathBuf,
};

use serde::Deserialize;
use toml::de::Error as TomlError;

/// How a diff is laid out on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiffLayout {
  /// Side-by-side split, windows left and right.
  Vertical,
  /// Stacked split, windows top and bottom.
  Horizontal,
  /// Single read-only buffer interleaving deleted and added lines.
  Inline,
}

/// What happens to the placeholder when a new-file diff is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NewFileReject {
  /// Leave the empty placeholder buffer in its window.
  KeepEmpty,
  /// Close the placeholder window along with the rest of the diff UI.
  CloseWindow,
}

/// Resolved diff options, static for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOptions {
  pub layout:                   DiffLayout,
  pub open_in_new_tab:          bool,
  pub keep_terminal_focus:      bool,
  pub hide_terminal_in_new_tab: bool,
  pub on_new_file_reject:       NewFileReject,
}

impl Default for DiffOptions {
  fn default() -> Self {
    Self {
      layout:                   DiffLayout::Vertical,
      open_in_new_tab:          false,
      keep_terminal_focus:      false,
      hide_terminal_in_new_tab: false,
      on_new_file_reject:       NewFileReject::KeepEmpty,
    }
  }
}

/// Raw `[diff]` table as written by the user, legacy keys included.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
struct DiffOptionsRaw {
  layout:                   Option<DiffLayout>,
  open_in_new_tab:          Option<bool>,
  keep_terminal_focus:      Option<bool>,
  hide_terminal_in_new_tab: Option<bool>,
  on_new_file_reject:       Option<NewFileReject>,

  // Legacy keys, kept so old configurations still load.
  vertical_split:       Option<bool>,
  open_in_current_tab:  Option<bool>,
  auto_close_on_accept: Option<toml::Value>,
  show_diff_stats:      Option<toml::Value>,
}

impl DiffOptionsRaw {
  /// Overlay `other` on top of `self`, key by key.
  fn merge(self, other: DiffOptionsRaw) -> DiffOptionsRaw {
    DiffOptionsRaw {
      layout:                   other.layout.or(self.layout),
      open_in_new_tab:          other.open_in_new_tab.or(self.open_in_new_tab),
      keep_terminal_focus:      other.keep_terminal_focus.or(self.keep_terminal_focus),
      hide_terminal_in_new_tab: other
        .hide_terminal_in_new_tab
        .or(self.hide_terminal_in_new_tab),
      on_new_file_reject:       other.on_new_file_reject.or(self.on_new_file_reject),
      vertical_split:           other.vertical_split.or(self.vertical_split),
      open_in_current_tab:      other.open_in_current_tab.or(self.open_in_current_tab),
      auto_close_on_accept:     other.auto_close_on_accept.or(self.auto_close_on_accept),
      show_diff_stats:          other.show_diff_stats.or(self.show_diff_stats),
    }
  }

  fn resolve(self) -> DiffOptions {
    let mut opts = DiffOptions::default();

    // Legacy mappings first so that modern keys win when both are present.
    if let Some(vertical) = self.vertical_split {
      log::warn!("config: diff.vertical-split is deprecated, use diff.layout");
      opts.layout = if vertical {
        DiffLayout::Vertical
      } else {
        DiffLayout::Horizontal
      };
    }
    if let Some(current) = self.open_in_current_tab {
      log::warn!("config: diff.open-in-current-tab is deprecated, use diff.open-in-new-tab");
      opts.open_in_new_tab = !current;
    }
    if self.auto_close_on_accept.is_some() {
      log::warn!("config: diff.auto-close-on-accept is no longer supported, ignoring");
    }
    if self.show_diff_stats.is_some() {
      log::warn!("config: diff.show-diff-stats is no longer supported, ignoring");
    }

    if let Some(layout) = self.layout {
      opts.layout = layout;
    }
    if let Some(new_tab) = self.open_in_new_tab {
      opts.open_in_new_tab = new_tab;
    }
    if let Some(focus) = self.keep_terminal_focus {
      opts.keep_terminal_focus = focus;
    }
    if let Some(hide) = self.hide_terminal_in_new_tab {
      opts.hide_terminal_in_new_tab = hide;
    }
    if let Some(reject) = self.on_new_file_reject {
      opts.on_new_file_reject = reject;
    }

    opts
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigRaw {
  diff: DiffOptionsRaw,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
  pub diff: DiffOptions,
}

impl Config {
  /// Build a config with the given diff options; handy for tests and
  /// embedders.
  pub fn with_diff(diff: DiffOptions) -> Self {
    Config { diff }
  }

  pub fn load(
    global: Result<String, ConfigLoadError>,
    local: Result<String, ConfigLoadError>,
  ) -> Result<Config, ConfigLoadError> {
    let global_config: Result<ConfigRaw, ConfigLoadError> =
      global.and_then(|file| toml::from_str(&file).map_err(ConfigLoadError::BadConfig));
    let local_config: Result<ConfigRaw, ConfigLoadError> =
      local.and_then(|file| toml::from_str(&file).map_err(ConfigLoadError::BadConfig));

    let raw = match (global_config, local_config) {
      (Ok(global), Ok(local)) => global.diff.merge(local.diff),
      (_, Err(ConfigLoadError::BadConfig(err))) | (Err(ConfigLoadError::BadConfig(err)), _) => {
        return Err(ConfigLoadError::BadConfig(err));
      },
      (Ok(config), Err(_)) | (Err(_), Ok(config)) => config.diff,
      (Err(err), Err(_)) => return Err(err),
    };

    Ok(Config {
      diff: raw.resolve(),
    })
  }

  /// Load the user config from the standard locations: the global file
  /// under the config directory and a workspace-local `.the-bridge.toml`.
  pub fn load_user() -> Result<Config, ConfigLoadError> {
    let global = fs::read_to_string(config_file()).map_err(ConfigLoadError::Error);
    let local = fs::read_to_string(workspace_config_file()).map_err(ConfigLoadError::Error);
    Self::load(global, local)
  }
}

#[derive(Debug)]
pub enum ConfigLoadError {
  BadConfig(TomlError),
  Error(IoError),
}

impl std::fmt::Display for ConfigLoadError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::BadConfig(err) => write!(f, "failed to parse config: {err}"),
      Self::Error(err) => write!(f, "failed to read config: {err}"),
    }
  }
}

impl std::error::Error for ConfigLoadError {}

pub fn config_file() -> PathBuf {
  config_dir().join("config.toml")
}

pub fn workspace_config_file() -> PathBuf {
  PathBuf::from(".the-bridge.toml")
}

fn config_dir() -> PathBuf {
  let base = env::var_os("XDG_CONFIG_HOME")
    .map(PathBuf::from)
    .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
    .unwrap_or_default();
  base.join("the-bridge")
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(text: &str) -> Result<Config, ConfigLoadError> {
    Config::load(
      Ok(text.to_string()),
      Err(ConfigLoadError::Error(IoError::other("missing"))),
    )
  }

  #[test]
  fn defaults_when_both_files_missing() {
    let missing = || Err(ConfigLoadError::Error(IoError::other("missing")));
    let config = Config::load(missing(), missing()).unwrap();
    assert_eq!(config, Config::default());
  }

  #[test]
  fn parses_modern_keys() {
    let config = parse(
      r#"
        [diff]
        layout = "inline"
        open-in-new-tab = true
        on-new-file-reject = "close-window"
      "#,
    )
    .unwrap();
    assert_eq!(config.diff.layout, DiffLayout::Inline);
    assert!(config.diff.open_in_new_tab);
    assert_eq!(config.diff.on_new_file_reject, NewFileReject::CloseWindow);
  }

  #[test]
  fn legacy_keys_map_onto_modern_options() {
    let config = parse(
      r#"
        [diff]
        vertical-split = false
        open-in-current-tab = false
        auto-close-on-accept = true
        show-diff-stats = false
      "#,
    )
    .unwrap();
    assert_eq!(config.diff.layout, DiffLayout::Horizontal);
    assert!(config.diff.open_in_new_tab);
  }

  #[test]
  fn modern_keys_win_over_legacy() {
    let config = parse(
      r#"
        [diff]
        vertical-split = false
        layout = "vertical"
      "#,
    )
    .unwrap();
    assert_eq!(config.diff.layout, DiffLayout::Vertical);
  }

  #[test]
  fn unknown_keys_are_rejected() {
    assert!(matches!(
      parse("[diff]\nno-such-option = 1\n"),
      Err(ConfigLoadError::BadConfig(_))
    ));
  }

  #[test]
  fn local_overrides_global_per_key() {
    let global = r#"
      [diff]
      layout = "horizontal"
      keep-terminal-focus = true
    "#;
    let local = r#"
      [diff]
      layout = "inline"
    "#;
    let config = Config::load(Ok(global.to_string()), Ok(local.to_string())).unwrap();
    assert_eq!(config.diff.layout, DiffLayout::Inline);
    assert!(config.diff.keep_terminal_focus);
  }
}
