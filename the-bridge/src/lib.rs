//! Editor-side bridge for assistant CLIs.
//!
//! An external AI coding assistant connects to this server and drives the
//! editor through a small tool interface: it can propose file contents as
//! interactive diffs (`openDiff`, which blocks until the user accepts or
//! rejects), and tear the resulting UI down again (`closeTab`,
//! `closeAllDiffTabs`). The heart of the crate is the diff subsystem in
//! [`diff`]; [`editor`] holds the headless editor state it manipulates,
//! and [`dispatch`] is the seam a transport plugs into.

pub mod config;
pub mod diff;
pub mod dispatch;
pub mod editor;
pub mod error;
pub mod rpc;
pub mod session;
pub mod tools;

pub use config::{
  Config,
  DiffLayout,
  DiffOptions,
  NewFileReject,
};
pub use error::BridgeError;
pub use session::{
  Session,
  SharedSession,
};
