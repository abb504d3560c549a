//! Routing tool calls to their handlers.
//!
//! `closeTab` and `closeAllDiffTabs` reply inline. `openDiff` blocks on
//! the user's decision, so its handler is spawned as its own task and the
//! reply goes out through the outgoing queue whenever the diff resolves —
//! replies are not ordered with respect to requests. A dispatcher built
//! for a context that cannot host suspended tasks refuses `openDiff`
//! outright; calling it there is a programming error, not a user error.

use serde::{
  Deserialize,
  Serialize,
};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{
  rpc::{
    RpcError,
    ToolResult,
  },
  session::SharedSession,
  tools,
};

pub type RequestId = i64;

/// An incoming tool call.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
  pub id:     RequestId,
  pub method: String,
  #[serde(default)]
  pub params: Value,
}

/// A reply travelling back to the assistant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutgoingMessage {
  Response { id: RequestId, result: ToolResult },
  Error { id: RequestId, error: RpcError },
}

impl OutgoingMessage {
  pub fn from_result(id: RequestId, result: Result<ToolResult, RpcError>) -> Self {
    match result {
      Ok(result) => OutgoingMessage::Response { id, result },
      Err(error) => OutgoingMessage::Error { id, error },
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatchMode {
  /// Handlers may suspend; replies arrive out of order.
  Suspendable,
  /// No task may outlive its dispatch; blocking tools are rejected.
  Immediate,
}

pub struct Dispatcher {
  session:  SharedSession,
  outgoing: mpsc::UnboundedSender<OutgoingMessage>,
  mode:     DispatchMode,
}

impl Dispatcher {
  pub fn new(session: SharedSession, outgoing: mpsc::UnboundedSender<OutgoingMessage>) -> Self {
    Self {
      session,
      outgoing,
      mode: DispatchMode::Suspendable,
    }
  }

  /// A dispatcher for contexts without a task runtime. `openDiff` fails
  /// here instead of wedging the caller forever.
  pub fn immediate(
    session: SharedSession,
    outgoing: mpsc::UnboundedSender<OutgoingMessage>,
  ) -> Self {
    Self {
      session,
      outgoing,
      mode: DispatchMode::Immediate,
    }
  }

  pub fn dispatch(&self, call: ToolCall) {
    log::debug!("dispatching {} (id {})", call.method, call.id);
    match call.method.as_str() {
      "openDiff" => self.dispatch_open_diff(call),
      "closeTab" => self.reply(call.id, tools::close_tab(&self.session, call.params)),
      "closeAllDiffTabs" => self.reply(call.id, tools::close_all_diff_tabs(&self.session)),
      other => self.reply(call.id, Err(RpcError::method_not_found(other))),
    }
  }

  fn dispatch_open_diff(&self, call: ToolCall) {
    if self.mode != DispatchMode::Suspendable {
      self.reply(
        call.id,
        Err(RpcError::internal(
          "openDiff must run on a suspendable dispatcher",
        )),
      );
      return;
    }

    let session = self.session.clone();
    let outgoing = self.outgoing.clone();
    let id = call.id;
    tokio::spawn(async move {
      let result = tools::open_diff(session, call.params).await;
      let _ = outgoing.send(OutgoingMessage::from_result(id, result));
    });
  }

  fn reply(&self, id: RequestId, result: Result<ToolResult, RpcError>) {
    let _ = self.outgoing.send(OutgoingMessage::from_result(id, result));
  }
}
