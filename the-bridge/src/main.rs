use anyhow::Context as _;
use the_bridge::{
  Config,
  Session,
  config::ConfigLoadError,
  dispatch::{
    Dispatcher,
    OutgoingMessage,
    ToolCall,
  },
};
use tokio::{
  io::{
    AsyncBufReadExt,
    AsyncWriteExt,
    BufReader,
  },
  sync::mpsc,
};

fn main() -> anyhow::Result<()> {
  env_logger::init();

  let config = match Config::load_user() {
    Ok(config) => config,
    Err(err @ ConfigLoadError::BadConfig(_)) => anyhow::bail!("{err}"),
    Err(_) => Config::default(),
  };

  let runtime = tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .context("failed to build the runtime")?;
  runtime.block_on(serve(config))
}

/// Serve line-delimited tool calls on stdin, replies on stdout, until the
/// assistant hangs up.
async fn serve(config: Config) -> anyhow::Result<()> {
  let session = Session::shared(config);
  let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<OutgoingMessage>();
  let dispatcher = Dispatcher::new(session.clone(), outgoing_tx);

  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  let mut stdout = tokio::io::stdout();

  loop {
    tokio::select! {
      line = lines.next_line() => {
        match line? {
          Some(line) if line.trim().is_empty() => {},
          Some(line) => match serde_json::from_str::<ToolCall>(&line) {
            Ok(call) => dispatcher.dispatch(call),
            Err(err) => log::error!("unparseable tool call: {err}"),
          },
          None => break, // EOF: the assistant is gone.
        }
      },
      Some(message) = outgoing_rx.recv() => {
        write_message(&mut stdout, &message).await?;
      },
    }
  }

  // Reject whatever is still pending so suspended handlers resolve, then
  // flush their replies before exiting.
  let closed = session.lock().shutdown();
  if closed > 0 {
    log::info!("shutdown rejected {closed} pending diff(s)");
  }
  tokio::task::yield_now().await;
  while let Ok(message) = outgoing_rx.try_recv() {
    write_message(&mut stdout, &message).await?;
  }

  Ok(())
}

async fn write_message(
  stdout: &mut tokio::io::Stdout,
  message: &OutgoingMessage,
) -> anyhow::Result<()> {
  let json = serde_json::to_string(message).context("failed to serialize reply")?;
  stdout.write_all(json.as_bytes()).await?;
  stdout.write_all(b"\n").await?;
  stdout.flush().await?;
  Ok(())
}
