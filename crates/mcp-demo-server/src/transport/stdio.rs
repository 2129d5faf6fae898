//! Persistent stream transport: newline-delimited JSON over a duplex pair.
//!
//! The read loop never waits on a handler. Every message is dispatched in
//! its own task and finished frames go through a channel to a single writer
//! task, so frames never interleave and responses leave in completion order.
//! A request named by `notifications/cancelled` is aborted and never answered.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::protocol::ProtocolHandler;
use crate::types::{JsonRpcMessage, McpError, McpResult, RequestId};

use super::framing;

/// Stdio transport for desktop MCP clients.
pub struct StdioTransport {
    handler: Arc<ProtocolHandler>,
}

impl StdioTransport {
    pub fn new(handler: ProtocolHandler) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// Serve stdin/stdout until the client closes its end.
    pub async fn run(&self) -> McpResult<()> {
        tracing::info!("Stdio transport started");
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve one session over an arbitrary reader/writer pair.
    ///
    /// On EOF the loop stops reading and drains in-flight requests. If the
    /// writer fails, in-flight handlers are aborted and `Transport` is returned.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> McpResult<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let mut lines = BufReader::new(reader).lines();
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let mut writer_task = tokio::spawn(write_frames(writer, rx));
        let mut in_flight: JoinSet<()> = JoinSet::new();
        let mut reading = true;

        loop {
            tokio::select! {
                line = lines.next_line(), if reading => match line {
                    Ok(Some(line)) => self.accept(&line, &tx, &mut in_flight),
                    Ok(None) => {
                        tracing::info!("EOF on input, draining {} in-flight request(s)", in_flight.len());
                        reading = false;
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                        tracing::warn!("Undecodable line: {e}");
                        send_error(&tx, &McpError::ParseError(e.to_string()));
                    }
                    Err(e) => {
                        tracing::warn!("Read failed, draining: {e}");
                        reading = false;
                    }
                },
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => match joined {
                    Err(e) if e.is_cancelled() => tracing::debug!("Request cancelled by client"),
                    Err(e) => tracing::error!("Dispatch task failed: {e}"),
                    Ok(()) => {}
                },
                written = &mut writer_task => {
                    in_flight.abort_all();
                    let reason = match written {
                        Ok(Err(e)) => e.to_string(),
                        Err(e) => e.to_string(),
                        Ok(Ok(())) => "writer closed".to_string(),
                    };
                    tracing::error!("Output closed, aborting in-flight requests: {reason}");
                    return Err(McpError::Transport(reason));
                }
            }

            if !reading && in_flight.is_empty() {
                break;
            }
        }

        drop(tx);
        match writer_task.await {
            Ok(Ok(())) => {
                tracing::info!("Stdio session closed");
                Ok(())
            }
            Ok(Err(e)) => Err(McpError::Transport(e.to_string())),
            Err(e) => Err(McpError::Transport(e.to_string())),
        }
    }

    fn accept(&self, line: &str, tx: &mpsc::UnboundedSender<String>, in_flight: &mut JoinSet<()>) {
        if line.trim().is_empty() {
            return;
        }

        let msg = match framing::parse_message(line) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!("Parse error: {e}");
                send_error(tx, &e);
                return;
            }
        };

        let request_id = match &msg {
            JsonRpcMessage::Request(request) => Some(request.id.clone()),
            _ => None,
        };
        let handler = self.handler.clone();
        let tx = tx.clone();
        let task = {
            let request_id = request_id.clone();
            async move {
                let response = handler.handle_message(msg).await;
                if let Some(id) = &request_id {
                    handler.untrack(id);
                }
                let Some(response) = response else {
                    return;
                };
                match framing::frame_message(&response) {
                    Ok(frame) => {
                        if tx.send(frame).is_err() {
                            tracing::debug!("Writer gone, dropping response");
                        }
                    }
                    Err(e) => tracing::error!("Failed to frame response: {e}"),
                }
            }
        };

        match request_id {
            Some(id) => self.handler.track(id, || in_flight.spawn(task)),
            None => {
                in_flight.spawn(task);
            }
        }
    }
}

fn send_error(tx: &mpsc::UnboundedSender<String>, error: &McpError) {
    match framing::error_frame(error, RequestId::Null) {
        Ok(frame) => {
            let _ = tx.send(frame);
        }
        Err(e) => tracing::error!("Failed to frame error: {e}"),
    }
}

async fn write_frames<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<String>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = rx.recv().await {
        writer.write_all(frame.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}
