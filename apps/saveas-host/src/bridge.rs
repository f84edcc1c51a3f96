//! JSON-lines bridge between the calling application and the save service.
//!
//! Each input line is a [`BridgeRequest`]. For an accepted `saveBase64`
//! the host writes `pending`, then `progress` lines, then one `ok` or
//! `error`. Requests rejected up front (bad arguments, busy, shut down)
//! get a single `error` line. `reset` gets no reply; any outstanding
//! result is dropped.

use std::future::Future;

use saveas_flow::{SaveEvent, SaveService};
use saveas_protocol::{Action, BridgeReply, BridgeRequest, SaveRequest};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

/// Serves requests from `input` until EOF or `interrupt` resolves, then
/// shuts the service down and flushes the remaining replies.
pub async fn serve<R, W>(
    mut service: SaveService,
    input: R,
    mut output: W,
    interrupt: impl Future<Output = ()>,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut events = service
        .take_events()
        .ok_or_else(|| anyhow::anyhow!("save events already taken"))?;
    let mut lines = input.lines();
    tokio::pin!(interrupt);

    info!("bridge ready");
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    if let Some(reply) = handle_line(&service, &line) {
                        write_reply(&mut output, &reply).await?;
                    }
                }
                None => {
                    info!("input closed");
                    break;
                }
            },
            Some(event) = events.recv() => {
                if event.is_terminal() {
                    debug!(request_id = event.request_id(), "request settled");
                }
                write_reply(&mut output, &reply_for(event)).await?;
            }
            _ = &mut interrupt => break,
        }
    }

    service.shutdown().await;
    while let Ok(event) = events.try_recv() {
        write_reply(&mut output, &reply_for(event)).await?;
    }
    output.flush().await?;
    Ok(())
}

/// Dispatches one input line; returns an immediate reply if there is one.
fn handle_line(service: &SaveService, line: &str) -> Option<BridgeReply> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let request = match BridgeRequest::from_line(line) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "malformed bridge request");
            return Some(BridgeReply::error("", e.kind(), e.to_string()));
        }
    };
    debug!(id = %request.id, action = %request.action, "bridge request");

    let action = match request.action() {
        Ok(action) => action,
        Err(e) => return Some(BridgeReply::error(request.id, e.kind(), e.to_string())),
    };

    match action {
        Action::Reset => {
            service.reset();
            None
        }
        Action::SaveBase64 => {
            let save = match SaveRequest::from_args(&request.args) {
                Ok(save) => save,
                Err(e) => {
                    return Some(BridgeReply::error(request.id, e.kind(), e.to_string()));
                }
            };
            // Replies arrive through the event stream.
            match service.submit(&request.id, save) {
                Ok(_pending) => None,
                Err(e) => Some(BridgeReply::error(request.id, e.kind(), e.to_string())),
            }
        }
    }
}

fn reply_for(event: SaveEvent) -> BridgeReply {
    match event {
        SaveEvent::Started { request_id } => BridgeReply::pending(request_id),
        SaveEvent::Progress {
            request_id,
            percent,
        } => BridgeReply::progress(request_id, percent),
        SaveEvent::Completed {
            request_id,
            outcome,
        } => BridgeReply::ok(request_id, outcome.to_dto()),
        SaveEvent::Failed {
            request_id,
            kind,
            message,
        } => BridgeReply::error(request_id, kind, message),
    }
}

async fn write_reply<W>(output: &mut W, reply: &BridgeReply) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = reply.to_line()?;
    line.push('\n');
    output.write_all(line.as_bytes()).await?;
    output.flush().await?;
    Ok(())
}
