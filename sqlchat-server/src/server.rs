use crate::context::AppContext;
use crate::router;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use sqlchat_core::ipc::{ChatRequest, ChatResponse};
use sqlchat_core::{ChatSession, SqlChatError};
use std::path::Path;
use std::sync::Arc;
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

type FrameWriter = FramedWrite<OwnedWriteHalf, LengthDelimitedCodec>;

/// 4-byte little-endian length prefix + MessagePack payload
fn frame_codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder().little_endian().new_codec()
}

/// Serve the IPC protocol on a Unix socket. Each accepted connection owns one
/// chat session for its whole lifetime.
pub async fn run_unix_server(
    socket_path: &str,
    ctx: Arc<AppContext>,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    if Path::new(socket_path).exists() {
        std::fs::remove_file(socket_path)?;
    }

    let listener = UnixListener::bind(socket_path)?;
    tracing::info!("IPC Server listening on {}", socket_path);

    loop {
        tokio::select! {
            res = listener.accept() => {
                let (stream, _) = res?;
                tokio::spawn(serve_session(stream, ctx.clone()));
            }
            _ = shutdown.recv() => {
                tracing::info!("Shutting down IPC server...");
                break;
            }
        }
    }

    if Path::new(socket_path).exists() {
        std::fs::remove_file(socket_path)?;
    }

    Ok(())
}

async fn serve_session(stream: UnixStream, ctx: Arc<AppContext>) {
    let mut session = ChatSession::new(ctx.config.prompt.profile);
    tracing::info!(session = %session.id, "IPC session started");

    let (read, write) = stream.into_split();
    let mut frames = FramedRead::new(read, frame_codec());
    let mut writer = FramedWrite::new(write, frame_codec());

    while let Some(frame) = frames.next().await {
        let payload = match frame {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(session = %session.id, "Frame error: {}", e);
                break;
            }
        };

        let response = match rmp_serde::from_slice::<ChatRequest>(&payload) {
            Ok(request) => router::handle_request(request, &mut session, &ctx).await,
            Err(e) => ChatResponse::err(
                SqlChatError::Ipc(format!("Deserialization error: {}", e)).to_string(),
            ),
        };

        if let Err(e) = send_response(&mut writer, &response).await {
            tracing::error!(session = %session.id, "Failed to send response: {}", e);
            break;
        }
    }

    tracing::info!(
        session = %session.id,
        turns = session.log().len(),
        "IPC session ended"
    );
}

async fn send_response(writer: &mut FrameWriter, response: &ChatResponse) -> anyhow::Result<()> {
    let bytes = rmp_serde::to_vec_named(response)?;
    writer.send(Bytes::from(bytes)).await?;
    Ok(())
}
