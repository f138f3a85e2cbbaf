//! Per-connection WebSocket transport.
//!
//! Each socket is split into two tasks. The writer drains the connection's
//! outbound channel into the socket; the reader feeds inbound frames back to the
//! connection manager. Whichever finishes first tears the other down, and the
//! connection is then removed (a no-op if the manager already dropped it).

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use lib_dashboard::{ConnectionManager, Outbound};

pub async fn handle_socket(socket: WebSocket, manager: Arc<ConnectionManager>) {
    let (mut sink, mut stream) = socket.split();
    let (client_id, mut outbound) = manager.accept();

    let mut writer = tokio::spawn(async move {
        while let Some(cmd) = outbound.recv().await {
            let frame = match cmd {
                Outbound::Text(text) => Message::Text(String::from(&*text).into()),
                Outbound::Ping => Message::Ping(Bytes::new()),
                Outbound::Close { code, reason } => {
                    let _ = sink
                        .send(Message::Close(Some(CloseFrame { code, reason: reason.into() })))
                        .await;
                    break;
                }
            };
            if sink.send(frame).await.is_err() {
                break; // client disconnected
            }
        }
    });

    let reader_manager = Arc::clone(&manager);
    let mut reader = tokio::spawn(async move {
        while let Some(msg) = stream.next().await {
            match msg {
                Ok(Message::Text(text)) => reader_manager.on_message(client_id, text.as_str()),
                Ok(Message::Pong(_)) => reader_manager.on_pong(client_id),
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    reader_manager.on_error(client_id, &e.to_string());
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    manager.on_close(client_id);
}
