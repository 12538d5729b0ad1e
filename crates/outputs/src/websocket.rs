//! Websocket output
//!
//! Sends each part as a binary frame. A failed send drops the socket so the
//! async writer reconnects before the next message.

use std::sync::Arc;

use async_trait::async_trait;
use ferry_config::WebsocketOutputConfig;
use ferry_core::{Batch, ComponentMetrics};
use futures_util::SinkExt;
use reqwest_websocket::{Message, RequestBuilderExt, WebSocket};

use crate::async_writer::AsyncWriter;
use crate::error::{BuildError, WriteError};
use crate::writer::Writer;

/// Writes parts to a websocket
pub struct WebsocketWriter {
    url: String,
    client: reqwest::Client,
    socket: Option<WebSocket>,
}

impl WebsocketWriter {
    /// Create a writer for `url`
    pub fn new(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
            socket: None,
        }
    }
}

#[async_trait]
impl Writer for WebsocketWriter {
    async fn connect(&mut self) -> Result<(), WriteError> {
        let response = self
            .client
            .get(&self.url)
            .upgrade()
            .send()
            .await
            .map_err(|e| WriteError::connect(e.to_string()))?;
        let socket = response
            .into_websocket()
            .await
            .map_err(|e| WriteError::connect(e.to_string()))?;

        tracing::info!(url = %self.url, "sending messages to websocket");
        self.socket = Some(socket);
        Ok(())
    }

    async fn write(&mut self, batch: &Batch) -> Result<(), WriteError> {
        let Some(socket) = self.socket.as_mut() else {
            return Err(WriteError::NotConnected);
        };

        for part in batch {
            if let Err(e) = socket.send(Message::Binary(part.data().clone().into())).await {
                self.socket = None;
                return Err(WriteError::write(e.to_string()));
            }
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), WriteError> {
        if let Some(mut socket) = self.socket.take() {
            SinkExt::close(&mut socket)
                .await
                .map_err(|e| WriteError::write(e.to_string()))?;
        }
        Ok(())
    }
}

/// Build the websocket output
pub fn websocket_output(
    config: &WebsocketOutputConfig,
    metrics: Arc<ComponentMetrics>,
) -> Result<AsyncWriter, BuildError> {
    let url = config.url.trim();
    if url.is_empty() {
        return Err(BuildError::invalid("url", "must not be empty"));
    }
    let url = url.to_string();
    let client = reqwest::Client::new();

    Ok(AsyncWriter::new(
        "websocket",
        1,
        move || WebsocketWriter::new(url.clone(), client.clone()),
        metrics,
    ))
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::extract::State;
    use axum::extract::ws::{Message as ServerMessage, WebSocketUpgrade};
    use axum::response::Response;
    use axum::routing::get;
    use tokio::sync::mpsc;

    use super::*;

    /// Record every binary frame, then a marker once the peer goes away
    async fn record(
        ws: WebSocketUpgrade,
        State(frames): State<mpsc::UnboundedSender<String>>,
    ) -> Response {
        ws.on_upgrade(move |mut socket| async move {
            while let Some(Ok(msg)) = socket.recv().await {
                match msg {
                    ServerMessage::Binary(data) => {
                        let _ = frames.send(String::from_utf8_lossy(&data).into_owned());
                    }
                    ServerMessage::Close(_) => break,
                    _ => {}
                }
            }
            let _ = frames.send("<closed>".to_string());
        })
    }

    #[tokio::test]
    async fn test_connect_write_close() {
        let (frames_tx, mut frames) = mpsc::unbounded_channel();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/", get(record)).with_state(frames_tx);
        tokio::spawn(async move { axum::serve(listener, app).await });

        let mut writer = WebsocketWriter::new(format!("ws://{addr}/"), reqwest::Client::new());
        writer.connect().await.unwrap();

        let batch: Batch = ["a", "b"].into_iter().map(ferry_core::Part::from).collect();
        writer.write(&batch).await.unwrap();
        writer.close().await.unwrap();

        let mut received = Vec::new();
        while received.last().map(String::as_str) != Some("<closed>") {
            let frame = tokio::time::timeout(std::time::Duration::from_secs(2), frames.recv())
                .await
                .unwrap()
                .unwrap();
            received.push(frame);
        }
        assert_eq!(received, vec!["a", "b", "<closed>"]);

        let err = writer.write(&Batch::single("c")).await.unwrap_err();
        assert!(matches!(err, WriteError::NotConnected));
    }

    #[tokio::test]
    async fn test_write_without_connection() {
        let mut writer = WebsocketWriter::new("ws://127.0.0.1:1", reqwest::Client::new());
        let err = writer.write(&Batch::single("x")).await.unwrap_err();
        assert!(matches!(err, WriteError::NotConnected));
        writer.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port nobody listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut writer = WebsocketWriter::new(format!("ws://{addr}"), reqwest::Client::new());
        let err = writer.connect().await.unwrap_err();
        assert!(matches!(err, WriteError::Connect(_)));
    }

    #[test]
    fn test_empty_url_rejected() {
        let config = WebsocketOutputConfig { url: "  ".into() };
        let err = websocket_output(&config, Arc::new(ComponentMetrics::new()))
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "invalid url: must not be empty");
    }
}
