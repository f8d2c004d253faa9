//! End-to-end exercises of the events channel against a local WebSocket
//! server: dial with token, dispatch, automatic reconnect after a drop,
//! and deliberate teardown.

use events::{EventEnvelope, EventKind};
use futures_util::{SinkExt, StreamExt};
use realtime::{ClientConfig, EventsClient, EventsEndpoint};
use serde_json::json;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Accept one connection and capture the request URI of its handshake.
async fn accept_with_uri(listener: &TcpListener) -> (WebSocketStream<TcpStream>, String) {
    let (stream, _) = listener.accept().await.unwrap();

    let (uri_tx, uri_rx) = std::sync::mpsc::channel();
    let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        let _ = uri_tx.send(request.uri().to_string());
        Ok(response)
    };

    let socket = accept_hdr_async(stream, callback).await.unwrap();
    let uri = uri_rx.recv().unwrap();
    (socket, uri)
}

fn envelope_frame(kind: &str, data: serde_json::Value) -> Message {
    Message::text(
        json!({
            "type": kind,
            "timestamp": "2025-06-01T08:00:00Z",
            "timezone": "Europe/London",
            "data": data,
        })
        .to_string(),
    )
}

fn client_for(
    listener: &TcpListener,
) -> (
    EventsClient,
    mpsc::UnboundedReceiver<EventEnvelope>,
    Vec<events::Subscription>,
) {
    let addr = listener.local_addr().unwrap();
    let endpoint = EventsEndpoint::parse(&format!("http://{addr}")).unwrap();
    let config = ClientConfig::new(endpoint).with_reconnect_delay(Duration::from_millis(200));
    let client = EventsClient::spawn(config);

    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let tx = event_tx.clone();
    let established_sub = client.subscribe_fn(EventKind::ConnectionEstablished, move |envelope| {
        let _ = tx.send(envelope.clone());
    });

    let tx = event_tx;
    let message_sub = client.subscribe_fn(EventKind::MessageReceived, move |envelope| {
        let _ = tx.send(envelope.clone());
    });

    (client, event_rx, vec![established_sub, message_sub])
}

#[tokio::test]
async fn token_drives_connect_dispatch_and_reconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let (client, mut event_rx, _subs) = client_for(&listener);

    // Token appears: exactly one dial, authenticated via query parameter.
    client.set_token(Some("integration-token".to_string()));

    let (mut server, uri) = timeout(RECV_TIMEOUT, accept_with_uri(&listener))
        .await
        .unwrap();
    assert!(uri.starts_with("/events/connect"));
    assert!(uri.contains("token=integration-token"));

    // The handshake envelope carries the session timezone.
    server
        .send(envelope_frame("connection-established", json!({})))
        .await
        .unwrap();

    let established = timeout(RECV_TIMEOUT, event_rx.recv()).await.unwrap().unwrap();
    assert_eq!(established.kind, EventKind::ConnectionEstablished);
    assert_eq!(client.timezone().as_deref(), Some("Europe/London"));
    assert!(client.connected());

    // A malformed frame is discarded without dropping the channel.
    server.send(Message::text("{ not json")).await.unwrap();

    server
        .send(envelope_frame(
            "message-received",
            json!({"conversation_id": "c-1"}),
        ))
        .await
        .unwrap();

    let message = timeout(RECV_TIMEOUT, event_rx.recv()).await.unwrap().unwrap();
    assert_eq!(message.kind, EventKind::MessageReceived);
    assert_eq!(message.data["conversation_id"], "c-1");
    assert!(client.connected());

    // Server drop: the client redials on its own after the fixed delay.
    drop(server);

    let (mut server, uri) = timeout(RECV_TIMEOUT, accept_with_uri(&listener))
        .await
        .unwrap();
    assert!(uri.contains("token=integration-token"));

    server
        .send(envelope_frame(
            "message-received",
            json!({"conversation_id": "c-2"}),
        ))
        .await
        .unwrap();

    let message = timeout(RECV_TIMEOUT, event_rx.recv()).await.unwrap().unwrap();
    assert_eq!(message.data["conversation_id"], "c-2");

    // Deliberate disconnect: no further dials, even past the delay.
    client.disconnect();
    assert!(
        timeout(Duration::from_millis(800), listener.accept())
            .await
            .is_err(),
        "client redialed after a deliberate disconnect"
    );
    assert!(!client.connected());
}

#[tokio::test]
async fn revoking_the_token_tears_the_channel_down() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let (client, mut event_rx, _subs) = client_for(&listener);

    client.set_token(Some("short-lived".to_string()));
    let (mut server, _uri) = timeout(RECV_TIMEOUT, accept_with_uri(&listener))
        .await
        .unwrap();

    server
        .send(envelope_frame("connection-established", json!({})))
        .await
        .unwrap();
    let _ = timeout(RECV_TIMEOUT, event_rx.recv()).await.unwrap().unwrap();

    client.set_token(None);

    // The server observes the close.
    let saw_close = timeout(RECV_TIMEOUT, async {
        loop {
            match server.next().await {
                Some(Ok(Message::Close(_))) | None => break true,
                Some(Ok(_)) => continue,
                Some(Err(_)) => break true,
            }
        }
    })
    .await
    .unwrap();
    assert!(saw_close);

    // And no reconnect is attempted without a token.
    assert!(
        timeout(Duration::from_millis(800), listener.accept())
            .await
            .is_err(),
        "client redialed without a token"
    );
    assert!(!client.connected());
}

#[tokio::test]
async fn connect_without_a_token_attempts_nothing() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let (client, _event_rx, _subs) = client_for(&listener);

    client.connect();

    assert!(
        timeout(Duration::from_millis(400), listener.accept())
            .await
            .is_err(),
        "client dialed without a token"
    );
    assert!(!client.connected());
}
