//! Upstream client: one duplex streaming connection per session,
//! run as an owning actor task so the reconnect loop, the pending-audio
//! queue, and the socket's reader/writer halves all live behind one set of
//! typed channels rather than shared mutable state — the donor's
//! `nodes/ws.rs` splits reader and writer into two tasks over one socket;
//! here the two halves *and* the reconnect loop collapse into one task
//! because re-establishing them together on every reconnect is simpler than
//! coordinating three independently-restarting tasks.

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use vsg_domain::error::Error;
use vsg_domain::upstream_connection::{UpstreamConnection, UpstreamConnectionState};

use crate::framer::{self, InboundEvent, SetupParams};
use crate::reconnect::ReconnectPolicy;
use crate::taxonomy;

#[derive(Debug, Clone)]
pub enum UpstreamEvent {
    StateChange(UpstreamConnectionState),
    SetupComplete { upstream_session_id: Option<String> },
    AudioOutput { sequence: u64, payload_base64: String },
    InputTranscription(String),
    OutputTranscription(String),
    ToolCall(Vec<framer::UpstreamFunctionCall>),
    ToolCallCancellation(Vec<String>),
    Interrupted,
    TurnComplete,
    GoAway { time_left_ms: Option<u64> },
    Error(Error),
}

pub enum ClientCommand {
    SendAudio { base64_payload: String },
    SendToolResponse { call_id: String, name: String, response: Value },
    SendTextTurn { text: String, turn_complete: bool },
    Disconnect,
}

#[derive(Clone)]
pub struct UpstreamClientHandle {
    commands: mpsc::UnboundedSender<ClientCommand>,
}

impl UpstreamClientHandle {
    pub fn send_audio(&self, base64_payload: impl Into<String>) {
        let _ = self.commands.send(ClientCommand::SendAudio {
            base64_payload: base64_payload.into(),
        });
    }

    pub fn send_tool_response(&self, call_id: impl Into<String>, name: impl Into<String>, response: Value) {
        let _ = self.commands.send(ClientCommand::SendToolResponse {
            call_id: call_id.into(),
            name: name.into(),
            response,
        });
    }

    pub fn send_text_turn(&self, text: impl Into<String>, turn_complete: bool) {
        let _ = self.commands.send(ClientCommand::SendTextTurn {
            text: text.into(),
            turn_complete,
        });
    }

    pub fn disconnect(&self) {
        let _ = self.commands.send(ClientCommand::Disconnect);
    }
}

/// Validates an inbound audio chunk before it is queued/sent: non-empty,
/// plausible base64 alphabet, and no larger than 1 MB decoded. Invalid
/// chunks are dropped with a warning; the caller
/// must not terminate the session over this.
pub fn validate_audio_chunk(base64_payload: &str) -> bool {
    if base64_payload.is_empty() {
        return false;
    }
    const MAX_DECODED_BYTES: usize = 1_000_000;
    if base64_payload.len() > MAX_DECODED_BYTES * 4 / 3 + 4 {
        return false;
    }
    base64_payload
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'=' | b'-' | b'_'))
}

/// Spawns the actor and returns a cheap-to-clone handle plus the event
/// stream the orchestrator consumes.
pub fn spawn(
    url: String,
    authorization_header: String,
    setup: SetupParams,
    reconnect: ReconnectPolicy,
) -> (UpstreamClientHandle, mpsc::UnboundedReceiver<UpstreamEvent>) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (evt_tx, evt_rx) = mpsc::unbounded_channel();
    tokio::spawn(run(url, authorization_header, setup, reconnect, cmd_rx, evt_tx));
    (UpstreamClientHandle { commands: cmd_tx }, evt_rx)
}

async fn run(
    url: String,
    authorization_header: String,
    setup: SetupParams,
    reconnect: ReconnectPolicy,
    mut cmd_rx: mpsc::UnboundedReceiver<ClientCommand>,
    evt_tx: mpsc::UnboundedSender<UpstreamEvent>,
) {
    let mut conn = UpstreamConnection::default();
    let mut attempt: u32 = 0;

    loop {
        set_state(&mut conn, UpstreamConnectionState::Connecting, &evt_tx);

        match connect_and_send_setup(&url, &authorization_header, &setup).await {
            Ok(stream) => {
                attempt = 0;
                conn.retry_count = 0;
                set_state(&mut conn, UpstreamConnectionState::Connected, &evt_tx);

                let (mut write, mut read) = stream.split();
                for chunk in conn.drain_pending_audio() {
                    if let Ok(payload) = String::from_utf8(chunk.payload) {
                        let frame = framer::build_audio_chunk_frame(&payload);
                        if write.send(Message::Text(frame.to_string())).await.is_err() {
                            break;
                        }
                    }
                }

                let disconnect_reason = drive_connection(&mut conn, &mut write, &mut read, &mut cmd_rx, &evt_tx).await;

                match disconnect_reason {
                    DisconnectReason::Requested => {
                        set_state(&mut conn, UpstreamConnectionState::Closed, &evt_tx);
                        return;
                    }
                    DisconnectReason::Error(err) => {
                        if !reconnect_after(&mut conn, &mut attempt, &reconnect, err, &evt_tx) {
                            return;
                        }
                    }
                }
            }
            Err(err) => {
                if !reconnect_after(&mut conn, &mut attempt, &reconnect, err, &evt_tx) {
                    return;
                }
            }
        }

        let delay = reconnect.delay_for_attempt(attempt);
        set_state(&mut conn, UpstreamConnectionState::Reconnecting, &evt_tx);
        tokio::time::sleep(delay).await;
    }
}

enum DisconnectReason {
    Requested,
    Error(Error),
}

type WsWrite = futures_util::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;
type WsRead = futures_util::stream::SplitStream<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
>;

async fn drive_connection(
    conn: &mut UpstreamConnection,
    write: &mut WsWrite,
    read: &mut WsRead,
    cmd_rx: &mut mpsc::UnboundedReceiver<ClientCommand>,
    evt_tx: &mpsc::UnboundedSender<UpstreamEvent>,
) -> DisconnectReason {
    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ClientCommand::SendAudio { base64_payload }) => {
                        if !validate_audio_chunk(&base64_payload) {
                            tracing::warn!("dropping invalid audio chunk");
                            continue;
                        }
                        if conn.state == UpstreamConnectionState::Ready {
                            let _seq = conn.next_input_sequence();
                            let frame = framer::build_audio_chunk_frame(&base64_payload);
                            if write.send(Message::Text(frame.to_string())).await.is_err() {
                                return DisconnectReason::Error(Error::ConnectionFailed("write failed".into()));
                            }
                        } else {
                            let seq = conn.input_sequence;
                            conn.enqueue_pending_audio(seq, base64_payload.into_bytes());
                        }
                    }
                    Some(ClientCommand::SendToolResponse { call_id, name, response }) => {
                        let frame = framer::build_tool_response_frame(&call_id, &name, response);
                        if write.send(Message::Text(frame.to_string())).await.is_err() {
                            return DisconnectReason::Error(Error::ConnectionFailed("write failed".into()));
                        }
                    }
                    Some(ClientCommand::SendTextTurn { text, turn_complete }) => {
                        let frame = framer::build_text_turn_frame(&text, turn_complete);
                        if write.send(Message::Text(frame.to_string())).await.is_err() {
                            return DisconnectReason::Error(Error::ConnectionFailed("write failed".into()));
                        }
                    }
                    Some(ClientCommand::Disconnect) | None => {
                        let _ = write.close().await;
                        return DisconnectReason::Requested;
                    }
                }
            }
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_inbound_text(conn, &text, evt_tx);
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame
                            .map(|f| (u16::from(f.code), f.reason.to_string()))
                            .unwrap_or((1006, String::new()));
                        return DisconnectReason::Error(taxonomy::classify(Some(code), &reason));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        return DisconnectReason::Error(taxonomy::classify(None, &e.to_string()));
                    }
                    None => {
                        return DisconnectReason::Error(taxonomy::classify(None, "stream ended"));
                    }
                }
            }
        }
    }
}

fn handle_inbound_text(
    conn: &mut UpstreamConnection,
    text: &str,
    evt_tx: &mpsc::UnboundedSender<UpstreamEvent>,
) {
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            let _ = evt_tx.send(UpstreamEvent::Error(taxonomy::classify(None, &format!("parse error: {e}"))));
            return;
        }
    };

    let event = match framer::parse_inbound(&value) {
        Ok(e) => e,
        Err(e) => {
            let _ = evt_tx.send(UpstreamEvent::Error(e));
            return;
        }
    };

    match event {
        InboundEvent::SetupComplete { upstream_session_id } => {
            conn.state = UpstreamConnectionState::Ready;
            let _ = evt_tx.send(UpstreamEvent::StateChange(conn.state));
            let _ = evt_tx.send(UpstreamEvent::SetupComplete { upstream_session_id });
        }
        InboundEvent::ServerContent(content) => {
            if content.interrupted {
                // Idempotent regardless of prior buffer/turn state.
                conn.clear_pending_output();
                let _ = evt_tx.send(UpstreamEvent::Interrupted);
            }
            for chunk in content.audio_chunks_base64 {
                let seq = conn.next_output_sequence();
                let _ = evt_tx.send(UpstreamEvent::AudioOutput {
                    sequence: seq,
                    payload_base64: chunk,
                });
            }
            if let Some(text) = content.input_transcription {
                let _ = evt_tx.send(UpstreamEvent::InputTranscription(text));
            }
            if let Some(text) = content.output_transcription {
                let _ = evt_tx.send(UpstreamEvent::OutputTranscription(text));
            }
            if content.turn_complete {
                conn.clear_pending_output();
                let _ = evt_tx.send(UpstreamEvent::TurnComplete);
            }
        }
        InboundEvent::ToolCall { calls } => {
            let _ = evt_tx.send(UpstreamEvent::ToolCall(calls));
        }
        InboundEvent::ToolCallCancellation { ids } => {
            let _ = evt_tx.send(UpstreamEvent::ToolCallCancellation(ids));
        }
        InboundEvent::GoAway { time_left_ms } => {
            let _ = evt_tx.send(UpstreamEvent::GoAway { time_left_ms });
        }
    }
}

async fn connect_and_send_setup(
    url: &str,
    authorization_header: &str,
    setup: &SetupParams,
) -> Result<tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>, Error> {
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;

    let mut request = url
        .into_client_request()
        .map_err(|e| Error::ConnectionFailed(e.to_string()))?;
    request
        .headers_mut()
        .insert("Authorization", authorization_header.parse().map_err(|_| {
            Error::AuthFailed("authorization header is not valid ASCII".to_string())
        })?);

    let (mut stream, response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| taxonomy::classify(None, &e.to_string()))?;

    if response.status().as_u16() == 401 || response.status().as_u16() == 403 {
        return Err(Error::AuthFailed(format!("handshake rejected: {}", response.status())));
    }

    let setup_frame = framer::build_setup_frame(setup);
    stream
        .send(Message::Text(setup_frame.to_string()))
        .await
        .map_err(|e| taxonomy::classify(None, &e.to_string()))?;

    Ok(stream)
}

fn set_state(
    conn: &mut UpstreamConnection,
    state: UpstreamConnectionState,
    evt_tx: &mpsc::UnboundedSender<UpstreamEvent>,
) {
    conn.state = state;
    let _ = evt_tx.send(UpstreamEvent::StateChange(state));
}

/// Returns `false` when the caller should stop the actor (non-recoverable,
/// or retries exhausted and the failure was not a `goAway`).
fn reconnect_after(
    conn: &mut UpstreamConnection,
    attempt: &mut u32,
    reconnect: &ReconnectPolicy,
    err: Error,
    evt_tx: &mpsc::UnboundedSender<UpstreamEvent>,
) -> bool {
    let is_go_away = matches!(err, Error::GoAway(_));
    let _ = evt_tx.send(UpstreamEvent::Error(err.clone()));

    if !err.recoverable() {
        set_state(conn, UpstreamConnectionState::Error, evt_tx);
        return false;
    }

    // `goAway` bypasses the attempt cap for that signal alone.
    if !is_go_away {
        *attempt += 1;
        conn.retry_count = *attempt;
        if reconnect.attempts_exhausted(*attempt) {
            let _ = evt_tx.send(UpstreamEvent::Error(Error::ReconnectionExhausted(
                "exhausted reconnect attempts".to_string(),
            )));
            set_state(conn, UpstreamConnectionState::Error, evt_tx);
            return false;
        }
    }
    true
}
