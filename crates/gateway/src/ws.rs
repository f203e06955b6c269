//! Client-facing WebSocket endpoint. Structured like the donor's
//! `nodes::ws::node_ws` + `handle_socket` split: a writer task drains an
//! outbound channel into the socket sink while the main task reads inbound
//! frames and, once a session has started, also polls the upstream event
//! stream and the tool-result relay — all three sources feed one
//! `SessionOrchestrator` owned by this task alone.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;

use vsg_protocol::{ClientEvent, Envelope, ServerEvent};
use vsg_upstream::client::{validate_audio_chunk, UpstreamEvent};

use crate::orchestrator::SessionOrchestrator;
use crate::state::AppState;

pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sink, mut ws_stream) = socket.split();
    let session_id = uuid::Uuid::new_v4().to_string();

    let (outbound_tx, mut outbound_rx) = mpsc::channel::<ServerEvent>(128);

    let writer_session_id = session_id.clone();
    let writer = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            let envelope = Envelope::new(writer_session_id.clone(), event);
            if send_event(&mut ws_sink, &envelope).await.is_err() {
                break;
            }
        }
    });

    let error_tx = outbound_tx.clone();
    let (mut orchestrator, mut tool_results) =
        SessionOrchestrator::new(std::sync::Arc::new(state.clone()), session_id.clone(), outbound_tx);
    let mut upstream_events: Option<mpsc::UnboundedReceiver<UpstreamEvent>> = None;

    loop {
        tokio::select! {
            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match handle_inbound_text(&state, &session_id, &text, &mut orchestrator, &mut upstream_events).await {
                            Ok(()) => {}
                            Err(event) => {
                                // Validation/rate-limit failures are reported directly
                                // over the outbound channel; they never touch
                                // orchestrator-owned session state.
                                let _ = error_tx.send(event).await;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
            maybe_event = recv_optional(&mut upstream_events) => {
                if let Some(event) = maybe_event {
                    orchestrator.handle_upstream_event(event).await;
                }
            }
            Some((name, result)) = tool_results.recv() => {
                orchestrator.handle_tool_result(name, result).await;
            }
        }
    }

    orchestrator.finish(None).await;
    writer.abort();
    tracing::info!(session_id = %session_id, "client disconnected");
}

/// Polls `rx` if present, otherwise never resolves — lets the `select!`
/// above treat "no session started yet" as a branch that simply never
/// fires instead of special-casing it.
async fn recv_optional(rx: &mut Option<mpsc::UnboundedReceiver<UpstreamEvent>>) -> Option<UpstreamEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Sanitizes every string field of an inbound event in place, skipping
/// `audioData` since it is opaque encoded binary rather than text. Flagged
/// fields are logged by `sanitize_text` itself; the cleaned string is what
/// reaches `validate_client_event` and, from there, the rest of the
/// pipeline.
fn sanitize_inbound_strings(raw: &mut Value) {
    let Value::Object(map) = raw else { return };
    for (field, value) in map.iter_mut() {
        if field == "audioData" {
            continue;
        }
        if let Value::String(text) = value {
            let outcome = vsg_transport::sanitize_text(text, field);
            *text = outcome.text;
        }
    }
}

async fn handle_inbound_text(
    state: &AppState,
    session_id: &str,
    text: &str,
    orchestrator: &mut SessionOrchestrator,
    upstream_events: &mut Option<mpsc::UnboundedReceiver<UpstreamEvent>>,
) -> Result<(), ServerEvent> {
    let rate_limit = state.rate_limiter.admit(session_id);
    if !rate_limit.accepted {
        return Err(ServerEvent::Error {
            error_code: "WS_RATE_LIMIT_EXCEEDED".to_string(),
            error_message: "too many events, slow down".to_string(),
            recoverable: true,
            retry_after: Some(rate_limit.retry_after_secs),
        });
    }

    let mut raw: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            return Err(ServerEvent::Error {
                error_code: "INVALID_MESSAGE".to_string(),
                error_message: format!("malformed JSON: {e}"),
                recoverable: false,
                retry_after: None,
            });
        }
    };

    sanitize_inbound_strings(&mut raw);

    let event = vsg_transport::validate_client_event(&raw).map_err(|e| ServerEvent::from_error(&e, None))?;

    match event {
        ClientEvent::SessionStart { questionnaire_id, voice_id, language, user_id } => {
            match orchestrator.start(questionnaire_id, voice_id, language, user_id).await {
                Ok(events) => {
                    *upstream_events = Some(events);
                }
                Err(e) => return Err(ServerEvent::from_error(&e, None)),
            }
        }
        ClientEvent::AudioChunk { audio_data, sequence_number: _ } => {
            if !validate_audio_chunk(&audio_data) {
                return Err(ServerEvent::Error {
                    error_code: "VALIDATION_ERROR".to_string(),
                    error_message: "audio chunk rejected".to_string(),
                    recoverable: true,
                    retry_after: None,
                });
            }
            orchestrator.forward_audio(audio_data);
        }
        ClientEvent::SessionEnd { reason } => {
            orchestrator.finish(reason).await;
        }
        ClientEvent::TextMessage { .. }
        | ClientEvent::ConfigUpdate { .. }
        | ClientEvent::QuestionnaireSelect { .. }
        | ClientEvent::UserSpeaking {}
        | ClientEvent::TranscriptUpdate { .. } => {
            // Reserved events: accepted but not yet wired to behavior.
        }
    }

    Ok(())
}

async fn send_event(
    sink: &mut (impl SinkExt<Message> + Unpin),
    envelope: &Envelope<ServerEvent>,
) -> Result<(), ()> {
    let json = serde_json::to_string(envelope).map_err(|_| ())?;
    sink.send(Message::Text(json)).await.map_err(|_| ())
}
