//! `WS /ws/chat` (spec.md §6.1) — same turn algorithm as `POST /chat`, but
//! streams progress frames ahead of the final response: a phase change,
//! candidate tranches of 10, then any aggregation/enrichment result, then
//! `Final`.

use std::net::SocketAddr;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::Response;

use bib_dialogue::wire::{candidate_tranches, ChatRequest, ChatResponseBody, ChatStreamEvent};

use crate::state::AppState;

pub async fn ws_chat(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, addr))
}

async fn handle_socket(mut socket: WebSocket, state: AppState, addr: SocketAddr) {
    while let Some(Ok(msg)) = socket.recv().await {
        let Message::Text(text) = msg else { continue };

        let req: ChatRequest = match serde_json::from_str(&text) {
            Ok(req) => req,
            Err(e) => {
                let _ = send_event(&mut socket, &err_event(&e.to_string())).await;
                continue;
            }
        };

        if !state.client_allowed(addr.ip()).await {
            let _ = send_event(&mut socket, &err_event("too many requests")).await;
            continue;
        }

        let session_id = match req.session_id {
            Some(id) => id,
            None => match state.engine.create_session().await {
                Ok(id) => id,
                Err(e) => {
                    let _ = send_event(&mut socket, &err_event(&e.to_string())).await;
                    continue;
                }
            },
        };

        let outcome = match state.engine.handle_turn(session_id, &req.message).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let _ = send_event(&mut socket, &err_event(&e.to_string())).await;
                continue;
            }
        };

        if send_event(&mut socket, &ChatStreamEvent::PhaseChange { phase: outcome.phase }).await.is_err() {
            break;
        }

        if let Some(candidate_set) = &outcome.candidate_set {
            for tranche in candidate_tranches(&candidate_set.candidates, 10) {
                if send_event(&mut socket, &tranche).await.is_err() {
                    return;
                }
            }
        }

        if let Some(result) = outcome.aggregation.clone() {
            if send_event(&mut socket, &ChatStreamEvent::AggregationResult { result }).await.is_err() {
                break;
            }
        }

        if let Some(result) = outcome.enrichment.clone() {
            let event = ChatStreamEvent::EnrichmentResult { entity_value: req.message.clone(), result };
            if send_event(&mut socket, &event).await.is_err() {
                break;
            }
        }

        let final_event = ChatStreamEvent::Final {
            response: ChatResponseBody {
                message: outcome.message,
                candidate_set: outcome.candidate_set,
                suggested_followups: outcome.suggested_followups,
                clarification_needed: outcome.clarification_needed,
                session_id: outcome.session_id,
                phase: outcome.phase,
                confidence: outcome.confidence,
            },
        };
        if send_event(&mut socket, &final_event).await.is_err() {
            break;
        }
    }
}

async fn send_event(socket: &mut WebSocket, event: &ChatStreamEvent) -> Result<(), axum::Error> {
    let text = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    socket.send(Message::Text(text)).await
}

fn err_event(message: &str) -> ChatStreamEvent {
    ChatStreamEvent::Final {
        response: ChatResponseBody {
            message: message.to_string(),
            candidate_set: None,
            suggested_followups: vec![],
            clarification_needed: None,
            session_id: uuid::Uuid::nil(),
            phase: bib_core::model::Phase::QueryDefinition,
            confidence: None,
        },
    }
}
