//! The WebSocket route. Binds the wire protocol to a per-connection
//! `session::Session` and, via `events::EventBus`, to the broadcast
//! fan-out. This is the only module that touches a real socket;
//! everything it calls into (`session::Session::dispatch`, `Registry`,
//! `Room`) is plain synchronous logic already covered by its own unit
//! tests.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use rocket::{get, State};
use rocket_ws::{Message, WebSocket};
use tokio::sync::broadcast::error::RecvError;

use crate::config::ServerConfig;
use crate::events::EventBus;
use crate::identifiers::ColorAllocator;
use crate::protocol::InboundEnvelope;
use crate::registry::Registry;
use crate::session::Session;

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[get("/ws")]
pub fn ws_gateway(
    ws: WebSocket,
    registry: &State<Arc<Registry>>,
    events: &State<Arc<EventBus>>,
    colors: &State<Arc<ColorAllocator>>,
    config: &State<ServerConfig>,
) -> rocket_ws::Channel<'static> {
    let registry = registry.inner().clone();
    let events = events.inner().clone();
    let colors = colors.inner().clone();
    let config = config.inner().clone();

    ws.channel(move |mut stream| {
        Box::pin(async move {
            let session_id = uuid::Uuid::new_v4().to_string();
            let mut session = Session::new(session_id.clone());
            let mut subscription = events.subscribe();

            log::info!("session {session_id} connected");

            loop {
                tokio::select! {
                    incoming = stream.next() => {
                        let Some(incoming) = incoming else { break };
                        let text = match incoming? {
                            Message::Text(text) => text,
                            Message::Close(_) => break,
                            _ => continue,
                        };

                        let envelope: InboundEnvelope = match serde_json::from_str(&text) {
                            Ok(envelope) => envelope,
                            Err(e) => {
                                log::warn!("session {session_id}: malformed envelope ignored: {e}");
                                continue;
                            }
                        };

                        if let Some(reply) =
                            session.dispatch(envelope, &registry, &events, &colors, &config, now())
                        {
                            let frame = serde_json::to_string(&reply).unwrap_or_default();
                            stream.send(Message::Text(frame)).await?;
                        }
                    }
                    broadcast = subscription.recv() => {
                        let event = match broadcast {
                            Ok(event) => event,
                            Err(RecvError::Lagged(skipped)) => {
                                log::warn!("session {session_id}: lagged, dropped {skipped} broadcast(s)");
                                continue;
                            }
                            Err(RecvError::Closed) => break,
                        };

                        let in_this_room = session.current_room_id.as_deref() == Some(event.room_id.as_str());
                        let is_self = event.except_session.as_deref() == Some(session.id.as_str());
                        if !in_this_room || is_self {
                            continue;
                        }

                        let frame = serde_json::to_string(&event.envelope).unwrap_or_default();
                        stream.send(Message::Text(frame)).await?;
                    }
                }
            }

            session.disconnect(&registry, &events, now());
            log::info!("session {session_id} disconnected");
            Ok(())
        })
    })
}
