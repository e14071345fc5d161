use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use parley_db::Database;
use parley_types::events::{ChatEvent, ClientCommand};

use crate::feed::ChannelFeed;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Handle a single WebSocket connection: Identify handshake, Ready event,
/// then a command/relay loop until either side goes away.
pub async fn handle_connection(
    socket: WebSocket,
    feed: ChannelFeed,
    db: Arc<Database>,
    jwt_secret: String,
) {
    let (mut sender, mut receiver) = socket.split();

    // Step 1: Wait for Identify command with JWT
    let user_id = match wait_for_identify(&mut receiver, &jwt_secret).await {
        Some(id) => id,
        None => {
            warn!("WebSocket client failed to identify, closing");
            return;
        }
    };

    info!("{} connected to gateway", user_id);

    // Step 2: Send Ready event
    let ready = ChatEvent::Ready {
        user_id: user_id.clone(),
    };
    if sender
        .send(Message::Text(serde_json::to_string(&ready).unwrap().into()))
        .await
        .is_err()
    {
        return;
    }

    // Everything destined for this client funnels through one queue so the
    // socket writer has a single owner.
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ChatEvent>();

    // Shared flag for heartbeat
    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward queued events -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = out_rx.recv() => {
                    let event = match result {
                        Some(event) => event,
                        None => break,
                    };

                    let text = serde_json::to_string(&event).unwrap();
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from client
    let feed_recv = feed.clone();
    let db_recv = db.clone();
    let user_recv = user_id.clone();
    let mut recv_task = tokio::spawn(async move {
        // One forward task per subscribed channel. Aborting a handle drops
        // its Subscription, which releases the feed slot.
        let mut subscriptions: HashMap<Uuid, JoinHandle<()>> = HashMap::new();

        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientCommand>(&text) {
                    Ok(cmd) => {
                        handle_command(
                            &feed_recv,
                            &db_recv,
                            &user_recv,
                            cmd,
                            &mut subscriptions,
                            &out_tx,
                        )
                        .await;
                    }
                    Err(e) => {
                        warn!(
                            "{} bad command: {} -- raw: {}",
                            user_recv,
                            e,
                            &text[..text.len().min(200)]
                        );
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }

        for (_, handle) in subscriptions.drain() {
            handle.abort();
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("{} disconnected from gateway", user_id);
}

async fn handle_command(
    feed: &ChannelFeed,
    db: &Arc<Database>,
    user_id: &str,
    cmd: ClientCommand,
    subscriptions: &mut HashMap<Uuid, JoinHandle<()>>,
    out_tx: &mpsc::UnboundedSender<ChatEvent>,
) {
    match cmd {
        // Already identified; a second Identify is a no-op.
        ClientCommand::Identify { .. } => {}

        ClientCommand::Subscribe { channel_ids } => {
            for channel_id in channel_ids {
                if subscriptions.contains_key(&channel_id) {
                    continue;
                }
                if !is_participant(db, user_id, channel_id).await {
                    warn!(
                        "{} tried to subscribe to channel {} they are not part of",
                        user_id, channel_id
                    );
                    continue;
                }

                let mut sub = feed.subscribe(channel_id);
                let out = out_tx.clone();
                let handle = tokio::spawn(async move {
                    loop {
                        tokio::select! {
                            maybe = sub.recv() => match maybe {
                                Some(event) => {
                                    if out.send(event).is_err() {
                                        break;
                                    }
                                }
                                None => break,
                            },
                            // Connection torn down: stop promptly instead of
                            // waiting for the next event on this channel.
                            _ = out.closed() => break,
                        }
                    }
                });
                subscriptions.insert(channel_id, handle);
            }
        }

        ClientCommand::Unsubscribe { channel_ids } => {
            for channel_id in channel_ids {
                if let Some(handle) = subscriptions.remove(&channel_id) {
                    handle.abort();
                }
            }
        }
    }
}

/// Membership check at subscribe time. Runs the blocking lookup off the
/// async runtime; any failure is treated as "not a participant".
async fn is_participant(db: &Arc<Database>, user_id: &str, channel_id: Uuid) -> bool {
    let db = db.clone();
    let user = user_id.to_string();

    let result =
        tokio::task::spawn_blocking(move || db.get_channel(&channel_id.to_string())).await;

    match result {
        Ok(Ok(Some(channel))) => {
            channel.participant_low == user || channel.participant_high == user
        }
        Ok(Ok(None)) => false,
        Ok(Err(e)) => {
            warn!("Channel lookup failed during subscribe: {}", e);
            false
        }
        Err(e) => {
            warn!("spawn_blocking join error: {}", e);
            false
        }
    }
}

async fn wait_for_identify(
    receiver: &mut futures_util::stream::SplitStream<WebSocket>,
    jwt_secret: &str,
) -> Option<String> {
    use jsonwebtoken::{DecodingKey, Validation, decode};
    use parley_types::api::Claims;

    let timeout = tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(ClientCommand::Identify { token }) =
                    serde_json::from_str::<ClientCommand>(&text)
                {
                    let token_data = decode::<Claims>(
                        &token,
                        &DecodingKey::from_secret(jwt_secret.as_bytes()),
                        &Validation::default(),
                    )
                    .ok()?;

                    return Some(token_data.claims.sub);
                }
            }
        }
        None
    });

    timeout.await.ok().flatten()
}
