//! Test fixtures and fake remote endpoints for integration testing

#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use player_watch::error::Result;
use player_watch::rcon::packet::{
    Packet, SERVERDATA_AUTH, SERVERDATA_AUTH_RESPONSE, SERVERDATA_RESPONSE_VALUE,
};
use player_watch::types::{NotificationProfile, ServerProfile};
use player_watch::{Notifier, PlayerQuery};
use serde_json::{json, Value};
use std::collections::{HashSet, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// A message handed to [`RecordingNotifier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub destination: String,
    pub subject: String,
    pub message: String,
}

/// Notifier that records every message it is asked to send
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<SentMessage>>>,
    fail: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut fail) = self.fail.lock() {
            *fail = failing;
        }
    }

    /// Everything sent so far, oldest first
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent().into_iter().map(|sent| sent.message).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, destination: &str, subject: &str, message: &str) -> Result<()> {
        if self.fail.lock().map(|fail| *fail).unwrap_or(false) {
            anyhow::bail!("notifier unavailable");
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentMessage {
                destination: destination.to_string(),
                subject: subject.to_string(),
                message: message.to_string(),
            });
        }
        Ok(())
    }
}

/// Query that replays a script of replies, repeating the last one
#[derive(Debug)]
pub struct ScriptedQuery {
    replies: Mutex<VecDeque<std::result::Result<String, String>>>,
    last: Mutex<Option<std::result::Result<String, String>>>,
    check_result: std::result::Result<(), String>,
    calls: Mutex<usize>,
}

impl ScriptedQuery {
    pub fn new(replies: Vec<std::result::Result<&str, &str>>) -> Self {
        Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|reply| reply.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            last: Mutex::new(None),
            check_result: Ok(()),
            calls: Mutex::new(0),
        }
    }

    /// A query whose startup check fails
    pub fn unreachable(reason: &str) -> Self {
        Self {
            check_result: Err(reason.to_string()),
            ..Self::new(vec![Err(reason)])
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().map(|calls| *calls).unwrap_or(0)
    }
}

#[async_trait]
impl PlayerQuery for ScriptedQuery {
    async fn query_players(&self) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls += 1;
        }

        let next = self.replies.lock().ok().and_then(|mut r| r.pop_front());
        let reply = match next {
            Some(reply) => {
                if let Ok(mut last) = self.last.lock() {
                    *last = Some(reply.clone());
                }
                reply
            }
            None => self
                .last
                .lock()
                .ok()
                .and_then(|last| last.clone())
                .unwrap_or_else(|| Ok(String::new())),
        };

        reply.map_err(|reason| anyhow::anyhow!(reason))
    }

    async fn check(&self) -> Result<()> {
        self.check_result
            .clone()
            .map_err(|reason| anyhow::anyhow!(reason))
    }
}

/// Minimal RCON server speaking the Source protocol on localhost
pub struct FakeRconServer {
    pub addr: SocketAddr,
    reply: Arc<Mutex<String>>,
    commands: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl FakeRconServer {
    pub async fn start(password: &str, reply: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let reply = Arc::new(Mutex::new(reply.to_string()));
        let commands = Arc::new(Mutex::new(Vec::new()));

        let password = password.to_string();
        let task_reply = reply.clone();
        let task_commands = commands.clone();
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve_session(
                    stream,
                    password.clone(),
                    task_reply.clone(),
                    task_commands.clone(),
                ));
            }
        });

        Self {
            addr,
            reply,
            commands,
            handle,
        }
    }

    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    /// Change what the next player listing returns
    pub fn set_reply(&self, reply: &str) {
        *self.reply.lock().unwrap() = reply.to_string();
    }

    /// Commands executed by authenticated clients
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

impl Drop for FakeRconServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve_session(
    mut stream: TcpStream,
    password: String,
    reply: Arc<Mutex<String>>,
    commands: Arc<Mutex<Vec<String>>>,
) {
    let Ok(auth) = Packet::read_from(&mut stream).await else {
        return;
    };
    if auth.kind != SERVERDATA_AUTH {
        return;
    }

    if auth.body != password {
        let _ = Packet::new(-1, SERVERDATA_AUTH_RESPONSE, "")
            .write_to(&mut stream)
            .await;
        return;
    }

    // Real servers send an empty value packet ahead of the auth response
    let _ = Packet::new(auth.id, SERVERDATA_RESPONSE_VALUE, "")
        .write_to(&mut stream)
        .await;
    let _ = Packet::new(auth.id, SERVERDATA_AUTH_RESPONSE, "")
        .write_to(&mut stream)
        .await;

    while let Ok(request) = Packet::read_from(&mut stream).await {
        commands.lock().unwrap().push(request.body.clone());
        let body = reply.lock().unwrap().clone();
        if Packet::new(request.id, SERVERDATA_RESPONSE_VALUE, body)
            .write_to(&mut stream)
            .await
            .is_err()
        {
            return;
        }
    }
}

/// A request received by [`FakeTelegramApi`]
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub token: String,
    pub chat_id: String,
    pub text: String,
}

#[derive(Clone)]
struct FakeTelegramState {
    received: Arc<Mutex<Vec<ReceivedMessage>>>,
    reject_with: Option<(StatusCode, String)>,
}

/// Local stand-in for the Telegram Bot API `sendMessage` method
pub struct FakeTelegramApi {
    pub addr: SocketAddr,
    received: Arc<Mutex<Vec<ReceivedMessage>>>,
    handle: JoinHandle<()>,
}

impl FakeTelegramApi {
    /// Accept every message
    pub async fn start() -> Self {
        Self::start_with(None).await
    }

    /// Reject every message with the given status and description
    pub async fn rejecting(status: StatusCode, description: &str) -> Self {
        Self::start_with(Some((status, description.to_string()))).await
    }

    async fn start_with(reject_with: Option<(StatusCode, String)>) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let state = FakeTelegramState {
            received: received.clone(),
            reject_with,
        };

        let router = Router::new()
            .route("/{bot}/sendMessage", post(send_message))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Self {
            addr,
            received,
            handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn received(&self) -> Vec<ReceivedMessage> {
        self.received.lock().unwrap().clone()
    }
}

impl Drop for FakeTelegramApi {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn send_message(
    State(state): State<FakeTelegramState>,
    Path(bot): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if let Some((status, description)) = &state.reject_with {
        return (
            *status,
            Json(json!({ "ok": false, "error_code": status.as_u16(), "description": description })),
        );
    }

    let chat_id = match &body["chat_id"] {
        Value::String(id) => id.clone(),
        other => other.to_string(),
    };
    state.received.lock().unwrap().push(ReceivedMessage {
        token: bot.trim_start_matches("bot").to_string(),
        chat_id,
        text: body["text"].as_str().unwrap_or_default().to_string(),
    });

    (
        StatusCode::OK,
        Json(json!({ "ok": true, "result": { "message_id": 1 } })),
    )
}

/// Server profile with test defaults
pub fn server_profile(name: &str, address: &str, ignore: &[&str]) -> ServerProfile {
    ServerProfile {
        name: name.to_string(),
        address: address.to_string(),
        password: "secret".to_string(),
        poll_interval_seconds: 1,
        ignore: ignore.iter().map(|n| n.to_string()).collect::<HashSet<_>>(),
        timeout_seconds: 2,
        command: "/players o".to_string(),
    }
}

pub fn notification_profile() -> NotificationProfile {
    NotificationProfile {
        destination: "-100123".to_string(),
        prefix: "Now online:".to_string(),
    }
}
