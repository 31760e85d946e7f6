// src/services/api_server.rs
//! API Server for the Telegram WebApp auth system.
//!
//! This module provides the REST interface in front of the credential
//! verification core. The API is built using Axum and includes endpoints
//! for:
//! - WebApp credential verification (and optional session token issuance)
//! - The Telegram webhook relay that hands out the WebApp button
//! - Health checking and a root redirect to the WebApp
//!
//! Status code policy: credential-shape problems are 400s carrying the
//! machine-readable reason code; a missing issuer secret or a broken token
//! configuration is the only 500.

use crate::auth::verifier::{verify_init_value, VerifiedPayload};
use crate::config::Settings;
use crate::models::update::Update;
use crate::services::notifier::BotNotifier;
use crate::services::token_issuer::SessionTokenIssuer;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Router,
};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;

// API request structures

/// Request payload for WebApp credential verification
///
/// `init_data` is kept as a raw JSON value so the verifier can report
/// non-string shapes as `invalid_input` instead of a generic decode error.
#[derive(Serialize, Deserialize)]
struct AuthInitRequest {
    init_data: Option<Value>,
}

/// HTTP server exposing the verification core and the webhook relay.
pub struct ApiServer {
    settings: Settings,
    notifier: BotNotifier,
}

impl ApiServer {
    /// Creates the server from startup configuration and the outbound
    /// notifier. `settings` is read-only from here on.
    pub fn new(settings: Settings, notifier: BotNotifier) -> Self {
        Self { settings, notifier }
    }

    /// Configures all API routes.
    fn router(&self) -> Router {
        Router::new()
            .route("/", get(Self::root_handler))
            .route("/health", get(Self::health_handler))
            .route("/auth/init", post(Self::auth_init_handler))
            .route("/webhook", post(Self::webhook_handler))
            .with_state(Arc::new(self.clone()))
    }

    /// Binds `addr` and serves requests until the process exits.
    pub async fn run(&self, addr: SocketAddr) {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        axum::serve(listener, app).await.unwrap();
    }

    // =====================
    // Service Endpoints
    // =====================

    /// Redirects the bare origin to the configured WebApp location.
    ///
    /// # Endpoint
    /// GET /
    async fn root_handler(State(state): State<Arc<ApiServer>>) -> Redirect {
        Redirect::temporary(&state.settings.webapp_base_url)
    }

    /// Liveness probe.
    ///
    /// # Endpoint
    /// GET /health
    async fn health_handler() -> (StatusCode, Json<Value>) {
        (StatusCode::OK, Json(json!({"status": "ok"})))
    }

    // =====================
    // Authentication
    // =====================

    /// Verifies WebApp `initData` and signs the caller in.
    ///
    /// # Endpoint
    /// POST /auth/init
    ///
    /// # Request Body
    /// JSON payload: `{"init_data": "<init_data string from Telegram>"}`
    ///
    /// # Responses
    /// - 200 OK: `{"ok": true, "user": {...}}`, plus `"token"` when session
    ///   tokens are enabled
    /// - 400 Bad Request: credential missing or failing verification; the
    ///   `error` field carries the reason code
    /// - 500 Internal Server Error: bot token or JWT secret not configured
    async fn auth_init_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<AuthInitRequest>,
    ) -> (StatusCode, Json<Value>) {
        let init_data = match payload.init_data {
            Some(value) => value,
            None => return error_response(StatusCode::BAD_REQUEST, "init_data required"),
        };

        let bot_token = match state.settings.bot_token.as_deref() {
            Some(token) => token,
            None => {
                warn!("BOT_TOKEN not configured; rejecting init_data");
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "server misconfiguration",
                );
            }
        };

        let verified = match verify_init_value(&init_data, bot_token) {
            Ok(verified) => verified,
            Err(reason) => {
                warn!("init_data verification failed: {}", reason);
                return error_response(StatusCode::BAD_REQUEST, &reason.to_string());
            }
        };

        let user = user_object(&verified);
        let mut body = json!({"ok": true, "user": user});

        if state.settings.use_jwt {
            let signing_secret = match state.settings.jwt_secret.as_deref() {
                Some(secret) => secret,
                None => {
                    error!("USE_JWT enabled but JWT_SECRET not set");
                    return error_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "server misconfiguration",
                    );
                }
            };
            match SessionTokenIssuer::new(signing_secret).issue(&token_subject(&body["user"])) {
                Ok(token) => {
                    body["token"] = Value::String(token);
                }
                Err(e) => {
                    error!("session token signing failed: {}", e);
                    return error_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "server misconfiguration",
                    );
                }
            }
        }

        (StatusCode::OK, Json(body))
    }

    // =====================
    // Webhook Relay
    // =====================

    /// Accepts a Telegram webhook update and replies with an inline
    /// keyboard button opening the WebApp. The WebApp obtains `initData`
    /// from the Telegram client and posts it to `/auth/init`.
    ///
    /// # Endpoint
    /// POST /webhook
    ///
    /// # Responses
    /// - 200 OK: update acked, whether or not a reply was sent; Telegram
    ///   must not redeliver on downstream send failures
    /// - 400 Bad Request: body is not JSON
    async fn webhook_handler(
        State(state): State<Arc<ApiServer>>,
        body: String,
    ) -> (StatusCode, Json<Value>) {
        let update: Update = match serde_json::from_str(&body) {
            Ok(update) => update,
            Err(e) => {
                error!("Failed to parse incoming webhook JSON: {}", e);
                return error_response(StatusCode::BAD_REQUEST, "invalid json");
            }
        };

        let chat_id = match update.message().and_then(|message| message.reply_chat_id()) {
            Some(chat_id) => chat_id,
            None => return (StatusCode::OK, Json(json!({"ok": true}))),
        };

        let webapp_url = state.settings.webapp_base_url.clone();
        let bot_token = match state.settings.bot_token.as_deref() {
            Some(token) => token,
            None => {
                warn!("BOT_TOKEN not set; built url: {}", webapp_url);
                return (
                    StatusCode::OK,
                    Json(json!({"ok": true, "webapp_url": webapp_url})),
                );
            }
        };

        let text = "Open the WebApp to continue; it uses Telegram initData to sign you in securely.";
        match state
            .notifier
            .send_webapp_button(bot_token, chat_id, text, &webapp_url)
            .await
        {
            Ok(()) => info!("Sent WebApp button to chat_id={}", chat_id),
            Err(e) => error!("Failed to send message to Telegram: {}", e),
        }

        (StatusCode::OK, Json(json!({"ok": true})))
    }
}

/// The `user` object returned to the client: the decoded `user` structure
/// when the credential carried one, otherwise the top-level identity
/// fields.
fn user_object(verified: &VerifiedPayload) -> Value {
    match verified.get("user") {
        Some(user @ Value::Object(_)) => user.clone(),
        _ => json!({
            "id": verified.get("id").cloned().unwrap_or(Value::Null),
            "username": verified.get("username").cloned().unwrap_or(Value::Null),
            "first_name": verified.get("first_name").cloned().unwrap_or(Value::Null),
            "auth_date": verified.get("auth_date").cloned().unwrap_or(Value::Null),
        }),
    }
}

/// Renders the user's id as the token subject string.
fn token_subject(user: &Value) -> String {
    match user.get("id") {
        Some(Value::Number(id)) => id.to_string(),
        Some(Value::String(id)) => id.clone(),
        _ => String::new(),
    }
}

fn error_response(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({"ok": false, "error": message})))
}

// Implement Clone for ApiServer to use with Axum's State
impl Clone for ApiServer {
    fn clone(&self) -> Self {
        ApiServer {
            settings: self.settings.clone(),
            notifier: self.notifier.clone(),
        }
    }
}
