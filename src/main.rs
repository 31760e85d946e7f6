// src/main.rs

//! # Telegram WebApp Auth System - Main Entry Point
//!
//! This module serves as the main entry point for the WebApp authentication
//! service. It loads configuration, wires the components together and starts
//! the API server.
//!
//! ## Architecture Overview
//! 1. **Auth Layer**: canonicalization and keyed-digest verification of
//!    Telegram `initData` credentials
//! 2. **Services Layer**: API endpoints, session token issuance and the
//!    outbound webhook notifier
//! 3. **Models Layer**: Telegram payload data structures
//!
//! ## Environment Variables
//! - `BOT_TOKEN`: Telegram bot token, the issuer secret for verification
//! - `WEBAPP_BASE_URL`: (Optional) WebApp location the bot links to
//!   (default: http://127.0.0.1:8000/webapp)
//! - `USE_JWT`: (Optional) issue session tokens after verification
//! - `JWT_SECRET`: session token signing secret, required when `USE_JWT` is on
//! - `RUST_LOG`: (Optional) log filter, e.g. `info` or `webapp_auth_system=debug`

use crate::config::Settings;
use crate::services::api_server::ApiServer;
use crate::services::notifier::BotNotifier;
use dotenv::dotenv;
use std::net::SocketAddr;

// Module declarations (organized by functional domain)
mod auth;      // initData canonicalization and verification
mod config;    // Environment-backed settings
mod models;    // Telegram payload data structures
mod services;  // API server, token issuance, outbound notifier
mod utils;     // Crypto helpers

/// Main application entry point
///
/// # Initialization Sequence
/// 1. Load environment configuration
/// 2. Initialize logging
/// 3. Wire the notifier into the API server
/// 4. Start the HTTP server
#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv().ok();
    env_logger::init();

    let settings = Settings::from_env();
    if settings.bot_token.is_none() {
        log::warn!("BOT_TOKEN is not set; /auth/init will reject credentials until it is configured");
    }
    if settings.use_jwt && settings.jwt_secret.is_none() {
        log::warn!("USE_JWT is on but JWT_SECRET is not set; token issuance will fail");
    }

    let notifier = BotNotifier::new();
    let api_server = ApiServer::new(settings, notifier);

    // Start the HTTP server
    let addr = SocketAddr::from(([127, 0, 0, 1], 8000));
    println!("API server running at http://{}", addr);
    println!("Available endpoints:");
    println!("- POST /auth/init");
    println!("- POST /webhook");
    println!("- GET  /health");

    api_server.run(addr).await;
}
