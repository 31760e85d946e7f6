// src/services/mod.rs
//! Service layer: HTTP API, session token issuance, outbound notifier.

pub mod api_server;
pub mod notifier;
pub mod token_issuer;
