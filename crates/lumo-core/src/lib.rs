//! Core lumo library (chat engine, stream transport, REST client, config).

pub mod api;
pub mod chat;
pub mod config;
pub mod core;
pub mod logging;
pub mod stream;
