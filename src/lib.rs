//! Live chat room for the price-comparison site.
//!
//! The server keeps one shared room. Clients connect over `/api/ws`, get a
//! guest nickname, optionally authenticate, join, and exchange messages;
//! `/api/chat/messages` serves recent history.

pub mod config;
pub mod db;
pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod services;
pub mod state;
