//! `todosync` collection server library.
//!
//! Exposes the server for use in tests and embedding. The server keeps one
//! task collection in memory and serves it over a small REST protocol.

pub mod config;
pub mod server;
pub mod store;
