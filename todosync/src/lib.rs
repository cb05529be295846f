//! `todosync` — task list kept in sync with a remote REST collection.

pub mod app;
pub mod cache;
pub mod config;
pub mod remote;
pub mod store;
pub mod view;
