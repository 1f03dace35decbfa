pub mod app;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod output;
pub mod store;
pub mod tui;
