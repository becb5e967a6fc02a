// src/lib.rs
pub mod app;
pub mod config;
pub mod countdown;
pub mod errors;
pub mod event;
pub mod event_store;
pub mod feed_download;
pub mod logging;
pub mod monitor;
pub mod notifier;
pub mod show;
pub mod show_factory;
pub mod timezone;
pub mod ui;
