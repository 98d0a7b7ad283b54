// src/lib.rs

pub mod api;
pub mod app_state;
pub mod blob;
pub mod config;
pub mod engine_hooks;
pub mod service;
pub mod store;
