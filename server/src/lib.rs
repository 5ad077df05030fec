//! HARBOR chat server library.
//! This crate exposes internal modules for integration testing.
//! The binary entry point is in main.rs.

pub mod commands;
pub mod config;
pub mod conn;
pub mod error;
pub mod state;
pub mod transcript;
pub mod ws;
