//! Bulletin board backend.
//!
//! Posts, one-level threaded replies, comments and bearer-session auth over
//! SQLite, served as a JSON API.

// Allow raw string hashes for safety - they're harmless and prevent issues if content changes
#![allow(clippy::needless_raw_string_hashes)]

pub mod auth;
pub mod board;
pub mod config;
pub mod db;
pub mod web;
