//! Floodgate - Sliding-Window Request Admission Service
//!
//! This crate implements an HTTP request admission service. A sliding-window
//! rate limiter sits ahead of business handlers and decides, per client
//! identity, whether a request proceeds or is rejected with retry guidance.
//! Accounting is in-memory and per-process; stale client state is reclaimed
//! by a periodic sweep so memory stays bounded.

pub mod admission;
pub mod config;
pub mod error;
pub mod http;
