//! Core types and trait definitions for the Agora social engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::SocialStore`]; the engine and the API
//! depend only on that abstraction.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod clock;
pub mod content;
pub mod cursor;
pub mod engagement;
pub mod error;
pub mod notification;
pub mod profile;
pub mod ratelimit;
pub mod store;
pub mod verification;

pub use error::{Error, Result};

/// Every entity in the system is identified by a v4 UUID.
pub type Id = uuid::Uuid;
