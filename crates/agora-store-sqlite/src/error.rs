//! Error type for `agora-store-sqlite`.
//!
//! Only infrastructure failures live here. Business outcomes are reported
//! through the outcome enums in [`agora_core::store`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown {column} value: {value:?}")]
  UnknownEnum { column: &'static str, value: String },

  #[error("notification {0} has an inconsistent kind/post pair")]
  CorruptNotification(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
