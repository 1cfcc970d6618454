//! Verification requests and their review state machine.
//!
//! `pending -> approved | rejected`; both outcomes are terminal.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Id, Result, profile::ProfileSummary};

pub const VERIFICATION_BIO_MAX_LEN: usize = 1000;
pub const MAX_SOCIAL_LINKS: usize = 10;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VerificationStatus {
  Pending,
  Approved,
  Rejected,
}

impl VerificationStatus {
  pub fn is_terminal(self) -> bool { !matches!(self, Self::Pending) }
}

/// An admin's verdict on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
  Approve,
  Reject,
}

impl Decision {
  pub fn resulting_status(self) -> VerificationStatus {
    match self {
      Self::Approve => VerificationStatus::Approved,
      Self::Reject => VerificationStatus::Rejected,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRequest {
  pub id:           Id,
  pub user_id:      Id,
  pub bio:          String,
  /// Platform name (e.g. `website`, `twitter`) to URL or handle.
  pub social_links: BTreeMap<String, String>,
  pub status:       VerificationStatus,
  pub admin_notes:  Option<String>,
  pub decided_by:   Option<Id>,
  pub created_at:   DateTime<Utc>,
  pub decided_at:   Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewVerification {
  pub user_id:      Id,
  pub bio:          String,
  pub social_links: BTreeMap<String, String>,
}

impl NewVerification {
  /// Trim inputs and drop blank links.
  pub fn new(user_id: Id, bio: &str, links: BTreeMap<String, String>) -> Result<Self> {
    let bio = bio.trim();
    if bio.is_empty() {
      return Err(Error::Validation("verification bio must not be empty".into()));
    }
    if bio.chars().count() > VERIFICATION_BIO_MAX_LEN {
      return Err(Error::Validation(format!(
        "verification bio exceeds {VERIFICATION_BIO_MAX_LEN} characters"
      )));
    }
    let social_links: BTreeMap<_, _> = links
      .into_iter()
      .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_owned()))
      .filter(|(k, v)| !k.is_empty() && !v.is_empty())
      .collect();
    if social_links.len() > MAX_SOCIAL_LINKS {
      return Err(Error::Validation(format!("at most {MAX_SOCIAL_LINKS} social links")));
    }
    Ok(Self { user_id, bio: bio.to_owned(), social_links })
  }
}

/// A pending request rendered for the admin review queue.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationView {
  #[serde(flatten)]
  pub request:   VerificationRequest,
  pub applicant: Option<ProfileSummary>,
}
