//! Verification Workflow: `pending -> approved | rejected`.
//!
//! A profile has at most one pending request; the store's partial unique
//! index enforces this. Decisions are terminal, and approval marks the
//! profile verified in the same transaction.

use std::collections::{BTreeMap, HashMap};

use agora_core::{
  Error, Id, Result,
  clock::Clock,
  store::{SocialStore, VerificationDecision, VerificationInsert},
  verification::{Decision, NewVerification, VerificationRequest, VerificationView},
};
use tracing::info;

use crate::Engine;

impl<S, C> Engine<S, C>
where
  S: SocialStore,
  C: Clock,
{
  pub async fn submit_verification(
    &self,
    viewer: Id,
    bio: &str,
    links: BTreeMap<String, String>,
  ) -> Result<VerificationRequest> {
    let input = NewVerification::new(viewer, bio, links)?;
    match self.store.insert_verification(input, self.now()).await.map_err(Error::store)? {
      VerificationInsert::Created(request) => Ok(request),
      VerificationInsert::PendingExists => {
        Err(Error::Conflict("a verification request is already pending".into()))
      }
      VerificationInsert::AlreadyVerified => {
        Err(Error::Conflict("profile is already verified".into()))
      }
      VerificationInsert::ProfileNotFound => Err(Error::NotFound(format!("profile {viewer}"))),
    }
  }

  /// The viewer's most recent request, in whatever state it is in.
  pub async fn my_verification(&self, viewer: Id) -> Result<Option<VerificationRequest>> {
    self.store.latest_verification(viewer).await.map_err(Error::store)
  }

  /// The admin review queue, newest first.
  pub async fn pending_verifications(
    &self,
    admin: Id,
    limit: Option<usize>,
  ) -> Result<Vec<VerificationView>> {
    self.require_admin(admin).await?;
    let limit = self.config.page_size(limit);
    let requests = self.store.pending_verifications(limit).await.map_err(Error::store)?;

    let applicant_ids: Vec<Id> = requests.iter().map(|r| r.user_id).collect();
    let applicants: HashMap<Id, _> = self
      .store
      .profiles_by_ids(&applicant_ids)
      .await
      .map_err(Error::store)?
      .into_iter()
      .map(|p| (p.id, p.summary()))
      .collect();

    Ok(
      requests
        .into_iter()
        .map(|request| {
          let applicant = applicants.get(&request.user_id).cloned();
          VerificationView { request, applicant }
        })
        .collect(),
    )
  }

  /// One request with its applicant, for the admin review screen.
  pub async fn verification_request(&self, admin: Id, request_id: Id) -> Result<VerificationView> {
    self.require_admin(admin).await?;
    let request = self
      .store
      .get_verification(request_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(format!("verification request {request_id}")))?;
    let applicant = self.store.get_profile(request.user_id).await.map_err(Error::store)?;
    Ok(VerificationView { request, applicant: applicant.map(|p| p.summary()) })
  }

  pub async fn decide_verification(
    &self,
    admin: Id,
    request_id: Id,
    decision: Decision,
    notes: Option<&str>,
  ) -> Result<VerificationRequest> {
    self.require_admin(admin).await?;
    let notes = notes.map(str::trim).filter(|n| !n.is_empty()).map(str::to_owned);

    let outcome = self
      .store
      .decide_verification(request_id, admin, decision, notes, self.now())
      .await
      .map_err(Error::store)?;
    match outcome {
      VerificationDecision::Decided(request) => {
        info!(
          request = %request.id,
          user = %request.user_id,
          %admin,
          status = %request.status,
          "verification decided"
        );
        Ok(request)
      }
      VerificationDecision::NotFound => {
        Err(Error::NotFound(format!("verification request {request_id}")))
      }
      VerificationDecision::AlreadyDecided(status) => {
        Err(Error::Conflict(format!("verification request is already {status}")))
      }
    }
  }
}
