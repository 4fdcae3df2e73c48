//! The matching-request workflow.
//!
//! `MatchingService` owns every lifecycle rule for matching requests: who may
//! create, accept, reject, and delete them, and which conflicts block a
//! mutation. It is deliberately independent of the HTTP layer; the server's
//! handlers translate `MatchingError` values into responses. `MatchingStore`
//! is the persistence seam, implemented for PostgreSQL by
//! [`crate::db::matching::Dao`].

use chrono::NaiveDateTime;
use diesel::Queryable;
use std::fmt;

use crate::db::DaoError;
use crate::models::matching_request::{MatchingRequest, RequestStatus};
use crate::models::user::UserRole;
use crate::request_io::outputs::{OutputMenteeRequest, OutputMentorRequest};

/// A mentor's verdict on a pending request. `Pending` is not representable
/// here, so a request can never be moved back into the pending state.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accepted,
    Rejected,
}

impl Decision {
    pub fn as_status(&self) -> RequestStatus {
        match self {
            Decision::Accepted => RequestStatus::Accepted,
            Decision::Rejected => RequestStatus::Rejected,
        }
    }
}

/// Errors surfaced by the store. The conflict variants correspond to the
/// database's uniqueness constraints; the store reports them even when the
/// service's advisory pre-check passed, which makes the constraint (not the
/// pre-check) the final authority on conflicts.
#[derive(Debug)]
pub enum StoreError {
    DuplicatePair,
    MenteeHasPending,
    MentorHasAccepted,
    Dao(DaoError),
}

impl From<r2d2::Error> for StoreError {
    fn from(error: r2d2::Error) -> Self {
        StoreError::Dao(DaoError::DbThreadPoolFailure(error))
    }
}

impl From<diesel::result::Error> for StoreError {
    fn from(error: diesel::result::Error) -> Self {
        StoreError::Dao(DaoError::QueryFailure(error))
    }
}

/// A request joined with the counterpart mentor's public profile fields, for
/// the mentee's view of the list.
#[derive(Clone, Debug, Queryable)]
pub struct MenteeRequestRow {
    pub id: i32,
    pub mentee_id: i32,
    pub mentor_id: i32,
    pub message: String,
    pub status: RequestStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub mentor_name: String,
    pub mentor_bio: Option<String>,
    pub mentor_skills: Option<String>,
}

/// A request joined with the counterpart mentee's public profile fields, for
/// the mentor's view of the list.
#[derive(Clone, Debug, Queryable)]
pub struct MentorRequestRow {
    pub id: i32,
    pub mentee_id: i32,
    pub mentor_id: i32,
    pub message: String,
    pub status: RequestStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub mentee_name: String,
    pub mentee_bio: Option<String>,
}

pub trait MatchingStore {
    fn user_role(&mut self, user_id: i32) -> Result<Option<UserRole>, StoreError>;
    fn mentee_has_pending(&mut self, mentee_id: i32) -> Result<bool, StoreError>;
    fn mentor_has_accepted(&mut self, mentor_id: i32) -> Result<bool, StoreError>;
    fn insert_request(
        &mut self,
        mentee_id: i32,
        mentor_id: i32,
        message: &str,
    ) -> Result<i32, StoreError>;
    fn get_request(&mut self, request_id: i32) -> Result<Option<MatchingRequest>, StoreError>;
    fn set_request_status(
        &mut self,
        request_id: i32,
        status: RequestStatus,
    ) -> Result<(), StoreError>;
    fn delete_request(&mut self, request_id: i32) -> Result<(), StoreError>;
    fn requests_for_mentee(&mut self, mentee_id: i32) -> Result<Vec<MenteeRequestRow>, StoreError>;
    fn requests_for_mentor(&mut self, mentor_id: i32) -> Result<Vec<MentorRequestRow>, StoreError>;
}

#[derive(Debug)]
pub enum MatchingError {
    /// The target user does not exist or is not a mentor.
    InvalidMentor,
    /// The mentee already has a pending request (to any mentor).
    PendingRequestExists,
    /// A request between this mentee and mentor already exists, in any status.
    DuplicatePair,
    /// The mentor already has an accepted request.
    AlreadyMatched,
    /// No request with the given ID exists.
    NotFound,
    /// The caller is neither the owning mentee nor the target mentor of the
    /// request, depending on the operation.
    NotRequestOwner,
    /// The request has already been accepted or rejected.
    NotPending,
    /// Unexpected storage failure.
    Store(DaoError),
}

impl std::error::Error for MatchingError {}

impl fmt::Display for MatchingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchingError::InvalidMentor => write!(f, "MatchingError: Invalid mentor"),
            MatchingError::PendingRequestExists => {
                write!(f, "MatchingError: Mentee already has a pending request")
            }
            MatchingError::DuplicatePair => {
                write!(f, "MatchingError: A request for this pair already exists")
            }
            MatchingError::AlreadyMatched => {
                write!(f, "MatchingError: Mentor already has an accepted request")
            }
            MatchingError::NotFound => write!(f, "MatchingError: Request not found"),
            MatchingError::NotRequestOwner => {
                write!(f, "MatchingError: Caller does not own the request")
            }
            MatchingError::NotPending => write!(f, "MatchingError: Request is no longer pending"),
            MatchingError::Store(e) => write!(f, "MatchingError: Storage failure: {e}"),
        }
    }
}

impl From<StoreError> for MatchingError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::DuplicatePair => MatchingError::DuplicatePair,
            StoreError::MenteeHasPending => MatchingError::PendingRequestExists,
            StoreError::MentorHasAccepted => MatchingError::AlreadyMatched,
            StoreError::Dao(e) => MatchingError::Store(e),
        }
    }
}

pub struct MatchingService<S: MatchingStore> {
    store: S,
}

impl<S: MatchingStore> MatchingService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates a pending request from `mentee_id` to `mentor_id`. The caller
    /// must already have been authenticated as the mentee.
    pub fn create(
        &mut self,
        mentee_id: i32,
        mentor_id: i32,
        message: Option<&str>,
    ) -> Result<i32, MatchingError> {
        if mentor_id < 1 {
            return Err(MatchingError::InvalidMentor);
        }

        match self.store.user_role(mentor_id)? {
            Some(UserRole::Mentor) => (),
            _ => return Err(MatchingError::InvalidMentor),
        }

        // Advisory pre-check; the store's uniqueness constraints are the
        // backstop if a concurrent create slips past it.
        if self.store.mentee_has_pending(mentee_id)? {
            return Err(MatchingError::PendingRequestExists);
        }

        let message = message.map(str::trim).unwrap_or("");
        let request_id = self.store.insert_request(mentee_id, mentor_id, message)?;

        Ok(request_id)
    }

    pub fn list_for_mentee(
        &mut self,
        mentee_id: i32,
    ) -> Result<Vec<OutputMenteeRequest>, MatchingError> {
        let rows = self.store.requests_for_mentee(mentee_id)?;
        Ok(rows.into_iter().map(shape_mentee_view).collect())
    }

    pub fn list_for_mentor(
        &mut self,
        mentor_id: i32,
    ) -> Result<Vec<OutputMentorRequest>, MatchingError> {
        let rows = self.store.requests_for_mentor(mentor_id)?;
        Ok(rows.into_iter().map(shape_mentor_view).collect())
    }

    /// Applies a mentor's decision to a pending request. Only the target
    /// mentor may decide, and only while the request is still pending.
    pub fn update_status(
        &mut self,
        request_id: i32,
        mentor_id: i32,
        decision: Decision,
    ) -> Result<RequestStatus, MatchingError> {
        let request = self
            .store
            .get_request(request_id)?
            .ok_or(MatchingError::NotFound)?;

        if request.mentor_id != mentor_id {
            return Err(MatchingError::NotRequestOwner);
        }

        if request.status != RequestStatus::Pending {
            return Err(MatchingError::NotPending);
        }

        let new_status = decision.as_status();

        if new_status == RequestStatus::Accepted && self.store.mentor_has_accepted(mentor_id)? {
            return Err(MatchingError::AlreadyMatched);
        }

        self.store.set_request_status(request_id, new_status)?;

        Ok(new_status)
    }

    /// Deletes a request in any status. Only the owning mentee may delete.
    pub fn delete(&mut self, request_id: i32, mentee_id: i32) -> Result<(), MatchingError> {
        let request = self
            .store
            .get_request(request_id)?
            .ok_or(MatchingError::NotFound)?;

        if request.mentee_id != mentee_id {
            return Err(MatchingError::NotRequestOwner);
        }

        self.store.delete_request(request_id)?;

        Ok(())
    }
}

fn shape_mentee_view(row: MenteeRequestRow) -> OutputMenteeRequest {
    OutputMenteeRequest {
        id: row.id,
        mentee_id: row.mentee_id,
        mentor_id: row.mentor_id,
        message: row.message,
        status: row.status,
        created_at: row.created_at,
        updated_at: row.updated_at,
        mentor_name: row.mentor_name,
        mentor_bio: row.mentor_bio.unwrap_or_default(),
        mentor_skills: decode_skills(row.mentor_skills.as_deref()),
    }
}

fn shape_mentor_view(row: MentorRequestRow) -> OutputMentorRequest {
    OutputMentorRequest {
        id: row.id,
        mentee_id: row.mentee_id,
        mentor_id: row.mentor_id,
        message: row.message,
        status: row.status,
        created_at: row.created_at,
        updated_at: row.updated_at,
        mentee_name: row.mentee_name,
        mentee_bio: row.mentee_bio.unwrap_or_default(),
    }
}

/// Skills are stored as a JSON-encoded array of strings. Absent or malformed
/// encodings decode to an empty list rather than an error.
pub fn decode_skills(skills_json: Option<&str>) -> Vec<String> {
    skills_json
        .and_then(|s| serde_json::from_str::<Vec<String>>(s).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, NaiveDate};
    use std::collections::HashMap;

    struct MockUser {
        role: UserRole,
        name: String,
        bio: Option<String>,
        skills: Option<String>,
    }

    #[derive(Default)]
    struct MemStore {
        users: HashMap<i32, MockUser>,
        requests: Vec<MatchingRequest>,
        next_request_id: i32,
        // Simulates a concurrent create committing between the advisory
        // pre-check and the insert.
        lie_about_pending: bool,
    }

    impl MemStore {
        fn with_user(mut self, id: i32, role: UserRole, name: &str) -> Self {
            self.users.insert(
                id,
                MockUser {
                    role,
                    name: String::from(name),
                    bio: None,
                    skills: None,
                },
            );
            self
        }

        fn with_mentor_profile(mut self, id: i32, bio: Option<&str>, skills: Option<&str>) -> Self {
            let user = self.users.get_mut(&id).expect("No such user");
            user.bio = bio.map(String::from);
            user.skills = skills.map(String::from);
            self
        }

        fn timestamp_for(request_id: i32) -> NaiveDateTime {
            NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
                + Duration::seconds(request_id.into())
        }
    }

    impl MatchingStore for MemStore {
        fn user_role(&mut self, user_id: i32) -> Result<Option<UserRole>, StoreError> {
            Ok(self.users.get(&user_id).map(|u| u.role))
        }

        fn mentee_has_pending(&mut self, mentee_id: i32) -> Result<bool, StoreError> {
            if self.lie_about_pending {
                return Ok(false);
            }

            Ok(self
                .requests
                .iter()
                .any(|r| r.mentee_id == mentee_id && r.status == RequestStatus::Pending))
        }

        fn mentor_has_accepted(&mut self, mentor_id: i32) -> Result<bool, StoreError> {
            Ok(self
                .requests
                .iter()
                .any(|r| r.mentor_id == mentor_id && r.status == RequestStatus::Accepted))
        }

        fn insert_request(
            &mut self,
            mentee_id: i32,
            mentor_id: i32,
            message: &str,
        ) -> Result<i32, StoreError> {
            if self
                .requests
                .iter()
                .any(|r| r.mentee_id == mentee_id && r.mentor_id == mentor_id)
            {
                return Err(StoreError::DuplicatePair);
            }

            if self
                .requests
                .iter()
                .any(|r| r.mentee_id == mentee_id && r.status == RequestStatus::Pending)
            {
                return Err(StoreError::MenteeHasPending);
            }

            self.next_request_id += 1;
            let request_id = self.next_request_id;
            let timestamp = Self::timestamp_for(request_id);

            self.requests.push(MatchingRequest {
                id: request_id,
                mentee_id,
                mentor_id,
                message: String::from(message),
                status: RequestStatus::Pending,
                created_at: timestamp,
                updated_at: timestamp,
            });

            Ok(request_id)
        }

        fn get_request(&mut self, request_id: i32) -> Result<Option<MatchingRequest>, StoreError> {
            Ok(self.requests.iter().find(|r| r.id == request_id).cloned())
        }

        fn set_request_status(
            &mut self,
            request_id: i32,
            status: RequestStatus,
        ) -> Result<(), StoreError> {
            if status == RequestStatus::Accepted {
                let mentor_id = self
                    .requests
                    .iter()
                    .find(|r| r.id == request_id)
                    .map(|r| r.mentor_id);

                if let Some(mentor_id) = mentor_id {
                    if self
                        .requests
                        .iter()
                        .any(|r| r.mentor_id == mentor_id && r.status == RequestStatus::Accepted)
                    {
                        return Err(StoreError::MentorHasAccepted);
                    }
                }
            }

            if let Some(request) = self.requests.iter_mut().find(|r| r.id == request_id) {
                request.status = status;
                request.updated_at = request.created_at + Duration::seconds(100);
            }

            Ok(())
        }

        fn delete_request(&mut self, request_id: i32) -> Result<(), StoreError> {
            self.requests.retain(|r| r.id != request_id);
            Ok(())
        }

        fn requests_for_mentee(
            &mut self,
            mentee_id: i32,
        ) -> Result<Vec<MenteeRequestRow>, StoreError> {
            let mut rows: Vec<MenteeRequestRow> = self
                .requests
                .iter()
                .filter(|r| r.mentee_id == mentee_id)
                .map(|r| {
                    let mentor = self.users.get(&r.mentor_id).expect("No such mentor");
                    MenteeRequestRow {
                        id: r.id,
                        mentee_id: r.mentee_id,
                        mentor_id: r.mentor_id,
                        message: r.message.clone(),
                        status: r.status,
                        created_at: r.created_at,
                        updated_at: r.updated_at,
                        mentor_name: mentor.name.clone(),
                        mentor_bio: mentor.bio.clone(),
                        mentor_skills: mentor.skills.clone(),
                    }
                })
                .collect();

            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(rows)
        }

        fn requests_for_mentor(
            &mut self,
            mentor_id: i32,
        ) -> Result<Vec<MentorRequestRow>, StoreError> {
            let mut rows: Vec<MentorRequestRow> = self
                .requests
                .iter()
                .filter(|r| r.mentor_id == mentor_id)
                .map(|r| {
                    let mentee = self.users.get(&r.mentee_id).expect("No such mentee");
                    MentorRequestRow {
                        id: r.id,
                        mentee_id: r.mentee_id,
                        mentor_id: r.mentor_id,
                        message: r.message.clone(),
                        status: r.status,
                        created_at: r.created_at,
                        updated_at: r.updated_at,
                        mentee_name: mentee.name.clone(),
                        mentee_bio: mentee.bio.clone(),
                    }
                })
                .collect();

            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(rows)
        }
    }

    const MENTEE: i32 = 1;
    const OTHER_MENTEE: i32 = 2;
    const MENTOR: i32 = 10;
    const OTHER_MENTOR: i32 = 11;

    fn service() -> MatchingService<MemStore> {
        MatchingService::new(
            MemStore::default()
                .with_user(MENTEE, UserRole::Mentee, "Mentee One")
                .with_user(OTHER_MENTEE, UserRole::Mentee, "Mentee Two")
                .with_user(MENTOR, UserRole::Mentor, "Mentor One")
                .with_user(OTHER_MENTOR, UserRole::Mentor, "Mentor Two"),
        )
    }

    #[test]
    fn test_create_defaults_message_to_empty() {
        let mut service = service();

        let request_id = service.create(MENTEE, MENTOR, None).unwrap();

        let request = service.store.get_request(request_id).unwrap().unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.message, "");
        assert_eq!(request.mentee_id, MENTEE);
        assert_eq!(request.mentor_id, MENTOR);
    }

    #[test]
    fn test_create_trims_message() {
        let mut service = service();

        let request_id = service
            .create(MENTEE, MENTOR, Some("  please mentor me  "))
            .unwrap();

        let request = service.store.get_request(request_id).unwrap().unwrap();
        assert_eq!(request.message, "please mentor me");
    }

    #[test]
    fn test_create_rejects_invalid_mentor() {
        let mut service = service();

        assert!(matches!(
            service.create(MENTEE, 0, None),
            Err(MatchingError::InvalidMentor)
        ));
        assert!(matches!(
            service.create(MENTEE, 999, None),
            Err(MatchingError::InvalidMentor)
        ));
        // A mentee is not a valid target
        assert!(matches!(
            service.create(MENTEE, OTHER_MENTEE, None),
            Err(MatchingError::InvalidMentor)
        ));
    }

    #[test]
    fn test_second_pending_request_conflicts() {
        let mut service = service();

        service.create(MENTEE, MENTOR, None).unwrap();

        assert!(matches!(
            service.create(MENTEE, OTHER_MENTOR, None),
            Err(MatchingError::PendingRequestExists)
        ));

        // A different mentee is unaffected
        service.create(OTHER_MENTEE, MENTOR, None).unwrap();
    }

    #[test]
    fn test_pair_uniqueness_survives_rejection() {
        let mut service = service();

        let request_id = service.create(MENTEE, MENTOR, None).unwrap();
        service
            .update_status(request_id, MENTOR, Decision::Rejected)
            .unwrap();

        assert!(matches!(
            service.create(MENTEE, MENTOR, None),
            Err(MatchingError::DuplicatePair)
        ));
    }

    #[test]
    fn test_storage_conflict_beats_passed_precheck() {
        let mut service = service();
        service.store.lie_about_pending = true;

        service.create(MENTEE, MENTOR, None).unwrap();

        // The pre-check claims there is no pending request, but the store's
        // constraint still reports the conflict.
        assert!(matches!(
            service.create(MENTEE, OTHER_MENTOR, None),
            Err(MatchingError::PendingRequestExists)
        ));
    }

    #[test]
    fn test_accept_transitions_and_blocks_second_accept() {
        let mut service = service();

        let first = service.create(MENTEE, MENTOR, None).unwrap();
        let second = service.create(OTHER_MENTEE, MENTOR, None).unwrap();

        let status = service
            .update_status(first, MENTOR, Decision::Accepted)
            .unwrap();
        assert_eq!(status, RequestStatus::Accepted);

        assert!(matches!(
            service.update_status(second, MENTOR, Decision::Accepted),
            Err(MatchingError::AlreadyMatched)
        ));

        // Rejecting the second request is still allowed
        let status = service
            .update_status(second, MENTOR, Decision::Rejected)
            .unwrap();
        assert_eq!(status, RequestStatus::Rejected);
    }

    #[test]
    fn test_update_requires_target_mentor() {
        let mut service = service();

        let request_id = service.create(MENTEE, MENTOR, None).unwrap();

        assert!(matches!(
            service.update_status(request_id, OTHER_MENTOR, Decision::Accepted),
            Err(MatchingError::NotRequestOwner)
        ));
        assert!(matches!(
            service.update_status(999, MENTOR, Decision::Accepted),
            Err(MatchingError::NotFound)
        ));
    }

    #[test]
    fn test_terminal_states_cannot_transition() {
        let mut service = service();

        let request_id = service.create(MENTEE, MENTOR, None).unwrap();
        service
            .update_status(request_id, MENTOR, Decision::Accepted)
            .unwrap();

        assert!(matches!(
            service.update_status(request_id, MENTOR, Decision::Rejected),
            Err(MatchingError::NotPending)
        ));
        assert!(matches!(
            service.update_status(request_id, MENTOR, Decision::Accepted),
            Err(MatchingError::NotPending)
        ));
    }

    #[test]
    fn test_delete_requires_owning_mentee() {
        let mut service = service();

        let request_id = service.create(MENTEE, MENTOR, None).unwrap();

        assert!(matches!(
            service.delete(request_id, OTHER_MENTEE),
            Err(MatchingError::NotRequestOwner)
        ));
        assert!(matches!(
            service.delete(999, MENTEE),
            Err(MatchingError::NotFound)
        ));

        service.delete(request_id, MENTEE).unwrap();
        assert!(service.store.get_request(request_id).unwrap().is_none());
    }

    #[test]
    fn test_delete_allowed_in_terminal_status() {
        let mut service = service();

        let request_id = service.create(MENTEE, MENTOR, None).unwrap();
        service
            .update_status(request_id, MENTOR, Decision::Accepted)
            .unwrap();

        service.delete(request_id, MENTEE).unwrap();
        assert!(service.store.get_request(request_id).unwrap().is_none());
    }

    #[test]
    fn test_list_for_mentee_is_enriched_and_newest_first() {
        let mut service = MatchingService::new(
            MemStore::default()
                .with_user(MENTEE, UserRole::Mentee, "Mentee One")
                .with_user(MENTOR, UserRole::Mentor, "Mentor One")
                .with_user(OTHER_MENTOR, UserRole::Mentor, "Mentor Two")
                .with_mentor_profile(
                    MENTOR,
                    Some("Ten years of backend work"),
                    Some(r#"["Rust","PostgreSQL"]"#),
                ),
        );

        let first = service.create(MENTEE, MENTOR, Some("hello")).unwrap();
        service
            .update_status(first, MENTOR, Decision::Rejected)
            .unwrap();
        let second = service.create(MENTEE, OTHER_MENTOR, None).unwrap();

        let list = service.list_for_mentee(MENTEE).unwrap();
        assert_eq!(list.len(), 2);

        // Newest first
        assert_eq!(list[0].id, second);
        assert_eq!(list[1].id, first);

        assert_eq!(list[1].mentor_name, "Mentor One");
        assert_eq!(list[1].mentor_bio, "Ten years of backend work");
        assert_eq!(list[1].mentor_skills, vec!["Rust", "PostgreSQL"]);
        assert_eq!(list[1].status, RequestStatus::Rejected);

        // Mentor Two has no bio or skills
        assert_eq!(list[0].mentor_bio, "");
        assert!(list[0].mentor_skills.is_empty());
    }

    #[test]
    fn test_list_for_mentor_shows_mentee_fields() {
        let mut service = service();

        service.create(MENTEE, MENTOR, Some("pick me")).unwrap();
        service.create(OTHER_MENTEE, MENTOR, None).unwrap();

        let list = service.list_for_mentor(MENTOR).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].mentee_name, "Mentee One");
        assert_eq!(list[1].message, "pick me");

        assert!(service.list_for_mentor(OTHER_MENTOR).unwrap().is_empty());
    }

    #[test]
    fn test_decode_skills_tolerates_bad_encodings() {
        assert!(decode_skills(None).is_empty());
        assert!(decode_skills(Some("")).is_empty());
        assert!(decode_skills(Some("not json")).is_empty());
        assert!(decode_skills(Some(r#"{"a":1}"#)).is_empty());
        assert_eq!(decode_skills(Some(r#"["Go"]"#)), vec!["Go"]);
    }
}
