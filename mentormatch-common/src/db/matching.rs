use chrono::Utc;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::{dsl, BoolExpressionMethods, ExpressionMethods, JoinOnDsl, OptionalExtension, QueryDsl, RunQueryDsl};

use crate::db::DbThreadPool;
use crate::matching::{MatchingStore, MenteeRequestRow, MentorRequestRow, StoreError};
use crate::models::matching_request::{MatchingRequest, NewMatchingRequest, RequestStatus};
use crate::models::user::UserRole;

use crate::schema::matching_requests as request_fields;
use crate::schema::matching_requests::dsl::matching_requests;
use crate::schema::users as user_fields;
use crate::schema::users::dsl::users;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }
}

/// Translates a unique violation on one of the matching_requests constraints
/// into the conflict it guards against. Other errors pass through unchanged.
fn map_constraint_violation(error: DieselError) -> StoreError {
    if let DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info) = error {
        match info.constraint_name() {
            Some("matching_requests_mentee_id_mentor_id_key") => {
                return StoreError::DuplicatePair;
            }
            Some("matching_requests_one_pending_per_mentee") => {
                return StoreError::MenteeHasPending;
            }
            Some("matching_requests_one_accepted_per_mentor") => {
                return StoreError::MentorHasAccepted;
            }
            _ => (),
        }
    }

    StoreError::from(error)
}

impl MatchingStore for Dao {
    fn user_role(&mut self, user_id: i32) -> Result<Option<UserRole>, StoreError> {
        let mut db_connection = self.db_thread_pool.get()?;

        Ok(users
            .select(user_fields::role)
            .find(user_id)
            .first::<UserRole>(&mut db_connection)
            .optional()?)
    }

    fn mentee_has_pending(&mut self, mentee_id: i32) -> Result<bool, StoreError> {
        let mut db_connection = self.db_thread_pool.get()?;

        Ok(diesel::select(dsl::exists(
            matching_requests.filter(
                request_fields::mentee_id
                    .eq(mentee_id)
                    .and(request_fields::status.eq(RequestStatus::Pending)),
            ),
        ))
        .get_result(&mut db_connection)?)
    }

    fn mentor_has_accepted(&mut self, mentor_id: i32) -> Result<bool, StoreError> {
        let mut db_connection = self.db_thread_pool.get()?;

        Ok(diesel::select(dsl::exists(
            matching_requests.filter(
                request_fields::mentor_id
                    .eq(mentor_id)
                    .and(request_fields::status.eq(RequestStatus::Accepted)),
            ),
        ))
        .get_result(&mut db_connection)?)
    }

    fn insert_request(
        &mut self,
        mentee_id: i32,
        mentor_id: i32,
        message: &str,
    ) -> Result<i32, StoreError> {
        let current_time = Utc::now().naive_utc();

        let new_request = NewMatchingRequest {
            mentee_id,
            mentor_id,
            message,
            status: RequestStatus::Pending,
            created_at: current_time,
            updated_at: current_time,
        };

        let mut db_connection = self.db_thread_pool.get()?;

        dsl::insert_into(matching_requests)
            .values(&new_request)
            .returning(request_fields::id)
            .get_result::<i32>(&mut db_connection)
            .map_err(map_constraint_violation)
    }

    fn get_request(&mut self, request_id: i32) -> Result<Option<MatchingRequest>, StoreError> {
        let mut db_connection = self.db_thread_pool.get()?;

        Ok(matching_requests
            .find(request_id)
            .first::<MatchingRequest>(&mut db_connection)
            .optional()?)
    }

    fn set_request_status(
        &mut self,
        request_id: i32,
        status: RequestStatus,
    ) -> Result<(), StoreError> {
        let mut db_connection = self.db_thread_pool.get()?;

        dsl::update(matching_requests.find(request_id))
            .set((
                request_fields::status.eq(status),
                request_fields::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(&mut db_connection)
            .map_err(map_constraint_violation)?;

        Ok(())
    }

    fn delete_request(&mut self, request_id: i32) -> Result<(), StoreError> {
        let mut db_connection = self.db_thread_pool.get()?;

        dsl::delete(matching_requests.find(request_id)).execute(&mut db_connection)?;

        Ok(())
    }

    fn requests_for_mentee(&mut self, mentee_id: i32) -> Result<Vec<MenteeRequestRow>, StoreError> {
        let mut db_connection = self.db_thread_pool.get()?;

        Ok(matching_requests
            .inner_join(users.on(user_fields::id.eq(request_fields::mentor_id)))
            .filter(request_fields::mentee_id.eq(mentee_id))
            .select((
                request_fields::id,
                request_fields::mentee_id,
                request_fields::mentor_id,
                request_fields::message,
                request_fields::status,
                request_fields::created_at,
                request_fields::updated_at,
                user_fields::name,
                user_fields::bio,
                user_fields::skills,
            ))
            .order(request_fields::created_at.desc())
            .load::<MenteeRequestRow>(&mut db_connection)?)
    }

    fn requests_for_mentor(&mut self, mentor_id: i32) -> Result<Vec<MentorRequestRow>, StoreError> {
        let mut db_connection = self.db_thread_pool.get()?;

        Ok(matching_requests
            .inner_join(users.on(user_fields::id.eq(request_fields::mentee_id)))
            .filter(request_fields::mentor_id.eq(mentor_id))
            .select((
                request_fields::id,
                request_fields::mentee_id,
                request_fields::mentor_id,
                request_fields::message,
                request_fields::status,
                request_fields::created_at,
                request_fields::updated_at,
                user_fields::name,
                user_fields::bio,
            ))
            .order(request_fields::created_at.desc())
            .load::<MentorRequestRow>(&mut db_connection)?)
    }
}
