use mentormatch_common::db::{self, DbThreadPool};
use mentormatch_common::matching::{Decision, MatchingService};
use mentormatch_common::models::user::UserRole;
use mentormatch_common::request_io::{
    InputMatchingRequest, InputRequestDecision, OutputMessage, OutputRequestCreated,
    OutputRequestDecided,
};

use actix_web::{web, HttpResponse};

use crate::handlers::error::HttpErrorResponse;
use crate::middleware::auth::AuthenticatedUser;

const MENTEE_ROLE_REQUIRED_MSG: &str = "Access denied. mentee role required";
const MENTOR_ROLE_REQUIRED_MSG: &str = "Access denied. mentor role required";

pub async fn create_request(
    db_thread_pool: web::Data<DbThreadPool>,
    authenticated_user: AuthenticatedUser,
    request_data: web::Json<InputMatchingRequest>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if authenticated_user.user_role != UserRole::Mentee {
        return Err(HttpErrorResponse::UserDisallowed(MENTEE_ROLE_REQUIRED_MSG));
    }

    let request_data = request_data.into_inner();

    let request_id = web::block(move || {
        let mut service = MatchingService::new(db::matching::Dao::new(&db_thread_pool));
        service.create(
            authenticated_user.user_id,
            request_data.mentor_id,
            request_data.message.as_deref(),
        )
    })
    .await??;

    Ok(HttpResponse::Created().json(OutputRequestCreated {
        message: "Matching request created successfully",
        request_id,
    }))
}

/// Mentees see the requests they sent; mentors see the requests sent to them.
pub async fn get_requests(
    db_thread_pool: web::Data<DbThreadPool>,
    authenticated_user: AuthenticatedUser,
) -> Result<HttpResponse, HttpErrorResponse> {
    let response = match authenticated_user.user_role {
        UserRole::Mentee => {
            let requests = web::block(move || {
                let mut service = MatchingService::new(db::matching::Dao::new(&db_thread_pool));
                service.list_for_mentee(authenticated_user.user_id)
            })
            .await??;

            HttpResponse::Ok().json(requests)
        }
        UserRole::Mentor => {
            let requests = web::block(move || {
                let mut service = MatchingService::new(db::matching::Dao::new(&db_thread_pool));
                service.list_for_mentor(authenticated_user.user_id)
            })
            .await??;

            HttpResponse::Ok().json(requests)
        }
    };

    Ok(response)
}

pub async fn decide_request(
    db_thread_pool: web::Data<DbThreadPool>,
    authenticated_user: AuthenticatedUser,
    request_id: web::Path<i32>,
    decision_data: web::Json<InputRequestDecision>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if authenticated_user.user_role != UserRole::Mentor {
        return Err(HttpErrorResponse::UserDisallowed(MENTOR_ROLE_REQUIRED_MSG));
    }

    let request_id = request_id.into_inner();
    let decision = decision_data.status;

    let new_status = web::block(move || {
        let mut service = MatchingService::new(db::matching::Dao::new(&db_thread_pool));
        service.update_status(request_id, authenticated_user.user_id, decision)
    })
    .await??;

    Ok(HttpResponse::Ok().json(OutputRequestDecided {
        message: format!("Matching request {} successfully", new_status.as_str()),
    }))
}

pub async fn delete_request(
    db_thread_pool: web::Data<DbThreadPool>,
    authenticated_user: AuthenticatedUser,
    request_id: web::Path<i32>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if authenticated_user.user_role != UserRole::Mentee {
        return Err(HttpErrorResponse::UserDisallowed(MENTEE_ROLE_REQUIRED_MSG));
    }

    let request_id = request_id.into_inner();

    web::block(move || {
        let mut service = MatchingService::new(db::matching::Dao::new(&db_thread_pool));
        service.delete(request_id, authenticated_user.user_id)
    })
    .await??;

    Ok(HttpResponse::Ok().json(OutputMessage {
        message: "Matching request deleted successfully",
    }))
}
