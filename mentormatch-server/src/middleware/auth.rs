use mentormatch_common::db::{self, DbThreadPool};
use mentormatch_common::models::user::UserRole;
use mentormatch_common::token::auth_token::AuthToken;
use mentormatch_common::token::{Token, TokenError};

use actix_web::dev::Payload;
use actix_web::web::{self, Data};
use actix_web::{FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;

use crate::env;
use crate::handlers::error::HttpErrorResponse;
use crate::middleware::{into_actix_error_res, FromBearerHeader, TokenLocation};

/// The identity behind a verified access token. Extraction fails with a 401
/// when the token is missing, invalid, or expired, or when the user the token
/// refers to no longer exists.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: i32,
    pub user_email: String,
    pub user_role: UserRole,
}

impl FromRequest for AuthenticatedUser {
    type Error = HttpErrorResponse;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        // Tests declare the requester via a header, the same way the limiter
        // accepts a "test-ip" header, so handlers can be exercised without a
        // signed token or a live database
        #[cfg(test)]
        if let Some(identity) = req.headers().get("test-identity") {
            let identity = identity
                .to_str()
                .expect("Invalid test identity")
                .to_owned();

            return Box::pin(async move {
                let mut parts = identity.splitn(3, ',');

                let user_id = parts
                    .next()
                    .and_then(|p| p.parse().ok())
                    .expect("Invalid test identity");
                let user_email = parts.next().expect("Invalid test identity").to_owned();
                let user_role = parts
                    .next()
                    .and_then(|p| p.parse().ok())
                    .expect("Invalid test identity");

                Ok(AuthenticatedUser {
                    user_id,
                    user_email,
                    user_role,
                })
            });
        }

        let token = FromBearerHeader::get_from_request(req)
            .ok_or(TokenError::TokenMissing)
            .and_then(AuthToken::decode);

        let db_thread_pool = req
            .app_data::<Data<DbThreadPool>>()
            .map(|pool| pool.get_ref().clone());

        Box::pin(async move {
            let decoded = into_actix_error_res(token)?;
            let claims = into_actix_error_res(
                decoded
                    .verify(&env::CONF.token_signing_key)
                    .map(|c| c.clone()),
            )?;

            let Some(db_thread_pool) = db_thread_pool else {
                log::error!("DB thread pool was not registered with the app");
                return Err(HttpErrorResponse::InternalError("Internal server error"));
            };

            let mut user_dao = db::user::Dao::new(&db_thread_pool);
            let identity = match web::block(move || user_dao.get_identity(claims.user_id)).await? {
                Ok(i) => i,
                Err(e) => {
                    log::error!("{e}");
                    return Err(HttpErrorResponse::InternalError("Internal server error"));
                }
            };

            // A token for a deleted user is treated the same as a bad token
            let Some((user_id, user_email, user_role)) = identity else {
                return Err(HttpErrorResponse::BadToken("Token is invalid"));
            };

            Ok(AuthenticatedUser {
                user_id,
                user_email,
                user_role,
            })
        })
    }
}
