pub mod auth;

mod limiter;

pub use limiter::Limiter;

use mentormatch_common::token::TokenError;

use actix_web::HttpRequest;

use crate::handlers::error::HttpErrorResponse;

pub trait TokenLocation {
    fn get_from_request<'a>(req: &'a HttpRequest) -> Option<&'a str>;
}

/// Extracts a bearer token from the `Authorization` header.
pub struct FromBearerHeader {}

impl TokenLocation for FromBearerHeader {
    fn get_from_request<'a>(req: &'a HttpRequest) -> Option<&'a str> {
        let header = req.headers().get("Authorization")?;
        let header = header.to_str().ok()?;
        header.strip_prefix("Bearer ")
    }
}

#[inline(always)]
fn into_actix_error_res<T>(result: Result<T, TokenError>) -> Result<T, HttpErrorResponse> {
    match result {
        Ok(t) => Ok(t),
        Err(TokenError::TokenInvalid) => Err(HttpErrorResponse::BadToken("Token is invalid")),
        Err(TokenError::TokenExpired) => Err(HttpErrorResponse::TokenExpired("Token is expired")),
        Err(TokenError::TokenMissing) => Err(HttpErrorResponse::TokenMissing("Token is missing")),
    }
}
