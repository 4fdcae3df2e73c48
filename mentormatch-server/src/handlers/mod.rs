pub mod auth;
pub mod matching;
pub mod mentor;
pub mod user;

pub mod error {
    use mentormatch_common::matching::MatchingError;
    use mentormatch_common::token::TokenError;

    use actix_web::http::{header, StatusCode};
    use actix_web::{HttpResponse, HttpResponseBuilder};
    use serde::Serialize;
    use std::fmt;
    use tokio::sync::oneshot;

    #[derive(Debug)]
    pub enum HttpErrorResponse {
        // 400
        IncorrectlyFormed(&'static str),
        InvalidState(&'static str),

        // 401
        IncorrectCredential(&'static str),
        BadToken(&'static str),
        TokenExpired(&'static str),
        TokenMissing(&'static str),

        // 403
        UserDisallowed(&'static str),

        // 404
        DoesNotExist(&'static str),

        // 409
        ConflictWithExisting(&'static str),

        // 413
        InputTooLarge(&'static str),

        // 500
        InternalError(&'static str),
    }

    impl HttpErrorResponse {
        fn message(&self) -> &'static str {
            match self {
                HttpErrorResponse::IncorrectlyFormed(msg)
                | HttpErrorResponse::InvalidState(msg)
                | HttpErrorResponse::IncorrectCredential(msg)
                | HttpErrorResponse::BadToken(msg)
                | HttpErrorResponse::TokenExpired(msg)
                | HttpErrorResponse::TokenMissing(msg)
                | HttpErrorResponse::UserDisallowed(msg)
                | HttpErrorResponse::DoesNotExist(msg)
                | HttpErrorResponse::ConflictWithExisting(msg)
                | HttpErrorResponse::InputTooLarge(msg)
                | HttpErrorResponse::InternalError(msg) => msg,
            }
        }
    }

    #[derive(Serialize)]
    struct ErrorBody {
        error: &'static str,
    }

    impl std::error::Error for HttpErrorResponse {}

    impl fmt::Display for HttpErrorResponse {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.message())
        }
    }

    impl actix_web::error::ResponseError for HttpErrorResponse {
        fn error_response(&self) -> HttpResponse {
            HttpResponseBuilder::new(self.status_code())
                .insert_header((header::CONTENT_TYPE, "application/json"))
                .json(ErrorBody {
                    error: self.message(),
                })
        }

        fn status_code(&self) -> StatusCode {
            match *self {
                HttpErrorResponse::IncorrectlyFormed(_) | HttpErrorResponse::InvalidState(_) => {
                    StatusCode::BAD_REQUEST
                }
                HttpErrorResponse::IncorrectCredential(_)
                | HttpErrorResponse::BadToken(_)
                | HttpErrorResponse::TokenExpired(_)
                | HttpErrorResponse::TokenMissing(_) => StatusCode::UNAUTHORIZED,
                HttpErrorResponse::UserDisallowed(_) => StatusCode::FORBIDDEN,
                HttpErrorResponse::DoesNotExist(_) => StatusCode::NOT_FOUND,
                HttpErrorResponse::ConflictWithExisting(_) => StatusCode::CONFLICT,
                HttpErrorResponse::InputTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
                HttpErrorResponse::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl From<actix_web::error::BlockingError> for HttpErrorResponse {
        fn from(_err: actix_web::error::BlockingError) -> Self {
            HttpErrorResponse::InternalError("Actix thread pool failure")
        }
    }

    impl From<oneshot::error::RecvError> for HttpErrorResponse {
        fn from(_err: oneshot::error::RecvError) -> Self {
            HttpErrorResponse::InternalError("Rayon thread pool failure")
        }
    }

    impl From<TokenError> for HttpErrorResponse {
        fn from(err: TokenError) -> Self {
            match err {
                TokenError::TokenInvalid => HttpErrorResponse::BadToken("Invalid token"),
                TokenError::TokenExpired => HttpErrorResponse::TokenExpired("Token expired"),
                TokenError::TokenMissing => HttpErrorResponse::TokenMissing("Missing token"),
            }
        }
    }

    impl From<MatchingError> for HttpErrorResponse {
        fn from(err: MatchingError) -> Self {
            match err {
                MatchingError::InvalidMentor => {
                    HttpErrorResponse::IncorrectlyFormed("Invalid mentor")
                }
                MatchingError::PendingRequestExists => HttpErrorResponse::ConflictWithExisting(
                    "You already have a pending matching request",
                ),
                MatchingError::DuplicatePair => HttpErrorResponse::ConflictWithExisting(
                    "You have already sent a request to this mentor",
                ),
                MatchingError::AlreadyMatched => HttpErrorResponse::ConflictWithExisting(
                    "You already have an accepted matching request",
                ),
                MatchingError::NotFound => {
                    HttpErrorResponse::DoesNotExist("Matching request not found")
                }
                MatchingError::NotRequestOwner => HttpErrorResponse::UserDisallowed("Access denied"),
                MatchingError::NotPending => {
                    HttpErrorResponse::InvalidState("Request is no longer pending")
                }
                MatchingError::Store(e) => {
                    log::error!("{e}");
                    HttpErrorResponse::InternalError("Internal server error")
                }
            }
        }
    }
}
