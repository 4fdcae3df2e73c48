use mentormatch_common::db::{self, DaoError, DbThreadPool};
use mentormatch_common::request_io::{InputCredentials, InputUser, OutputSignInToken, OutputSignup};
use mentormatch_common::token::auth_token::{AuthToken, NewAuthTokenClaims};
use mentormatch_common::validators::{self, Validity};

use actix_web::{web, HttpResponse};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::oneshot;
use zeroize::Zeroizing;

use crate::env;
use crate::handlers::error::HttpErrorResponse;

pub async fn create_user(
    db_thread_pool: web::Data<DbThreadPool>,
    user_data: web::Json<InputUser>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_data = user_data.into_inner();

    if let Validity::Invalid(_) = validators::validate_email_address(&user_data.email) {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            "Invalid email address",
        ));
    }

    if let Validity::Invalid(_) = validators::validate_password(&user_data.password) {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            "Password must be at least 8 characters long",
        ));
    }

    let name = user_data.name.trim();
    if name.is_empty() {
        return Err(HttpErrorResponse::IncorrectlyFormed("Name is required"));
    }
    let name = String::from(name);

    let password = Zeroizing::new(user_data.password);
    let (sender, receiver) = oneshot::channel();

    rayon::spawn(move || {
        let hash_result = argon2_kdf::Hasher::default()
            .algorithm(argon2_kdf::Algorithm::Argon2id)
            .salt_length(env::CONF.hash_salt_length)
            .hash_length(env::CONF.hash_length)
            .iterations(env::CONF.hash_iterations)
            .memory_cost_kib(env::CONF.hash_mem_cost_kib)
            .threads(env::CONF.hash_threads)
            .secret(argon2_kdf::Secret::using(&env::CONF.hashing_key))
            .hash(password.as_bytes())
            .map(|h| h.to_string());

        sender.send(hash_result).expect("Sending to channel failed");
    });

    let password_hash = match receiver.await? {
        Ok(h) => h,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to hash password",
            ));
        }
    };

    let mut user_dao = db::user::Dao::new(&db_thread_pool);
    let user_id = match web::block(move || {
        user_dao.create_user(&user_data.email, &password_hash, &name, user_data.role)
    })
    .await?
    {
        Ok(id) => id,
        Err(DaoError::QueryFailure(DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            _,
        ))) => {
            return Err(HttpErrorResponse::ConflictWithExisting("User already exists"));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError("Failed to create user"));
        }
    };

    Ok(HttpResponse::Created().json(OutputSignup {
        message: "User created successfully",
        user_id,
    }))
}

pub async fn sign_in(
    db_thread_pool: web::Data<DbThreadPool>,
    credentials: web::Json<InputCredentials>,
) -> Result<HttpResponse, HttpErrorResponse> {
    const INVALID_CREDENTIALS_MSG: &str = "Invalid credentials";

    let credentials = credentials.into_inner();

    if credentials.email.len() > 320 {
        return Err(HttpErrorResponse::IncorrectCredential(
            INVALID_CREDENTIALS_MSG,
        ));
    }

    let mut user_dao = db::user::Dao::new(&db_thread_pool);
    let user = match web::block(move || user_dao.get_user_by_email(&credentials.email)).await? {
        Ok(u) => u,
        Err(DaoError::QueryFailure(DieselError::NotFound)) => {
            // Indistinguishable from a wrong password to prevent user enumeration
            return Err(HttpErrorResponse::IncorrectCredential(
                INVALID_CREDENTIALS_MSG,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError("Failed to get user"));
        }
    };

    let password = Zeroizing::new(credentials.password);
    let password_hash = user.password_hash.clone();
    let (sender, receiver) = oneshot::channel();

    rayon::spawn(move || {
        let hash = match argon2_kdf::Hash::from_str(&password_hash) {
            Ok(h) => h,
            Err(e) => {
                sender.send(Err(e)).expect("Sending to channel failed");
                return;
            }
        };

        let does_password_match_hash = hash.verify_with_secret(
            password.as_bytes(),
            argon2_kdf::Secret::using(&env::CONF.hashing_key),
        );

        sender
            .send(Ok(does_password_match_hash))
            .expect("Sending to channel failed");
    });

    match receiver.await? {
        Ok(true) => (),
        Ok(false) => {
            return Err(HttpErrorResponse::IncorrectCredential(
                INVALID_CREDENTIALS_MSG,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to validate credentials",
            ));
        }
    };

    let expiration = (SystemTime::now() + env::CONF.access_token_lifetime)
        .duration_since(UNIX_EPOCH)
        .expect("Failed to fetch system time")
        .as_secs();

    let claims = NewAuthTokenClaims {
        user_id: user.id,
        user_email: &user.email,
        user_role: user.role,
        expiration,
    };

    let token = AuthToken::sign_new(claims, &env::CONF.token_signing_key);

    Ok(HttpResponse::Ok().json(OutputSignInToken { token }))
}
