use mentormatch_common::db::{self, DaoError, DbThreadPool};
use mentormatch_common::matching::decode_skills;
use mentormatch_common::models::user::UserRole;
use mentormatch_common::request_io::{
    InputEditProfile, OutputImageUploaded, OutputMessage, OutputProfileDetails, OutputUserProfile,
};

use actix_web::{web, HttpResponse};
use diesel::result::Error as DieselError;
use std::str::FromStr;

use crate::handlers::error::HttpErrorResponse;
use crate::middleware::auth::AuthenticatedUser;

const MAX_IMAGE_SIZE: usize = 1024 * 1024;

pub fn profile_image_url(user_id: i32, role: UserRole, has_image: bool) -> String {
    if has_image {
        format!("/api/images/{}/{}", role.as_str(), user_id)
    } else {
        format!("/public/images/default-{}.png", role.as_str())
    }
}

pub async fn get_me(
    db_thread_pool: web::Data<DbThreadPool>,
    authenticated_user: AuthenticatedUser,
) -> Result<HttpResponse, HttpErrorResponse> {
    let mut user_dao = db::user::Dao::new(&db_thread_pool);
    let user = match web::block(move || user_dao.get_user_by_id(authenticated_user.user_id)).await?
    {
        Ok(u) => u,
        Err(DaoError::QueryFailure(DieselError::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist("User not found"));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError("Failed to get user"));
        }
    };

    // Mentees never expose a skill list
    let skills = match user.role {
        UserRole::Mentor => decode_skills(user.skills.as_deref()),
        UserRole::Mentee => Vec::new(),
    };

    Ok(HttpResponse::Ok().json(OutputUserProfile {
        id: user.id,
        email: user.email,
        role: user.role,
        profile: OutputProfileDetails {
            name: user.name,
            bio: user.bio.unwrap_or_default(),
            image_url: profile_image_url(user.id, user.role, user.image_data.is_some()),
            skills,
        },
    }))
}

pub async fn edit_me(
    db_thread_pool: web::Data<DbThreadPool>,
    authenticated_user: AuthenticatedUser,
    profile_edits: web::Json<InputEditProfile>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let profile_edits = profile_edits.into_inner();

    let name = match profile_edits.name.as_deref().map(str::trim) {
        Some("") => return Err(HttpErrorResponse::IncorrectlyFormed("Name cannot be empty")),
        name => name.map(String::from),
    };

    // Only mentors have a skill list; a mentee's skills edit is ignored
    let skills_json = match (authenticated_user.user_role, profile_edits.skills) {
        (UserRole::Mentor, Some(skills)) => {
            Some(serde_json::to_string(&skills).expect("Serializing a string list cannot fail"))
        }
        _ => None,
    };

    let mut user_dao = db::user::Dao::new(&db_thread_pool);
    match web::block(move || {
        user_dao.update_profile(
            authenticated_user.user_id,
            name.as_deref(),
            profile_edits.bio.as_deref(),
            skills_json.as_deref(),
        )
    })
    .await?
    {
        Ok(()) => (),
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                "Failed to update profile",
            ));
        }
    };

    Ok(HttpResponse::Ok().json(OutputMessage {
        message: "Profile updated successfully",
    }))
}

pub async fn upload_image(
    db_thread_pool: web::Data<DbThreadPool>,
    authenticated_user: AuthenticatedUser,
    image_bytes: web::Bytes,
) -> Result<HttpResponse, HttpErrorResponse> {
    if image_bytes.is_empty() {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            "No image file provided",
        ));
    }

    if image_bytes.len() > MAX_IMAGE_SIZE {
        return Err(HttpErrorResponse::InputTooLarge(
            "Image must be 1MB or smaller",
        ));
    }

    let Some(image_type) = sniff_image_type(&image_bytes) else {
        return Err(HttpErrorResponse::IncorrectlyFormed("Invalid image format"));
    };

    let mut user_dao = db::user::Dao::new(&db_thread_pool);
    match web::block(move || {
        user_dao.set_profile_image(authenticated_user.user_id, &image_bytes, image_type)
    })
    .await?
    {
        Ok(()) => (),
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError("Failed to save image"));
        }
    };

    Ok(HttpResponse::Ok().json(OutputImageUploaded {
        message: "Image uploaded successfully",
        image_url: profile_image_url(
            authenticated_user.user_id,
            authenticated_user.user_role,
            true,
        ),
    }))
}

pub async fn get_image(
    db_thread_pool: web::Data<DbThreadPool>,
    path: web::Path<(String, i32)>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let (role, user_id) = path.into_inner();

    let Ok(role) = UserRole::from_str(&role) else {
        return Err(HttpErrorResponse::IncorrectlyFormed("Invalid role"));
    };

    let mut user_dao = db::user::Dao::new(&db_thread_pool);
    let image = match web::block(move || user_dao.get_profile_image(user_id)).await? {
        Ok(i) => i,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError("Failed to get image"));
        }
    };

    let (user_role, image_data, image_type) = match image {
        Some(i) => i,
        None => return Err(HttpErrorResponse::DoesNotExist("User not found")),
    };

    if user_role != role {
        return Err(HttpErrorResponse::DoesNotExist("User not found"));
    }

    let (Some(image_data), Some(image_type)) = (image_data, image_type) else {
        return Err(HttpErrorResponse::DoesNotExist("Image not found"));
    };

    Ok(HttpResponse::Ok()
        .content_type(image_type)
        .body(image_data))
}

/// Checks the leading magic bytes. Only PNG and JPEG uploads are accepted.
fn sniff_image_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_image_type() {
        assert_eq!(
            sniff_image_type(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A]),
            Some("image/png")
        );
        assert_eq!(
            sniff_image_type(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Some("image/jpeg")
        );
        assert_eq!(sniff_image_type(b"GIF89a"), None);
        assert_eq!(sniff_image_type(&[]), None);
        assert_eq!(sniff_image_type(&[0x89]), None);
    }

    #[test]
    fn test_profile_image_url() {
        assert_eq!(
            profile_image_url(7, UserRole::Mentor, true),
            "/api/images/mentor/7"
        );
        assert_eq!(
            profile_image_url(7, UserRole::Mentee, false),
            "/public/images/default-mentee.png"
        );
    }
}
