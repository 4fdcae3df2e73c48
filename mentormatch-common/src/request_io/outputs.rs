use chrono::NaiveDateTime;
use serde::Serialize;

use crate::models::matching_request::RequestStatus;
use crate::models::user::UserRole;

#[derive(Clone, Debug, Serialize)]
pub struct OutputMessage {
    pub message: &'static str,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputSignup {
    pub message: &'static str,
    #[serde(rename = "userId")]
    pub user_id: i32,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputSignInToken {
    pub token: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputProfileDetails {
    pub name: String,
    pub bio: String,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    pub skills: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputUserProfile {
    pub id: i32,
    pub email: String,
    pub role: UserRole,
    pub profile: OutputProfileDetails,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputImageUploaded {
    pub message: &'static str,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputMentor {
    pub id: i32,
    pub name: String,
    pub bio: String,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    pub skills: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputRequestCreated {
    pub message: &'static str,
    #[serde(rename = "requestId")]
    pub request_id: i32,
}

/// A mentee's view of a request, joined with the target mentor's public
/// profile fields.
#[derive(Clone, Debug, Serialize)]
pub struct OutputMenteeRequest {
    pub id: i32,
    pub mentee_id: i32,
    pub mentor_id: i32,
    pub message: String,
    pub status: RequestStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub mentor_name: String,
    pub mentor_bio: String,
    pub mentor_skills: Vec<String>,
}

/// A mentor's view of a request, joined with the sending mentee's public
/// profile fields.
#[derive(Clone, Debug, Serialize)]
pub struct OutputMentorRequest {
    pub id: i32,
    pub mentee_id: i32,
    pub mentor_id: i32,
    pub message: String,
    pub status: RequestStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub mentee_name: String,
    pub mentee_bio: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputRequestDecided {
    pub message: String,
}
