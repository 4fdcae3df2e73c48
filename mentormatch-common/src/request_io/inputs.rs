use serde::Deserialize;

use crate::matching::Decision;
use crate::models::user::UserRole;

#[derive(Clone, Debug, Deserialize)]
pub struct InputUser {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: UserRole,
}

#[derive(Clone, Debug, Deserialize)]
pub struct InputCredentials {
    pub email: String,
    pub password: String,
}

/// Fields left out of the request body are not modified.
#[derive(Clone, Debug, Deserialize)]
pub struct InputEditProfile {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub skills: Option<Vec<String>>,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum MentorSortField {
    Name,
    Skills,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Clone, Debug, Deserialize)]
pub struct InputMentorQuery {
    pub skill: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<MentorSortField>,
    #[serde(rename = "sortOrder")]
    pub sort_order: Option<SortOrder>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct InputMatchingRequest {
    pub mentor_id: i32,
    pub message: Option<String>,
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct InputRequestDecision {
    pub status: Decision,
}
