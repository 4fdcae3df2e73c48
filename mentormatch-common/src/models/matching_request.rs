use chrono::NaiveDateTime;
use diesel::deserialize::{self, FromSql};
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::schema::matching_requests;

/// Requests begin as `Pending`. `Accepted` and `Rejected` are terminal.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl ToSql<Text, Pg> for RequestStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for RequestStatus {
    fn from_sql(value: PgValue<'_>) -> deserialize::Result<Self> {
        match value.as_bytes() {
            b"pending" => Ok(RequestStatus::Pending),
            b"accepted" => Ok(RequestStatus::Accepted),
            b"rejected" => Ok(RequestStatus::Rejected),
            other => Err(format!(
                "Unrecognized request status: {}",
                String::from_utf8_lossy(other)
            )
            .into()),
        }
    }
}

#[derive(Clone, Debug, Identifiable, Queryable)]
#[diesel(table_name = matching_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MatchingRequest {
    pub id: i32,
    pub mentee_id: i32,
    pub mentor_id: i32,
    pub message: String,
    pub status: RequestStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = matching_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewMatchingRequest<'a> {
    pub mentee_id: i32,
    pub mentor_id: i32,
    pub message: &'a str,
    pub status: RequestStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
