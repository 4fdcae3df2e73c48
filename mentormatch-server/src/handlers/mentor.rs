use mentormatch_common::db::{self, DbThreadPool};
use mentormatch_common::matching::decode_skills;
use mentormatch_common::models::user::{User, UserRole};
use mentormatch_common::request_io::{InputMentorQuery, MentorSortField, OutputMentor, SortOrder};

use actix_web::{web, HttpResponse};

use crate::handlers::error::HttpErrorResponse;
use crate::handlers::user::profile_image_url;
use crate::middleware::auth::AuthenticatedUser;

pub async fn get_mentors(
    db_thread_pool: web::Data<DbThreadPool>,
    authenticated_user: AuthenticatedUser,
    query: web::Query<InputMentorQuery>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if authenticated_user.user_role != UserRole::Mentee {
        return Err(HttpErrorResponse::UserDisallowed(
            "Access denied. mentee role required",
        ));
    }

    let mut user_dao = db::user::Dao::new(&db_thread_pool);
    let mentors = match web::block(move || user_dao.get_mentors()).await? {
        Ok(m) => m,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError("Failed to get mentors"));
        }
    };

    let query = query.into_inner();
    let mentors = shape_mentor_list(
        mentors,
        query.skill.as_deref(),
        query.sort_by.unwrap_or(MentorSortField::Name),
        query.sort_order.unwrap_or(SortOrder::Asc),
    );

    Ok(HttpResponse::Ok().json(mentors))
}

fn shape_mentor_list(
    mentors: Vec<User>,
    skill_filter: Option<&str>,
    sort_by: MentorSortField,
    sort_order: SortOrder,
) -> Vec<OutputMentor> {
    let mut mentors: Vec<OutputMentor> = mentors
        .into_iter()
        .map(|mentor| OutputMentor {
            id: mentor.id,
            name: mentor.name,
            bio: mentor.bio.unwrap_or_default(),
            image_url: profile_image_url(mentor.id, UserRole::Mentor, mentor.image_data.is_some()),
            skills: decode_skills(mentor.skills.as_deref()),
        })
        .collect();

    if let Some(skill) = skill_filter {
        let skill = skill.to_lowercase();
        mentors.retain(|mentor| {
            mentor
                .skills
                .iter()
                .any(|s| s.to_lowercase().contains(&skill))
        });
    }

    mentors.sort_by(|a, b| {
        let ordering = match sort_by {
            MentorSortField::Name => a.name.cmp(&b.name),
            MentorSortField::Skills => a.skills.join(", ").cmp(&b.skills.join(", ")),
        };

        match sort_order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });

    mentors
}
