use actix_web::web::*;

use crate::handlers::mentor;

use super::RouteLimiters;

pub fn configure(cfg: &mut ServiceConfig, limiters: RouteLimiters) {
    cfg.service(resource("/mentors").route(get().to(mentor::get_mentors).wrap(limiters.general)));
}
