use actix_web::web::*;

use crate::handlers::auth;

use super::RouteLimiters;

pub fn configure(cfg: &mut ServiceConfig, limiters: RouteLimiters) {
    cfg.service(
        resource("/signup").route(post().to(auth::create_user).wrap(limiters.signup)),
    )
    .service(resource("/login").route(post().to(auth::sign_in).wrap(limiters.sign_in)));
}
