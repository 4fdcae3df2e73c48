use actix_web::web::*;

use crate::handlers::user;

use super::RouteLimiters;

pub fn configure(cfg: &mut ServiceConfig, limiters: RouteLimiters) {
    cfg.service(
        resource("/me")
            .route(get().to(user::get_me).wrap(limiters.general.clone()))
            .route(put().to(user::edit_me).wrap(limiters.general.clone())),
    )
    .service(
        resource("/me/image").route(post().to(user::upload_image).wrap(limiters.general.clone())),
    )
    .service(
        resource("/images/{role}/{user_id}")
            .route(get().to(user::get_image).wrap(limiters.general)),
    );
}
