use actix_web::web::*;

use crate::handlers::matching;

use super::RouteLimiters;

pub fn configure(cfg: &mut ServiceConfig, limiters: RouteLimiters) {
    cfg.service(
        scope("/matching-requests")
            .service(
                resource("")
                    .route(
                        post()
                            .to(matching::create_request)
                            .wrap(limiters.general.clone()),
                    )
                    .route(
                        get()
                            .to(matching::get_requests)
                            .wrap(limiters.general.clone()),
                    ),
            )
            .service(
                resource("/{request_id}")
                    .route(
                        put()
                            .to(matching::decide_request)
                            .wrap(limiters.general.clone()),
                    )
                    .route(
                        delete()
                            .to(matching::delete_request)
                            .wrap(limiters.general),
                    ),
            ),
    );
}
