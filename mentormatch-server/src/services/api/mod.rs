use std::time::Duration;

use actix_web::web::*;

use crate::middleware::Limiter;

mod auth;
mod matching;
mod mentor;
mod user;

#[derive(Clone)]
pub struct RouteLimiters {
    pub signup: Limiter,
    pub sign_in: Limiter,
    pub general: Limiter,
}

impl Default for RouteLimiters {
    fn default() -> Self {
        const CLEAR_FREQUENCY: Duration = Duration::from_secs(3600 * 24);

        Self {
            signup: Limiter::new(5, Duration::from_secs(1200), CLEAR_FREQUENCY),
            sign_in: Limiter::new(10, Duration::from_secs(600), CLEAR_FREQUENCY),
            general: Limiter::new(120, Duration::from_secs(60), CLEAR_FREQUENCY),
        }
    }
}

pub fn configure(cfg: &mut ServiceConfig, limiters: RouteLimiters) {
    cfg.service(
        scope("/api")
            .configure(|cfg| auth::configure(cfg, limiters.clone()))
            .configure(|cfg| user::configure(cfg, limiters.clone()))
            .configure(|cfg| mentor::configure(cfg, limiters.clone()))
            .configure(|cfg| matching::configure(cfg, limiters)),
    );
}
