use std::{
    collections::HashMap,
    future::{ready, Ready},
    net::{IpAddr, SocketAddr, SocketAddrV4},
    sync::Mutex,
    time::{Duration, Instant},
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorTooManyRequests,
};
use futures::future::LocalBoxFuture;
use tokio::sync::RwLock;

#[derive(Debug)]
struct LimiterEntry {
    count: u64,
    window_start: Instant,
}

struct LimiterTable {
    map: HashMap<IpAddr, Mutex<LimiterEntry>>,
    last_clear: Instant,
}

/// Per-IP fixed-window rate limiting. The table is cleared periodically so it
/// cannot grow without bound.
#[derive(Clone)]
pub struct Limiter {
    max_per_period: u64,
    period: Duration,
    clear_frequency: Duration,
    table: &'static RwLock<LimiterTable>,
}

impl Limiter {
    /// Should be created on a single thread. Panics if period is greater than clear frequency.
    pub fn new(max_per_period: u64, period: Duration, clear_frequency: Duration) -> Self {
        if period > clear_frequency {
            panic!("Period cannot be greater than clear frequency");
        }

        let table = Box::leak(Box::new(RwLock::new(LimiterTable {
            map: HashMap::new(),
            last_clear: Instant::now(),
        })));

        Limiter {
            max_per_period,
            period,
            clear_frequency,
            table,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Limiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = LimiterMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LimiterMiddleware {
            service,

            max_per_period: self.max_per_period,
            period: self.period,
            clear_frequency: self.clear_frequency,

            table: self.table,
        }))
    }
}

pub struct LimiterMiddleware<S> {
    service: S,

    max_per_period: u64,
    period: Duration,
    clear_frequency: Duration,

    table: &'static RwLock<LimiterTable>,
}

impl<S, B> Service<ServiceRequest> for LimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let addr = if cfg!(test) {
            use actix_web::http::header::HeaderValue;
            use std::net::Ipv4Addr;
            use std::str::FromStr;

            let default_ip = HeaderValue::from_static("127.0.0.1");
            let test_ip = req
                .headers()
                .get("test-ip")
                .unwrap_or(&default_ip)
                .to_str()
                .unwrap();

            let test_ip = Ipv4Addr::from_str(test_ip).expect("Invalid test IP");
            SocketAddr::V4(SocketAddrV4::new(test_ip, 80))
        } else {
            // peer_addr() only returns None in a test
            req.peer_addr().expect("Address should always be available")
        };

        let ip = addr.ip();

        let req_fut = self.service.call(req);

        let max_per_period = self.max_per_period;
        let period = self.period;
        let clear_frequency = self.clear_frequency;
        let table = self.table;

        Box::pin(async move {
            let now = Instant::now();

            let found_ip = {
                // The read lock is intentionally scoped in this block to ensure it gets
                // dropped before the write lock is acquired
                let table = table.read().await;

                if let Some(entry) = table.map.get(&ip) {
                    let mut entry = entry.lock().expect("Lock should not be poisoned");

                    if entry.window_start + period < now {
                        entry.window_start = now;
                        entry.count = 1;
                    } else {
                        if entry.count >= max_per_period {
                            return Err(ErrorTooManyRequests(
                                "Too many requests. Please try again later.",
                            ));
                        }

                        entry.count += 1;
                    }

                    true
                } else {
                    false
                }
            };

            if !found_ip {
                let mut table = table.write().await;

                if now > table.last_clear + clear_frequency {
                    table.map.clear();
                    table.map.shrink_to_fit();
                    table.last_clear = now;
                }

                table
                    .map
                    .entry(ip)
                    .and_modify(|entry| {
                        // Was added by another thread before we acquired the lock; just
                        // increment the count
                        entry.get_mut().expect("Lock should not be poisoned").count += 1;
                    })
                    .or_insert_with(|| {
                        Mutex::new(LimiterEntry {
                            window_start: now,
                            count: 1,
                        })
                    });
            }

            req_fut.await
        })
    }
}
