use anyhow::{Result, bail};
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::counter;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::error::ApiError;

const ONE_HOUR: Duration = Duration::from_secs(60 * 60);
const ONE_DAY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy)]
struct Quota {
    name: &'static str,
    limit: u32,
    period: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

impl Window {
    fn expired(&self, period: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.started) >= period
    }
}

/// Per-address fixed-window quotas. A request passes only if every quota admits it,
/// and a refused request consumes nothing.
#[derive(Clone)]
pub struct AddressRateLimiter {
    quotas: Arc<[Quota]>,
    usage: Arc<Mutex<HashMap<IpAddr, Vec<Window>>>>,
}

impl AddressRateLimiter {
    pub fn new(config: &RateLimitConfig) -> Result<Self> {
        if config.per_hour == 0 {
            bail!("Invalid hourly rate limit");
        }
        if config.per_day == 0 {
            bail!("Invalid daily rate limit");
        }

        let quotas = [
            Quota {
                name: "per hour",
                limit: config.per_hour,
                period: ONE_HOUR,
            },
            Quota {
                name: "per day",
                limit: config.per_day,
                period: ONE_DAY,
            },
        ];

        Ok(Self {
            quotas: Arc::new(quotas),
            usage: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Counts one request for `address`, or names the first quota that refused it.
    pub fn check(&self, address: IpAddr) -> Result<(), &'static str> {
        let now = Instant::now();
        let mut usage = self.usage.lock();
        let windows = usage.entry(address).or_insert_with(|| {
            self.quotas
                .iter()
                .map(|_| Window {
                    started: now,
                    count: 0,
                })
                .collect()
        });

        for (quota, window) in self.quotas.iter().zip(windows.iter_mut()) {
            if window.expired(quota.period, now) {
                *window = Window {
                    started: now,
                    count: 0,
                };
            }
        }

        if let Some(quota) = self
            .quotas
            .iter()
            .zip(windows.iter())
            .find(|(quota, window)| window.count >= quota.limit)
            .map(|(quota, _)| quota)
        {
            return Err(quota.name);
        }

        for window in windows.iter_mut() {
            window.count += 1;
        }
        Ok(())
    }

    /// Drops addresses whose windows have all run out.
    pub fn retain_recent(&self) {
        let now = Instant::now();
        let quotas = &self.quotas;
        self.usage.lock().retain(|_, windows| {
            quotas
                .iter()
                .zip(windows.iter())
                .any(|(quota, window)| !window.expired(quota.period, now))
        });
    }

    pub fn tracked_addresses(&self) -> usize {
        self.usage.lock().len()
    }
}

fn client_address(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

pub async fn enforce(
    State(limiter): State<AddressRateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let address = client_address(&request);

    if let Err(quota) = limiter.check(address) {
        counter!("rate_limited_requests_total").increment(1);
        tracing::warn!(%address, quota, "Rate limit exceeded");
        return ApiError::RateLimited(quota).into_response();
    }

    next.run(request).await
}
