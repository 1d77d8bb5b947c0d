use std::{
    env,
    net::IpAddr,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use rocket::{
    http::Status,
    request::{self, FromRequest, Request},
};
use tracing::{debug, instrument, warn};

#[derive(Debug)]
pub struct TokenBucket {
    last_refill: Instant,
    tokens: u32,
    capacity: u32,
    refill_rate: u32,
    refill_interval: Duration,
}

impl TokenBucket {
    fn new(capacity: u32, refill_rate: u32, refill_interval: Duration) -> Self {
        debug!(
            "Creating new token bucket: capacity={}, refill_rate={}, interval={}s",
            capacity,
            refill_rate,
            refill_interval.as_secs()
        );
        Self {
            last_refill: Instant::now(),
            tokens: capacity,
            capacity,
            refill_rate,
            refill_interval,
        }
    }

    fn try_consume(&mut self) -> bool {
        self.refill();
        if self.tokens > 0 {
            self.tokens -= 1;
            debug!("Token consumed, remaining: {}", self.tokens);
            true
        } else {
            debug!("No tokens available for consumption");
            false
        }
    }

    fn refill(&mut self) {
        let elapsed = self.last_refill.elapsed();
        let intervals = elapsed.as_millis() / self.refill_interval.as_millis().max(1);

        if intervals > 0 {
            let old_tokens = self.tokens;
            let tokens_to_add = u32::try_from(intervals)
                .unwrap_or(u32::MAX)
                .saturating_mul(self.refill_rate);
            self.tokens = self.tokens.saturating_add(tokens_to_add).min(self.capacity);
            self.last_refill = Instant::now();
            if self.tokens != old_tokens {
                debug!(
                    "Token bucket refilled: {} -> {} tokens",
                    old_tokens, self.tokens
                );
            }
        }
    }
}

/// Per-client token buckets limiting how fast scores can be submitted.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<IpAddr, TokenBucket>,
    capacity: u32,
    refill_interval: Duration,
}

impl RateLimiter {
    /// Allows `capacity` submissions per `refill_interval`, refilled in full each interval.
    pub fn new(capacity: u32, refill_interval: Duration) -> Self {
        Self {
            buckets: DashMap::new(),
            capacity,
            refill_interval,
        }
    }

    pub fn from_env() -> Self {
        let capacity: u32 = env::var("RATE_LIMIT_SUBMISSIONS_PER_MINUTE")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        Self::new(capacity, Duration::from_secs(60))
    }

    #[instrument(level = "trace", skip(self))]
    pub fn check(&self, ip: &IpAddr) -> Result<(), Status> {
        let mut entry = self.buckets.entry(*ip).or_insert_with(|| {
            TokenBucket::new(self.capacity, self.capacity, self.refill_interval)
        });

        if entry.try_consume() {
            debug!("Rate limit check passed for {}", ip);
            Ok(())
        } else {
            warn!("Rate limit exceeded for {} - rejecting request", ip);
            Err(Status::TooManyRequests)
        }
    }
}

/// Address of the caller, honouring reverse-proxy headers.
pub struct ClientIp(pub IpAddr);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientIp {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let ip = req
            .headers()
            .get_one("X-Forwarded-For")
            .and_then(|header| header.split(',').next())
            .and_then(|ip| ip.trim().parse().ok())
            .or_else(|| {
                req.headers()
                    .get_one("X-Real-IP")
                    .and_then(|ip| ip.trim().parse().ok())
            })
            .or_else(|| req.client_ip())
            .unwrap_or(IpAddr::from([127, 0, 0, 1]));

        request::Outcome::Success(ClientIp(ip))
    }
}
