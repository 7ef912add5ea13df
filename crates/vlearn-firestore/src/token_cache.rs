//! OAuth token caching for Firestore requests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use gcp_auth::TokenProvider;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{FirestoreError, FirestoreResult};

const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

/// Refresh this long before the deadline so an in-flight request never
/// carries a token that expires mid-request.
const REFRESH_AHEAD: Duration = Duration::from_secs(60);

/// Lifetime assumed when the provider reports no usable expiry. Google
/// access tokens last about an hour.
const ASSUMED_LIFETIME: Duration = Duration::from_secs(50 * 60);

/// A cached access token and the instant it stops being served.
struct Lease {
    token: String,
    deadline: Instant,
}

impl Lease {
    /// Enough life left to hand out without refreshing.
    fn is_fresh(&self, now: Instant) -> bool {
        self.deadline.saturating_duration_since(now) > REFRESH_AHEAD
    }

    /// Not yet past the deadline; acceptable only when a refresh failed.
    fn is_usable(&self, now: Instant) -> bool {
        now < self.deadline
    }
}

/// Caches the Firestore access token and renews it ahead of expiry.
///
/// A single async mutex guards the lease across the refresh, so concurrent
/// callers wait for one fetch instead of racing the provider. When a refresh
/// fails, the previous token keeps being served until its real deadline.
pub struct TokenCache {
    provider: Arc<dyn TokenProvider>,
    lease: Mutex<Option<Lease>>,
}

impl TokenCache {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            provider,
            lease: Mutex::new(None),
        }
    }

    /// Drop the cached token; the next call fetches a new one.
    pub async fn invalidate(&self) {
        self.lease.lock().await.take();
    }

    /// Return an access token with at least [`REFRESH_AHEAD`] of life left.
    pub async fn get_token(&self) -> FirestoreResult<String> {
        let mut slot = self.lease.lock().await;
        let now = Instant::now();

        if let Some(lease) = slot.as_ref() {
            if lease.is_fresh(now) {
                return Ok(lease.token.clone());
            }
        }

        match self.fetch().await {
            Ok(lease) => {
                let token = lease.token.clone();
                *slot = Some(lease);
                debug!("Refreshed Firestore auth token");
                Ok(token)
            }
            Err(e) => {
                // Ride out a provider hiccup on the old token while it
                // still has life left
                if let Some(lease) = slot.as_ref() {
                    if lease.is_usable(now) {
                        warn!("Token refresh failed, reusing current token: {}", e);
                        return Ok(lease.token.clone());
                    }
                }
                Err(e)
            }
        }
    }

    async fn fetch(&self) -> FirestoreResult<Lease> {
        let token = self
            .provider
            .token(&[DATASTORE_SCOPE])
            .await
            .map_err(|e| {
                FirestoreError::auth_error(format!("Failed to obtain auth token: {}", e))
            })?;

        let now = Utc::now();
        let expires_at = token.expires_at();
        let lifetime = if expires_at > now {
            (expires_at - now).to_std().unwrap_or(ASSUMED_LIFETIME)
        } else {
            // Already expired per the provider; serve it to no one
            Duration::ZERO
        };

        Ok(Lease {
            token: token.as_str().to_string(),
            deadline: Instant::now() + lifetime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_lease_is_served() {
        let now = Instant::now();
        let lease = Lease {
            token: "t".to_string(),
            deadline: now + Duration::from_secs(600),
        };
        assert!(lease.is_fresh(now));
        assert!(lease.is_usable(now));
    }

    #[test]
    fn test_lease_near_deadline_triggers_refresh_but_stays_usable() {
        let now = Instant::now();
        let lease = Lease {
            token: "t".to_string(),
            deadline: now + REFRESH_AHEAD / 2,
        };
        assert!(!lease.is_fresh(now));
        assert!(lease.is_usable(now));
    }

    #[test]
    fn test_expired_lease_is_neither_fresh_nor_usable() {
        let now = Instant::now();
        let lease = Lease {
            token: "t".to_string(),
            deadline: now,
        };
        assert!(!lease.is_fresh(now));
        assert!(!lease.is_usable(now));
    }
}
