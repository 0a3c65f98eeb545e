//! Cached session factory

use chrono::{DateTime, Utc};
use relay_client::Result as ClientResult;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{PlatformSession, SessionBuilder};

struct CachedSession {
    session: Arc<dyn PlatformSession>,
    created_at: DateTime<Utc>,
}

/// Lazily builds a session and hands it out while it stays valid
///
/// The cached session is probed on every call. An authentication-class probe
/// failure replaces it with a freshly built one; any other probe failure is
/// returned as-is and the cache is left untouched. The lock is held across
/// probe and rebuild, so concurrent callers wait for a rebuild to finish and
/// never see a half-built session. A failed rebuild leaves the cache empty.
pub struct SessionFactory {
    builder: Arc<dyn SessionBuilder>,
    cached: Mutex<Option<CachedSession>>,
}

impl SessionFactory {
    pub fn new(builder: Arc<dyn SessionBuilder>) -> Self {
        Self {
            builder,
            cached: Mutex::new(None),
        }
    }

    /// Returns a session that passed its validity probe
    pub async fn get_session(&self) -> ClientResult<Arc<dyn PlatformSession>> {
        let mut cached = self.cached.lock().await;

        if let Some(current) = cached.as_ref() {
            match current.session.probe().await {
                Ok(()) => {
                    debug!("Reusing cached platform session");
                    return Ok(Arc::clone(&current.session));
                }
                Err(e) if e.is_auth_error() => {
                    let age = Utc::now() - current.created_at;
                    info!(
                        age_secs = age.num_seconds(),
                        "Platform session no longer valid, rebuilding: {}", e
                    );
                }
                Err(e) => {
                    warn!("Platform session probe failed: {}", e);
                    return Err(e);
                }
            }
        }

        // Drop the stale session first so a failed rebuild leaves nothing cached
        *cached = None;

        let session = self.builder.build().await?;
        info!("Built new platform session");
        *cached = Some(CachedSession {
            session: Arc::clone(&session),
            created_at: Utc::now(),
        });

        Ok(session)
    }
}
