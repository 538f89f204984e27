//! Background tasks: idle-session eviction and the keep-alive self-ping.
//!
//! Both run on fixed intervals independent of request handling and are
//! cancelled at shutdown. Neither is a correctness mechanism: eviction only
//! bounds memory, and the self-ping only keeps free-tier hosting awake.

use crate::session::SessionStore;
use chrono::Utc;
use cvgen_common::Config;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Handles to the spawned background loops.
pub struct BackgroundTasks {
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    /// Spawn the eviction sweep and, when a public URL is configured, the
    /// keep-alive self-ping.
    pub fn spawn(store: Arc<SessionStore>, config: &Config) -> Self {
        let mut handles = Vec::new();

        handles.push(spawn_eviction_loop(
            store,
            Duration::from_secs(config.session.evict_interval_secs),
            config.session.ttl_secs,
        ));

        if let Some(public_url) = config.server.public_url.clone() {
            handles.push(spawn_keepalive_loop(public_url));
        }

        Self { handles }
    }

    /// Cancel all background loops.
    pub fn shutdown(self) {
        for handle in self.handles {
            handle.abort();
        }
        tracing::info!("Background tasks stopped");
    }
}

fn spawn_eviction_loop(
    store: Arc<SessionStore>,
    interval: Duration,
    ttl_secs: u64,
) -> JoinHandle<()> {
    let ttl = chrono::Duration::seconds(ttl_secs as i64);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The immediate first tick has nothing to evict
        ticker.tick().await;

        tracing::info!(
            interval_secs = interval.as_secs(),
            ttl_secs,
            "Eviction sweep started"
        );

        loop {
            ticker.tick().await;
            store.evict_idle(Utc::now(), ttl);
        }
    })
}

fn spawn_keepalive_loop(public_url: String) -> JoinHandle<()> {
    // Render and similar hosts idle out after ~15 minutes without traffic
    const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(5 * 60);

    tokio::spawn(async move {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let url = format!("{}/api/ping", public_url.trim_end_matches('/'));
        let mut ticker = tokio::time::interval(KEEPALIVE_INTERVAL);
        ticker.tick().await;

        tracing::info!(url = %url, "Keep-alive self-ping started");

        loop {
            ticker.tick().await;
            match client.get(&url).send().await {
                Ok(response) => {
                    tracing::debug!(status = %response.status(), "Keep-alive ping sent");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Keep-alive ping failed");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Turn;

    #[tokio::test(start_paused = true)]
    async fn test_eviction_loop_sweeps_idle_sessions() {
        let store = Arc::new(SessionStore::new(6));
        let id = store.get_or_create(None);
        store.append_turn(&id, Turn::user("hello"));

        // TTL of zero: everything is stale by the next sweep
        let handle = spawn_eviction_loop(Arc::clone(&store), Duration::from_secs(1), 0);

        tokio::time::sleep(Duration::from_secs(3)).await;
        tokio::task::yield_now().await;

        assert!(store.is_empty());
        handle.abort();
    }

    #[tokio::test]
    async fn test_shutdown_aborts_handles() {
        let store = Arc::new(SessionStore::new(6));
        let config = Config::default();

        let tasks = BackgroundTasks::spawn(store, &config);
        tasks.shutdown();
    }
}
