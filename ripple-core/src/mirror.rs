//! Best-effort replication of local collections to a remote database.
//!
//! The local files are always the source of truth. A sink hears about a
//! collection only after it was written locally, and whatever the sink does
//! (or fails to do) never changes the outcome of the local operation.

use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::MirrorConfig;
use crate::error::{RippleError, RippleResult};
use crate::store::Collection;

/// Receives every collection after a successful local write.
pub trait ReplicationSink: Send + Sync {
    fn replicate(&self, collection: Collection, records: &Value) -> RippleResult<()>;
}

/// Sink used when no mirror is configured.
pub struct NoMirror;

impl ReplicationSink for NoMirror {
    fn replicate(&self, _: Collection, _: &Value) -> RippleResult<()> {
        Ok(())
    }
}

/// Mirrors collections to a Firebase-style REST database by PUTting the
/// whole array to `<url>/<collection>.json`.
///
/// Requests run as detached tasks on the supplied runtime so the caller
/// never waits on the network. Each request is bounded by a fixed timeout;
/// outcomes are only logged. Concurrent replications of the same collection
/// are not ordered.
pub struct HttpMirror {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    runtime: Handle,
    tasks: Mutex<JoinSet<()>>,
}

impl HttpMirror {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration, runtime: Handle) -> Self {
        HttpMirror {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout: request_timeout,
            runtime,
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    pub fn from_config(config: &MirrorConfig, runtime: Handle) -> Self {
        Self::new(
            config.url.clone(),
            Duration::from_secs(config.timeout_secs),
            runtime,
        )
    }

    pub fn collection_url(&self, collection: Collection) -> String {
        format!(
            "{}/{}.json",
            self.base_url.trim_end_matches('/'),
            collection.name()
        )
    }

    /// Wait for in-flight replications, e.g. before a short-lived process
    /// exits.
    pub async fn drain(&self) {
        let mut tasks = match self.tasks.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(_) => return,
        };
        while tasks.join_next().await.is_some() {}
    }
}

impl ReplicationSink for HttpMirror {
    fn replicate(&self, collection: Collection, records: &Value) -> RippleResult<()> {
        let url = self.collection_url(collection);
        let request = self.client.put(&url).json(records);
        let limit = self.timeout;

        let mut tasks = self
            .tasks
            .lock()
            .map_err(|_| RippleError::Mirror("mirror task list poisoned".into()))?;
        while tasks.try_join_next().is_some() {}

        tasks.spawn_on(
            async move {
                match timeout(limit, request.send()).await {
                    Err(_) => warn!(%collection, %url, "mirror request timed out"),
                    Ok(Err(e)) => warn!(%collection, %url, error = %e, "mirror request failed"),
                    Ok(Ok(response)) if !response.status().is_success() => {
                        warn!(%collection, %url, status = %response.status(), "mirror rejected update")
                    }
                    Ok(Ok(_)) => debug!(%collection, %url, "mirrored collection"),
                }
            },
            &self.runtime,
        );
        Ok(())
    }
}
