//! Connection pool for node daemon clients.
//!
//! Keyed by node ID with at most one live connection per node. A single
//! writer lock guards the map; readers take a snapshot of the `Arc` and
//! never block each other. Backpressure is a per-node in-flight semaphore:
//! when it is exhausted the caller gets `ResourceExhausted` instead of an
//! unbounded queue.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{Error, Result};

use super::{DaemonClient, DaemonClientFactory};

/// Default per-node in-flight request limit.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 32;

/// One pooled daemon connection.
pub struct PooledDaemon {
    pub node_id: Uuid,
    pub address: String,
    client: Arc<dyn DaemonClient>,
    in_flight: Arc<Semaphore>,
}

impl PooledDaemon {
    pub fn client(&self) -> &Arc<dyn DaemonClient> {
        &self.client
    }

    /// Take an in-flight slot. Fails fast with `ResourceExhausted` when the
    /// node already has the maximum number of requests outstanding.
    pub fn try_acquire(&self) -> Result<OwnedSemaphorePermit> {
        self.in_flight.clone().try_acquire_owned().map_err(|_| {
            Error::ResourceExhausted(format!(
                "node {} has too many in-flight daemon requests",
                self.node_id
            ))
        })
    }
}

/// Process-wide pool of daemon connections, keyed by node ID.
pub struct DaemonPool {
    clients: RwLock<HashMap<Uuid, Arc<PooledDaemon>>>,
    factory: Arc<dyn DaemonClientFactory>,
    max_in_flight: usize,
}

impl DaemonPool {
    pub fn new(factory: Arc<dyn DaemonClientFactory>, max_in_flight: usize) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            factory,
            max_in_flight,
        }
    }

    /// Connect to a node's daemon. Idempotent: an existing connection for
    /// the node is returned as-is unless the address changed, in which case
    /// the stale connection is replaced.
    pub async fn connect(&self, node_id: Uuid, address: &str) -> Result<Arc<PooledDaemon>> {
        if let Some(existing) = self.get(node_id) {
            if existing.address == address {
                return Ok(existing);
            }
            debug!(
                node_id = %node_id,
                old = %existing.address,
                new = %address,
                "Node address changed, reconnecting"
            );
        }

        // Dial outside the lock; connection setup can be slow.
        let client = self.factory.connect(address).await?;
        let pooled = Arc::new(PooledDaemon {
            node_id,
            address: address.to_string(),
            client,
            in_flight: Arc::new(Semaphore::new(self.max_in_flight)),
        });

        let mut clients = self
            .clients
            .write()
            .map_err(|_| Error::Internal("daemon pool lock poisoned".to_string()))?;
        // A racing connect for the same address wins; keep its semaphore so
        // in-flight accounting is not reset.
        if let Some(existing) = clients.get(&node_id) {
            if existing.address == address {
                return Ok(existing.clone());
            }
        }
        clients.insert(node_id, pooled.clone());
        info!(node_id = %node_id, address = %address, "🔌 Daemon connection pooled");
        Ok(pooled)
    }

    /// The cached connection for a node, if any.
    pub fn get(&self, node_id: Uuid) -> Option<Arc<PooledDaemon>> {
        self.clients.read().ok()?.get(&node_id).cloned()
    }

    /// Cached connection or a fresh dial to `address`.
    pub async fn get_or_connect(&self, node_id: Uuid, address: &str) -> Result<Arc<PooledDaemon>> {
        match self.get(node_id) {
            Some(pooled) if pooled.address == address => Ok(pooled),
            _ => self.connect(node_id, address).await,
        }
    }

    /// Drop a node's connection (after decommission).
    pub fn disconnect(&self, node_id: Uuid) {
        if let Ok(mut clients) = self.clients.write() {
            if clients.remove(&node_id).is_some() {
                info!(node_id = %node_id, "🔌❌ Daemon connection dropped");
            }
        }
    }

    /// Close every connection. Called on shutdown; transports close when the
    /// last reference drops.
    pub fn close_all(&self) {
        if let Ok(mut clients) = self.clients.write() {
            let count = clients.len();
            clients.clear();
            info!(connections = count, "🌙 Daemon pool closed");
        }
    }

    pub fn len(&self) -> usize {
        self.clients.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daemon::MockDaemonClientFactory;

    fn pool() -> (Arc<MockDaemonClientFactory>, DaemonPool) {
        let factory = Arc::new(MockDaemonClientFactory::new());
        let pool = DaemonPool::new(factory.clone(), 2);
        (factory, pool)
    }

    #[tokio::test]
    async fn test_connect_is_idempotent() {
        let (_factory, pool) = pool();
        let node_id = Uuid::new_v4();

        let a = pool.connect(node_id, "10.0.0.1:9090").await.unwrap();
        let b = pool.connect(node_id, "10.0.0.1:9090").await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(pool.len(), 1);
    }

    #[tokio::test]
    async fn test_address_change_replaces_connection() {
        let (_factory, pool) = pool();
        let node_id = Uuid::new_v4();

        let a = pool.connect(node_id, "10.0.0.1:9090").await.unwrap();
        let b = pool.connect(node_id, "10.0.0.2:9090").await.unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(pool.get(node_id).unwrap().address, "10.0.0.2:9090");
        assert_eq!(pool.len(), 1);
    }

    #[tokio::test]
    async fn test_get_returns_none_for_unknown_node() {
        let (_factory, pool) = pool();
        assert!(pool.get(Uuid::new_v4()).is_none());
    }

    #[tokio::test]
    async fn test_in_flight_limit() {
        let (_factory, pool) = pool();
        let node_id = Uuid::new_v4();
        let pooled = pool.connect(node_id, "10.0.0.1:9090").await.unwrap();

        let _p1 = pooled.try_acquire().unwrap();
        let _p2 = pooled.try_acquire().unwrap();
        let err = pooled.try_acquire().unwrap_err();
        assert!(matches!(err, Error::ResourceExhausted(_)));

        drop(_p1);
        assert!(pooled.try_acquire().is_ok());
    }

    #[tokio::test]
    async fn test_close_all() {
        let (_factory, pool) = pool();
        pool.connect(Uuid::new_v4(), "10.0.0.1:9090").await.unwrap();
        pool.connect(Uuid::new_v4(), "10.0.0.2:9090").await.unwrap();
        assert_eq!(pool.len(), 2);

        pool.close_all();
        assert!(pool.is_empty());
    }
}
