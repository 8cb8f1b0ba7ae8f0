//! Swappable, lazily-built reference to the live retriever.
//!
//! At most one retriever instance is published at a time. Readers clone
//! the `Arc` under a short read lock and run retrieval without holding any
//! lock, so a reload never waits for in-flight retrieval and in-flight
//! retrieval keeps using the instance it started with. Construction is
//! serialized by a separate mutex so concurrent first callers build once.

use crate::retriever::{Retriever, RetrieverLoader};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

#[derive(Clone)]
enum Slot {
    /// Not built yet; the next `get()` attempts a build.
    Unloaded,
    Ready(Arc<dyn Retriever>),
    /// A build failed or a reload found no index; stays until `reload()`.
    Unavailable,
}

/// Owner of the current retriever instance.
pub struct RetrieverHandle {
    loader: Arc<dyn RetrieverLoader>,
    slot: RwLock<Slot>,
    build_lock: Mutex<()>,
}

impl std::fmt::Debug for RetrieverHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.slot.try_read().as_deref() {
            Ok(Slot::Unloaded) => "unloaded",
            Ok(Slot::Ready(_)) => "ready",
            Ok(Slot::Unavailable) => "unavailable",
            Err(_) => "locked",
        };
        f.debug_struct("RetrieverHandle")
            .field("state", &state)
            .finish()
    }
}

impl RetrieverHandle {
    pub fn new(loader: Arc<dyn RetrieverLoader>) -> Self {
        Self {
            loader,
            slot: RwLock::new(Slot::Unloaded),
            build_lock: Mutex::new(()),
        }
    }

    /// Current retriever, building it on first use.
    ///
    /// `None` means unavailable: no index has been built yet, or the last
    /// build failed. Callers treat this as a normal state.
    pub async fn get(&self) -> Option<Arc<dyn Retriever>> {
        match self.current().await {
            Slot::Ready(retriever) => return Some(retriever),
            Slot::Unavailable => return None,
            Slot::Unloaded => {}
        }

        let _guard = self.build_lock.lock().await;

        // Another caller may have finished the build while we waited
        match self.current().await {
            Slot::Ready(retriever) => return Some(retriever),
            Slot::Unavailable => return None,
            Slot::Unloaded => {}
        }

        match self.loader.load().await {
            Ok(Some(retriever)) => {
                *self.slot.write().await = Slot::Ready(Arc::clone(&retriever));
                tracing::info!("Retriever initialized");
                Some(retriever)
            }
            // Stay unloaded so the index is picked up once it exists
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Retriever initialization failed; knowledge base unavailable");
                *self.slot.write().await = Slot::Unavailable;
                None
            }
        }
    }

    /// Rebuild the retriever now and publish it in place of the old one.
    ///
    /// Requests already holding the previous instance finish against it.
    /// If the rebuild finds no index or fails, the handle becomes
    /// unavailable until the next successful reload. Returns whether a
    /// retriever is available afterwards.
    pub async fn reload(&self) -> bool {
        let _guard = self.build_lock.lock().await;

        let next = match self.loader.load().await {
            Ok(Some(retriever)) => {
                tracing::info!("Retriever reloaded");
                Slot::Ready(retriever)
            }
            Ok(None) => {
                tracing::warn!("Reload found no index; knowledge base unavailable");
                Slot::Unavailable
            }
            Err(e) => {
                tracing::warn!(error = %e, "Reload failed; knowledge base unavailable");
                Slot::Unavailable
            }
        };

        let available = matches!(next, Slot::Ready(_));
        *self.slot.write().await = next;
        available
    }

    /// Build the retriever ahead of the first question.
    pub async fn warmup(&self) -> bool {
        self.get().await.is_some()
    }

    async fn current(&self) -> Slot {
        self.slot.read().await.clone()
    }

    /// Whether a retriever is currently published.
    pub async fn is_loaded(&self) -> bool {
        matches!(*self.slot.read().await, Slot::Ready(_))
    }
}
