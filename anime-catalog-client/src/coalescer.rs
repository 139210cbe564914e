use crate::cache::CacheKey;
use crate::error::{Error, ErrorKind, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[cfg(feature = "graphql")]
use async_graphql::SimpleObject;

type Flight<T> = Shared<BoxFuture<'static, Result<T>>>;

/// Merges concurrent requests for the same key into a single execution.
///
/// The first caller for a key spawns the producer and publishes a shared
/// handle to it before the producer gets a chance to run. Every caller that
/// arrives while that handle is published awaits it and observes the same
/// outcome. The spawned task clears the handle once the producer settles,
/// so a producer runs to completion even if all of its callers go away.
pub struct RequestCoalescer<T> {
    name: &'static str,
    in_flight: Arc<DashMap<CacheKey, (u64, Flight<T>)>>,
    next_flight: AtomicU64,
    joined: AtomicU64,
}

impl<T> RequestCoalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            in_flight: Arc::new(DashMap::new()),
            next_flight: AtomicU64::new(0),
            joined: AtomicU64::new(0),
        }
    }

    /// Run `producer` for `key`, or join the execution already in flight.
    pub async fn run<F>(&self, key: CacheKey, producer: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let flight = match self.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => {
                log::debug!("{} request already in flight for key: {:?}", self.name, key);
                self.joined.fetch_add(1, Ordering::Relaxed);
                entry.get().1.clone()
            }
            Entry::Vacant(entry) => {
                log::debug!("Executing new {} request for key: {:?}", self.name, key);
                let id = self.next_flight.fetch_add(1, Ordering::Relaxed);
                let flight = self.launch(key, id, producer);
                entry.insert((id, flight.clone()));
                flight
            }
        };

        flight.await
    }

    fn launch<F>(&self, key: CacheKey, id: u64, producer: F) -> Flight<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let in_flight = Arc::clone(&self.in_flight);
        let task_key = key.clone();
        // The entry lock is held by the caller until the handle is inserted,
        // so this removal cannot run before the insert.
        let handle = tokio::spawn(async move {
            let result = producer.await;
            in_flight.remove_if(&task_key, |_, (flight, _)| *flight == id);
            result
        });

        let in_flight = Arc::clone(&self.in_flight);
        let name = self.name;
        async move {
            match handle.await {
                Ok(result) => result,
                Err(err) => {
                    log::error!("{} request task for key {:?} failed: {}", name, key, err);
                    in_flight.remove_if(&key, |_, (flight, _)| *flight == id);
                    Err(Error::new(ErrorKind::Aborted, err.to_string()))
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Number of keys with a request currently in flight
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn stats(&self) -> CoalescerStats {
        CoalescerStats {
            name: self.name.to_string(),
            in_flight: self.in_flight.len(),
            joined_requests: self.joined.load(Ordering::Relaxed),
        }
    }
}

/// Statistics for request coalescing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "graphql", derive(SimpleObject))]
pub struct CoalescerStats {
    pub name: String,
    pub in_flight: usize,
    /// Callers that were served by a request someone else started
    pub joined_requests: u64,
}
