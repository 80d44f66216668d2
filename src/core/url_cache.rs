//! In-memory resolution cache
//!
//! Memoizes `(resolver, type, id) -> claim | none` for the page's lifetime
//! and makes sure only one network lookup per key is outstanding at a time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::error::{Result, WatchOnLbryError};
use crate::types::{LbryClaim, ResolveType, ResolverName};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub resolver: ResolverName,
    #[serde(rename = "type")]
    pub kind: ResolveType,
    pub id: String,
}

impl CacheKey {
    pub fn new(resolver: ResolverName, kind: ResolveType, id: impl Into<String>) -> Self {
        Self {
            resolver,
            kind,
            id: id.into(),
        }
    }
}

/// Three-valued lookup result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// Definitive answer; `None` means confirmed "no mapping"
    Resolved(Option<LbryClaim>),
    /// Never looked up (or looked up and still in flight)
    Absent,
}

type Outcome = std::result::Result<Option<LbryClaim>, String>;

enum Entry {
    Ready(Option<LbryClaim>),
    InFlight {
        flight: u64,
        rx: watch::Receiver<Option<Outcome>>,
    },
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, Entry>,
    /// Bumped by every clear so older lookups cannot write back
    generation: u64,
    next_flight: u64,
}

/// Cache shared between the message handler and whoever clears it
#[derive(Clone, Default)]
pub struct ResolutionCache {
    state: Arc<Mutex<CacheState>>,
}

/// How the keys of one `reserve` call split up
pub struct Reservation {
    pub hits: Vec<(CacheKey, Option<LbryClaim>)>,
    pub waiting: Vec<Pending>,
    pub owned: Vec<Ticket>,
}

/// A lookup some other caller is already performing
pub struct Pending {
    pub key: CacheKey,
    rx: watch::Receiver<Option<Outcome>>,
}

impl Pending {
    /// Wait for the owning caller to finish
    pub async fn wait(mut self) -> Result<(CacheKey, Option<LbryClaim>)> {
        let outcome = match self.rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };
        match outcome {
            Some(Ok(claim)) => Ok((self.key, claim)),
            Some(Err(message)) => Err(WatchOnLbryError::Transport(message)),
            None => Err(WatchOnLbryError::Transport(format!(
                "lookup for {} was abandoned",
                self.key.id
            ))),
        }
    }
}

/// Exclusive right to resolve one key.
///
/// Dropping a ticket without completing it releases the key and tells
/// waiters the lookup failed.
pub struct Ticket {
    pub key: CacheKey,
    tx: Option<watch::Sender<Option<Outcome>>>,
    flight: u64,
    generation: u64,
    state: Arc<Mutex<CacheState>>,
}

impl Ticket {
    /// Store a definitive answer and wake waiters
    pub fn complete(mut self, claim: Option<LbryClaim>) {
        let Some(tx) = self.tx.take() else { return };
        {
            let mut state = lock(&self.state);
            if self.owns_slot(&state) {
                state.entries.insert(self.key.clone(), Entry::Ready(claim.clone()));
                trace!(id = %self.key.id, "Stored resolution in cache");
            } else {
                debug!(id = %self.key.id, "Cache cleared during lookup, result not stored");
            }
        }
        let _ = tx.send(Some(Ok(claim)));
    }

    /// Release the key without caching anything
    pub fn fail(mut self, message: &str) {
        if let Some(tx) = self.tx.take() {
            self.release();
            let _ = tx.send(Some(Err(message.to_string())));
        }
    }

    fn release(&self) {
        let mut state = lock(&self.state);
        if self.owns_slot(&state) {
            state.entries.remove(&self.key);
        }
    }

    fn owns_slot(&self, state: &CacheState) -> bool {
        state.generation == self.generation
            && matches!(
                state.entries.get(&self.key),
                Some(Entry::InFlight { flight, .. }) if *flight == self.flight
            )
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        if self.tx.take().is_some() {
            self.release();
        }
    }
}

fn lock(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> CacheLookup {
        match lock(&self.state).entries.get(key) {
            Some(Entry::Ready(claim)) => CacheLookup::Resolved(claim.clone()),
            Some(Entry::InFlight { .. }) | None => CacheLookup::Absent,
        }
    }

    pub fn put(&self, key: CacheKey, claim: Option<LbryClaim>) {
        lock(&self.state).entries.insert(key, Entry::Ready(claim));
    }

    /// Drop every entry. In-flight lookups finish for their callers but
    /// are not written back.
    pub fn clear_all(&self) {
        let mut state = lock(&self.state);
        let dropped = state.entries.len();
        state.entries.clear();
        state.generation += 1;
        debug!(dropped, "Cleared resolution cache");
    }

    /// Split keys into cache hits, lookups already in flight, and keys the
    /// caller now owns and must resolve.
    pub fn reserve(&self, keys: impl IntoIterator<Item = CacheKey>) -> Reservation {
        let mut state = lock(&self.state);
        let generation = state.generation;
        let mut reservation = Reservation {
            hits: Vec::new(),
            waiting: Vec::new(),
            owned: Vec::new(),
        };

        for key in keys {
            match state.entries.get(&key) {
                Some(Entry::Ready(claim)) => {
                    trace!(id = %key.id, "Cache hit");
                    let claim = claim.clone();
                    reservation.hits.push((key, claim));
                }
                Some(Entry::InFlight { rx, .. }) => {
                    trace!(id = %key.id, "Joining in-flight lookup");
                    let rx = rx.clone();
                    reservation.waiting.push(Pending { key, rx });
                }
                None => {
                    trace!(id = %key.id, "Cache miss");
                    let (tx, rx) = watch::channel(None);
                    let flight = state.next_flight;
                    state.next_flight += 1;
                    state.entries.insert(key.clone(), Entry::InFlight { flight, rx });
                    reservation.owned.push(Ticket {
                        key,
                        tx: Some(tx),
                        flight,
                        generation,
                        state: Arc::clone(&self.state),
                    });
                }
            }
        }

        reservation
    }

    /// Every definitive entry, for persisting
    pub fn snapshot(&self) -> Vec<(CacheKey, Option<LbryClaim>)> {
        lock(&self.state)
            .entries
            .iter()
            .filter_map(|(key, entry)| match entry {
                Entry::Ready(claim) => Some((key.clone(), claim.clone())),
                Entry::InFlight { .. } => None,
            })
            .collect()
    }

    /// Load previously persisted entries without touching in-flight ones
    pub fn restore(&self, entries: impl IntoIterator<Item = (CacheKey, Option<LbryClaim>)>) {
        let mut state = lock(&self.state);
        for (key, claim) in entries {
            state.entries.entry(key).or_insert(Entry::Ready(claim));
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.state).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
