//! Time-limited cache for the verse corpus
//!
//! The cache is an ordinary value owned by whoever needs it (the quote
//! display loop, the CLI). Freshness is measured with an injected `Clock` so
//! expiry can be tested without sleeping.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::corpus::Corpus;

/// Source of monotonic time
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Corpus cache with a time-to-live
pub struct ChapterCache<C: Clock = SystemClock> {
    clock: C,
    ttl: Duration,
    entry: Option<(Instant, Arc<Corpus>)>,
}

impl ChapterCache<SystemClock> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(SystemClock, ttl)
    }
}

impl<C: Clock> ChapterCache<C> {
    pub fn with_clock(clock: C, ttl: Duration) -> Self {
        Self {
            clock,
            ttl,
            entry: None,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached corpus, if present and younger than the TTL
    pub fn get(&self) -> Option<Arc<Corpus>> {
        let (loaded_at, corpus) = self.entry.as_ref()?;
        let age = self.clock.now().saturating_duration_since(*loaded_at);
        (age < self.ttl).then(|| Arc::clone(corpus))
    }

    /// Cached corpus, or a fresh one from `load`
    ///
    /// A failed load leaves the cache empty.
    pub fn get_or_load<E>(
        &mut self,
        load: impl FnOnce() -> Result<Corpus, E>,
    ) -> Result<Arc<Corpus>, E> {
        if let Some(corpus) = self.get() {
            return Ok(corpus);
        }

        self.entry = None;
        let corpus = Arc::new(load()?);
        debug!("Chapter cache refilled (ttl {:?})", self.ttl);
        self.entry = Some((self.clock.now(), Arc::clone(&corpus)));
        Ok(corpus)
    }

    /// Drop the cached corpus
    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}
