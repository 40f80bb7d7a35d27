//! Lock-screen quote display
//!
//! The platform delivers screen events; this module decides what to show.
//! Turning the screen on displays the quote of the day, turning it off or
//! unlocking hides it. How a quote is actually drawn is up to the
//! `QuoteSink` implementation.
//!
//! `monitor` keeps the display loop alive: it checks on a fixed period and
//! starts the loop again if it has stopped.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{ChapterCache, Clock, SystemClock};
use crate::corpus::{Corpus, CorpusError, Quote};

/// Screen state changes reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenEvent {
    ScreenOn,
    ScreenOff,
    /// The user unlocked the device
    UserPresent,
}

/// Where quotes are shown
pub trait QuoteSink: Send {
    fn display(&mut self, quote: &Quote) -> Result<()>;
    fn hide(&mut self) -> Result<()>;
}

type DateSource = Box<dyn Fn() -> NaiveDate + Send>;

/// Reacts to screen events by showing or hiding the daily quote
pub struct OverlayService<S: QuoteSink, C: Clock = SystemClock> {
    sink: S,
    cache: ChapterCache<C>,
    corpus_path: Option<PathBuf>,
    today: DateSource,
    rng: StdRng,
    visible: bool,
}

impl<S: QuoteSink> OverlayService<S, SystemClock> {
    pub fn new(sink: S, cache_ttl: Duration, corpus_path: Option<PathBuf>) -> Self {
        Self::with_cache(sink, ChapterCache::new(cache_ttl), corpus_path)
    }
}

impl<S: QuoteSink, C: Clock> OverlayService<S, C> {
    pub fn with_cache(sink: S, cache: ChapterCache<C>, corpus_path: Option<PathBuf>) -> Self {
        Self {
            sink,
            cache,
            corpus_path,
            today: Box::new(|| Local::now().date_naive()),
            rng: StdRng::from_entropy(),
            visible: false,
        }
    }

    /// Replace the source of "today" (used to pick the chapter)
    pub fn with_date_source(mut self, today: impl Fn() -> NaiveDate + Send + 'static) -> Self {
        self.today = Box::new(today);
        self
    }

    /// Make verse selection deterministic
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Quote of the day from the cached corpus
    pub fn current_quote(&mut self) -> Result<Quote, CorpusError> {
        let path = self.corpus_path.clone();
        let corpus = self
            .cache
            .get_or_load(|| Corpus::load_or_bundled(path.as_deref()))?;
        Ok(corpus.daily_quote((self.today)(), &mut self.rng))
    }

    /// Apply one screen event; failures are logged, never returned
    pub fn handle(&mut self, event: ScreenEvent) {
        debug!("Screen event {:?}", event);
        match event {
            ScreenEvent::ScreenOn => {
                let quote = match self.current_quote() {
                    Ok(quote) => quote,
                    Err(e) => {
                        warn!("No quote to display: {}", e);
                        return;
                    }
                };
                match self.sink.display(&quote) {
                    Ok(()) => self.visible = true,
                    Err(e) => warn!("Failed to display quote: {:#}", e),
                }
            }
            ScreenEvent::ScreenOff | ScreenEvent::UserPresent => {
                if !self.visible {
                    return;
                }
                match self.sink.hide() {
                    Ok(()) => self.visible = false,
                    Err(e) => warn!("Failed to hide quote: {:#}", e),
                }
            }
        }
    }

    /// Process events until the sender side closes; hands the sink back
    pub async fn run(mut self, mut events: mpsc::Receiver<ScreenEvent>) -> S {
        info!("Quote overlay started");
        while let Some(event) = events.recv().await {
            self.handle(event);
        }
        info!("Quote overlay stopped");
        self.sink
    }
}

/// Keep a service running
///
/// Every `period`, if no service task is alive, calls `start` to launch
/// one. Start failures are logged and retried on the next tick. Returns
/// when `shutdown` becomes true (or its sender is dropped), aborting the
/// running task.
pub async fn monitor<F>(period: Duration, mut start: F, mut shutdown: watch::Receiver<bool>)
where
    F: FnMut() -> Result<JoinHandle<()>>,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut running: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if running.as_ref().is_some_and(|handle| !handle.is_finished()) {
                    continue;
                }
                match start() {
                    Ok(handle) => {
                        info!("Display service started");
                        running = Some(handle);
                    }
                    Err(e) => warn!("Failed to start display service: {:#}", e),
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    if let Some(handle) = running {
        handle.abort();
    }
    debug!("Display monitor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct RecordingSink {
        shown: Vec<Quote>,
        hides: u32,
        fail_display: bool,
    }

    impl QuoteSink for RecordingSink {
        fn display(&mut self, quote: &Quote) -> Result<()> {
            if self.fail_display {
                anyhow::bail!("overlay permission revoked");
            }
            self.shown.push(quote.clone());
            Ok(())
        }

        fn hide(&mut self) -> Result<()> {
            self.hides += 1;
            Ok(())
        }
    }

    fn service(sink: RecordingSink) -> OverlayService<RecordingSink> {
        OverlayService::new(sink, Duration::from_secs(3600), None)
            .with_date_source(|| NaiveDate::from_ymd_opt(2026, 10, 17).unwrap())
            .with_seed(3)
    }

    #[test]
    fn test_screen_on_displays_todays_chapter() {
        let mut overlay = service(RecordingSink::default());

        overlay.handle(ScreenEvent::ScreenOn);
        assert!(overlay.is_visible());
        assert_eq!(overlay.sink().shown.len(), 1);
        assert_eq!(overlay.sink().shown[0].chapter, 17);
    }

    #[test]
    fn test_unlock_and_screen_off_hide() {
        let mut overlay = service(RecordingSink::default());

        // Nothing to hide yet
        overlay.handle(ScreenEvent::UserPresent);
        assert_eq!(overlay.sink().hides, 0);

        overlay.handle(ScreenEvent::ScreenOn);
        overlay.handle(ScreenEvent::UserPresent);
        assert!(!overlay.is_visible());
        assert_eq!(overlay.sink().hides, 1);

        overlay.handle(ScreenEvent::ScreenOn);
        overlay.handle(ScreenEvent::ScreenOff);
        assert_eq!(overlay.sink().hides, 2);
    }

    #[test]
    fn test_display_failure_is_swallowed() {
        let mut overlay = service(RecordingSink {
            fail_display: true,
            ..Default::default()
        });

        overlay.handle(ScreenEvent::ScreenOn);
        assert!(!overlay.is_visible());
    }

    #[test]
    fn test_bad_corpus_path_is_swallowed() {
        let mut overlay = OverlayService::with_cache(
            RecordingSink::default(),
            ChapterCache::with_clock(Arc::new(ManualClock::new()), Duration::from_secs(60)),
            Some(PathBuf::from("/nonexistent/proverbs.json")),
        );

        overlay.handle(ScreenEvent::ScreenOn);
        assert!(overlay.sink().shown.is_empty());
        assert!(overlay.current_quote().is_err());
    }

    #[tokio::test]
    async fn test_run_until_channel_closes() {
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(service(RecordingSink::default()).run(rx));

        tx.send(ScreenEvent::ScreenOn).await.unwrap();
        tx.send(ScreenEvent::UserPresent).await.unwrap();
        tx.send(ScreenEvent::ScreenOn).await.unwrap();
        drop(tx);

        let sink = task.await.unwrap();
        assert_eq!(sink.shown.len(), 2);
        assert_eq!(sink.hides, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_retries_failed_start() {
        let attempts = Arc::new(AtomicU32::new(0));
        let (stop_tx, stop_rx) = watch::channel(false);

        let counter = Arc::clone(&attempts);
        let monitor_task = tokio::spawn(monitor(
            Duration::from_secs(10),
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    anyhow::bail!("not yet");
                }
                Ok(tokio::spawn(std::future::pending::<()>()))
            },
            stop_rx,
        ));

        tokio::time::sleep(Duration::from_secs(55)).await;
        stop_tx.send(true).unwrap();
        monitor_task.await.unwrap();

        // First attempt failed, second succeeded and stayed up
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_restarts_stopped_service() {
        let attempts = Arc::new(AtomicU32::new(0));
        let (stop_tx, stop_rx) = watch::channel(false);

        let counter = Arc::clone(&attempts);
        let monitor_task = tokio::spawn(monitor(
            Duration::from_secs(10),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(tokio::spawn(async {}))
            },
            stop_rx,
        ));

        tokio::time::sleep(Duration::from_secs(35)).await;
        drop(stop_tx);
        monitor_task.await.unwrap();

        // Ticks at 0, 10, 20 and 30 each found the service gone
        assert!(attempts.load(Ordering::SeqCst) >= 3);
    }
}
