//! Terminal front end for the lock-screen quote overlay
//!
//! Reads screen events from stdin, one per line (`on`, `off`, `unlock`),
//! and shows or hides the quote of the day in the terminal.
//!
//! The overlay runs under `quotex_core::monitor`, which starts a fresh one
//! if the running task ends. Events always go to the newest overlay.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::warn;

use quotex_core::{monitor, Config, OverlayService, Quote, QuoteSink, ScreenEvent};

use crate::output::Output;

/// How often the monitor checks that the overlay is alive
const RESTART_PERIOD: Duration = Duration::from_secs(5);

struct TerminalSink {
    output: Output,
}

impl QuoteSink for TerminalSink {
    fn display(&mut self, quote: &Quote) -> Result<()> {
        self.output.print_quote(quote);
        Ok(())
    }

    fn hide(&mut self) -> Result<()> {
        self.output.message("(quote hidden)");
        Ok(())
    }
}

/// Where the next event goes
#[derive(Clone)]
enum Route {
    /// No overlay has been started yet
    Waiting,
    Overlay(mpsc::Sender<ScreenEvent>),
    Closed,
}

/// Routes events to whichever overlay task is currently running
#[derive(Clone)]
struct EventRelay {
    route: Arc<watch::Sender<Route>>,
}

impl EventRelay {
    fn new() -> Self {
        let (route, _) = watch::channel(Route::Waiting);
        Self {
            route: Arc::new(route),
        }
    }

    /// Spawn an overlay and send all further events to it
    fn start<S: QuoteSink + 'static>(&self, overlay: OverlayService<S>) -> JoinHandle<()> {
        let (tx, rx) = mpsc::channel(16);
        self.route.send_replace(Route::Overlay(tx));
        tokio::spawn(async move {
            overlay.run(rx).await;
        })
    }

    /// Deliver an event, waiting while no live overlay is running
    ///
    /// Returns false once the relay is closed.
    async fn send(&self, event: ScreenEvent) -> bool {
        let mut route = self.route.subscribe();
        let ready = route
            .wait_for(|route| match route {
                Route::Waiting => false,
                Route::Overlay(tx) => !tx.is_closed(),
                Route::Closed => true,
            })
            .await
            .map(|route| route.clone());
        match ready {
            Ok(Route::Overlay(tx)) => tx.send(event).await.is_ok(),
            _ => false,
        }
    }

    /// Stop routing; the running overlay drains its queue and exits
    fn close(&self) {
        self.route.send_replace(Route::Closed);
    }
}

/// Run the overlay until stdin closes
pub async fn run(config: &Config, output: &Output) -> Result<()> {
    let relay = EventRelay::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let start = {
        let relay = relay.clone();
        let output = *output;
        let ttl = config.cache_ttl();
        let corpus_path = config.corpus_path.clone();
        move || -> Result<JoinHandle<()>> {
            let overlay = OverlayService::new(TerminalSink { output }, ttl, corpus_path.clone());
            Ok(relay.start(overlay))
        }
    };
    let monitor = tokio::spawn(monitor(RESTART_PERIOD, start, shutdown_rx));

    output.message("Screen events: on, off, unlock (Ctrl-D to stop)");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_event(line) {
            Some(event) => {
                if !relay.send(event).await {
                    warn!("Overlay is gone, dropped {:?}", event);
                }
            }
            None => eprintln!("Unknown event '{}': use on, off or unlock", line),
        }
    }

    relay.close();
    shutdown_tx.send_replace(true);
    monitor.await.context("Overlay monitor failed")?;
    Ok(())
}

fn parse_event(input: &str) -> Option<ScreenEvent> {
    match input.to_lowercase().as_str() {
        "on" | "screen-on" => Some(ScreenEvent::ScreenOn),
        "off" | "screen-off" => Some(ScreenEvent::ScreenOff),
        "unlock" | "present" => Some(ScreenEvent::UserPresent),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records what each overlay instance did, tagged with its number
    #[derive(Clone, Default)]
    struct Log(Arc<Mutex<Vec<String>>>);

    impl Log {
        fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    struct LogSink {
        instance: u32,
        log: Log,
    }

    impl QuoteSink for LogSink {
        fn display(&mut self, _quote: &Quote) -> Result<()> {
            self.log.0.lock().unwrap().push(format!("{}:show", self.instance));
            Ok(())
        }

        fn hide(&mut self) -> Result<()> {
            self.log.0.lock().unwrap().push(format!("{}:hide", self.instance));
            Ok(())
        }
    }

    fn overlay(instance: u32, log: &Log) -> OverlayService<LogSink> {
        let sink = LogSink {
            instance,
            log: log.clone(),
        };
        OverlayService::new(sink, Duration::ZERO, None).with_seed(1)
    }

    #[test]
    fn test_parse_event() {
        assert_eq!(parse_event("on"), Some(ScreenEvent::ScreenOn));
        assert_eq!(parse_event("OFF"), Some(ScreenEvent::ScreenOff));
        assert_eq!(parse_event("unlock"), Some(ScreenEvent::UserPresent));
        assert_eq!(parse_event("sleep"), None);
    }

    #[tokio::test]
    async fn test_events_follow_a_restarted_overlay() {
        let log = Log::default();
        let relay = EventRelay::new();

        let first = relay.start(overlay(1, &log));
        assert!(relay.send(ScreenEvent::ScreenOn).await);
        first.abort();
        assert!(first.await.unwrap_err().is_cancelled());

        // Waits for the replacement instead of losing the event
        let pending = {
            let relay = relay.clone();
            tokio::spawn(async move { relay.send(ScreenEvent::ScreenOn).await })
        };
        let second = relay.start(overlay(2, &log));
        assert!(pending.await.unwrap());
        assert!(relay.send(ScreenEvent::ScreenOff).await);

        relay.close();
        second.await.unwrap();
        assert_eq!(log.entries().last().map(String::as_str), Some("2:hide"));
        assert!(log.entries().contains(&"2:show".to_string()));
    }

    #[tokio::test]
    async fn test_monitor_starts_overlay_for_relay() {
        let log = Log::default();
        let relay = EventRelay::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let start = {
            let relay = relay.clone();
            let log = log.clone();
            move || -> Result<JoinHandle<()>> { Ok(relay.start(overlay(1, &log))) }
        };
        let monitor = tokio::spawn(monitor(Duration::from_secs(60), start, shutdown_rx));

        assert!(relay.send(ScreenEvent::ScreenOn).await);
        assert!(relay.send(ScreenEvent::UserPresent).await);
        tokio::time::timeout(Duration::from_secs(5), async {
            while log.entries().len() < 2 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(log.entries(), vec!["1:show", "1:hide"]);

        shutdown_tx.send_replace(true);
        monitor.await.unwrap();
        relay.close();
        assert!(!relay.send(ScreenEvent::ScreenOn).await);
    }
}
