use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::fetch::{StatusFetcher, check_once};
use crate::query::ProductQuery;
use crate::status::{ReleaseStatus, Resolution};

/// Snapshot published after every state change of a [`PollLoop`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub product_id: String,
    pub status: ReleaseStatus,
    pub display_name: String,
    /// Set on exactly one update per transition into "released".
    pub newly_released: bool,
    /// When the cycle that produced this update completed. `None` while
    /// loading.
    pub checked_at: Option<DateTime<Utc>>,
}

impl StatusUpdate {
    fn loading(query: &ProductQuery, display_name: &str) -> Self {
        Self {
            product_id: query.product_id().to_string(),
            status: ReleaseStatus::Loading,
            display_name: display_name.to_string(),
            newly_released: false,
            checked_at: None,
        }
    }
}

pub trait StatusObserver: Send + Sync {
    fn on_status_changed(&self, update: &StatusUpdate);
}

impl<F> StatusObserver for F
where
    F: Fn(&StatusUpdate) + Send + Sync,
{
    fn on_status_changed(&self, update: &StatusUpdate) {
        self(update);
    }
}

enum Command {
    RefreshNow,
    UpdateQuery(ProductQuery),
}

struct CycleOutcome {
    generation: u64,
    resolution: Resolution,
}

/// Periodically fetches and resolves the release status of one product.
///
/// At most one cycle is in flight at a time. The latest snapshot is kept in
/// a watch slot readable through [`PollLoop::subscribe`] and is pushed to the
/// registered observers. Dropping the loop stops it.
pub struct PollLoop {
    commands: mpsc::UnboundedSender<Command>,
    published: watch::Receiver<StatusUpdate>,
    cancel: CancellationToken,
    driver: Option<JoinHandle<()>>,
}

impl PollLoop {
    /// Spawn the loop on the current tokio runtime and run the first cycle
    /// immediately.
    #[must_use]
    pub fn start(
        fetcher: Arc<dyn StatusFetcher>,
        query: ProductQuery,
        interval: Duration,
        observers: Vec<Arc<dyn StatusObserver>>,
    ) -> Self {
        let display_name = query.label().to_string();
        let (publisher, published) = watch::channel(StatusUpdate::loading(&query, &display_name));
        let (commands, command_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        info!(
            "Starting poll loop for app {} every {}s",
            query.product_id(),
            interval.as_secs_f64()
        );

        let driver = Driver {
            fetcher,
            observers,
            publisher,
            query,
            display_name,
            generation: 0,
            in_flight: false,
            pending: false,
            released: false,
            interval,
            cancel: cancel.clone(),
        };

        Self {
            commands,
            published,
            cancel,
            driver: Some(tokio::spawn(driver.run(command_rx))),
        }
    }

    /// Run a cycle now unless one is already in flight.
    pub fn refresh_now(&self) {
        let _ = self.commands.send(Command::RefreshNow);
    }

    /// Replace the active query and poll it right away. Results still in
    /// flight for the previous query are discarded.
    pub fn update_query(&self, query: ProductQuery) {
        let _ = self.commands.send(Command::UpdateQuery(query));
    }

    /// Cancel the timer and drop any result that has not been published yet.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StatusUpdate> {
        self.published.clone()
    }

    #[must_use]
    pub fn latest(&self) -> StatusUpdate {
        self.published.borrow().clone()
    }

    /// Wait for the loop to wind down after [`PollLoop::stop`].
    pub async fn join(&mut self) {
        if let Some(driver) = self.driver.take() {
            let _ = driver.await;
        }
    }
}

impl Drop for PollLoop {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Driver {
    fetcher: Arc<dyn StatusFetcher>,
    observers: Vec<Arc<dyn StatusObserver>>,
    publisher: watch::Sender<StatusUpdate>,
    query: ProductQuery,
    display_name: String,
    generation: u64,
    in_flight: bool,
    pending: bool,
    released: bool,
    interval: Duration,
    cancel: CancellationToken,
}

impl Driver {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let (outcome_tx, mut outcomes) = mpsc::unbounded_channel::<CycleOutcome>();
        let mut next_tick: Option<Instant> = None;

        self.begin_cycle(&outcome_tx);

        loop {
            tokio::select! {
                biased;

                () = self.cancel.cancelled() => {
                    debug!("Poll loop for app {} stopped", self.query.product_id());
                    break;
                }
                Some(command) = commands.recv() => match command {
                    Command::RefreshNow => {
                        if self.in_flight {
                            debug!("Refresh requested while a cycle is in flight; coalescing");
                        } else {
                            next_tick = None;
                            self.begin_cycle(&outcome_tx);
                        }
                    }
                    Command::UpdateQuery(query) => {
                        self.replace_query(query);
                        if self.in_flight {
                            self.pending = true;
                            self.publish(StatusUpdate::loading(&self.query, &self.display_name));
                        } else {
                            next_tick = None;
                            self.begin_cycle(&outcome_tx);
                        }
                    }
                },
                Some(outcome) = outcomes.recv() => {
                    self.in_flight = false;
                    self.finish_cycle(outcome);
                    if std::mem::take(&mut self.pending) {
                        next_tick = None;
                        self.begin_cycle(&outcome_tx);
                    } else {
                        next_tick = Some(Instant::now() + self.interval);
                    }
                }
                () = tokio::time::sleep_until(next_tick.unwrap_or_else(Instant::now)),
                    if next_tick.is_some() && !self.in_flight =>
                {
                    next_tick = None;
                    self.begin_cycle(&outcome_tx);
                }
            }
        }
    }

    fn begin_cycle(&mut self, outcomes: &mpsc::UnboundedSender<CycleOutcome>) {
        self.in_flight = true;
        self.publish(StatusUpdate::loading(&self.query, &self.display_name));

        let fetcher = Arc::clone(&self.fetcher);
        let query = self.query.clone();
        let generation = self.generation;
        let cancel = self.cancel.child_token();
        let outcomes = outcomes.clone();

        debug!("Starting status cycle for app {}", query.product_id());
        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {}
                resolution = check_once(fetcher.as_ref(), &query) => {
                    let _ = outcomes.send(CycleOutcome { generation, resolution });
                }
            }
        });
    }

    fn finish_cycle(&mut self, outcome: CycleOutcome) {
        if self.cancel.is_cancelled() {
            return;
        }
        if outcome.generation != self.generation {
            debug!(
                "Ignoring stale status result: generation={} current={}",
                outcome.generation, self.generation
            );
            return;
        }

        let Resolution {
            status,
            display_name,
        } = outcome.resolution;
        if let Some(display_name) = display_name {
            self.display_name = display_name;
        }

        let newly_released = self.track_release(&status);
        if newly_released {
            info!("{} is out", self.display_name);
        }

        self.publish(StatusUpdate {
            product_id: self.query.product_id().to_string(),
            status,
            display_name: self.display_name.clone(),
            newly_released,
            checked_at: Some(Utc::now()),
        });
    }

    fn replace_query(&mut self, query: ProductQuery) {
        info!(
            "Switching poll loop from app {} to app {}",
            self.query.product_id(),
            query.product_id()
        );
        self.display_name = query.label().to_string();
        self.query = query;
        self.generation += 1;
        self.released = false;
    }

    // Loading and transient errors keep the previous verdict so that a
    // flaky connection cannot re-trigger the release edge.
    fn track_release(&mut self, status: &ReleaseStatus) -> bool {
        match status {
            ReleaseStatus::Success { is_out } => {
                let newly_released = *is_out && !self.released;
                self.released = *is_out;
                newly_released
            }
            ReleaseStatus::Loading | ReleaseStatus::Error { .. } => false,
        }
    }

    fn publish(&self, update: StatusUpdate) {
        self.publisher.send_replace(update.clone());
        for observer in &self.observers {
            observer.on_status_changed(&update);
        }
    }
}
