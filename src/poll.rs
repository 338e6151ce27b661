//! Background feed polling.
//!
//! A [`Poller`] runs one poll cycle per [`Poller::tick`]:
//!
//! ```text
//! fetch ──► filter ──► detect ──► replace PollState ──► notify?
//!   │
//!   └─ error: log, keep previous state
//! ```
//!
//! [`spawn`] starts the scheduler thread that calls `tick` on a timer and
//! returns a [`PollHandle`], which the UI uses for everything else: manual
//! refreshes, settings changes, snapshots and shutdown.
//!
//! ## Timer
//!
//! The timer is a single deadline owned by the scheduler thread, which waits
//! on its command channel until the deadline passes.  After every timed
//! poll the deadline is re-armed from the *current* settings, and
//! [`PollHandle::set_interval`] replaces it outright.  A manual refresh polls
//! without touching the deadline.
//!
//! ## No overlapping polls
//!
//! Every scheduled and manual poll runs on the scheduler thread, one after
//! another.  `tick` also refuses to start while another tick is in flight
//! ([`TickOutcome::Skipped`]), so calling it directly from another thread is
//! safe too.

use std::collections::HashSet;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, TimeDelta};
use tracing::{debug, info, warn};

use crate::detect;
use crate::error::ControlError;
use crate::filter::{self, VisibleEntry};
use crate::notify::NotificationSink;
use crate::settings::{FilterRule, RefreshInterval, Settings, SettingsStore};
use crate::source::DataSource;
use crate::startup::Autostart;

/// Real-time length of one interval minute.
pub const MINUTE: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Poll state
// ---------------------------------------------------------------------------

/// The poller's memory of the most recent successful poll.
#[derive(Debug, Clone, Default)]
pub struct PollState {
    pub visible_entries: Vec<VisibleEntry>,
    /// Title set of `visible_entries`; the baseline for change detection.
    pub known_titles: HashSet<String>,
    pub last_updated_at: Option<DateTime<Local>>,
    /// Bumped on every replacement so readers can tell their copy is stale.
    pub generation: u64,
}

/// How many polls have finished, counting failures, and whether the most
/// recent one failed.  Lets the display tell that a requested poll is over
/// even when it left the state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollProgress {
    pub finished: u64,
    pub last_failed: bool,
}

/// What the display reads.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub visible_entries: Vec<VisibleEntry>,
    pub last_updated_at: Option<DateTime<Local>>,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The poll succeeded and replaced the state.
    Updated { changed: bool, notified: bool },
    /// The fetch failed; state is untouched.
    FetchFailed,
    /// Another tick was already in flight.
    Skipped,
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

/// Runs poll cycles against one source.
pub struct Poller {
    source: Box<dyn DataSource>,
    settings: Arc<SettingsStore>,
    notifier: Box<dyn NotificationSink>,
    state: Mutex<PollState>,
    progress: Mutex<PollProgress>,
    in_flight: Mutex<()>,
}

impl Poller {
    pub fn new(
        source: Box<dyn DataSource>,
        settings: Arc<SettingsStore>,
        notifier: Box<dyn NotificationSink>,
    ) -> Self {
        Self {
            source,
            settings,
            notifier,
            state: Mutex::new(PollState::default()),
            progress: Mutex::new(PollProgress::default()),
            in_flight: Mutex::new(()),
        }
    }

    /// Run one fetch → filter → detect → notify cycle.
    pub fn tick(&self) -> TickOutcome {
        let _polling = match self.in_flight.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => {
                debug!("poll already in flight, skipping");
                return TickOutcome::Skipped;
            }
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        let items = match self.source.fetch() {
            Ok(items) => items,
            Err(e) => {
                warn!(source = self.source.name(), "poll failed: {e}");
                self.record_finished(true);
                return TickOutcome::FetchFailed;
            }
        };
        let fetched = items.len();

        let settings = self.settings.snapshot();
        let now = Local::now();
        let visible = filter::apply(items, &settings.filter_rule(), now.date_naive());

        let shown = visible.len();
        let changed = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let detection = detect::detect(&state.known_titles, &visible);
            let generation = state.generation + 1;
            *state = PollState {
                visible_entries: visible,
                known_titles: detection.titles,
                last_updated_at: Some(now),
                generation,
            };
            detection.changed
        };
        self.record_finished(false);

        info!(
            source = self.source.name(),
            fetched, shown, changed, "poll complete"
        );

        let notified = changed && !settings.notifications_disabled;
        if notified {
            self.notifier.notify(&change_summary(shown));
        }
        TickOutcome::Updated { changed, notified }
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        Snapshot {
            visible_entries: state.visible_entries.clone(),
            last_updated_at: state.last_updated_at,
            generation: state.generation,
        }
    }

    /// A snapshot, but only if the state moved past generation `seen`.
    pub fn snapshot_since(&self, seen: u64) -> Option<Snapshot> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        (state.generation > seen).then(|| Snapshot {
            visible_entries: state.visible_entries.clone(),
            last_updated_at: state.last_updated_at,
            generation: state.generation,
        })
    }

    pub fn progress(&self) -> PollProgress {
        *self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_finished(&self, failed: bool) {
        let mut progress = self.progress.lock().unwrap_or_else(PoisonError::into_inner);
        progress.finished += 1;
        progress.last_failed = failed;
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    fn current_interval(&self) -> RefreshInterval {
        self.settings.snapshot().refresh_interval
    }
}

fn change_summary(shown: usize) -> String {
    match shown {
        0 => "The feed no longer lists any matching deals.".to_string(),
        1 => "New items found in the feed (1 deal listed).".to_string(),
        n => format!("New items found in the feed ({n} deals listed)."),
    }
}

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

/// When the next timed poll is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub interval: RefreshInterval,
    pub due: DateTime<Local>,
}

/// The scheduler's single timer handle.
struct Timer {
    deadline: Instant,
    unit: Duration,
}

impl Timer {
    fn new(unit: Duration) -> Self {
        Self {
            deadline: Instant::now(),
            unit,
        }
    }

    /// Cancel whatever was pending and fire `interval` after `now`.
    fn arm(&mut self, now: Instant, interval: RefreshInterval) -> Duration {
        let wait = interval.scaled(self.unit);
        self.deadline = now + wait;
        wait
    }

    fn remaining(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }
}

enum Command {
    Refresh,
    Rearm,
    Quit,
}

// ---------------------------------------------------------------------------
// Scheduler thread
// ---------------------------------------------------------------------------

/// Start polling: one immediate poll, then one every refresh interval.
pub fn spawn(poller: Arc<Poller>, autostart: Box<dyn Autostart>) -> io::Result<PollHandle> {
    spawn_with_unit(poller, autostart, MINUTE)
}

pub(crate) fn spawn_with_unit(
    poller: Arc<Poller>,
    autostart: Box<dyn Autostart>,
    unit: Duration,
) -> io::Result<PollHandle> {
    let (tx, rx) = mpsc::channel();
    let refresh_queued = Arc::new(AtomicBool::new(false));
    let schedule = Arc::new(Mutex::new(None));

    let scheduler = Scheduler {
        poller: Arc::clone(&poller),
        rx,
        refresh_queued: Arc::clone(&refresh_queued),
        schedule: Arc::clone(&schedule),
        timer: Timer::new(unit),
    };
    thread::Builder::new()
        .name("poll-scheduler".into())
        .spawn(move || scheduler.run())?;

    Ok(PollHandle {
        poller,
        tx,
        refresh_queued,
        schedule,
        autostart,
    })
}

struct Scheduler {
    poller: Arc<Poller>,
    rx: mpsc::Receiver<Command>,
    refresh_queued: Arc<AtomicBool>,
    schedule: Arc<Mutex<Option<Schedule>>>,
    timer: Timer,
}

impl Scheduler {
    fn run(mut self) {
        // Poll once straight away so the list is never empty on launch.
        self.poll();
        self.arm();

        loop {
            match self.rx.recv_timeout(self.timer.remaining(Instant::now())) {
                Ok(Command::Refresh) => {
                    self.refresh_queued.store(false, Ordering::SeqCst);
                    self.poll();
                }
                Ok(Command::Rearm) => self.arm(),
                Ok(Command::Quit) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    self.poll();
                    self.arm();
                }
            }
        }
        info!("poll scheduler stopped");
    }

    fn poll(&self) {
        match self.poller.tick() {
            TickOutcome::Updated { changed, notified } => {
                debug!(changed, notified, "poll finished");
            }
            TickOutcome::FetchFailed => debug!("poll failed, keeping previous entries"),
            TickOutcome::Skipped => debug!("poll already in flight"),
        }
    }

    /// Re-arm from the interval in the settings right now.
    fn arm(&mut self) {
        let interval = self.poller.current_interval();
        let wait = self.timer.arm(Instant::now(), interval);
        let due = TimeDelta::from_std(wait)
            .ok()
            .and_then(|d| Local::now().checked_add_signed(d))
            .unwrap_or_else(Local::now);

        debug!(minutes = interval.minutes(), %due, "timer armed");
        *self.schedule.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(Schedule { interval, due });
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// The UI's side of the poller.  Every method is safe to call while a poll
/// is running.
pub struct PollHandle {
    poller: Arc<Poller>,
    tx: mpsc::Sender<Command>,
    refresh_queued: Arc<AtomicBool>,
    schedule: Arc<Mutex<Option<Schedule>>>,
    autostart: Box<dyn Autostart>,
}

impl PollHandle {
    /// Poll now, ahead of the timer.  The timed schedule is unchanged.
    ///
    /// Requests made while one is already queued are merged into it.
    pub fn manual_refresh(&self) {
        if self.refresh_queued.swap(true, Ordering::SeqCst) {
            debug!("refresh already queued");
            return;
        }
        self.send(Command::Refresh);
    }

    /// Change the refresh interval and restart the timer with it.
    ///
    /// Out-of-range values are rejected before anything is saved or
    /// re-armed.  A failed save still re-arms; the new interval is live in
    /// memory.
    pub fn set_interval(&self, minutes: i64) -> Result<RefreshInterval, ControlError> {
        let interval = RefreshInterval::new(minutes)?;
        let saved = self
            .poller
            .settings()
            .update(|s| s.refresh_interval = interval);
        self.send(Command::Rearm);
        info!(minutes = interval.minutes(), "refresh interval set");
        saved?;
        Ok(interval)
    }

    /// Change the filter rule and refresh so the list reflects it.
    pub fn set_filter_rule(&self, rule: FilterRule) -> Result<(), ControlError> {
        info!(?rule, "filter rule set");
        let saved = self.poller.settings().update(|s| s.set_filter_rule(rule));
        self.manual_refresh();
        saved?;
        Ok(())
    }

    pub fn set_notifications_disabled(&self, disabled: bool) -> Result<(), ControlError> {
        info!(disabled, "notifications toggled");
        self.poller
            .settings()
            .update(|s| s.notifications_disabled = disabled)?;
        Ok(())
    }

    /// Register or unregister the login launcher, then record the choice.
    /// Nothing is recorded if the platform refuses.
    pub fn set_load_on_startup(&self, enabled: bool) -> Result<(), ControlError> {
        self.autostart.set_enabled(enabled)?;
        info!(enabled, "load on startup toggled");
        self.poller
            .settings()
            .update(|s| s.load_on_startup = enabled)?;
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        self.poller.snapshot()
    }

    /// See [`Poller::snapshot_since`].
    pub fn snapshot_since(&self, seen: u64) -> Option<Snapshot> {
        self.poller.snapshot_since(seen)
    }

    pub fn settings(&self) -> Settings {
        self.poller.settings().snapshot()
    }

    pub fn progress(&self) -> PollProgress {
        self.poller.progress()
    }

    /// The armed timer, once the first poll has finished.
    pub fn schedule(&self) -> Option<Schedule> {
        *self.schedule.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stop the timer.  A poll already in flight is left to finish.
    pub fn quit(&self) {
        self.send(Command::Quit);
    }

    fn send(&self, command: Command) {
        // The scheduler only exits after `quit`, so a closed channel just
        // means we are shutting down.
        if self.tx.send(command).is_err() {
            debug!("poll scheduler is not running");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
