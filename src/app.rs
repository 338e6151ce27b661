use chrono::{DateTime, Local};
use ratatui::widgets::ListState;

use crate::filter::VisibleEntry;
use crate::notify::Notice;
use crate::poll::{PollProgress, Schedule, Snapshot};
use crate::settings::Settings;

/// Which setting the text prompt is editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Interval,
    Keywords,
}

impl EditField {
    pub fn label(self) -> &'static str {
        match self {
            EditField::Interval => "Auto-refresh interval (minutes)",
            EditField::Keywords => "Deals containing keywords",
        }
    }
}

/// The status-bar text and how long it stays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Idle,
    /// Shown until a poll after `since` finishes.
    AwaitingPoll { text: String, since: PollProgress },
    /// Outcome of a control action, shown until the next key press.
    Message(String),
}

impl Status {
    pub fn text(&self) -> &str {
        match self {
            Status::Idle => "",
            Status::AwaitingPoll { text, .. } | Status::Message(text) => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing { field: EditField, buffer: String },
}

/// Everything the terminal front end shows.  The poller's state is copied in
/// from [`Snapshot`]s; nothing here is shared with the scheduler thread.
pub struct App {
    /// Entries from the latest successful poll, in feed order.
    pub entries: Vec<VisibleEntry>,
    pub last_updated_at: Option<DateTime<Local>>,
    /// Generation of the snapshot `entries` came from.
    generation: u64,
    /// Copy of the settings as of the last control action.
    pub settings: Settings,
    pub next_poll: Option<Schedule>,
    /// List selection state for scrolling.
    pub list_state: ListState,
    pub mode: InputMode,
    /// Most recent notification, shown until the next key press.
    pub banner: Option<Notice>,
    /// Whether the user has requested to quit.
    pub quit: bool,
    pub status: Status,
}

impl App {
    pub fn new(settings: Settings) -> Self {
        Self {
            entries: Vec::new(),
            last_updated_at: None,
            generation: 0,
            settings,
            next_poll: None,
            list_state: ListState::default(),
            mode: InputMode::Normal,
            banner: None,
            quit: false,
            status: Status::AwaitingPoll {
                text: "Starting…".into(),
                since: PollProgress::default(),
            },
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replace the list with a newer poll result, keeping the selection in
    /// range.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        if snapshot.generation <= self.generation {
            return;
        }
        self.entries = snapshot.visible_entries;
        self.last_updated_at = snapshot.last_updated_at;
        self.generation = snapshot.generation;

        let selected = match self.list_state.selected() {
            _ if self.entries.is_empty() => None,
            Some(i) => Some(i.min(self.entries.len() - 1)),
            None => None,
        };
        self.list_state.select(selected);
    }

    pub fn set_message(&mut self, text: impl Into<String>) {
        self.status = Status::Message(text.into());
    }

    /// Show `text` until the poller gets past `since`.
    pub fn await_poll(&mut self, text: impl Into<String>, since: PollProgress) {
        self.status = Status::AwaitingPoll {
            text: text.into(),
            since,
        };
    }

    /// Drop a waiting message once a later poll has finished.  A failed poll
    /// leaves an error in its place.
    pub fn settle_status(&mut self, progress: PollProgress) {
        let Status::AwaitingPoll { since, .. } = &self.status else {
            return;
        };
        if progress.finished <= since.finished {
            return;
        }
        self.status = if progress.last_failed {
            Status::Message("Error: could not fetch the feed (see the log)".into())
        } else {
            Status::Idle
        };
    }

    /// Forget the last control message; a pending wait stays.
    pub fn dismiss_message(&mut self) {
        if matches!(self.status, Status::Message(_)) {
            self.status = Status::Idle;
        }
    }

    pub fn show_notice(&mut self, notice: Notice) {
        self.banner = Some(notice);
    }

    pub fn selected_link(&self) -> Option<&str> {
        let i = self.list_state.selected()?;
        self.entries.get(i)?.item.link.as_deref()
    }

    // -- editing -------------------------------------------------------------

    /// Open the prompt for `field`, pre-filled with the current value.
    pub fn start_editing(&mut self, field: EditField) {
        let buffer = match field {
            EditField::Interval => self.settings.refresh_interval.minutes().to_string(),
            EditField::Keywords => self.settings.keywords.join(", "),
        };
        self.mode = InputMode::Editing { field, buffer };
    }

    // -- navigation ----------------------------------------------------------

    pub fn select_next(&mut self) {
        self.move_selection(|current, last| current.map_or(0, |i| (i + 1).min(last)));
    }

    pub fn select_previous(&mut self) {
        self.move_selection(|current, _| current.map_or(0, |i| i.saturating_sub(1)));
    }

    pub fn select_first(&mut self) {
        self.move_selection(|_, _| 0);
    }

    pub fn select_last(&mut self) {
        self.move_selection(|_, last| last);
    }

    /// `pick` gets the current selection and the last valid index.  An
    /// empty list has nothing to select.
    fn move_selection(&mut self, pick: impl FnOnce(Option<usize>, usize) -> usize) {
        let Some(last) = self.entries.len().checked_sub(1) else {
            return;
        };
        let i = pick(self.list_state.selected(), last);
        self.list_state.select(Some(i));
    }
}
