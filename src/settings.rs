//! User settings and their on-disk record.
//!
//! [`SettingsStore`] is the single place settings live while the program
//! runs.  Readers take a [`SettingsStore::snapshot`] once per poll cycle so a
//! cycle never sees half of an update; writers go through
//! [`SettingsStore::update`], which changes the in-memory copy and then
//! rewrites the whole file.
//!
//! The file is a small JSON object:
//!
//! ```json
//! {
//!   "refresh_interval_minutes": 5,
//!   "notifier_type": "keywords",
//!   "keywords": "sale, bundle",
//!   "load_on_startup": false,
//!   "disable_notifications": false
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::{ConfigError, LoadError, PersistenceError};

pub const MIN_INTERVAL_MINUTES: u32 = 1;
pub const MAX_INTERVAL_MINUTES: u32 = 1440;
pub const DEFAULT_INTERVAL_MINUTES: u32 = 5;

// ---------------------------------------------------------------------------
// Refresh interval
// ---------------------------------------------------------------------------

/// A refresh interval in whole minutes, always within
/// [`MIN_INTERVAL_MINUTES`]..=[`MAX_INTERVAL_MINUTES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefreshInterval(u32);

impl RefreshInterval {
    pub fn new(minutes: i64) -> Result<Self, ConfigError> {
        if (i64::from(MIN_INTERVAL_MINUTES)..=i64::from(MAX_INTERVAL_MINUTES)).contains(&minutes) {
            Ok(Self(minutes as u32))
        } else {
            Err(ConfigError::IntervalOutOfRange(minutes))
        }
    }

    pub fn minutes(self) -> u32 {
        self.0
    }

    /// Length of the interval when one "minute" lasts `unit`.  Production
    /// code passes 60 s; tests shrink the unit to keep timing tests fast.
    pub fn scaled(self, unit: Duration) -> Duration {
        unit * self.0
    }
}

/// Read user-typed text such as `" 15 "` as a whole number of minutes.
/// The range is checked by [`RefreshInterval::new`].
pub fn parse_minutes(text: &str) -> Result<i64, ConfigError> {
    let trimmed = text.trim();
    trimmed
        .parse::<i64>()
        .map_err(|_| ConfigError::NotANumber(trimmed.to_string()))
}

impl Default for RefreshInterval {
    fn default() -> Self {
        Self(DEFAULT_INTERVAL_MINUTES)
    }
}

// ---------------------------------------------------------------------------
// Filter rule
// ---------------------------------------------------------------------------

/// Which entries are shown (and therefore which entries can trigger a
/// notification).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterRule {
    AllEntries,
    /// Keep entries whose title or summary contains any of these lowercase
    /// keywords.  An empty list keeps everything.
    KeywordMatch(Vec<String>),
}

impl FilterRule {
    /// Build a keyword rule from a comma-separated list as typed by the user.
    pub fn from_keyword_list(text: &str) -> Self {
        Self::KeywordMatch(parse_keywords(text))
    }
}

/// Split a comma-separated keyword list, trimming and lowercasing each token
/// and dropping empty ones.
pub fn parse_keywords(text: &str) -> Vec<String> {
    text.split(',')
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

/// The persisted `notifier_type`.  Stored separately from the keyword list so
/// switching to "all" and back keeps the keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    All,
    Keywords,
}

impl FilterMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterMode::All => "all",
            FilterMode::Keywords => "keywords",
        }
    }

    fn from_record(value: &str) -> Option<Self> {
        match value {
            "all" => Some(FilterMode::All),
            "keywords" => Some(FilterMode::Keywords),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Settings {
    pub refresh_interval: RefreshInterval,
    pub filter_mode: FilterMode,
    pub keywords: Vec<String>,
    pub notifications_disabled: bool,
    pub load_on_startup: bool,
}

impl Settings {
    /// The rule the filter should apply this cycle.
    pub fn filter_rule(&self) -> FilterRule {
        match self.filter_mode {
            FilterMode::All => FilterRule::AllEntries,
            FilterMode::Keywords => FilterRule::KeywordMatch(self.keywords.clone()),
        }
    }

    pub fn set_filter_rule(&mut self, rule: FilterRule) {
        match rule {
            FilterRule::AllEntries => self.filter_mode = FilterMode::All,
            FilterRule::KeywordMatch(keywords) => {
                self.filter_mode = FilterMode::Keywords;
                self.keywords = keywords;
            }
        }
    }
}

/// On-disk shape of [`Settings`].  Out-of-range values are repaired field
/// by field in the conversion.
#[derive(Debug, Serialize)]
struct SettingsRecord {
    refresh_interval_minutes: i64,
    notifier_type: String,
    keywords: String,
    load_on_startup: bool,
    disable_notifications: bool,
}

impl SettingsRecord {
    /// Pick each field out of a JSON object on its own.  A field that is
    /// missing or has the wrong type takes its default without touching the
    /// others.
    fn from_object(object: &Map<String, Value>) -> Self {
        let defaults = Self::from(&Settings::default());
        Self {
            refresh_interval_minutes: field(object, "refresh_interval_minutes")
                .unwrap_or(defaults.refresh_interval_minutes),
            notifier_type: field(object, "notifier_type").unwrap_or(defaults.notifier_type),
            keywords: field(object, "keywords").unwrap_or(defaults.keywords),
            load_on_startup: field(object, "load_on_startup").unwrap_or(defaults.load_on_startup),
            disable_notifications: field(object, "disable_notifications")
                .unwrap_or(defaults.disable_notifications),
        }
    }
}

fn field<T: DeserializeOwned>(object: &Map<String, Value>, key: &str) -> Option<T> {
    let value = object.get(key)?;
    Deserialize::deserialize(value)
        .map_err(|err| warn!(field = key, %value, "{err}; using default"))
        .ok()
}

impl From<&Settings> for SettingsRecord {
    fn from(settings: &Settings) -> Self {
        Self {
            refresh_interval_minutes: i64::from(settings.refresh_interval.minutes()),
            notifier_type: settings.filter_mode.as_str().to_string(),
            keywords: settings.keywords.join(", "),
            load_on_startup: settings.load_on_startup,
            disable_notifications: settings.notifications_disabled,
        }
    }
}

impl From<SettingsRecord> for Settings {
    fn from(record: SettingsRecord) -> Self {
        let refresh_interval = RefreshInterval::new(record.refresh_interval_minutes)
            .unwrap_or_else(|err| {
                warn!("{err}; using {DEFAULT_INTERVAL_MINUTES}");
                RefreshInterval::default()
            });
        let filter_mode = FilterMode::from_record(&record.notifier_type).unwrap_or_else(|| {
            warn!(value = %record.notifier_type, "unknown notifier_type; using \"all\"");
            FilterMode::default()
        });

        Self {
            refresh_interval,
            filter_mode,
            keywords: parse_keywords(&record.keywords),
            notifications_disabled: record.disable_notifications,
            load_on_startup: record.load_on_startup,
        }
    }
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Read settings from `path`, reporting why that was impossible.
pub fn read_settings(path: &Path) -> Result<Settings, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            LoadError::Missing(path.to_path_buf())
        } else {
            LoadError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let object: Map<String, Value> =
        serde_json::from_str(&text).map_err(|source| LoadError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(SettingsRecord::from_object(&object).into())
}

/// Read settings from `path`, falling back to defaults on any failure.
pub fn load(path: &Path) -> Settings {
    match read_settings(path) {
        Ok(settings) => {
            info!(path = %path.display(), "loaded settings");
            settings
        }
        Err(err @ LoadError::Missing(_)) => {
            info!("{err}; using defaults");
            Settings::default()
        }
        Err(err) => {
            warn!("{err}; using defaults");
            Settings::default()
        }
    }
}

/// Overwrite `path` with the full settings record.
pub fn save(path: &Path, settings: &Settings) -> Result<(), PersistenceError> {
    let json = serde_json::to_string_pretty(&SettingsRecord::from(settings))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| PersistenceError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::write(path, json).map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Process-wide settings behind one lock.
pub struct SettingsStore {
    path: Option<PathBuf>,
    current: RwLock<Settings>,
}

impl SettingsStore {
    /// Load settings from `path`; later updates are written back there.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = load(&path);
        Self {
            path: Some(path),
            current: RwLock::new(settings),
        }
    }

    /// A store that never touches the disk.
    #[cfg(test)]
    pub fn in_memory(settings: Settings) -> Self {
        Self {
            path: None,
            current: RwLock::new(settings),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// A consistent copy of the current settings.
    pub fn snapshot(&self) -> Settings {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply `change` in memory, then persist the result.
    ///
    /// The lock is held across the write so the file always reflects the
    /// latest update.  A failed write is returned but the in-memory change
    /// stays.
    pub fn update<F>(&self, change: F) -> Result<Settings, PersistenceError>
    where
        F: FnOnce(&mut Settings),
    {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        change(&mut guard);
        let updated = guard.clone();

        if let Some(path) = &self.path {
            save(path, &updated)?;
        }
        Ok(updated)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_bounds_are_inclusive() {
        assert_eq!(RefreshInterval::new(1).unwrap().minutes(), 1);
        assert_eq!(RefreshInterval::new(1440).unwrap().minutes(), 1440);
        assert_eq!(
            RefreshInterval::new(0),
            Err(ConfigError::IntervalOutOfRange(0))
        );
        assert_eq!(
            RefreshInterval::new(1441),
            Err(ConfigError::IntervalOutOfRange(1441))
        );
        assert_eq!(
            RefreshInterval::new(-3),
            Err(ConfigError::IntervalOutOfRange(-3))
        );
    }

    #[test]
    fn parse_minutes_trims_and_rejects_text() {
        assert_eq!(parse_minutes(" 15 "), Ok(15));
        assert_eq!(parse_minutes("-2"), Ok(-2));
        assert_eq!(
            parse_minutes("soon"),
            Err(ConfigError::NotANumber("soon".to_string()))
        );
        assert_eq!(
            parse_minutes("2.5"),
            Err(ConfigError::NotANumber("2.5".to_string()))
        );
    }

    #[test]
    fn interval_scales_by_unit() {
        let interval = RefreshInterval::new(3).unwrap();
        assert_eq!(interval.scaled(Duration::from_secs(60)), Duration::from_secs(180));
        assert_eq!(interval.scaled(Duration::from_millis(10)), Duration::from_millis(30));
    }

    #[test]
    fn keywords_are_trimmed_lowercased_and_non_empty() {
        assert_eq!(
            parse_keywords(" Sale, ,BUNDLE ,,  free stuff "),
            vec!["sale", "bundle", "free stuff"]
        );
        assert!(parse_keywords("  , ,").is_empty());
        assert!(parse_keywords("").is_empty());
    }

    #[test]
    fn filter_rule_follows_mode_and_keeps_keywords() {
        let mut settings = Settings::default();
        assert_eq!(settings.filter_rule(), FilterRule::AllEntries);

        settings.set_filter_rule(FilterRule::from_keyword_list("Sale"));
        assert_eq!(
            settings.filter_rule(),
            FilterRule::KeywordMatch(vec!["sale".into()])
        );

        settings.set_filter_rule(FilterRule::AllEntries);
        assert_eq!(settings.filter_rule(), FilterRule::AllEntries);
        assert_eq!(settings.keywords, vec!["sale".to_string()]);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        assert!(matches!(read_settings(&path), Err(LoadError::Missing(_))));
        assert_eq!(load(&path), Settings::default());
    }

    #[test]
    fn malformed_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            read_settings(&path),
            Err(LoadError::Malformed { .. })
        ));
        assert_eq!(load(&path), Settings::default());
    }

    #[test]
    fn invalid_fields_default_individually() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{
                "refresh_interval_minutes": 5000,
                "notifier_type": "sometimes",
                "keywords": "Sale",
                "disable_notifications": true,
                "window_geometry": "600x500"
            }"#,
        )
        .unwrap();

        let settings = load(&path);
        assert_eq!(settings.refresh_interval, RefreshInterval::default());
        assert_eq!(settings.filter_mode, FilterMode::All);
        assert_eq!(settings.keywords, vec!["sale".to_string()]);
        assert!(settings.notifications_disabled);
        assert!(!settings.load_on_startup);
    }

    #[test]
    fn wrongly_typed_field_keeps_the_others() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{
                "refresh_interval_minutes": "30",
                "notifier_type": "keywords",
                "keywords": "sale",
                "load_on_startup": null,
                "disable_notifications": true
            }"#,
        )
        .unwrap();

        let settings = read_settings(&path).unwrap();
        assert_eq!(settings.refresh_interval, RefreshInterval::default());
        assert_eq!(settings.filter_mode, FilterMode::Keywords);
        assert_eq!(settings.keywords, vec!["sale".to_string()]);
        assert!(settings.notifications_disabled);
        assert!(!settings.load_on_startup);
    }

    #[test]
    fn float_interval_defaults_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"refresh_interval_minutes": 30.0, "keywords": ["sale"], "load_on_startup": true}"#,
        )
        .unwrap();

        let settings = load(&path);
        assert_eq!(settings.refresh_interval, RefreshInterval::default());
        assert!(settings.keywords.is_empty());
        assert!(settings.load_on_startup);
    }

    #[test]
    fn non_object_json_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        assert!(matches!(
            read_settings(&path),
            Err(LoadError::Malformed { .. })
        ));
    }

    #[test]
    fn saved_record_uses_documented_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            refresh_interval: RefreshInterval::new(30).unwrap(),
            filter_mode: FilterMode::Keywords,
            keywords: vec!["sale".into(), "bundle".into()],
            notifications_disabled: true,
            load_on_startup: true,
        };

        save(&path, &settings).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["refresh_interval_minutes"], 30);
        assert_eq!(value["notifier_type"], "keywords");
        assert_eq!(value["keywords"], "sale, bundle");
        assert_eq!(value["load_on_startup"], true);
        assert_eq!(value["disable_notifications"], true);

        assert_eq!(load(&path), settings);
    }

    #[test]
    fn update_persists_whole_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::open(&path);

        store
            .update(|s| s.refresh_interval = RefreshInterval::new(42).unwrap())
            .unwrap();

        assert_eq!(store.snapshot().refresh_interval.minutes(), 42);
        assert_eq!(load(&path).refresh_interval.minutes(), 42);
    }

    #[test]
    fn failed_write_keeps_in_memory_change() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be overwritten as a file.
        let store = SettingsStore::open(dir.path());

        let result = store.update(|s| s.notifications_disabled = true);

        assert!(matches!(result, Err(PersistenceError::Io { .. })));
        assert!(store.snapshot().notifications_disabled);
    }
}
