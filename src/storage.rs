use crate::config::atomic_rename;
use crate::model::STAT_MAX;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
#[cfg(test)]
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

const HUNGER_LOSS: i64 = 20;
const HUNGER_PERIOD_SECS: i64 = 24 * 3600;
const JOY_LOSS: i64 = 20;
const JOY_PERIOD_SECS: i64 = 4 * 3600;

#[derive(Debug, Error)]
pub(crate) enum StorageError {
    #[error("stat file i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stat file is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// The persisted stat snapshot. Always written as a whole.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StatRecord {
    pub(crate) hunger: i32,
    pub(crate) joy: i32,
    /// Unix seconds of the last load. `None` on a fresh install.
    #[serde(default, deserialize_with = "unix_seconds")]
    pub(crate) last_checked: Option<i64>,
}

// Older saves carry fractional seconds; whole seconds are enough for decay.
fn unix_seconds<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let secs = Option::<f64>::deserialize(d)?;
    Ok(secs.filter(|s| s.is_finite()).map(|s| s.floor() as i64))
}

impl Default for StatRecord {
    fn default() -> Self {
        Self {
            hunger: 50,
            joy: 50,
            last_checked: None,
        }
    }
}

impl StatRecord {
    /// Applies real-time decay since `last_checked` and stamps `now`.
    pub(crate) fn decayed(self, now: DateTime<Utc>) -> Self {
        let now_secs = now.timestamp();
        let last = self.last_checked.unwrap_or(now_secs);
        // a clock that went backwards never restores stats
        let elapsed = (now_secs - last).max(0);

        let hunger_loss = elapsed.saturating_mul(HUNGER_LOSS) / HUNGER_PERIOD_SECS;
        let joy_loss = elapsed.saturating_mul(JOY_LOSS) / JOY_PERIOD_SECS;

        Self {
            hunger: decay_stat(self.hunger, hunger_loss),
            joy: decay_stat(self.joy, joy_loss),
            last_checked: Some(now_secs),
        }
    }
}

fn decay_stat(value: i32, loss: i64) -> i32 {
    let value = value.clamp(0, STAT_MAX) as i64;
    (value - loss).max(0) as i32
}

/// Backing store for the stat record.
pub(crate) trait StatStore {
    /// Returns `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<StatRecord>, StorageError>;
    fn save(&self, record: &StatRecord) -> Result<(), StorageError>;
}

/// JSON file rewritten atomically on every save.
pub(crate) struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[cfg(test)]
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Moves an unreadable file out of the way so the fresh record written
    /// next does not destroy it.
    fn set_aside(&self) {
        let bad = self.path.with_extension("json.bad");
        match atomic_rename(&self.path, &bad) {
            Ok(()) => tracing::warn!(path = %bad.display(), "unreadable stat file moved aside"),
            Err(err) => tracing::warn!(%err, "could not move unreadable stat file aside"),
        }
    }
}

impl StatStore for JsonFileStore {
    fn load(&self) -> Result<Option<StatRecord>, StorageError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&data) {
            Ok(record) => Ok(Some(record)),
            Err(err) => {
                self.set_aside();
                Err(err.into())
            }
        }
    }

    fn save(&self, record: &StatRecord) -> Result<(), StorageError> {
        let tmp = self.path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(record)?;
        fs::write(&tmp, data)?;
        atomic_rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Hunger and joy held in memory, decayed once at load and flushed to the
/// store whenever a setter changed them.
pub(crate) struct PersistentStats {
    record: StatRecord,
    store: Box<dyn StatStore>,
    dirty: bool,
}

impl PersistentStats {
    /// Loads the record, applies decay since the last check and persists the
    /// refreshed snapshot straight away.
    pub(crate) fn load(store: Box<dyn StatStore>, now: DateTime<Utc>) -> Self {
        let stored = match store.load() {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::info!("no saved stats, starting from defaults");
                StatRecord::default()
            }
            Err(err) => {
                tracing::warn!(%err, "saved stats unreadable, starting from defaults");
                StatRecord::default()
            }
        };

        let record = stored.decayed(now);
        tracing::info!(
            hunger = record.hunger,
            joy = record.joy,
            hunger_lost = stored.hunger.clamp(0, STAT_MAX) - record.hunger,
            joy_lost = stored.joy.clamp(0, STAT_MAX) - record.joy,
            "stats loaded"
        );

        let mut stats = Self {
            record,
            store,
            dirty: true,
        };
        stats.flush();
        stats
    }

    pub(crate) fn hunger(&self) -> i32 {
        self.record.hunger
    }

    pub(crate) fn joy(&self) -> i32 {
        self.record.joy
    }

    #[cfg(test)]
    pub(crate) fn record(&self) -> StatRecord {
        self.record
    }

    #[cfg(test)]
    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Values outside the open range (0, 100) are dropped.
    pub(crate) fn set_hunger(&mut self, value: i32) {
        if in_settable_range(value) {
            self.record.hunger = value;
            self.dirty = true;
        }
    }

    /// Values outside the open range (0, 100) are dropped.
    pub(crate) fn set_joy(&mut self, value: i32) {
        if in_settable_range(value) {
            self.record.joy = value;
            self.dirty = true;
        }
    }

    /// Writes the record if it changed. Failures keep the record dirty so
    /// the next flush retries.
    pub(crate) fn flush(&mut self) {
        if !self.dirty {
            return;
        }
        match self.store.save(&self.record) {
            Ok(()) => self.dirty = false,
            Err(err) => tracing::warn!(%err, "failed to save stats"),
        }
    }
}

fn in_settable_range(value: i32) -> bool {
    value > 0 && value < STAT_MAX
}


#[cfg(test)]
mod tests {
    use super::testing::MemoryStore;
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn stats_with(hunger: i32, joy: i32, last: Option<i64>) -> (PersistentStats, MemoryStore) {
        let store = MemoryStore::with_record(StatRecord {
            hunger,
            joy,
            last_checked: last,
        });
        let stats = PersistentStats::load(Box::new(store.clone()), at(1_700_000_000));
        (stats, store)
    }

    #[test]
    fn decay_matches_daily_and_four_hourly_rates() {
        let t0 = 1_700_000_000;
        for elapsed in [0_i64, 1, 719, 720, 4_319, 4_320, 14_400, 86_399, 86_400, 200_000] {
            let rec = StatRecord {
                hunger: 90,
                joy: 90,
                last_checked: Some(t0),
            }
            .decayed(at(t0 + elapsed));

            let hunger_loss = (elapsed as f64 / 86_400.0 * 20.0).floor() as i32;
            let joy_loss = (elapsed as f64 / 14_400.0 * 20.0).floor() as i32;
            assert_eq!(rec.hunger, (90 - hunger_loss).max(0), "hunger after {elapsed}s");
            assert_eq!(rec.joy, (90 - joy_loss).max(0), "joy after {elapsed}s");
            assert_eq!(rec.last_checked, Some(t0 + elapsed));
        }
    }

    #[test]
    fn decay_never_increases_stats() {
        let rec = StatRecord {
            hunger: 40,
            joy: 40,
            last_checked: Some(2_000),
        };
        // clock moved backwards
        let back = rec.decayed(at(1_000));
        assert_eq!((back.hunger, back.joy), (40, 40));

        let long = rec.decayed(at(2_000 + 30 * 86_400));
        assert_eq!((long.hunger, long.joy), (0, 0));
    }

    #[test]
    fn null_last_checked_means_now() {
        let rec = StatRecord {
            hunger: 70,
            joy: 20,
            last_checked: None,
        }
        .decayed(at(5_000));
        assert_eq!((rec.hunger, rec.joy), (70, 20));
        assert_eq!(rec.last_checked, Some(5_000));
    }

    #[test]
    fn load_persists_refreshed_snapshot() {
        let t0 = 1_700_000_000 - 14_400;
        let (stats, store) = stats_with(60, 60, Some(t0));
        assert_eq!(stats.joy(), 40);
        assert_eq!(stats.hunger(), 60 - 3);
        assert!(!stats.is_dirty());
        assert_eq!(store.snapshot(), Some(stats.record()));
        assert_eq!(store.snapshot().unwrap().last_checked, Some(1_700_000_000));
    }

    #[test]
    fn first_run_uses_default_record() {
        let store = MemoryStore::default();
        let stats = PersistentStats::load(Box::new(store.clone()), at(10));
        assert_eq!((stats.hunger(), stats.joy()), (50, 50));
        assert_eq!(
            store.snapshot(),
            Some(StatRecord {
                hunger: 50,
                joy: 50,
                last_checked: Some(10)
            })
        );
    }

    #[test]
    fn setters_drop_values_outside_open_range() {
        let (mut stats, store) = stats_with(50, 50, None);
        for v in [-5, 0, 100, 130] {
            stats.set_hunger(v);
            stats.set_joy(v);
            assert_eq!((stats.hunger(), stats.joy()), (50, 50), "value {v}");
        }
        assert!(!stats.is_dirty());

        for v in [1, 42, 99] {
            stats.set_hunger(v);
            stats.set_joy(v);
            stats.flush();
            assert_eq!(store.snapshot().map(|r| (r.hunger, r.joy)), Some((v, v)));
        }
    }

    #[test]
    fn flush_writes_whole_record_once() {
        let (mut stats, store) = stats_with(50, 50, None);
        stats.set_joy(61);
        assert!(stats.is_dirty());
        assert_eq!(store.snapshot().unwrap().joy, 50);
        stats.flush();
        assert!(!stats.is_dirty());
        let saved = store.snapshot().unwrap();
        assert_eq!((saved.hunger, saved.joy), (50, 61));
        assert!(saved.last_checked.is_some());
    }

    #[test]
    fn json_store_round_trips_and_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("stats.json"));
        assert!(store.load().unwrap().is_none());

        let rec = StatRecord {
            hunger: 12,
            joy: 88,
            last_checked: Some(1_234),
        };
        store.save(&rec).unwrap();
        assert_eq!(store.load().unwrap(), Some(rec));
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn json_store_accepts_null_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        fs::write(&path, r#"{"hunger": 30, "joy": 75, "last_checked": null}"#).unwrap();
        let rec = JsonFileStore::new(&path).load().unwrap().unwrap();
        assert_eq!(rec.last_checked, None);
        assert_eq!((rec.hunger, rec.joy), (30, 75));
    }

    #[test]
    fn corrupt_file_is_kept_aside_and_defaults_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        fs::write(&path, "not json").unwrap();
        let stats = PersistentStats::load(Box::new(JsonFileStore::new(&path)), at(99));
        assert_eq!((stats.hunger(), stats.joy()), (50, 50));
        let rec = JsonFileStore::new(&path).load().unwrap().unwrap();
        assert_eq!(rec.last_checked, Some(99));
        let kept = fs::read_to_string(dir.path().join("stats.json.bad")).unwrap();
        assert_eq!(kept, "not json");
    }

    #[test]
    fn fractional_timestamp_from_device_save_is_floored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        fs::write(
            &path,
            r#"{"hunger": 80, "joy": 60, "last_checked": 1700000000.25}"#,
        )
        .unwrap();
        let rec = JsonFileStore::new(&path).load().unwrap().unwrap();
        assert_eq!(rec.last_checked, Some(1_700_000_000));

        let stats = PersistentStats::load(Box::new(JsonFileStore::new(&path)), at(1_700_014_400));
        assert_eq!((stats.hunger(), stats.joy()), (77, 40));
        let saved = JsonFileStore::new(&path).load().unwrap().unwrap();
        assert_eq!((saved.hunger, saved.joy), (77, 40));
        assert_eq!(saved.last_checked, Some(1_700_014_400));
        assert!(!dir.path().join("stats.json.bad").exists());
    }

    #[test]
    fn missing_timestamp_field_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        fs::write(&path, r#"{"hunger": 10, "joy": 20}"#).unwrap();
        let rec = JsonFileStore::new(&path).load().unwrap().unwrap();
        assert_eq!(rec.last_checked, None);
    }
}
