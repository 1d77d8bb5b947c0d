use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use chrono::Utc;
use dashmap::{DashMap, Entry};
use nanoid::nanoid;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use minesweeper_common::{
    models::{LeaderboardEntry, NewLeaderboardEntry},
    protocol::{LEADERBOARD_LIMIT, LeaderboardQuery},
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access leaderboard file: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode leaderboard: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Storage behind the leaderboard endpoints.
pub trait LeaderboardStore: Send + Sync {
    /// Stores a validated entry, assigning its id and date.
    fn insert(&self, entry: NewLeaderboardEntry) -> Result<LeaderboardEntry, StoreError>;

    /// Fastest matching entries, at most [`LEADERBOARD_LIMIT`].
    fn top(&self, query: &LeaderboardQuery) -> Vec<LeaderboardEntry>;
}

pub type Leaderboard = Arc<dyn LeaderboardStore>;

/// Entries kept in memory, optionally mirrored to a JSON file.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, LeaderboardEntry>,
    path: Option<PathBuf>,
    write_lock: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads entries from `path` and rewrites it after every insert.
    /// A missing file starts an empty leaderboard.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = DashMap::new();

        match fs::read_to_string(&path) {
            Ok(text) => {
                let loaded: Vec<LeaderboardEntry> = serde_json::from_str(&text)?;
                info!(
                    "Loaded {} leaderboard entries from {}",
                    loaded.len(),
                    path.display()
                );
                for entry in loaded {
                    entries.insert(entry.id.clone(), entry);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(
                    "No leaderboard file at {}, starting empty",
                    path.display()
                );
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Self {
            entries,
            path: Some(path),
            write_lock: Mutex::new(()),
        })
    }

    /// Uses `LEADERBOARD_FILE` when set, otherwise keeps entries in memory only.
    pub fn from_env() -> Result<Self, StoreError> {
        match env::var("LEADERBOARD_FILE") {
            Ok(path) if !path.trim().is_empty() => Self::open(path.trim()),
            _ => {
                info!("LEADERBOARD_FILE not set, leaderboard is kept in memory");
                Ok(Self::new())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[instrument(level = "trace", skip(self, entry))]
    fn add_entry(&self, entry: NewLeaderboardEntry) -> LeaderboardEntry {
        let mut id_length = 10;
        let max_attempts_per_length = 10;

        loop {
            for _ in 0..max_attempts_per_length {
                let id = nanoid!(id_length);
                match self.entries.entry(id.clone()) {
                    Entry::Occupied(_) => {
                        debug!("Entry ID collision, trying another: {}", id);
                        continue;
                    }
                    Entry::Vacant(vacant) => {
                        let stored = LeaderboardEntry {
                            id,
                            name: entry.name,
                            time: entry.time,
                            difficulty: entry.difficulty,
                            board_size: entry.board_size,
                            date: Utc::now(),
                        };
                        vacant.insert(stored.clone());
                        return stored;
                    }
                }
            }

            warn!(
                "Exhausted ID attempts at length {}, increasing to {}",
                id_length,
                id_length + 1
            );
            id_length += 1;
        }
    }

    /// Rewrites the whole file. Callers hold `write_lock`.
    fn persist(&self, path: &Path) -> Result<(), StoreError> {
        let mut all: Vec<LeaderboardEntry> = self
            .entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by(|a, b| a.date.cmp(&b.date));

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&all)?)?;
        fs::rename(&tmp, path)?;
        debug!("Wrote {} entries to {}", all.len(), path.display());
        Ok(())
    }
}

impl LeaderboardStore for MemoryStore {
    fn insert(&self, entry: NewLeaderboardEntry) -> Result<LeaderboardEntry, StoreError> {
        // held until the file matches memory again, rollback included
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let stored = self.add_entry(entry);

        if let Some(path) = &self.path
            && let Err(e) = self.persist(path)
        {
            self.entries.remove(&stored.id);
            return Err(e);
        }

        info!(
            "Stored leaderboard entry {}: {} in {}s on {} {}x{}",
            stored.id,
            stored.name,
            stored.time,
            stored.difficulty,
            stored.board_size,
            stored.board_size
        );
        Ok(stored)
    }

    fn top(&self, query: &LeaderboardQuery) -> Vec<LeaderboardEntry> {
        let mut matching: Vec<LeaderboardEntry> = self
            .entries
            .iter()
            .filter(|entry| query.matches(entry.difficulty, entry.board_size))
            .map(|entry| entry.value().clone())
            .collect();

        matching.sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.date.cmp(&b.date)));
        matching.truncate(LEADERBOARD_LIMIT);
        matching
    }
}

#[cfg(test)]
mod tests {
    use minesweeper_common::models::Difficulty;

    use super::*;

    fn entry(name: &str, time: u32, difficulty: Difficulty, board_size: u8) -> NewLeaderboardEntry {
        NewLeaderboardEntry {
            name: name.to_string(),
            time,
            difficulty,
            board_size,
        }
    }

    fn temp_file(name: &str) -> PathBuf {
        env::temp_dir().join(format!("minesweeper-{}-{}.json", name, nanoid!(8)))
    }

    #[test]
    fn insert_assigns_id_and_date() {
        let store = MemoryStore::new();
        let stored = store.insert(entry("ada", 31, Difficulty::Hard, 10)).unwrap();

        assert_eq!(stored.id.len(), 10);
        assert_eq!(stored.name, "ada");
        assert!(stored.date <= Utc::now());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn top_ranks_by_time_and_caps_results() {
        let store = MemoryStore::new();
        for time in (1..=15).rev() {
            store
                .insert(entry(&format!("p{time}"), time * 10, Difficulty::Easy, 8))
                .unwrap();
        }
        store.insert(entry("other", 1, Difficulty::Hard, 8)).unwrap();

        let top = store.top(&LeaderboardQuery::new(Difficulty::Easy, 8));

        assert_eq!(top.len(), LEADERBOARD_LIMIT);
        let times: Vec<u32> = top.iter().map(|e| e.time).collect();
        assert_eq!(times, (1..=10).map(|t| t * 10).collect::<Vec<_>>());
    }

    #[test]
    fn top_filters_by_board_size_only_when_asked() {
        let store = MemoryStore::new();
        store.insert(entry("small", 50, Difficulty::Medium, 8)).unwrap();
        store.insert(entry("large", 40, Difficulty::Medium, 16)).unwrap();

        let sized = store.top(&LeaderboardQuery::new(Difficulty::Medium, 8));
        assert_eq!(sized.len(), 1);
        assert_eq!(sized[0].name, "small");

        let any_size = store.top(&LeaderboardQuery {
            difficulty: Some(Difficulty::Medium),
            board_size: None,
        });
        assert_eq!(any_size.len(), 2);
        assert_eq!(any_size[0].name, "large");
    }

    #[test]
    fn equal_times_keep_submission_order() {
        let store = MemoryStore::new();
        store.insert(entry("first", 20, Difficulty::Easy, 8)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        store.insert(entry("second", 20, Difficulty::Easy, 8)).unwrap();

        let top = store.top(&LeaderboardQuery::default());
        assert_eq!(top[0].name, "first");
        assert_eq!(top[1].name, "second");
    }

    #[test]
    fn persisted_entries_survive_reopen() {
        let path = temp_file("reopen");
        {
            let store = MemoryStore::open(&path).unwrap();
            assert!(store.is_empty());
            store.insert(entry("ada", 12, Difficulty::Impossible, 16)).unwrap();
        }

        let reopened = MemoryStore::open(&path).unwrap();
        let top = reopened.top(&LeaderboardQuery::default());
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].name, "ada");
        assert_eq!(top[0].difficulty, Difficulty::Impossible);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn concurrent_inserts_match_the_file() {
        let path = temp_file("concurrent");
        let store = Arc::new(MemoryStore::open(&path).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for j in 0..5 {
                        store
                            .insert(entry(&format!("p{i}-{j}"), i * 10 + j, Difficulty::Easy, 8))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let reopened = MemoryStore::open(&path).unwrap();
        assert_eq!(store.len(), 40);
        assert_eq!(reopened.len(), 40);
        assert!(
            store
                .entries
                .iter()
                .all(|e| reopened.entries.contains_key(e.key()))
        );

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn failed_write_rolls_the_entry_back() {
        let path = env::temp_dir()
            .join(format!("minesweeper-missing-{}", nanoid!(8)))
            .join("leaderboard.json");
        let store = Arc::new(MemoryStore::open(&path).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.insert(entry("ada", i, Difficulty::Hard, 10)))
            })
            .collect();
        for handle in handles {
            assert!(matches!(handle.join().unwrap(), Err(StoreError::Io(_))));
        }

        assert!(store.is_empty());
        assert!(store.top(&LeaderboardQuery::default()).is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let path = temp_file("corrupt");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            MemoryStore::open(&path),
            Err(StoreError::Serialization(_))
        ));

        fs::remove_file(&path).unwrap();
    }
}
