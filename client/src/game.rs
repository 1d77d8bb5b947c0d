use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use minesweeper_common::models::{Difficulty, GameStatus, LeaderboardEntry, NewLeaderboardEntry};
use minesweeper_core::{FlagOutcome, GameSession, RevealOutcome};
use tokio::{runtime::Handle, sync::mpsc, task::JoinHandle, time};
use tracing::{debug, info, instrument, warn};

use crate::{LeaderboardStore, Result};

/// Events emitted while a game is played
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// A fresh board was dealt
    GameStarted {
        size: usize,
        difficulty: Difficulty,
        mines: usize,
    },
    /// Cells were revealed or a flag changed
    BoardUpdated {
        revealed: usize,
        flags: usize,
    },
    /// One more second passed in the running game
    Tick { elapsed_secs: u32 },
    /// The game was won or lost
    GameStatusChanged {
        status: GameStatus,
        elapsed_secs: u32,
    },
    /// The leaderboard accepted the winning time
    ScoreSubmitted(LeaderboardEntry),
    /// The leaderboard could not be reached or refused the entry
    SubmissionFailed { reason: String },
}

/// Stopwatch for one game. Frozen once the game ends.
#[derive(Debug, Clone, Copy)]
struct Stopwatch {
    started_at: Instant,
    stopped_after: Option<Duration>,
}

impl Stopwatch {
    fn start() -> Self {
        Self {
            started_at: Instant::now(),
            stopped_after: None,
        }
    }

    fn stop(&mut self) {
        if self.stopped_after.is_none() {
            self.stopped_after = Some(self.started_at.elapsed());
        }
    }

    fn elapsed(&self) -> Duration {
        self.stopped_after
            .unwrap_or_else(|| self.started_at.elapsed())
    }

    fn elapsed_secs(&self) -> u32 {
        u32::try_from(self.elapsed().as_secs()).unwrap_or(u32::MAX)
    }
}

/// A single-player game that times itself and reports wins to a leaderboard.
///
/// Moves are applied synchronously to the wrapped [`GameSession`]. The once-a-second
/// ticker and the score submission run as tokio tasks when a runtime is available.
pub struct MinesweeperGame<S: LeaderboardStore> {
    session: GameSession,
    store: Arc<S>,
    player_name: String,
    stopwatch: Stopwatch,
    ticker: Option<JoinHandle<()>>,
    submission: Option<JoinHandle<Option<LeaderboardEntry>>>,
    event_sender: Option<mpsc::UnboundedSender<GameEvent>>,
}

impl<S: LeaderboardStore> MinesweeperGame<S> {
    /// Deal a new board and start the clock
    pub fn new(
        store: Arc<S>,
        player_name: impl Into<String>,
        size: usize,
        difficulty: Difficulty,
    ) -> minesweeper_core::Result<Self> {
        let session = GameSession::new(size, difficulty)?;
        Ok(Self::with_session(store, player_name, session))
    }

    /// Play an already prepared session, e.g. a seeded or hand-made board
    pub fn with_session(store: Arc<S>, player_name: impl Into<String>, session: GameSession) -> Self {
        Self {
            session,
            store,
            player_name: player_name.into(),
            stopwatch: Stopwatch::start(),
            ticker: None,
            submission: None,
            event_sender: None,
        }
    }

    /// Subscribe to game events. Replaces any earlier subscriber.
    pub fn subscribe_to_events(&mut self) -> mpsc::UnboundedReceiver<GameEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.event_sender = Some(sender);
        self.start_ticker();
        receiver
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn status(&self) -> GameStatus {
        self.session.status()
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn set_player_name(&mut self, name: impl Into<String>) {
        self.player_name = name.into();
    }

    /// Whole seconds since the game started, frozen once it ended
    pub fn elapsed_secs(&self) -> u32 {
        self.stopwatch.elapsed_secs()
    }

    /// Abandon the current game and start another one
    #[instrument(level = "trace", skip(self))]
    pub fn new_game(&mut self, size: usize, difficulty: Difficulty) -> minesweeper_core::Result<()> {
        self.session.new_game(size, difficulty)?;
        self.begin();
        Ok(())
    }

    /// Start over with the same size and difficulty
    pub fn restart(&mut self) -> minesweeper_core::Result<()> {
        self.session.restart()?;
        self.begin();
        Ok(())
    }

    fn begin(&mut self) {
        self.stopwatch = Stopwatch::start();
        self.emit(GameEvent::GameStarted {
            size: self.session.size(),
            difficulty: self.session.difficulty(),
            mines: self.session.mine_count(),
        });
        self.start_ticker();
    }

    #[instrument(level = "trace", skip(self))]
    pub fn reveal(&mut self, row: usize, col: usize) -> minesweeper_core::Result<RevealOutcome> {
        let before = self.session.status();
        let outcome = self.session.reveal(row, col)?;

        if outcome.has_update() {
            self.emit_board_update();
        }
        if self.session.status() != before {
            self.finish();
        }
        Ok(outcome)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn toggle_flag(&mut self, row: usize, col: usize) -> minesweeper_core::Result<FlagOutcome> {
        let outcome = self.session.toggle_flag(row, col)?;
        if outcome.has_update() {
            self.emit_board_update();
        }
        Ok(outcome)
    }

    /// Fastest entries for the current board, for display
    pub async fn top_scores(&self) -> Result<Vec<LeaderboardEntry>> {
        let board_size = u8::try_from(self.session.size()).unwrap_or(u8::MAX);
        self.store.query(self.session.difficulty(), board_size).await
    }

    /// Wait for the score submission of the last won game, if one is pending
    pub async fn wait_for_submission(&mut self) -> Option<LeaderboardEntry> {
        let handle = self.submission.take()?;
        match handle.await {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Score submission task failed: {}", e);
                None
            }
        }
    }

    fn finish(&mut self) {
        self.stopwatch.stop();
        self.stop_ticker();

        let status = self.session.status();
        let elapsed_secs = self.stopwatch.elapsed_secs();
        info!("Game finished with {:?} after {}s", status, elapsed_secs);
        self.emit(GameEvent::GameStatusChanged {
            status,
            elapsed_secs,
        });

        if status == GameStatus::Won {
            self.submit_score(elapsed_secs);
        }
    }

    fn submit_score(&mut self, time: u32) {
        let entry = NewLeaderboardEntry {
            name: self.player_name.trim().to_string(),
            time,
            difficulty: self.session.difficulty(),
            board_size: u8::try_from(self.session.size()).unwrap_or(u8::MAX),
        };

        if !entry.is_valid() {
            info!("Not submitting score: {}", entry.validate().join("; "));
            return;
        }

        let Ok(runtime) = Handle::try_current() else {
            warn!("No async runtime available, score for {} not submitted", entry.name);
            return;
        };

        let store = Arc::clone(&self.store);
        let sender = self.event_sender.clone();
        debug!("Submitting {}s on {} {}x{}", time, entry.difficulty, entry.board_size, entry.board_size);

        self.submission = Some(runtime.spawn(async move {
            match store.submit(entry).await {
                Ok(stored) => {
                    info!("Score submitted as entry {}", stored.id);
                    if let Some(sender) = sender {
                        let _ = sender.send(GameEvent::ScoreSubmitted(stored.clone()));
                    }
                    Some(stored)
                }
                Err(e) => {
                    warn!("Error adding leaderboard entry: {}", e);
                    if let Some(sender) = sender {
                        let _ = sender.send(GameEvent::SubmissionFailed {
                            reason: e.to_string(),
                        });
                    }
                    None
                }
            }
        }));
    }

    fn emit_board_update(&self) {
        self.emit(GameEvent::BoardUpdated {
            revealed: self.session.revealed_count(),
            flags: self.session.flag_count(),
        });
    }

    fn emit(&self, event: GameEvent) {
        if let Some(sender) = &self.event_sender {
            let _ = sender.send(event);
        }
    }

    fn start_ticker(&mut self) {
        self.stop_ticker();

        if self.session.is_finished() {
            return;
        }
        let Some(sender) = self.event_sender.clone() else {
            return;
        };
        let Ok(runtime) = Handle::try_current() else {
            debug!("No async runtime available, running without ticker");
            return;
        };

        let stopwatch = self.stopwatch;
        self.ticker = Some(runtime.spawn(async move {
            let mut interval = time::interval(Duration::from_secs(1));
            // the first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let tick = GameEvent::Tick {
                    elapsed_secs: stopwatch.elapsed_secs(),
                };
                if sender.send(tick).is_err() {
                    break;
                }
            }
        }));
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

impl<S: LeaderboardStore> Drop for MinesweeperGame<S> {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;
    use minesweeper_core::Board;
    use rand::{SeedableRng, rngs::StdRng};
    use tokio_test::assert_ok;

    use super::*;

    #[derive(Default)]
    struct FakeStore {
        submitted: Mutex<Vec<NewLeaderboardEntry>>,
        fail: bool,
    }

    impl FakeStore {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn submitted(&self) -> Vec<NewLeaderboardEntry> {
            self.submitted.lock().unwrap().clone()
        }
    }

    impl LeaderboardStore for FakeStore {
        async fn submit(&self, entry: NewLeaderboardEntry) -> Result<LeaderboardEntry> {
            if self.fail {
                return Err("Failed to add leaderboard entry: 500".into());
            }
            self.submitted.lock().unwrap().push(entry.clone());
            Ok(LeaderboardEntry {
                id: "entry-1".into(),
                name: entry.name,
                time: entry.time,
                difficulty: entry.difficulty,
                board_size: entry.board_size,
                date: Utc::now(),
            })
        }

        async fn query(&self, difficulty: Difficulty, board_size: u8) -> Result<Vec<LeaderboardEntry>> {
            Ok(self
                .submitted()
                .into_iter()
                .filter(|e| e.difficulty == difficulty && e.board_size == board_size)
                .map(|e| LeaderboardEntry {
                    id: "entry-1".into(),
                    name: e.name,
                    time: e.time,
                    difficulty: e.difficulty,
                    board_size: e.board_size,
                    date: Utc::now(),
                })
                .collect())
        }
    }

    fn single_mine_game(store: Arc<FakeStore>, size: usize) -> MinesweeperGame<FakeStore> {
        let board = Board::from_mines(size, &[(0, 0)]).unwrap();
        let session = GameSession::from_board(board, Difficulty::Hard, StdRng::seed_from_u64(1));
        MinesweeperGame::with_session(store, "ada", session)
    }

    #[tokio::test]
    async fn win_submits_score_once() {
        let store = Arc::new(FakeStore::default());
        let mut game = single_mine_game(Arc::clone(&store), 8);

        let outcome = assert_ok!(game.reveal(7, 7));
        assert!(matches!(outcome, RevealOutcome::Won { .. }));

        let stored = game.wait_for_submission().await.expect("stored entry");
        assert_eq!(stored.name, "ada");
        assert_eq!(stored.board_size, 8);
        assert_eq!(stored.difficulty, Difficulty::Hard);

        assert_ok!(game.reveal(0, 0));
        assert_ok!(game.reveal(3, 3));
        assert!(game.wait_for_submission().await.is_none());
        assert_eq!(store.submitted().len(), 1);
        assert_eq!(game.top_scores().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn loss_submits_nothing() {
        let store = Arc::new(FakeStore::default());
        let mut game = single_mine_game(Arc::clone(&store), 8);

        assert_eq!(assert_ok!(game.reveal(0, 0)), RevealOutcome::Lost);

        assert_eq!(game.status(), GameStatus::Lost);
        assert!(game.wait_for_submission().await.is_none());
        assert!(store.submitted().is_empty());
    }

    #[tokio::test]
    async fn failed_submission_keeps_the_win() {
        let store = Arc::new(FakeStore::failing());
        let mut game = single_mine_game(Arc::clone(&store), 8);
        let mut events = game.subscribe_to_events();

        assert_ok!(game.reveal(7, 7));
        assert!(game.wait_for_submission().await.is_none());
        assert_eq!(game.status(), GameStatus::Won);

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert!(seen.iter().any(|e| matches!(
            e,
            GameEvent::GameStatusChanged {
                status: GameStatus::Won,
                ..
            }
        )));
        assert!(seen
            .iter()
            .any(|e| matches!(e, GameEvent::SubmissionFailed { .. })));
    }

    #[tokio::test]
    async fn boards_outside_leaderboard_sizes_are_not_submitted() {
        let store = Arc::new(FakeStore::default());
        let mut game = single_mine_game(Arc::clone(&store), 5);

        assert_ok!(game.reveal(4, 4));

        assert_eq!(game.status(), GameStatus::Won);
        assert!(game.wait_for_submission().await.is_none());
        assert!(store.submitted().is_empty());
    }

    #[tokio::test]
    async fn new_game_restarts_clock_and_reports_board() {
        let store = Arc::new(FakeStore::default());
        let mut game = single_mine_game(store, 8);
        let mut events = game.subscribe_to_events();
        game.reveal(0, 0).unwrap();

        assert_ok!(game.new_game(10, Difficulty::Hard));

        assert_eq!(game.status(), GameStatus::InProgress);
        assert_eq!(game.session().mine_count(), 20);
        assert_eq!(game.elapsed_secs(), 0);

        let mut started = None;
        while let Ok(event) = events.try_recv() {
            if let GameEvent::GameStarted { .. } = event {
                started = Some(event);
            }
        }
        assert_eq!(
            started,
            Some(GameEvent::GameStarted {
                size: 10,
                difficulty: Difficulty::Hard,
                mines: 20,
            })
        );
    }

    #[test]
    fn plays_without_a_runtime() {
        let store = Arc::new(FakeStore::default());
        let mut game = single_mine_game(Arc::clone(&store), 8);

        assert!(matches!(game.reveal(7, 7), Ok(RevealOutcome::Won { .. })));
        assert!(store.submitted().is_empty());
    }

    #[test]
    fn stopwatch_freezes_when_stopped() {
        let mut stopwatch = Stopwatch::start();
        stopwatch.stop();
        let frozen = stopwatch.elapsed();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(stopwatch.elapsed(), frozen);
    }
}
