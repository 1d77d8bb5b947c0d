use std::sync::Arc;

use minesweeper_client::{
    BOARD_SIZES, Cell, Difficulty, GameEvent, GameSession, LeaderboardClient, MinesweeperGame,
    format_time,
};
use tokio::time::{Duration, sleep};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let server =
        std::env::var("MINESWEEPER_SERVER").unwrap_or_else(|_| "http://localhost:8000".into());
    let store = Arc::new(LeaderboardClient::new(&server)?);

    // Seeded so every run plays the same board
    let session = GameSession::seeded(usize::from(BOARD_SIZES[0]), Difficulty::Easy, 42)?;
    let mut game = MinesweeperGame::with_session(store, "example", session);
    let mut event_receiver = game.subscribe_to_events();

    let event_handler = tokio::spawn(async move {
        while let Some(event) = event_receiver.recv().await {
            match event {
                GameEvent::GameStarted {
                    size,
                    difficulty,
                    mines,
                } => println!("🎮 New {}x{} {} game with {} mines", size, size, difficulty, mines),
                GameEvent::BoardUpdated { revealed, flags } => {
                    println!("📋 {} cells revealed, {} flags", revealed, flags)
                }
                GameEvent::Tick { elapsed_secs } => println!("⏱  {}", format_time(elapsed_secs)),
                GameEvent::GameStatusChanged {
                    status,
                    elapsed_secs,
                } => println!("🏁 {:?} in {}", status, format_time(elapsed_secs)),
                GameEvent::ScoreSubmitted(entry) => {
                    println!("🏆 Recorded {} for {}", format_time(entry.time), entry.name)
                }
                GameEvent::SubmissionFailed { reason } => {
                    println!("❌ Score not recorded: {}", reason)
                }
            }
        }
    });

    // Sweep from the center outwards, skipping anything already open
    let size = game.session().size();
    let center = size / 2;
    let mut order: Vec<(usize, usize)> = (0..size)
        .flat_map(|row| (0..size).map(move |col| (row, col)))
        .collect();
    order.sort_by_key(|&(row, col)| row.abs_diff(center) + col.abs_diff(center));

    for (row, col) in order {
        if game.session().is_finished() {
            break;
        }
        if game.session().is_revealed(row, col) {
            continue;
        }
        println!("\nRevealing cell ({}, {})...", row, col);
        game.reveal(row, col)?;
        display_board(game.session());
        sleep(Duration::from_millis(200)).await;
    }

    if let Some(entry) = game.wait_for_submission().await {
        println!("\nStored as entry {}", entry.id);
    }
    match game.top_scores().await {
        Ok(scores) => {
            println!("\nTop scores:");
            for (rank, entry) in scores.iter().enumerate() {
                println!("{:>3}. {:<20} {}", rank + 1, entry.name, format_time(entry.time));
            }
        }
        Err(e) => println!("Could not fetch leaderboard: {}", e),
    }

    drop(game);
    event_handler.abort();
    let _ = event_handler.await;

    Ok(())
}

fn display_board(session: &GameSession) {
    for (row, cells) in session.cells().iter().enumerate() {
        print!("  ");
        for cell in cells {
            let symbol = match cell {
                Cell::Hidden => "·".to_string(),
                Cell::Flagged => "F".to_string(),
                Cell::Revealed { adjacent: 0 } => " ".to_string(),
                Cell::Revealed { adjacent } => adjacent.to_string(),
                Cell::Mine => "*".to_string(),
            };
            print!("{:2}", symbol);
        }
        println!("  {}", row);
    }

    print!("  ");
    for col in 0..session.size() {
        print!("{:2}", col);
    }
    println!();
}
