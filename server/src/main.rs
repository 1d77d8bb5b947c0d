use std::sync::Arc;

use minesweeper_server::{
    build_rocket,
    leaderboard::{Leaderboard, MemoryStore},
    rate_limit::RateLimiter,
};
use rocket::{Build, Rocket};
use tracing::{error, info};

#[rocket::launch]
fn rocket() -> Rocket<Build> {
    tracing_subscriber::fmt::init();
    info!("🚀 Starting Minesweeper leaderboard server");

    let store = MemoryStore::from_env().unwrap_or_else(|e| {
        error!("Could not load leaderboard file, keeping entries in memory only: {}", e);
        MemoryStore::new()
    });
    info!("📊 Leaderboard holds {} entries", store.len());

    let store: Leaderboard = Arc::new(store);
    let rocket = build_rocket(store, RateLimiter::from_env());

    info!("🌐 Server configured with CORS, rate limiting, and routes");
    info!("📡 Endpoints: GET /api/leaderboard, POST /api/leaderboard");

    rocket
}
