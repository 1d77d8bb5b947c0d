//! HTTP service storing and ranking won minesweeper games.
//!
//! Endpoints, mounted under `/api`:
//!
//! * `GET /api/leaderboard?difficulty=hard&boardSize=10` lists the ten fastest entries.
//! * `POST /api/leaderboard` stores a new entry.

pub mod cors;
pub mod leaderboard;
pub mod rate_limit;
pub mod routes;

use rocket::{Build, Rocket, catchers, routes};

use crate::{cors::create_cors, leaderboard::Leaderboard, rate_limit::RateLimiter};

pub fn build_rocket(store: Leaderboard, rate_limiter: RateLimiter) -> Rocket<Build> {
    rocket::build()
        .attach(create_cors())
        .manage(store)
        .manage(rate_limiter)
        .mount(
            "/api",
            routes![routes::get_leaderboard, routes::submit_entry],
        )
        .register("/", catchers![routes::default_catcher])
}
