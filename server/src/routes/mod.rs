use std::sync::Arc;

use rocket::{
    FromForm, Request, State, catch, get,
    http::Status,
    post,
    response::status::Custom,
    serde::json::{self, Json},
    tokio::task,
};
use tracing::{error, info, instrument, warn};

use minesweeper_common::{
    models::{Difficulty, LeaderboardEntry, NewLeaderboardEntry},
    protocol::{ErrorResponse, LeaderboardQuery},
};

use crate::{
    leaderboard::Leaderboard,
    rate_limit::{ClientIp, RateLimiter},
};

type ApiError = Custom<Json<ErrorResponse>>;

fn api_error(status: Status, error: &str, details: Vec<String>) -> ApiError {
    Custom(status, Json(ErrorResponse::with_details(error, details)))
}

#[derive(Debug, FromForm)]
pub struct LeaderboardParams<'r> {
    difficulty: Option<&'r str>,
    #[field(name = "boardSize")]
    board_size: Option<u8>,
}

impl LeaderboardParams<'_> {
    fn to_query(&self) -> Result<LeaderboardQuery, ApiError> {
        let difficulty = match self.difficulty {
            None | Some("") => None,
            Some(value) => Some(value.parse::<Difficulty>().map_err(|e| {
                api_error(
                    Status::BadRequest,
                    "Invalid difficulty",
                    vec![e.to_string()],
                )
            })?),
        };

        Ok(LeaderboardQuery {
            difficulty,
            board_size: self.board_size,
        })
    }
}

#[get("/leaderboard?<params..>")]
#[instrument(level = "trace", skip(store))]
pub fn get_leaderboard(
    params: LeaderboardParams<'_>,
    store: &State<Leaderboard>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let query = params.to_query()?;
    let entries = store.top(&query);
    info!(
        "Leaderboard query {:?}/{:?} returned {} entries",
        query.difficulty,
        query.board_size,
        entries.len()
    );
    Ok(Json(entries))
}

#[post("/leaderboard", data = "<entry>")]
#[instrument(level = "trace", skip(entry, store, rate_limiter, client_ip), fields(client_ip = %client_ip.0))]
pub async fn submit_entry(
    entry: Result<Json<NewLeaderboardEntry>, json::Error<'_>>,
    store: &State<Leaderboard>,
    rate_limiter: &State<RateLimiter>,
    client_ip: ClientIp,
) -> Result<Json<LeaderboardEntry>, ApiError> {
    if let Err(status) = rate_limiter.check(&client_ip.0) {
        warn!("Rate limit exceeded for client {}", client_ip.0);
        return Err(api_error(status, "Too many submissions", Vec::new()));
    }

    let mut entry = match entry {
        Ok(Json(entry)) => entry,
        Err(e) => {
            warn!("Malformed leaderboard entry from {}: {}", client_ip.0, e);
            return Err(api_error(
                Status::BadRequest,
                "Invalid data format",
                vec![e.to_string()],
            ));
        }
    };

    entry.name = entry.name.trim().to_string();
    let problems = entry.validate();
    if !problems.is_empty() {
        warn!(
            "Rejected leaderboard entry from {}: {:?}",
            client_ip.0, problems
        );
        return Err(api_error(
            Status::BadRequest,
            "Invalid data format",
            problems,
        ));
    }

    // file-backed stores write to disk, keep that off the async workers
    let store = Arc::clone(store.inner());
    let inserted = task::spawn_blocking(move || store.insert(entry))
        .await
        .map_err(|e| e.to_string())
        .and_then(|result| result.map_err(|e| e.to_string()));

    match inserted {
        Ok(stored) => {
            info!(
                "Accepted leaderboard entry {} from {}",
                stored.id, client_ip.0
            );
            Ok(Json(stored))
        }
        Err(e) => {
            error!("Error creating leaderboard entry: {}", e);
            Err(api_error(
                Status::InternalServerError,
                "Failed to create leaderboard entry",
                Vec::new(),
            ))
        }
    }
}

#[catch(default)]
pub fn default_catcher(status: Status, request: &Request<'_>) -> Json<ErrorResponse> {
    warn!("{} {} failed with {}", request.method(), request.uri(), status);
    Json(ErrorResponse::new(
        status.reason().unwrap_or("Unknown error"),
    ))
}
