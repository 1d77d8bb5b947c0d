use rocket::http::Method;
use rocket_cors::{AllowedHeaders, AllowedOrigins, CorsOptions};
use std::env;

pub fn create_cors() -> rocket_cors::Cors {
    let allowed_origins_env =
        env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "http://localhost:3000".to_string());

    let allowed_origins: Vec<String> = allowed_origins_env
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    CorsOptions {
        allowed_origins: AllowedOrigins::some_exact(&allowed_origins),
        allowed_methods: [Method::Get, Method::Post, Method::Options]
            .into_iter()
            .map(|m| m.into())
            .collect(),
        allowed_headers: AllowedHeaders::some(&["Accept", "Content-Type"]),
        allow_credentials: false,
        ..Default::default()
    }
    .to_cors()
    .expect("Failed to create CORS configuration")
}
