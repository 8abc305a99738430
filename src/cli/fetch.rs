use std::time::Instant;

use crate::{api::AppState, config::Config, error, info, success};

/// Runs `GET <api>/<path>` through the proxy once and prints the body.
///
/// `query` items are `key=value` strings. With a `token`, the request is sent
/// as if the caller had passed `Authorization: Bearer <token>`.
pub async fn fetch(config: Config, path: String, query: Vec<String>, token: Option<String>) {
    let query = match parse_query_items(&query) {
        Ok(query) => query,
        Err(item) => error!("Invalid query item '{}', expected key=value", item),
    };

    let state = match AppState::new(config) {
        Ok(state) => state,
        Err(e) => error!("Cannot initialise the proxy. Err: {}", e),
    };

    let auth = token.map(|t| format!("Bearer {t}"));
    let pb = super::spinner(&format!("Fetching {}...", path));
    let started = Instant::now();
    let result = state.proxy.handle(&path, &query, auth.as_deref()).await;
    pb.finish_and_clear();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => error!("Request failed ({}). Err: {}", e.status(), e),
    };

    success!("Fetched {} in {:?}", path, started.elapsed());
    info!(
        "cache: {}, token: {}",
        outcome.cache.as_str(),
        outcome.class.as_str()
    );
    if let Some(ttl) = outcome.ttl {
        info!("cached for {}s", ttl.as_secs());
    }

    match outcome.data {
        Some(data) => match serde_json::to_string_pretty(&data) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Cannot print response. Err: {}", e),
        },
        None => info!("No content"),
    }
}

/// Splits `key=value` items, returning the first malformed one on failure.
pub fn parse_query_items(items: &[String]) -> Result<Vec<(String, String)>, String> {
    items
        .iter()
        .map(|item| match item.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
            _ => Err(item.clone()),
        })
        .collect()
}
