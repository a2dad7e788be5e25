//! REST client for the Game of Life board server.
//!
//! Client-side (hydrate): real HTTP calls via `gloo-net`, with a bounded
//! timeout and an optional bearer credential attached to every request.
//! Server-side (SSR): stubs returning errors since these endpoints are only
//! meaningful in the browser.
//!
//! ERROR HANDLING
//! ==============
//! Every operation normalizes failures into [`RequestError`]: transport
//! faults and timeouts carry no status, non-2xx responses become
//! `Server {status, message}` with the message extracted from a structured
//! body when one is present, and malformed inputs are rejected locally as
//! `Validation` before any request is sent.

#![allow(clippy::unused_async)]

use super::types::{BoardId, BoardSnapshot, FinalState, RequestError, UploadBoardRequest};

/// Compile-time API base URL; empty means same-origin relative paths.
#[cfg(feature = "hydrate")]
const BASE_URL: &str = match option_env!("LIFEBOARD_API_URL") {
    Some(url) => url,
    None => "",
};

/// localStorage key for the persisted bearer token.
#[cfg(feature = "hydrate")]
const TOKEN_KEY: &str = "lifeboard_token";

/// Upper bound on how long any single request may stay in flight.
#[cfg(feature = "hydrate")]
const REQUEST_TIMEOUT_MS: u64 = 10_000;

#[cfg(not(feature = "hydrate"))]
fn server_unavailable() -> RequestError {
    RequestError::Transport("not available on server".to_owned())
}

/// Reject an empty or whitespace board identity before any network call.
fn ensure_board_id(id: &str) -> Result<(), RequestError> {
    if id.trim().is_empty() {
        return Err(RequestError::Validation("missing board id".to_owned()));
    }
    Ok(())
}

/// Upload an initial grid (or `None` for a server-default empty board).
/// Returns the new board identity issued by the server.
pub async fn create_board(grid: Option<Vec<Vec<bool>>>) -> Result<BoardId, RequestError> {
    let body = UploadBoardRequest { grid };
    #[cfg(feature = "hydrate")]
    {
        let url = format!("{BASE_URL}/api/boards");
        let req = with_auth(gloo_net::http::Request::post(&url))
            .json(&body)
            .map_err(|e| RequestError::Transport(e.to_string()))?;
        let resp = expect_ok(send_with_timeout(req.send()).await?).await?;

        // The server answers with the bare identity string; tolerate both a
        // JSON-encoded string and a plain-text body.
        let body = resp
            .text()
            .await
            .map_err(|e| RequestError::Transport(e.to_string()))?;
        let id = serde_json::from_str::<String>(&body)
            .unwrap_or_else(|_| body.trim().trim_matches('"').to_owned());
        Ok(id)
    }
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = body;
        Err(server_unavailable())
    }
}

/// Fetch the current state of board `id`.
pub async fn read_board(id: &str) -> Result<BoardSnapshot, RequestError> {
    ensure_board_id(id)?;
    #[cfg(feature = "hydrate")]
    {
        fetch_snapshot(&format!("{BASE_URL}/api/boards/{id}")).await
    }
    #[cfg(not(feature = "hydrate"))]
    {
        Err(server_unavailable())
    }
}

/// Fetch the state one generation ahead without mutating the server.
pub async fn preview_next(id: &str) -> Result<BoardSnapshot, RequestError> {
    ensure_board_id(id)?;
    #[cfg(feature = "hydrate")]
    {
        fetch_snapshot(&format!("{BASE_URL}/api/boards/{id}/next")).await
    }
    #[cfg(not(feature = "hydrate"))]
    {
        Err(server_unavailable())
    }
}

/// Fetch the state `n` generations ahead without mutating the server.
pub async fn read_steps(id: &str, n: u32) -> Result<BoardSnapshot, RequestError> {
    ensure_board_id(id)?;
    ensure_steps(n)?;
    #[cfg(feature = "hydrate")]
    {
        fetch_snapshot(&format!("{BASE_URL}/api/boards/{id}/steps/{n}")).await
    }
    #[cfg(not(feature = "hydrate"))]
    {
        Err(server_unavailable())
    }
}

/// Replace the full grid at the current generation; returns the resulting
/// snapshot with `generation` unchanged.
pub async fn update_grid(id: &str, grid: Vec<Vec<bool>>) -> Result<BoardSnapshot, RequestError> {
    ensure_board_id(id)?;
    #[cfg(feature = "hydrate")]
    {
        let url = format!("{BASE_URL}/api/boards/{id}");
        let req = with_auth(gloo_net::http::Request::put(&url))
            .json(&serde_json::json!({ "grid": grid }))
            .map_err(|e| RequestError::Transport(e.to_string()))?;
        let resp = expect_ok(send_with_timeout(req.send()).await?).await?;
        parse_json(resp).await
    }
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = grid;
        Err(server_unavailable())
    }
}

/// Advance the server's board state forward by `steps` generations.
pub async fn advance(id: &str, steps: u32) -> Result<BoardSnapshot, RequestError> {
    ensure_board_id(id)?;
    ensure_steps(steps)?;
    #[cfg(feature = "hydrate")]
    {
        let url = format!("{BASE_URL}/api/boards/{id}/advance?steps={steps}");
        let req = with_auth(gloo_net::http::Request::post(&url));
        let resp = expect_ok(send_with_timeout(req.send()).await?).await?;
        parse_json(resp).await
    }
    #[cfg(not(feature = "hydrate"))]
    {
        Err(server_unavailable())
    }
}

/// Run the server's loop/period detection for up to `max_attempts` steps.
///
/// Available capability; no UI path consumes it.
pub async fn final_state(id: &str, max_attempts: u32) -> Result<FinalState, RequestError> {
    ensure_board_id(id)?;
    #[cfg(feature = "hydrate")]
    {
        let url = format!("{BASE_URL}/api/boards/{id}/final?maxAttempts={max_attempts}");
        let req = with_auth(gloo_net::http::Request::get(&url));
        let resp = expect_ok(send_with_timeout(req.send()).await?).await?;
        parse_json(resp).await
    }
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = max_attempts;
        Err(server_unavailable())
    }
}

fn ensure_steps(steps: u32) -> Result<(), RequestError> {
    if steps == 0 {
        return Err(RequestError::Validation("steps must be at least 1".to_owned()));
    }
    Ok(())
}

/// The bearer credential to attach, if any. An externally supplied token
/// wins over the persisted one; both are normalized to a `Bearer ` prefix.
#[cfg(feature = "hydrate")]
fn auth_header() -> Option<String> {
    let token = match option_env!("LIFEBOARD_API_TOKEN") {
        Some(token) => token.to_owned(),
        None => {
            let storage = web_sys::window()?.local_storage().ok()??;
            storage.get_item(TOKEN_KEY).ok()??
        }
    };
    if token.starts_with("Bearer ") {
        Some(token)
    } else {
        Some(format!("Bearer {token}"))
    }
}

#[cfg(feature = "hydrate")]
fn with_auth(req: gloo_net::http::RequestBuilder) -> gloo_net::http::RequestBuilder {
    match auth_header() {
        Some(auth) => req.header("Authorization", &auth),
        None => req,
    }
}

#[cfg(feature = "hydrate")]
async fn fetch_snapshot(url: &str) -> Result<BoardSnapshot, RequestError> {
    let req = with_auth(gloo_net::http::Request::get(url));
    let resp = expect_ok(send_with_timeout(req.send()).await?).await?;
    parse_json(resp).await
}

/// Race a request against the bounded timeout.
#[cfg(feature = "hydrate")]
async fn send_with_timeout(
    send: impl std::future::Future<Output = Result<gloo_net::http::Response, gloo_net::Error>>,
) -> Result<gloo_net::http::Response, RequestError> {
    use futures::future::{Either, select};

    let timeout =
        gloo_timers::future::sleep(std::time::Duration::from_millis(REQUEST_TIMEOUT_MS));
    match select(Box::pin(send), Box::pin(timeout)).await {
        Either::Left((result, _)) => result.map_err(|e| RequestError::Transport(e.to_string())),
        Either::Right(((), _)) => Err(RequestError::Timeout),
    }
}

/// Pass 2xx responses through; turn anything else into a `Server` error
/// with the body's `message`/`error` field when present.
#[cfg(feature = "hydrate")]
async fn expect_ok(
    resp: gloo_net::http::Response,
) -> Result<gloo_net::http::Response, RequestError> {
    if resp.ok() {
        return Ok(resp);
    }
    let status = resp.status();
    let message = match resp.text().await {
        Ok(body) => extract_message(&body),
        Err(_) => "Request failed".to_owned(),
    };
    Err(RequestError::Server { status, message })
}

#[cfg(feature = "hydrate")]
fn extract_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .and_then(serde_json::Value::as_str)
                .or_else(|| v.get("error").and_then(serde_json::Value::as_str))
                .map(ToOwned::to_owned)
        })
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                "Request failed".to_owned()
            } else {
                body.trim().to_owned()
            }
        })
}

#[cfg(feature = "hydrate")]
async fn parse_json<T: serde::de::DeserializeOwned>(
    resp: gloo_net::http::Response,
) -> Result<T, RequestError> {
    resp.json::<T>()
        .await
        .map_err(|e| RequestError::Transport(e.to_string()))
}
