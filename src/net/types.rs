#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

/// Opaque server-issued token naming one board instance.
pub type BoardId = String;

/// Request body for uploading a new board.
///
/// A `None` grid asks the server to create an empty board of its default
/// size.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UploadBoardRequest {
    pub grid: Option<Vec<Vec<bool>>>,
}

/// One server-side view of a board at a specific generation.
///
/// The server is authoritative for every field; the client only ever
/// fabricates a snapshot transiently for optimistic edits, and then with an
/// unchanged `generation`. The server may omit `grid` (`null` on the wire);
/// use [`BoardSnapshot::grid_or_empty`] to materialize an all-dead grid of
/// the advertised dimensions.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    pub id: BoardId,
    pub generation: u64,
    pub width: usize,
    pub height: usize,
    pub alive_count: usize,
    pub grid: Option<Vec<Vec<bool>>>,
}

impl BoardSnapshot {
    /// The snapshot's grid, or an all-dead `height`×`width` grid when the
    /// server omitted it.
    pub fn grid_or_empty(&self) -> Vec<Vec<bool>> {
        self.grid
            .clone()
            .unwrap_or_else(|| vec![vec![false; self.width]; self.height])
    }
}

/// Result of the server's loop/period detection endpoint.
///
/// Exposed by the client but not consumed by any UI path.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalState {
    pub id: BoardId,
    pub final_grid: Option<Vec<Vec<bool>>>,
    pub steps_taken: u64,
    pub is_loop: bool,
    pub period: u64,
    pub conclusion: Option<String>,
}

/// Uniform failure shape for every remote operation.
///
/// `Transport` and `Timeout` mean no usable response arrived; `Server`
/// carries the HTTP status and a message extracted from the response body
/// when one is present. `Validation` is raised client-side before any
/// request is sent.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("{0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("{status}: {message}")]
    Server { status: u16, message: String },
    #[error("{0}")]
    Validation(String),
}

impl RequestError {
    /// HTTP status of a server rejection, if this error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}
