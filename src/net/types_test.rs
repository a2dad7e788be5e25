use super::*;

#[test]
fn board_snapshot_parses_camel_case_wire_shape() {
    let json = r#"{"id":"b-1","generation":3,"width":2,"height":2,"aliveCount":1,"grid":[[true,false],[false,false]]}"#;
    let snap: BoardSnapshot = serde_json::from_str(json).expect("snapshot");
    assert_eq!(snap.id, "b-1");
    assert_eq!(snap.generation, 3);
    assert_eq!(snap.alive_count, 1);
    assert_eq!(snap.grid, Some(vec![vec![true, false], vec![false, false]]));
}

#[test]
fn board_snapshot_tolerates_null_grid() {
    let json = r#"{"id":"b-1","generation":0,"width":3,"height":2,"aliveCount":0,"grid":null}"#;
    let snap: BoardSnapshot = serde_json::from_str(json).expect("snapshot");
    assert!(snap.grid.is_none());

    let grid = snap.grid_or_empty();
    assert_eq!(grid.len(), 2);
    assert!(grid.iter().all(|row| row.len() == 3));
    assert!(grid.iter().flatten().all(|cell| !cell));
}

#[test]
fn upload_request_serializes_null_grid() {
    let body = serde_json::to_string(&UploadBoardRequest { grid: None }).expect("json");
    assert_eq!(body, r#"{"grid":null}"#);
}

#[test]
fn final_state_parses_loop_report() {
    let json = r#"{"id":"b-1","finalGrid":[[false]],"stepsTaken":12,"isLoop":true,"period":2,"conclusion":"loop"}"#;
    let report: FinalState = serde_json::from_str(json).expect("final state");
    assert_eq!(report.steps_taken, 12);
    assert!(report.is_loop);
    assert_eq!(report.period, 2);
    assert_eq!(report.conclusion.as_deref(), Some("loop"));
}

#[test]
fn server_error_carries_status_and_message() {
    let err = RequestError::Server { status: 404, message: "unknown board".to_owned() };
    assert_eq!(err.to_string(), "404: unknown board");
    assert_eq!(err.status(), Some(404));
}

#[test]
fn timeout_is_distinguishable_from_http_errors() {
    assert_eq!(RequestError::Timeout.to_string(), "request timed out");
    assert_eq!(RequestError::Timeout.status(), None);
    assert_ne!(
        RequestError::Timeout,
        RequestError::Transport("request timed out".to_owned())
    );
}
