/// GET /health: liveness only. Answers `OK` whatever state the sync is in.
pub async fn health() -> &'static str {
    "OK"
}
