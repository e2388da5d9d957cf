use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

/// Demo API routes.
pub fn register(router: Router) -> Router {
    router.route("/ping", get(ping))
}

async fn ping() -> Json<Value> {
    Json(json!({ "message": "pong" }))
}
