//! Demo handlers behind the gate. They echo the admitted context back.

use axum::Json;
use serde_json::{json, Value};

use crate::gate::Gated;

/// `GET /`
pub async fn root_handler(Gated(ctx): Gated) -> Json<Value> {
    Json(json!({
        "message": "Hello World",
        "realm": ctx.realm,
        "validation": ctx.validation,
    }))
}

/// `GET /question`, `POST /question`
pub async fn question_handler(Gated(ctx): Gated) -> Json<Value> {
    Json(json!({
        "message": "This is a validated /question endpoint.",
        "realm": ctx.realm,
        "token_payload": ctx.token_payload,
        "validation": ctx.validation,
    }))
}
