//! HTTP routes.
//!
//! The whole API is one endpoint: `POST /graph` takes a parsed operation
//! document (kind plus the root field's arguments and selection) and
//! returns its JSON result under `data`. Schema validation of raw query
//! text is an upstream concern; this transport accepts the already-parsed
//! tree.

use axum::{Json, Router, extract::State, routing::post};
use serde_json::{Value, json};
use trellis_graph::request::Operation;

use crate::error::Result;
use crate::state::AppState;

/// Build the API router.
pub fn routes() -> Router<AppState> {
    Router::new().route("/graph", post(execute))
}

/// Execute one operation against the resolver.
async fn execute(
    State(state): State<AppState>,
    Json(operation): Json<Operation>,
) -> Result<Json<Value>> {
    let result = state.resolver().execute(&operation).await?;
    Ok(Json(json!({ "data": result })))
}
