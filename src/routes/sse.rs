use std::convert::Infallible;

use axum::{Router, extract::State, response::sse::Sse, routing::get};
use futures::Stream;
use tracing::info;

use crate::{services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/sse/matches",
    tag = "sse",
    responses((status = 200, description = "Match event stream", content_type = "text/event-stream", body = String))
)]
/// Stream scoring events and match states of every loaded match.
pub async fn match_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let receiver = sse_service::subscribe(&state);
    info!("New match SSE connection");
    sse_service::to_sse_stream(receiver, sse_service::handshake(&state))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/matches", get(match_stream))
}
