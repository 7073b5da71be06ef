use axum::{Json, Router, extract::State, routing::get};

use crate::{dto::shot::ShotCatalogResponse, services::catalog_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/shots",
    tag = "shots",
    responses((status = 200, description = "Shot catalog", body = ShotCatalogResponse))
)]
/// List the shots that can be selected during point entry.
pub async fn list_shots(State(state): State<SharedState>) -> Json<ShotCatalogResponse> {
    Json(catalog_service::shot_catalog(&state))
}

/// Configure the shot catalog routes.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/shots", get(list_shots))
}
