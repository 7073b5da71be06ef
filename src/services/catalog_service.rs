use crate::{dto::shot::ShotCatalogResponse, state::SharedState};

/// Shot catalog as configured at startup.
pub fn shot_catalog(state: &SharedState) -> ShotCatalogResponse {
    ShotCatalogResponse::from(state.shots())
}
