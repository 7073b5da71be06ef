use serde::Serialize;
use utoipa::ToSchema;

use crate::state::{ShotCatalog, ShotDefinition};

/// One selectable shot.
#[derive(Debug, Serialize, ToSchema)]
pub struct ShotResponse {
    pub id: String,
    pub name: String,
    pub category: String,
}

impl From<&ShotDefinition> for ShotResponse {
    fn from(shot: &ShotDefinition) -> Self {
        Self {
            id: shot.id.clone(),
            name: shot.name.clone(),
            category: shot.category.clone(),
        }
    }
}

/// The shot catalog offered to the point-entry flow.
#[derive(Debug, Serialize, ToSchema)]
pub struct ShotCatalogResponse {
    /// Categories in display order.
    pub categories: Vec<String>,
    pub shots: Vec<ShotResponse>,
}

impl From<&ShotCatalog> for ShotCatalogResponse {
    fn from(catalog: &ShotCatalog) -> Self {
        Self {
            categories: catalog
                .categories()
                .into_iter()
                .map(str::to_string)
                .collect(),
            shots: catalog.iter().map(ShotResponse::from).collect(),
        }
    }
}
