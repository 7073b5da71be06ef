use indexmap::IndexMap;

/// A selectable shot as shown in the point-entry flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShotDefinition {
    pub id: String,
    pub name: String,
    pub category: String,
}

/// Read-only lookup of shots by id, kept in configuration order.
#[derive(Debug, Clone, Default)]
pub struct ShotCatalog {
    shots: IndexMap<String, ShotDefinition>,
}

impl ShotCatalog {
    /// Later duplicates of an id replace earlier ones but keep the first position.
    pub fn new(shots: impl IntoIterator<Item = ShotDefinition>) -> Self {
        Self {
            shots: shots
                .into_iter()
                .map(|shot| (shot.id.clone(), shot))
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&ShotDefinition> {
        self.shots.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.shots.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.shots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShotDefinition> {
        self.shots.values()
    }

    /// Distinct categories in first-seen order.
    pub fn categories(&self) -> Vec<&str> {
        let mut categories = Vec::new();
        for shot in self.shots.values() {
            if !categories.contains(&shot.category.as_str()) {
                categories.push(shot.category.as_str());
            }
        }
        categories
    }
}
