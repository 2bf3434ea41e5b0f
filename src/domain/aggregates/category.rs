//! Category Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn create(name: impl Into<String>, parent_id: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self { id: Uuid::now_v7(), name: name.into(), parent_id, created_at: now, updated_at: now }
    }

    /// Direct children of `parent` among `all`, by name.
    pub fn sub_categories<'a>(all: &'a [Category], parent: Uuid) -> Vec<&'a Category> {
        let mut subs: Vec<_> = all.iter().filter(|c| c.parent_id == Some(parent)).collect();
        subs.sort_by(|a, b| a.name.cmp(&b.name));
        subs
    }

    /// Detaches this category from a parent that is being removed.
    pub fn orphan(&mut self) {
        self.parent_id = None;
        self.updated_at = Utc::now();
    }
}
