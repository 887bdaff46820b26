use serde::{Deserialize, Serialize};

use crate::sort::Sort;

/// Options accepted by the read operations (`find`, `find_one`, `count`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindOptions {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default)]
    pub sort: Vec<Sort>,
    /// Return soft-deleted documents too. Only meaningful for collections
    /// defined with soft-delete.
    #[serde(default)]
    pub include_deleted: bool,
}

impl FindOptions {
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn include_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }
}
