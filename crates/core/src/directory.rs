use std::collections::HashMap;

use crate::domain::area::Area;

/// Resolves a claimed identity to the single area it may see.
pub trait PermissionDirectory: Send + Sync {
    fn area_for(&self, identity: &str) -> Option<Area>;
}

#[derive(Clone, Debug, Default)]
pub struct StaticPermissionDirectory {
    entries: HashMap<String, Area>,
}

impl StaticPermissionDirectory {
    pub fn new<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Area)>,
        K: Into<String>,
    {
        Self { entries: entries.into_iter().map(|(identity, area)| (identity.into(), area)).collect() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PermissionDirectory for StaticPermissionDirectory {
    fn area_for(&self, identity: &str) -> Option<Area> {
        self.entries.get(identity).cloned()
    }
}
