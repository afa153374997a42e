//! The visible navigation stack.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coordinator::CoordinatorId;

/// Identifies one presented screen instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScreenId(pub u64);

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "screen-{}", self.0)
    }
}

/// What the render surface should show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenDescriptor {
    /// Route name, e.g. "login" or "account_detail".
    pub route: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

impl ScreenDescriptor {
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            title: None,
            params: BTreeMap::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// A screen on the stack together with the coordinator that presented it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenEntry {
    pub id: ScreenId,
    pub owner: CoordinatorId,
    pub descriptor: ScreenDescriptor,
}

/// Ordered stack of presented screens, bottom first.
///
/// Only [`NavigationHost`](super::NavigationHost) mutates it.
#[derive(Debug, Clone, Default)]
pub struct NavigationContext {
    entries: Vec<ScreenEntry>,
}

impl NavigationContext {
    pub fn entries(&self) -> &[ScreenEntry] {
        &self.entries
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn top(&self) -> Option<&ScreenEntry> {
        self.entries.last()
    }

    /// The coordinator whose screen is visible.
    pub fn current_owner(&self) -> Option<CoordinatorId> {
        self.top().map(|entry| entry.owner)
    }

    /// Screens owned by `owner` counted from the top until another owner appears.
    pub fn owned_on_top(&self, owner: CoordinatorId) -> usize {
        self.entries
            .iter()
            .rev()
            .take_while(|entry| entry.owner == owner)
            .count()
    }

    pub fn owned_total(&self, owner: CoordinatorId) -> usize {
        self.entries.iter().filter(|entry| entry.owner == owner).count()
    }

    pub(crate) fn push(&mut self, entry: ScreenEntry) {
        self.entries.push(entry);
    }

    pub(crate) fn pop(&mut self) -> Option<ScreenEntry> {
        self.entries.pop()
    }

    pub(crate) fn remove(&mut self, index: usize) -> Option<ScreenEntry> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }

    /// Stack positions of `owner`'s screens, topmost first.
    pub(crate) fn owned_positions(&self, owner: CoordinatorId) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, entry)| entry.owner == owner)
            .map(|(index, _)| index)
            .collect()
    }
}
