//! Marker registry
//!
//! Owned mapping from entity id to its marker. At most one marker per id;
//! updates mutate the existing marker instead of replacing it.

use std::collections::{HashMap, HashSet};

use crate::backend::Position;

/// What a marker represents; drives its icon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    Bus,
    User,
    Stop,
    Origin,
    Destination,
}

/// Visible content of a marker
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerContent {
    pub kind: MarkerKind,
    /// Short text drawn next to the icon
    pub label: String,
    /// Multi-line text shown on selection
    pub popup: String,
}

impl MarkerContent {
    pub fn new(kind: MarkerKind, label: impl Into<String>, popup: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            popup: popup.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: String,
    pub position: Position,
    pub content: MarkerContent,
    /// Creation order; stable for the marker's whole life
    created_seq: u64,
    /// Bumped on every in-place update
    revision: u64,
}

impl Marker {
    pub fn created_seq(&self) -> u64 {
        self.created_seq
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// Outcome of an upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerChange {
    Created,
    Updated,
    Unchanged,
}

#[derive(Debug, Default)]
pub struct MarkerRegistry {
    markers: HashMap<String, Marker>,
    next_seq: u64,
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the marker if absent, else move/relabel it in place
    pub fn upsert(&mut self, id: &str, position: Position, content: MarkerContent) -> MarkerChange {
        if let Some(marker) = self.markers.get_mut(id) {
            if marker.position == position && marker.content == content {
                return MarkerChange::Unchanged;
            }
            marker.position = position;
            marker.content = content;
            marker.revision += 1;
            return MarkerChange::Updated;
        }

        self.next_seq += 1;
        self.markers.insert(
            id.to_string(),
            Marker {
                id: id.to_string(),
                position,
                content,
                created_seq: self.next_seq,
                revision: 0,
            },
        );
        MarkerChange::Created
    }

    pub fn remove(&mut self, id: &str) -> Option<Marker> {
        self.markers.remove(id)
    }

    /// Drop every marker whose id is not in `current_ids`; returns the removed ids
    pub fn remove_stale<'a, I>(&mut self, current_ids: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let keep: HashSet<&str> = current_ids.into_iter().collect();
        let stale: Vec<String> = self
            .markers
            .keys()
            .filter(|id| !keep.contains(id.as_str()))
            .cloned()
            .collect();

        for id in &stale {
            self.markers.remove(id);
        }
        stale
    }

    pub fn get(&self, id: &str) -> Option<&Marker> {
        self.markers.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.markers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Ids in sorted order
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.markers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Markers sorted by id
    pub fn sorted(&self) -> Vec<&Marker> {
        let mut markers: Vec<&Marker> = self.markers.values().collect();
        markers.sort_by(|a, b| a.id.cmp(&b.id));
        markers
    }

    pub fn clear(&mut self) -> usize {
        let count = self.markers.len();
        self.markers.clear();
        count
    }
}
