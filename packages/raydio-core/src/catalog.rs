//! Stream catalog: groups of stream entries as delivered by the SDK, and the
//! flattened list the presentation layer renders.
//!
//! The [`Catalog`] keeps groups in insertion order keyed by title and rebuilds
//! the flattened [`Stream`] list on every change, so a reader always gets a
//! list that matches one complete catalog version.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A single playable entry inside a [`StreamGroup`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEntry {
    /// Identifier unique within the catalog.
    pub stream_id: String,
    #[serde(default)]
    pub is_muted: bool,
    pub language: String,
}

impl StreamEntry {
    pub fn new(stream_id: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            stream_id: stream_id.into(),
            is_muted: false,
            language: language.into(),
        }
    }

    /// Returns a copy of the entry with the muted flag set.
    #[must_use]
    pub fn muted(mut self, is_muted: bool) -> Self {
        self.is_muted = is_muted;
        self
    }
}

/// A titled group of stream entries (e.g. one match with several commentary
/// languages). The title is the group's stable key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamGroup {
    pub title: String,
    #[serde(default)]
    pub entries: Vec<StreamEntry>,
}

impl StreamGroup {
    pub fn new(title: impl Into<String>, entries: Vec<StreamEntry>) -> Self {
        Self {
            title: title.into(),
            entries,
        }
    }

    /// Returns true if any entry of this group has the given stream id.
    #[must_use]
    pub fn contains_stream(&self, stream_id: &str) -> bool {
        self.entries.iter().any(|e| e.stream_id == stream_id)
    }
}

/// Presentation projection of a [`StreamEntry`], carrying its group's title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    pub stream_id: String,
    pub title: String,
    pub language: String,
    pub muted: bool,
}

/// Projects groups into one ordered list: group order, then entry order.
#[must_use]
pub fn flatten(groups: &[StreamGroup]) -> Vec<Stream> {
    groups
        .iter()
        .flat_map(|group| {
            group.entries.iter().map(move |entry| Stream {
                stream_id: entry.stream_id.clone(),
                title: group.title.clone(),
                language: entry.language.clone(),
                muted: entry.is_muted,
            })
        })
        .collect()
}

/// Finds the title of the first group containing `stream_id`.
#[must_use]
pub fn owning_group_title<'a>(groups: &'a [StreamGroup], stream_id: &str) -> Option<&'a str> {
    groups
        .iter()
        .find(|g| g.contains_stream(stream_id))
        .map(|g| g.title.as_str())
}

/// Ordered set of stream groups keyed by title, with its flattened view.
///
/// Mutators return `true` when the catalog changed. Each change bumps
/// [`Catalog::version`] and replaces the flattened list wholesale.
#[derive(Debug, Clone)]
pub struct Catalog {
    groups: Vec<StreamGroup>,
    streams: Arc<[Stream]>,
    version: u64,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            streams: Arc::from(Vec::new()),
            version: 0,
        }
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current groups in presentation order.
    pub fn groups(&self) -> &[StreamGroup] {
        &self.groups
    }

    /// Flattened stream list for the current version.
    pub fn streams(&self) -> Arc<[Stream]> {
        Arc::clone(&self.streams)
    }

    /// Number of changes applied since construction.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn contains_stream(&self, stream_id: &str) -> bool {
        self.streams.iter().any(|s| s.stream_id == stream_id)
    }

    fn position(&self, title: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.title == title)
    }

    /// Appends a group whose title has not been seen yet.
    pub fn add_group(&mut self, group: StreamGroup) -> bool {
        if self.position(&group.title).is_some() {
            log::debug!("[Catalog] Ignoring duplicate group '{}'", group.title);
            return false;
        }
        self.groups.push(group);
        self.rebuild();
        true
    }

    /// Replaces the group with the same title in place.
    pub fn update_group(&mut self, group: StreamGroup) -> bool {
        match self.position(&group.title) {
            Some(index) => {
                self.groups[index] = group;
                self.rebuild();
                true
            }
            None => {
                log::debug!("[Catalog] Update for unknown group '{}'", group.title);
                false
            }
        }
    }

    /// Removes the first group with the given title.
    pub fn remove_group(&mut self, title: &str) -> bool {
        match self.position(title) {
            Some(index) => {
                self.groups.remove(index);
                self.rebuild();
                true
            }
            None => {
                log::debug!("[Catalog] Removal of unknown group '{}'", title);
                false
            }
        }
    }

    /// Discards every group and adopts `groups` in the given order.
    ///
    /// A title repeated within `groups` keeps only its first occurrence.
    pub fn replace_all(&mut self, groups: Vec<StreamGroup>) {
        let mut adopted: Vec<StreamGroup> = Vec::with_capacity(groups.len());
        for group in groups {
            if adopted.iter().any(|g| g.title == group.title) {
                log::warn!(
                    "[Catalog] Dropping repeated group '{}' from bulk update",
                    group.title
                );
                continue;
            }
            adopted.push(group);
        }
        self.groups = adopted;
        self.rebuild();
    }

    fn rebuild(&mut self) {
        self.streams = Arc::from(flatten(&self.groups));
        self.version += 1;
    }
}
