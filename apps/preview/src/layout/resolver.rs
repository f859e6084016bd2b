//! Block Order & Visibility Resolver: applies the user's arrangement to built blocks.
//!
//! Preferences come from persisted JSON that may be stale or hand-edited, so parsing
//! is deliberately lenient: unknown kinds are ignored and malformed values are
//! treated as empty.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::layout::block::{Block, BlockKind};
use crate::store::{
    load_json, save_json, PreferenceStore, StoreError, KEY_HIDDEN_SECTIONS, KEY_SECTION_ORDER,
};

/// Persisted, user-editable arrangement of blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutPreferences {
    /// Last user-chosen arrangement. May omit kinds; duplicates keep their first rank.
    pub order: Vec<BlockKind>,
    pub hidden: BTreeSet<BlockKind>,
    /// Kind forced to the front of every rendering, immune to reordering.
    pub pinned_kind: Option<BlockKind>,
}

/// One row of the block arrangement list shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockListing {
    pub kind: BlockKind,
    pub label: &'static str,
    pub visible: bool,
    pub pinned: bool,
}

impl LayoutPreferences {
    /// Builds preferences from raw persisted values. Anything that is not an array of
    /// strings is treated as empty; unknown kind names are skipped.
    pub fn from_raw(order: Option<&Value>, hidden: Option<&Value>) -> Self {
        Self {
            order: parse_kind_list(order, KEY_SECTION_ORDER),
            hidden: parse_kind_list(hidden, KEY_HIDDEN_SECTIONS)
                .into_iter()
                .collect(),
            pinned_kind: None,
        }
    }

    /// Reads order and hidden set from the store. Never fails.
    pub async fn load(store: &dyn PreferenceStore) -> Self {
        let order: Option<Value> = load_json(store, KEY_SECTION_ORDER).await;
        let hidden: Option<Value> = load_json(store, KEY_HIDDEN_SECTIONS).await;
        Self::from_raw(order.as_ref(), hidden.as_ref())
    }

    pub async fn persist_order(&self, store: &dyn PreferenceStore) -> Result<(), StoreError> {
        let names: Vec<&str> = self.order.iter().map(|k| k.as_str()).collect();
        save_json(store, KEY_SECTION_ORDER, &names).await
    }

    pub async fn persist_hidden(&self, store: &dyn PreferenceStore) -> Result<(), StoreError> {
        let names: Vec<&str> = self.hidden.iter().map(|k| k.as_str()).collect();
        save_json(store, KEY_HIDDEN_SECTIONS, &names).await
    }

    pub fn with_pinned(mut self, pinned_kind: Option<BlockKind>) -> Self {
        self.pinned_kind = pinned_kind;
        self
    }

    /// Rank of `kind` in the saved arrangement; unranked kinds sort last.
    fn rank(&self, kind: BlockKind) -> usize {
        self.order
            .iter()
            .position(|k| *k == kind)
            .unwrap_or(usize::MAX)
    }

    /// Every kind exactly once: the saved arrangement (deduplicated) followed by the
    /// kinds it omits, in default order.
    pub fn effective_order(&self) -> Vec<BlockKind> {
        let mut kinds = BlockKind::DEFAULT_ORDER.to_vec();
        kinds.sort_by_key(|k| self.rank(*k));
        kinds
    }

    /// Replaces the arrangement. Duplicates are dropped, keeping the first occurrence.
    pub fn set_order(&mut self, order: Vec<BlockKind>) {
        let mut seen = BTreeSet::new();
        self.order = order.into_iter().filter(|k| seen.insert(*k)).collect();
    }

    pub fn set_hidden(&mut self, kind: BlockKind, hidden: bool) {
        if hidden {
            self.hidden.insert(kind);
        } else {
            self.hidden.remove(&kind);
        }
    }

    /// Drag reassignment: moves `kind` to `to_index` within the effective order.
    ///
    /// Returns `false` (and changes nothing) for the pinned kind.
    pub fn move_kind(&mut self, kind: BlockKind, to_index: usize) -> bool {
        if self.pinned_kind == Some(kind) {
            return false;
        }
        let mut order = self.effective_order();
        order.retain(|k| *k != kind);
        let index = to_index.min(order.len());
        order.insert(index, kind);
        self.order = order;
        true
    }

    pub fn listing(&self) -> Vec<BlockListing> {
        self.effective_order()
            .into_iter()
            .map(|kind| BlockListing {
                kind,
                label: kind.label(),
                visible: !self.hidden.contains(&kind),
                pinned: self.pinned_kind == Some(kind),
            })
            .collect()
    }
}

fn parse_kind_list(raw: Option<&Value>, key: &str) -> Vec<BlockKind> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    let Some(items) = raw.as_array() else {
        warn!(key, "Persisted block list is not an array; treating as empty");
        return Vec::new();
    };

    let mut kinds = Vec::with_capacity(items.len());
    for item in items {
        match item.as_str().map(str::parse::<BlockKind>) {
            Some(Ok(kind)) => {
                if !kinds.contains(&kind) {
                    kinds.push(kind);
                }
            }
            // Unknown names come from older layouts; drop them silently.
            Some(Err(_)) => {}
            None => warn!(key, "Ignoring non-string entry in persisted block list"),
        }
    }
    kinds
}

/// Filters hidden kinds, stable-sorts by saved rank, then moves the pinned kind (if
/// it survived filtering) to the front.
pub fn resolve(blocks: Vec<Block>, prefs: &LayoutPreferences) -> Vec<Block> {
    let mut resolved: Vec<Block> = blocks
        .into_iter()
        .filter(|b| !prefs.hidden.contains(&b.kind))
        .collect();

    // `sort_by_key` is stable: unranked kinds keep their relative input order.
    resolved.sort_by_key(|b| prefs.rank(b.kind));

    if let Some(pinned) = prefs.pinned_kind {
        if let Some(pos) = resolved.iter().position(|b| b.kind == pinned) {
            let block = resolved.remove(pos);
            resolved.insert(0, block);
        }
    }

    resolved
}
