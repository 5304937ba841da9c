// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsing of lore extraction output.

use saga_core::types::LoreCategory;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One extracted entity as the model reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoreItem {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// The four entity lists produced by one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoreSet {
    #[serde(default)]
    pub characters: Vec<LoreItem>,
    #[serde(default)]
    pub locations: Vec<LoreItem>,
    #[serde(default)]
    pub events: Vec<LoreItem>,
    #[serde(default)]
    pub items: Vec<LoreItem>,
}

impl LoreSet {
    pub fn get(&self, category: LoreCategory) -> &[LoreItem] {
        match category {
            LoreCategory::Character => &self.characters,
            LoreCategory::Location => &self.locations,
            LoreCategory::Event => &self.events,
            LoreCategory::Item => &self.items,
        }
    }

    /// Every item paired with its category, in category order.
    pub fn iter(&self) -> impl Iterator<Item = (LoreCategory, &LoreItem)> {
        LoreCategory::ALL
            .into_iter()
            .flat_map(move |category| self.get(category).iter().map(move |item| (category, item)))
    }

    pub fn total(&self) -> usize {
        LoreCategory::ALL.iter().map(|c| self.get(*c).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Parses raw model output into a [`LoreSet`].
///
/// Markdown code fences are stripped and the outermost JSON object is
/// parsed. Unparseable output yields an empty set; items without a name
/// are dropped.
pub fn parse_lore(raw: &str) -> LoreSet {
    let body = strip_code_fence(raw.trim());

    let json = match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if end > start => &body[start..=end],
        _ => {
            warn!(
                response_len = raw.len(),
                "lore response contains no JSON object, treating as empty"
            );
            return LoreSet::default();
        }
    };

    match serde_json::from_str::<LoreSet>(json) {
        Ok(mut set) => {
            for list in [
                &mut set.characters,
                &mut set.locations,
                &mut set.events,
                &mut set.items,
            ] {
                list.retain(|item| !item.name.trim().is_empty());
            }
            set
        }
        Err(e) => {
            warn!(error = %e, "failed to parse lore response, treating as empty");
            LoreSet::default()
        }
    }
}

/// Returns the contents of the first fenced block, or the input unchanged.
fn strip_code_fence(text: &str) -> &str {
    let Some(open) = text.find("```") else {
        return text;
    };
    let after_open = &text[open + 3..];
    // Skip an info string such as `json`.
    let content = match after_open.find('\n') {
        Some(nl) if !after_open[..nl].contains('{') => &after_open[nl + 1..],
        _ => after_open,
    };
    match content.find("```") {
        Some(close) => content[..close].trim(),
        None => content.trim(),
    }
}
