//! Facet values attached to packs for filtering in the catalog UI.
//!
//! Pixel-level heuristics are not computed yet; every pack gets the same
//! neutral placeholder set so the published shape is stable.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::types::Pack;

/// The neutral facet set assigned until real heuristics exist.
pub fn placeholder_facets() -> BTreeMap<String, Value> {
    let mut facets = BTreeMap::new();
    facets.insert("background_style".into(), json!("light"));
    facets.insert("colorfulness".into(), json!("medium"));
    facets.insert(
        "font_pair".into(),
        json!({ "heading": "Unknown", "body": "Unknown" }),
    );
    facets.insert("font_mood".into(), json!("modern"));
    facets.insert("visual_density".into(), json!("balanced"));
    facets.insert("complexity".into(), json!(3));
    facets.insert("wcag_contrast".into(), json!("pass"));
    facets
}

/// Assign placeholder facets to every pack. Returns the number of packs touched.
pub fn enrich_packs(items: &mut [Pack]) -> usize {
    for pack in items.iter_mut() {
        pack.facets = placeholder_facets();
    }
    items.len()
}
