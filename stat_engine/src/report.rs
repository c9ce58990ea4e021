//! Human-readable diagnostic dump of a collection
//!
//! Pure text, no parsed format; the only contract is determinism, so the
//! output is safe to pin in snapshot tests.

use crate::collection::StatCollection;
use crate::modifier::{ModifierKind, StatModifier};
use crate::stat_value::StatValue;
use std::collections::BTreeMap;
use std::fmt::Write;

const KIND_SECTIONS: [(ModifierKind, &str); 4] = [
    (ModifierKind::Override, "override"),
    (ModifierKind::Additive, "additive"),
    (ModifierKind::PercentAdditive, "percent"),
    (ModifierKind::Multiplicative, "multiplicative"),
];

/// Render every materialized stat of a collection: display name, base and
/// effective value, active categories, and per combination mode the visible
/// modifiers with source and remaining lifetime. Stats are sorted by
/// canonical id and modifiers listed in ledger insertion order, so repeated
/// calls over unchanged state produce identical text.
pub fn collection_report(collection: &StatCollection, now: f64) -> String {
    let sorted: BTreeMap<&String, &StatValue> = collection.iter().collect();

    let mut out = String::new();
    let _ = writeln!(out, "=== Stat Report ({} stats) ===", sorted.len());
    for (id, stat) in sorted {
        let def = stat.definition();
        let _ = writeln!(out, "{} [{}]", def.display_name, id);
        let _ = writeln!(
            out,
            "  base: {}  effective: {}  active: {}",
            def.format_value(stat.base_value()),
            def.format_value(stat.value()),
            stat.active_categories()
        );
        for (kind, label) in KIND_SECTIONS {
            let visible: Vec<&StatModifier> = stat.visible_modifiers_of_kind(kind).collect();
            if visible.is_empty() {
                continue;
            }
            let _ = writeln!(out, "  {}:", label);
            for m in visible {
                let _ = write!(out, "    - {} = {:.2} (source: {}", m.id, m.value, m.source);
                if !m.required_categories.is_empty() {
                    let _ = write!(out, ", requires: {}", m.required_categories);
                }
                if m.is_temporary() {
                    let _ = write!(out, ", {:.1}s left", m.remaining(now));
                }
                let _ = writeln!(out, ")");
            }
        }
    }
    out
}
