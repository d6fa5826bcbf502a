//! Sitemap tree flattening.

#![allow(missing_docs)]

use smol_str::SmolStr;
use tracing::debug;

use crate::entity::{Entity, Row, SwitchState};
use crate::sitemap::Widget;

/// Walks `widgets` depth-first and returns one row per visible, supported
/// widget. Groups are followed directly by their own flattened children.
///
/// Hidden widgets are skipped with their whole subtree. Unsupported kinds are
/// skipped the same way. This runs on every refresh, so skips are logged at
/// debug level.
#[must_use]
pub fn flatten(widgets: &[Widget], depth: usize, parent_label: &str) -> Vec<Row> {
    let mut rows = Vec::new();
    for widget in widgets {
        if !widget.visibility {
            continue;
        }
        let Some(entity) = entity_for(widget) else {
            debug!(kind = %widget.kind, label = %widget.label, "unsupported widget skipped");
            continue;
        };
        let is_group = !entity.interactable();
        rows.push(Row {
            entity,
            depth,
            parent_label: SmolStr::new(parent_label),
        });
        if is_group && !widget.widgets.is_empty() {
            rows.extend(flatten(&widget.widgets, depth + 1, &widget.label));
        }
    }
    rows
}

fn entity_for(widget: &Widget) -> Option<Entity> {
    let label = SmolStr::new(&widget.label);
    let target = SmolStr::new(widget.command_target());
    match widget.kind.as_str() {
        "Frame" => Some(Entity::Group { label }),
        "Switch" => Some(Entity::Toggle {
            label,
            state: switch_state(widget),
            target,
        }),
        "Slider" => Some(Entity::Range {
            label,
            value: range_value(widget.item_state()),
            target,
        }),
        _ => None,
    }
}

fn switch_state(widget: &Widget) -> SwitchState {
    match widget.state.as_deref().map(str::trim) {
        Some("ON") => SwitchState::On,
        Some("OFF") => SwitchState::Off,
        _ => SwitchState::parse(widget.item_state()),
    }
}

/// Reads a 0..=100 percentage; anything unreadable counts as 0.
fn range_value(text: &str) -> u8 {
    let text = text.trim();
    let value = text
        .parse::<i64>()
        .ok()
        .or_else(|| {
            text.parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(|value| value.trunc() as i64)
        })
        .unwrap_or(0);
    u8::try_from(value.clamp(0, 100)).unwrap_or(0)
}
