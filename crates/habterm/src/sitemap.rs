//! Wire model of the openHAB sitemap REST payload.

#![allow(missing_docs)]

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Sitemap {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub link: String,
    pub homepage: Page,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub widgets: Vec<Widget>,
}

/// One node of the sitemap tree as the server reports it.
///
/// `kind` is kept as the raw wire string; the flattener decides which kinds
/// are supported.
#[derive(Debug, Clone, Deserialize)]
pub struct Widget {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "visible_by_default")]
    pub visibility: bool,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub mappings: Vec<Mapping>,
    #[serde(default)]
    pub item: Option<Item>,
    /// Widget-level state report; authoritative for switches.
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub widgets: Vec<Widget>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Mapping {
    pub command: String,
    #[serde(default)]
    pub label: String,
}

fn visible_by_default() -> bool {
    true
}

impl Widget {
    /// Builds a widget by hand; used by fixtures and tests.
    #[must_use]
    pub fn new(kind: &str, label: &str) -> Self {
        Self {
            kind: kind.to_string(),
            visibility: true,
            label: label.to_string(),
            icon: String::new(),
            mappings: Vec::new(),
            item: None,
            state: None,
            widgets: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_item(mut self, link: &str, state: &str) -> Self {
        self.item = Some(Item {
            name: String::new(),
            link: link.to_string(),
            state: state.to_string(),
        });
        self
    }

    #[must_use]
    pub fn with_state(mut self, state: &str) -> Self {
        self.state = Some(state.to_string());
        self
    }

    #[must_use]
    pub fn with_children(mut self, widgets: Vec<Widget>) -> Self {
        self.widgets = widgets;
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visibility = false;
        self
    }

    /// Last-known state of the bound item, empty when there is none.
    #[must_use]
    pub fn item_state(&self) -> &str {
        self.item.as_ref().map_or("", |item| item.state.as_str())
    }

    #[must_use]
    pub fn command_target(&self) -> &str {
        self.item.as_ref().map_or("", |item| item.link.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_nested_homepage() {
        let payload = r#"{
            "name": "default",
            "label": "Home",
            "link": "http://hab:8080/rest/sitemaps/default",
            "homepage": {
                "id": "default",
                "title": "Home",
                "widgets": [
                    {
                        "widgetId": "00",
                        "type": "Frame",
                        "visibility": true,
                        "label": "Lights",
                        "icon": "frame",
                        "mappings": [],
                        "widgets": [
                            {
                                "widgetId": "0000",
                                "type": "Switch",
                                "visibility": true,
                                "label": "Lamp",
                                "state": "ON",
                                "item": {
                                    "name": "Lamp",
                                    "link": "http://hab:8080/rest/items/Lamp",
                                    "state": "OFF",
                                    "type": "Switch"
                                },
                                "widgets": []
                            }
                        ]
                    }
                ]
            }
        }"#;

        let sitemap: Sitemap = serde_json::from_str(payload).expect("parse sitemap");
        assert_eq!(sitemap.name, "default");
        let frame = &sitemap.homepage.widgets[0];
        assert_eq!(frame.kind, "Frame");
        assert!(frame.item.is_none());
        let lamp = &frame.widgets[0];
        assert_eq!(lamp.state.as_deref(), Some("ON"));
        assert_eq!(lamp.item_state(), "OFF");
        assert_eq!(lamp.command_target(), "http://hab:8080/rest/items/Lamp");
    }

    #[test]
    fn missing_visibility_means_visible() {
        let widget: Widget =
            serde_json::from_str(r#"{"type": "Text", "label": "Note"}"#).expect("parse widget");
        assert!(widget.visibility);
        assert_eq!(widget.item_state(), "");
        assert_eq!(widget.command_target(), "");
    }
}
