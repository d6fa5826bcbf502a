//! Entity kinds and their capability contract.
//!
//! Every row of the console is backed by one [`Entity`]. The set of kinds is
//! closed: groups only structure the tree, toggles and ranges can be driven
//! from the keyboard. Each capability returns the [`Command`] the remote
//! system has to receive, if any; sending it is the caller's business.

#![allow(missing_docs)]

use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use smol_str::SmolStr;

const GROUP_BG: Color = Color::Rgb(125, 86, 244);
const LABEL_WIDTH: usize = 10;
const RANGE_SEGMENTS: u8 = 20;
const RANGE_STEP: u8 = 5;
const RANGE_MAX: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchState {
    On,
    Off,
}

impl SwitchState {
    /// Anything but `ON` reads as off.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        if text.trim() == "ON" {
            Self::On
        } else {
            Self::Off
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }

    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::On => Self::Off,
            Self::Off => Self::On,
        }
    }
}

/// A state change addressed to one remote item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub target: SmolStr,
    pub value: SmolStr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    StepLeft,
    StepRight,
    Activate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Group {
        label: SmolStr,
    },
    Toggle {
        label: SmolStr,
        state: SwitchState,
        target: SmolStr,
    },
    Range {
        label: SmolStr,
        value: u8,
        target: SmolStr,
    },
}

impl Entity {
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Group { label } | Self::Toggle { label, .. } | Self::Range { label, .. } => {
                label.as_str()
            }
        }
    }

    #[must_use]
    pub fn interactable(&self) -> bool {
        !matches!(self, Self::Group { .. })
    }

    pub fn apply(&mut self, action: Action) -> Option<Command> {
        match action {
            Action::StepLeft => self.step_left(),
            Action::StepRight => self.step_right(),
            Action::Activate => self.activate(),
        }
    }

    /// Lowers a range to the next multiple of five below its value.
    pub fn step_left(&mut self) -> Option<Command> {
        let Self::Range { value, target, .. } = self else {
            return None;
        };
        if *value == 0 {
            return None;
        }
        *value = *value - 1 - (*value - 1) % RANGE_STEP;
        Some(Command {
            target: target.clone(),
            value: SmolStr::new(value.to_string()),
        })
    }

    /// Raises a range to the next multiple of five above its value.
    pub fn step_right(&mut self) -> Option<Command> {
        let Self::Range { value, target, .. } = self else {
            return None;
        };
        if *value >= RANGE_MAX {
            return None;
        }
        *value = (*value + RANGE_STEP - *value % RANGE_STEP).min(RANGE_MAX);
        Some(Command {
            target: target.clone(),
            value: SmolStr::new(value.to_string()),
        })
    }

    pub fn activate(&mut self) -> Option<Command> {
        let Self::Toggle { state, target, .. } = self else {
            return None;
        };
        *state = state.toggled();
        Some(Command {
            target: target.clone(),
            value: SmolStr::new(state.as_str()),
        })
    }

    #[must_use]
    pub fn render(&self, depth: usize) -> Line<'static> {
        let indent = "  ".repeat(depth);
        match self {
            Self::Group { label } => Line::from(vec![
                Span::raw(indent),
                Span::styled(label.to_string(), Style::default().bg(GROUP_BG)),
            ]),
            Self::Toggle { label, state, .. } => {
                let mark = match state {
                    SwitchState::On => "X",
                    SwitchState::Off => " ",
                };
                Line::from(vec![
                    Span::raw(format!("{indent}{label:<LABEL_WIDTH$} [")),
                    Span::raw(mark),
                    Span::raw("]"),
                ])
            }
            Self::Range { label, value, .. } => {
                let filled = usize::from(value / RANGE_STEP);
                let empty = usize::from(RANGE_SEGMENTS).saturating_sub(filled);
                Line::from(vec![
                    Span::raw(format!("{indent}{label:<LABEL_WIDTH$} [")),
                    Span::raw(format!("{}{}", "|".repeat(filled), " ".repeat(empty))),
                    Span::raw("]"),
                ])
            }
        }
    }
}

/// One visible entity of the flattened tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub entity: Entity,
    pub depth: usize,
    pub parent_label: SmolStr,
}

impl Row {
    #[must_use]
    pub fn label(&self) -> &str {
        self.entity.label()
    }

    #[must_use]
    pub fn interactive(&self) -> bool {
        self.entity.interactable()
    }

    #[must_use]
    pub fn render(&self) -> Line<'static> {
        self.entity.render(self.depth)
    }

    /// Rendered text without styling.
    #[must_use]
    pub fn text(&self) -> String {
        self.render()
            .spans
            .iter()
            .map(|span| span.content.as_ref())
            .collect()
    }

    /// True when every term occurs in the label or the parent label.
    ///
    /// Terms are expected in lowercase.
    #[must_use]
    pub fn matches(&self, terms: &[String]) -> bool {
        let label = self.label().to_lowercase();
        let parent = self.parent_label.to_lowercase();
        terms
            .iter()
            .all(|term| label.contains(term.as_str()) || parent.contains(term.as_str()))
    }
}
