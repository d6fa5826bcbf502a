//! Test fixtures: sitemap builders and an in-memory sitemap source.

use std::sync::Mutex;

use crate::entity::Command;
use crate::error::ConsoleError;
use crate::rest::SitemapSource;
use crate::sitemap::Widget;

pub(crate) fn frame(label: &str, children: Vec<Widget>) -> Widget {
    Widget::new("Frame", label).with_children(children)
}

pub(crate) fn switch(label: &str, state: &str) -> Widget {
    Widget::new("Switch", label).with_item(&item_link(label), state)
}

pub(crate) fn slider(label: &str, state: &str) -> Widget {
    Widget::new("Slider", label).with_item(&item_link(label), state)
}

pub(crate) fn item_link(label: &str) -> String {
    format!("http://hab.test/rest/items/{label}")
}

/// Lights { Lamp OFF, Fan ON }, Living { Dimmer 40 }.
pub(crate) fn house() -> Vec<Widget> {
    vec![
        frame(
            "Lights",
            vec![switch("Lamp", "OFF"), switch("Fan", "ON")],
        ),
        frame("Living", vec![slider("Dimmer", "40")]),
    ]
}

/// Serves a fixed tree and applies commands to it like the remote side would.
#[derive(Debug, Default)]
pub(crate) struct FakeSource {
    tree: Mutex<Vec<Widget>>,
    sent: Mutex<Vec<Command>>,
    fail_fetch: Mutex<bool>,
    fail_commands: Mutex<bool>,
}

impl FakeSource {
    pub(crate) fn new(tree: Vec<Widget>) -> Self {
        Self {
            tree: Mutex::new(tree),
            ..Self::default()
        }
    }

    pub(crate) fn replace_tree(&self, tree: Vec<Widget>) {
        *self.tree.lock().expect("tree lock") = tree;
    }

    pub(crate) fn sent(&self) -> Vec<Command> {
        self.sent.lock().expect("sent lock").clone()
    }

    pub(crate) fn fail_fetch(&self, fail: bool) {
        *self.fail_fetch.lock().expect("flag lock") = fail;
    }

    pub(crate) fn fail_commands(&self, fail: bool) {
        *self.fail_commands.lock().expect("flag lock") = fail;
    }
}

impl SitemapSource for FakeSource {
    fn fetch(&self) -> Result<Vec<Widget>, ConsoleError> {
        if *self.fail_fetch.lock().expect("flag lock") {
            return Err(ConsoleError::Transport("connection refused".into()));
        }
        Ok(self.tree.lock().expect("tree lock").clone())
    }

    fn send_command(&self, command: &Command) -> Result<(), ConsoleError> {
        if *self.fail_commands.lock().expect("flag lock") {
            return Err(ConsoleError::Transport("server answered 500".into()));
        }
        self.sent.lock().expect("sent lock").push(command.clone());
        let mut tree = self.tree.lock().expect("tree lock");
        apply(&mut tree, command);
        Ok(())
    }
}

fn apply(widgets: &mut [Widget], command: &Command) {
    for widget in widgets {
        if let Some(item) = widget.item.as_mut() {
            if item.link == command.target.as_str() {
                item.state = command.value.to_string();
                widget.state = None;
            }
        }
        apply(&mut widget.widgets, command);
    }
}
