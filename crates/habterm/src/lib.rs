//! Terminal console for openHAB sitemaps.
//!
//! The sitemap is flattened into rows, browsed and searched with the
//! keyboard, and switches and sliders are operated through the REST API.
//! The console runs on the local terminal or serves SSH sessions.

#![warn(missing_docs)]

pub mod config;
pub mod entity;
pub mod error;
pub mod flatten;
pub mod navigator;
pub mod rest;
pub mod server;
pub mod sitemap;
pub mod ui;

#[cfg(test)]
mod fixtures;

pub use config::ConsoleConfig;
pub use error::ConsoleError;
pub use navigator::{NavEvent, Navigator};
pub use rest::{RestClient, SitemapSource};
pub use server::SessionServer;
