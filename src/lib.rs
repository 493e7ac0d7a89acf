//! Status dashboard for a cluster of Kannel bearerbox instances.
//!
//! Each page load polls every configured instance's `status.xml`, extracts
//! traffic, box and SMSC link figures, sums them across instances and renders
//! an auto-refreshing HTML page.

pub mod admin;
pub mod aggregate;
pub mod fetch;
pub mod format;
pub mod render;
pub mod report;
pub mod settings;
pub mod status;
pub mod web;
pub mod xpath;
