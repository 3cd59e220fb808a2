//! Nebula: mesh topology daemon.
//!
//! Polls the status API through a [`topology::TopologyStore`], keeps a live
//! force layout of the current node set and serves both over HTTP.

pub mod api;
pub mod app;
pub mod cmd;
pub mod config;
pub mod view;
