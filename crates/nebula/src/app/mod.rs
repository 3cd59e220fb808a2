//! Daemon lifecycle: service construction, background tasks and shutdown.

pub mod core;
pub mod services;
pub mod tasks;

pub use core::Application;
pub use services::ApplicationServices;
