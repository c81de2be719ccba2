//! UI primitives for the Daybook CLI.
//!
//! - **Context**: environment detection (TTY, color, unicode)
//! - **Mode**: output mode resolution (json, plain, pretty)
//! - **Theme**: badges and styles
//! - **Render**: tables, key/value lines, hints
//! - **Format**: string utilities

mod context;
pub mod format;
mod mode;
pub mod render;
pub mod theme;

pub use context::UiContext;
pub use mode::OutputMode;
pub use theme::Badge;

pub use render::{badge, header, hint, kv, table, Column};
