//! # rostersync-renderer
//!
//! Tera-based template engine that renders the instruction documents placed
//! in each agent workspace from a roster entry.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rostersync_renderer::{DocumentKind, Renderer};
//! use rostersync_core::types::{ContainerPath, RosterEntry};
//!
//! fn render_soul(roster: &[RosterEntry]) {
//!     let main = ContainerPath::from("/data/.openclaw/workspace");
//!     if let Ok(renderer) = Renderer::new(main) {
//!         for entry in roster {
//!             if let Ok(text) = renderer.render(DocumentKind::Soul, entry, roster) {
//!                 println!("{}: {} bytes", entry.name, text.len());
//!             }
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::TemplateContext;
pub use engine::{DocumentKind, Renderer, TemplateEngine};
pub use error::RenderError;
