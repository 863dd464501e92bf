//! User interface output and scripted input.
//!
//! - **tokens**: `{b}`-style markup and its ANSI expansion
//! - **renderer**: Double-buffered line renderer with frame diffing
//! - **keymapper**: Key scripts (`UP,TYPE=foo,ENTER`) to terminal bytes
//!
//! # Rendering Modes
//!
//! - **Terminal**: only changed lines are rewritten
//! - **Captured**: plain text, or styled stream when colors are forced

pub mod keymapper;
pub mod renderer;
pub mod tokens;

pub use keymapper::KeyMapper;
pub use renderer::{OutputMode, Renderer, TokenMode};
