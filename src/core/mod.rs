//! Core engine components.
//!
//! The interactive pieces the selector is built from:
//!
//! - **term**: raw mode, deadline reads, terminal size, signal flags
//! - **keys**: byte stream to key event decoding
//! - **fuzzy**: relevance scoring and match highlighting
//!
//! # Architecture
//!
//! ```text
//! Selector
//! ├── KeyDecoder ← ByteSource (TtyInput | ScriptedInput)
//! ├── fuzzy::score
//! └── Renderer (ui)
//! ```

pub mod fuzzy;
pub mod keys;
pub mod term;
