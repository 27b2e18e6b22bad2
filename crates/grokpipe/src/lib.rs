//! Public facade crate for `grokpipe`.
//!
//! No IO or provider-specific logic lives here; it re-exports the request builder,
//! response normalizer, renderer and operation presets from `grokpipe-core`.

pub use grokpipe_core::*;
