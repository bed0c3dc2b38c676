//! Purpose: Define the stable public Rust API boundary for Herodex.
//! Exports: Core types and operations needed by the CLI and tests.
//! Role: Public, additive-only surface; hides the internal module layout.
//! Invariants: This module is the only public path to store and source types.
//! Invariants: Internal modules remain private and are not directly exposed.

mod asset;
mod remote;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::hero::{Hero, Publisher, ensure_hero_id};
pub use crate::core::source::{HeroDocument, HeroSource, parse_document};
pub use crate::core::store::HeroStore;
pub use asset::{AssetRef, DEFAULT_ASSET_PATH, FileSource, HttpSource, default_asset_ref, open_source};
pub use remote::RemoteClient;
