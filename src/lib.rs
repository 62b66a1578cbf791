//! Vista Engine: a fixed-point software renderer core
//!
//! The four pieces that made the classic first-person renderers tick,
//! rebuilt as explicit service objects:
//! - tagged, purge-aware zone memory (`zone`)
//! - column/span rasterization primitives (`draw`)
//! - the visplane span cache for floors and ceilings (`plane`)
//! - resolution-independent coordinate scaling and blits (`video`)
//!
//! Rendering is single-threaded and frame-sequential: draw order and
//! the fuzz cursor are deterministic so recorded gameplay replays
//! bit-exact.

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod draw;
pub mod fixed;
pub mod plane;
pub mod settings;
pub mod video;
pub mod zone;
