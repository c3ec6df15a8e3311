//! varbuild-lib: build variant orchestration for multi-platform Fortran trees
//!
//! This crate provides the engine behind the `varbuild` command:
//! - `platform`: host family, word width and toolchain detection
//! - `variant`: the mutually exclusive compiler flag sets
//! - `units`: the static unit table, link set and invalidation
//! - `arch`: object-file word-width consistency checking
//! - `artifact`: deterministic naming and promotion of executables
//! - `execute`: the single-variant build state machine and `release`

pub mod arch;
pub mod artifact;
pub mod clean;
pub mod consts;
pub mod error;
pub mod execute;
pub mod manifest;
pub mod platform;
pub mod tree_lock;
pub mod units;
pub mod util;
pub mod variant;
