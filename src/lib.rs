//! Source provisioning for a GNU cross-compiler build.
//!
//! `crossprep` fetches the upstream archives a cross-compiler build needs
//! (binutils, GCC, GMP, MPFR, MPC), verifies each against a pinned SHA-512
//! digest, and unpacks them into a build workspace. Every step is idempotent:
//! a verified file in the download cache is never fetched again, and a stamp
//! file records each completed extraction so re-runs skip finished work.
//!
//! # Example
//!
//! ```no_run
//! use crossprep::manifest::Manifest;
//! use crossprep::pipeline::{Dirs, Pipeline};
//! use std::path::PathBuf;
//!
//! let dirs = Dirs::new(PathBuf::from("/opt/cross"), None, None);
//! let stats = Pipeline::new(Manifest::toolchain(), dirs).run()?;
//! println!("{} downloaded, {} from cache", stats.downloaded, stats.cache_hits);
//! # Ok::<(), crossprep::error::PrepError>(())
//! ```
//!
//! Interrupting a run leaves at worst a truncated cache file (whose digest
//! will not verify) or an unpacked tree without its stamp; the next run
//! re-downloads or re-extracts as needed.

pub mod download;
pub mod error;
pub mod extract;
pub mod fs_utils;
pub mod hash;
pub mod manifest;
pub mod output;
pub mod pipeline;

pub use error::{PrepError, Result};
pub use manifest::{Artifact, Manifest};
pub use pipeline::{Dirs, Pipeline, RunStats};
