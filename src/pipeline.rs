//! Sequential download-then-extract orchestration.
//!
//! Drives every manifest artifact through the caching downloader, then
//! unpacks the primary artifact (binutils for the reference toolchain) into
//! the build directory. Strictly one artifact at a time, fail-fast: the
//! first integrity or extraction failure aborts the run. Re-running after
//! any interruption is safe and skips all completed work.

use crate::download;
use crate::error::Result;
use crate::extract;
use crate::fs_utils;
use crate::manifest::Manifest;
use crate::output;
use std::path::{Path, PathBuf};

/// The three directories a run operates on.
#[derive(Debug, Clone)]
pub struct Dirs {
    /// Where the finished cross compiler will ultimately be installed.
    pub dest_dir: PathBuf,
    /// Where sources are extracted and built. Defaults to the current
    /// working directory.
    pub build_dir: Option<PathBuf>,
    /// Where downloaded archives are cached. Defaults to the build
    /// directory.
    pub download_dir: Option<PathBuf>,
}

impl Dirs {
    pub fn new(
        dest_dir: PathBuf,
        build_dir: Option<PathBuf>,
        download_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            dest_dir,
            build_dir,
            download_dir,
        }
    }

    pub fn effective_build_dir(&self) -> PathBuf {
        self.build_dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    pub fn effective_download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .unwrap_or_else(|| self.effective_build_dir())
    }
}

/// Counters accumulated over one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    /// Artifacts fetched over the network.
    pub downloaded: usize,
    /// Bytes transferred over the network.
    pub downloaded_bytes: u64,
    /// Artifacts served from the download cache.
    pub cache_hits: usize,
    /// Bytes verified from the cache.
    pub cached_bytes: u64,
    /// Archives actually unpacked.
    pub extracted: usize,
    /// Extractions skipped because the stamp matched.
    pub extract_skipped: usize,
}

/// Drives the manifest through download and extraction.
pub struct Pipeline {
    manifest: Manifest,
    dirs: Dirs,
}

impl Pipeline {
    pub fn new(manifest: Manifest, dirs: Dirs) -> Self {
        Self { manifest, dirs }
    }

    /// Run the full provisioning stage: verify-or-download every artifact,
    /// then extract the primary one into the build directory.
    pub fn run(&self) -> Result<RunStats> {
        let build_dir = self.dirs.effective_build_dir();
        let download_dir = self.dirs.effective_download_dir();

        output::action(&format!(
            "Provisioning toolchain sources in {} (install prefix {})",
            build_dir.display(),
            self.dirs.dest_dir.display()
        ));

        fs_utils::ensure_dir(&self.dirs.dest_dir)?;
        fs_utils::ensure_dir(&build_dir)?;
        fs_utils::ensure_dir(&download_dir)?;

        let mut stats = RunStats::default();
        let total = self.manifest.len();

        let mut primary_archive = None;
        for (i, artifact) in self.manifest.artifacts().iter().enumerate() {
            output::action_numbered(i + 1, total, &artifact.id);
            let outcome = download::ensure_downloaded(artifact, &download_dir)?;
            if outcome.from_cache {
                stats.cache_hits += 1;
                stats.cached_bytes += outcome.bytes;
            } else {
                stats.downloaded += 1;
                stats.downloaded_bytes += outcome.bytes;
            }
            if artifact.id == self.manifest.primary().id {
                primary_archive = Some(outcome.path);
            }
        }

        let primary = self.manifest.primary();
        let archive = primary_archive.expect("primary artifact is always downloaded");
        if extract::ensure_extracted(&archive, primary, &build_dir)? {
            stats.extracted += 1;
        } else {
            stats.extract_skipped += 1;
        }

        output::success(&format!(
            "{} downloaded ({} bytes), {} from cache ({} bytes), {} extracted, {} skipped",
            stats.downloaded,
            stats.downloaded_bytes,
            stats.cache_hits,
            stats.cached_bytes,
            stats.extracted,
            stats.extract_skipped
        ));

        Ok(stats)
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn dirs(&self) -> &Dirs {
        &self.dirs
    }
}

/// Convenience for callers that only have paths.
pub fn run(manifest: Manifest, dest_dir: &Path, build_dir: Option<&Path>, download_dir: Option<&Path>) -> Result<RunStats> {
    let dirs = Dirs::new(
        dest_dir.to_path_buf(),
        build_dir.map(Path::to_path_buf),
        download_dir.map(Path::to_path_buf),
    );
    Pipeline::new(manifest, dirs).run()
}
