//! Stamped, idempotent archive extraction.
//!
//! Each successful extraction writes a stamp file next to the unpacked tree
//! recording the digest of the archive it came from. A re-run compares the
//! stamp against the current manifest pin: a match skips the work entirely,
//! anything else (missing, unreadable, stale) re-extracts from scratch. The
//! unpacked tree is never trusted on mere presence — only the stamp proves
//! completeness, so bumping a version in the manifest forces re-extraction
//! automatically.
//!
//! Extraction itself is native (tar + flate2/bzip2/xz2) and refuses any
//! entry that could escape the destination directory.

use crate::error::{PrepError, Result};
use crate::fs_utils;
use crate::manifest::Artifact;
use crate::output;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

/// Suffix of the per-artifact extraction stamp file.
const STAMP_SUFFIX: &str = ".extract.stamp.txt";

/// Path of the stamp recording a completed extraction of `src_dir`.
pub fn stamp_path(dest: &Path, src_dir: &str) -> PathBuf {
    dest.join(format!("{src_dir}{STAMP_SUFFIX}"))
}

/// Ensure `archive` is unpacked under `dest`, exactly once per digest.
///
/// Returns `false` when the stamp already matches the manifest pin and no
/// work was done, `true` after a fresh extraction. The stamp is written only
/// after the expected directory `dest/<src_dir>` has been verified to exist,
/// so an interrupted extraction is simply redone on the next run.
pub fn ensure_extracted(archive: &Path, artifact: &Artifact, dest: &Path) -> Result<bool> {
    let stamp = stamp_path(dest, &artifact.src_dir);
    let expected = artifact.sha512_lower();

    if stamp_matches(&stamp, &expected) {
        output::skip(&format!("{} already extracted, skipping", artifact.src_dir));
        return Ok(false);
    }

    fs_utils::ensure_dir(dest)?;

    let pb = output::create_spinner(&format!("extracting {}", artifact.src_dir));
    let result = extract_archive(archive, dest, &artifact.id);
    pb.finish_and_clear();
    result?;

    let src_dir = dest.join(&artifact.src_dir);
    if !src_dir.is_dir() {
        return Err(PrepError::Extraction {
            artifact: artifact.id.clone(),
            dir: src_dir,
        });
    }

    // Written last: the stamp is a proof of completion, not an intent.
    std::fs::write(&stamp, format!("{expected}\n"))?;
    output::detail(&format!("extracted {}", artifact.src_dir));
    Ok(true)
}

/// Read the stamp and compare it, trimmed, against the expected digest.
/// A missing or unreadable stamp counts as a mismatch.
fn stamp_matches(stamp: &Path, expected: &str) -> bool {
    match std::fs::read(stamp) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).trim() == expected,
        Err(_) => false,
    }
}

// ============================================================================
// Native tar extraction with path-escape checks
// ============================================================================

/// Detect the archive format from the filename extension.
fn detect_format(archive: &Path) -> Option<&'static str> {
    let name = archive.to_string_lossy().to_lowercase();
    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        Some("tar.gz")
    } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
        Some("tar.bz2")
    } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
        Some("tar.xz")
    } else if name.ends_with(".tar") {
        Some("tar")
    } else {
        None
    }
}

fn extract_archive(archive: &Path, dest: &Path, id: &str) -> Result<()> {
    let format = detect_format(archive)
        .ok_or_else(|| PrepError::UnknownFormat(archive.to_path_buf()))?;

    let file = File::open(archive)?;
    let reader = BufReader::new(file);
    match format {
        "tar.gz" => extract_tar(flate2::read::GzDecoder::new(reader), dest, id),
        "tar.bz2" => extract_tar(bzip2::read::BzDecoder::new(reader), dest, id),
        "tar.xz" => extract_tar(xz2::read::XzDecoder::new(reader), dest, id),
        "tar" => extract_tar(reader, dest, id),
        _ => unreachable!("detect_format only yields the variants above"),
    }
}

fn unsafe_entry(id: &str, detail: String) -> PrepError {
    PrepError::UnsafeArchive {
        artifact: id.to_string(),
        detail,
    }
}

fn extract_tar<R: Read>(reader: R, dest: &Path, id: &str) -> Result<()> {
    let mut archive = tar::Archive::new(reader);

    for entry in archive.entries()? {
        let mut entry = entry?;

        let path = entry.path()?.into_owned();
        if !fs_utils::is_safe_path(&path) {
            return Err(unsafe_entry(
                id,
                format!("path escapes destination: {}", path.display()),
            ));
        }

        // Some archives contain a "." entry; treat it as a no-op.
        if path.as_os_str().is_empty() || path == Path::new(".") {
            continue;
        }

        let full_path = dest.join(&path);

        // Block tar "symlink swap" escapes: if any existing component is a
        // symlink, writing through it could escape `dest` even when the
        // entry path is syntactically safe.
        ensure_no_symlink_components(dest, &full_path, id)?;

        // Validate link targets before extraction.
        let entry_type = entry.header().entry_type();
        if entry_type == tar::EntryType::Symlink || entry_type == tar::EntryType::Link {
            match entry.link_name()? {
                Some(link_name) => {
                    let link_parent = full_path.parent().unwrap_or(dest);
                    ensure_link_target_within_dest(dest, link_parent, &link_name, id)?;
                }
                None => {
                    return Err(unsafe_entry(
                        id,
                        format!("link entry without target: {}", path.display()),
                    ));
                }
            }
        }

        if let Some(parent) = full_path.parent() {
            if parent.starts_with(dest) {
                ensure_no_symlink_components(dest, parent, id)?;
            }
            std::fs::create_dir_all(parent)?;
        }

        entry.unpack(&full_path)?;
    }

    Ok(())
}

/// Lexically normalize a path (no filesystem access). Used to validate link
/// targets without following symlinks.
fn normalize_lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    let mut has_root = false;

    for c in path.components() {
        match c {
            Component::Prefix(p) => {
                out.clear();
                out.push(p.as_os_str());
                has_root = true;
            }
            Component::RootDir => {
                out.push(Component::RootDir.as_os_str());
                has_root = true;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = out
                    .components()
                    .next_back()
                    .is_some_and(|last| matches!(last, Component::Normal(_)));
                if popped {
                    out.pop();
                } else if !has_root {
                    // Preserve leading ".." for relative paths.
                    out.push("..");
                }
            }
            Component::Normal(seg) => out.push(seg),
        }
    }

    out
}

fn ensure_no_symlink_components(dest: &Path, full_path: &Path, id: &str) -> Result<()> {
    let rel = full_path.strip_prefix(dest).map_err(|_| {
        unsafe_entry(
            id,
            format!("path outside destination: {}", full_path.display()),
        )
    })?;

    // Reject if any existing path component (including leaf) is a symlink.
    let mut cur = dest.to_path_buf();
    for comp in rel.components() {
        cur.push(comp);
        if let Ok(md) = std::fs::symlink_metadata(&cur)
            && md.file_type().is_symlink()
        {
            return Err(unsafe_entry(
                id,
                format!("symlink in path component: {}", cur.display()),
            ));
        }
    }

    Ok(())
}

fn ensure_link_target_within_dest(
    dest: &Path,
    link_parent: &Path,
    link_name: &Path,
    id: &str,
) -> Result<()> {
    if link_name.is_absolute()
        || link_name
            .components()
            .any(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
    {
        return Err(unsafe_entry(
            id,
            format!("absolute link target: {}", link_name.display()),
        ));
    }

    // Resolve relative to the link's parent, then ensure it stays within dest.
    let candidate = normalize_lexical(&link_parent.join(link_name));
    let norm_dest = normalize_lexical(dest);
    if candidate.strip_prefix(&norm_dest).is_err() {
        return Err(unsafe_entry(
            id,
            format!(
                "link target escapes destination: {} -> {}",
                link_parent.display(),
                link_name.display()
            ),
        ));
    }

    Ok(())
}
