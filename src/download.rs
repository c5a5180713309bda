//! Cache-aware, integrity-checked downloading.
//!
//! Every artifact is held to the same standard whether it comes off the
//! network or out of the download cache: the file must hash to the digest
//! pinned in the manifest. A corrupted or tampered cache entry is therefore
//! self-healing — it simply costs one re-download on the next run.

use crate::error::{PrepError, Result};
use crate::hash::{self, Sha512Stream};
use crate::manifest::Artifact;
use crate::output::{self, upgrade_to_bytes};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// A verified local copy of one artifact.
///
/// Only ever constructed after the file's digest has been checked against
/// the manifest.
#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    /// Path of the verified file in the download cache.
    pub path: PathBuf,
    /// The digest the file actually hashes to (equals the manifest pin).
    pub sha512: String,
    /// Size of the file in bytes.
    pub bytes: u64,
    /// True when the file was served from the cache without network access.
    pub from_cache: bool,
}

/// Extract the cache filename from a URL: the final path segment, with any
/// query string or fragment stripped.
pub fn filename_from_url(url: &str) -> String {
    let clean = url.split('?').next().unwrap_or(url);
    let clean = clean.split('#').next().unwrap_or(clean);

    clean
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| "download".to_string())
}

/// Ensure a verified copy of `artifact` exists in `download_dir`.
///
/// An existing file that hashes to the pinned digest is returned as a cache
/// hit with no network access. A missing or mismatching file is
/// (re-)downloaded in place; the fresh bytes are hashed as they are written
/// and a final mismatch fails with [`PrepError::Integrity`], leaving the
/// file on disk for inspection.
pub fn ensure_downloaded(artifact: &Artifact, download_dir: &Path) -> Result<DownloadOutcome> {
    let dest = download_dir.join(filename_from_url(&artifact.url));
    let expected = artifact.sha512_lower();

    if dest.is_file() {
        output::detail(&format!(
            "verifying sha512 of cached {}",
            dest.file_name().unwrap_or_default().to_string_lossy()
        ));
        let actual = hash::digest_file(&dest)?;
        if actual == expected {
            let bytes = std::fs::metadata(&dest)?.len();
            return Ok(DownloadOutcome {
                path: dest,
                sha512: actual,
                bytes,
                from_cache: true,
            });
        }
        output::warning(&format!(
            "cached {} failed verification (got {}, expected {}), re-downloading",
            dest.display(),
            actual,
            expected
        ));
    }

    let (bytes, actual) = download_to(&artifact.url, &dest)?;
    output::detail(&format!(
        "downloaded {} ({} bytes)",
        dest.file_name().unwrap_or_default().to_string_lossy(),
        bytes
    ));

    if actual != expected {
        return Err(PrepError::Integrity {
            artifact: artifact.id.clone(),
            url: artifact.url.clone(),
            expected,
            actual,
        });
    }

    Ok(DownloadOutcome {
        path: dest,
        sha512: actual,
        bytes,
        from_cache: false,
    })
}

/// Stream a URL to disk, hashing each chunk as it is written.
/// Returns the byte count and the final lower-case hex digest.
fn download_to(url: &str, dest: &Path) -> Result<(u64, String)> {
    let filename = dest
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "download".to_string());
    let pb = output::create_spinner(&format!("downloading {}", filename));

    let response = ureq::get(url).call().map_err(|e| {
        pb.finish_and_clear();
        PrepError::Http {
            url: url.to_string(),
            source: Box::new(e),
        }
    })?;

    if let Some(len) = response
        .header("content-length")
        .and_then(|s| s.parse().ok())
    {
        upgrade_to_bytes(&pb, len);
    }

    let result = copy_hashing(response.into_reader(), dest, &pb);
    pb.finish_and_clear();
    result
}

fn copy_hashing(
    mut reader: impl Read,
    dest: &Path,
    pb: &indicatif::ProgressBar,
) -> Result<(u64, String)> {
    let mut file = std::fs::File::create(dest)?;
    let mut stream = Sha512Stream::new();
    let mut buffer = [0u8; 8192];
    let mut total_bytes = 0u64;

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }

        file.write_all(&buffer[..n])?;
        stream.update(&buffer[..n]);
        total_bytes += n as u64;
        pb.set_position(total_bytes);
    }

    Ok((total_bytes, stream.finish()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Artifact;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // SHA-512 of "hello world"
    const HELLO_SHA512: &str = "309ecc489c12d6eb4cc40f50c902f2b4d0ed77ee511a7c7a9bcd3ca86d4cd86f\
                                989dd35bc5ff499670da34255b45b0cfd830e81f605dcf7dc5542e93ae9cd76f";

    fn hello_artifact(server_uri: &str) -> Artifact {
        Artifact::new(
            "hello",
            &format!("{}/pub/hello-1.0.tar.gz", server_uri),
            HELLO_SHA512,
            "hello-1.0",
        )
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(
            filename_from_url("https://ftp.gnu.org/gnu/binutils/binutils-2.41.tar.bz2"),
            "binutils-2.41.tar.bz2"
        );
        assert_eq!(
            filename_from_url("https://example.com/foo.tar.gz?mirror=1"),
            "foo.tar.gz"
        );
        assert_eq!(
            filename_from_url("https://example.com/foo.tar.gz#frag"),
            "foo.tar.gz"
        );
        assert_eq!(filename_from_url("https://example.com/"), "download");
    }

    #[tokio::test]
    async fn test_fresh_download_verifies_and_writes_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pub/hello-1.0.tar.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello world".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let temp = tempfile::tempdir().unwrap();
        let artifact = hello_artifact(&server.uri());

        let outcome = ensure_downloaded(&artifact, temp.path()).unwrap();
        assert!(!outcome.from_cache);
        assert_eq!(outcome.bytes, 11);
        assert_eq!(outcome.sha512, HELLO_SHA512);
        assert_eq!(outcome.path, temp.path().join("hello-1.0.tar.gz"));
        assert_eq!(
            std::fs::read(&outcome.path).unwrap(),
            b"hello world".to_vec()
        );
    }

    #[tokio::test]
    async fn test_verified_cache_hit_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("hello-1.0.tar.gz"), b"hello world").unwrap();

        let artifact = hello_artifact(&server.uri());
        let outcome = ensure_downloaded(&artifact, temp.path()).unwrap();
        assert!(outcome.from_cache);
        assert_eq!(outcome.bytes, 11);
        assert_eq!(outcome.sha512, HELLO_SHA512);
    }

    #[tokio::test]
    async fn test_corrupt_cache_is_overwritten() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pub/hello-1.0.tar.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello world".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let temp = tempfile::tempdir().unwrap();
        let cached = temp.path().join("hello-1.0.tar.gz");
        std::fs::write(&cached, b"corrupted bytes").unwrap();

        let artifact = hello_artifact(&server.uri());
        let outcome = ensure_downloaded(&artifact, temp.path()).unwrap();
        assert!(!outcome.from_cache);
        assert_eq!(std::fs::read(&cached).unwrap(), b"hello world".to_vec());
    }

    #[tokio::test]
    async fn test_digest_mismatch_fails_and_keeps_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pub/hello-1.0.tar.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"tampered".to_vec()))
            .mount(&server)
            .await;

        let temp = tempfile::tempdir().unwrap();
        let artifact = hello_artifact(&server.uri());

        let err = ensure_downloaded(&artifact, temp.path()).unwrap_err();
        match err {
            PrepError::Integrity {
                artifact, expected, ..
            } => {
                assert_eq!(artifact, "hello");
                assert_eq!(expected, HELLO_SHA512);
            }
            other => panic!("expected Integrity error, got: {other}"),
        }
        // The bad file stays on disk for inspection.
        assert!(temp.path().join("hello-1.0.tar.gz").is_file());
    }

    #[tokio::test]
    async fn test_http_error_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pub/hello-1.0.tar.gz"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let temp = tempfile::tempdir().unwrap();
        let artifact = hello_artifact(&server.uri());

        let err = ensure_downloaded(&artifact, temp.path()).unwrap_err();
        assert!(matches!(err, PrepError::Http { .. }));
    }

    #[tokio::test]
    async fn test_uppercase_manifest_digest_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pub/hello-1.0.tar.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello world".to_vec()))
            .mount(&server)
            .await;

        let temp = tempfile::tempdir().unwrap();
        let artifact = Artifact::new(
            "hello",
            &format!("{}/pub/hello-1.0.tar.gz", server.uri()),
            &HELLO_SHA512.to_uppercase(),
            "hello-1.0",
        );

        let outcome = ensure_downloaded(&artifact, temp.path()).unwrap();
        assert_eq!(outcome.sha512, HELLO_SHA512);
    }
}
