//! The pinned table of upstream source archives.
//!
//! Each [`Artifact`] names one tarball the toolchain build needs: where to
//! fetch it, the SHA-512 digest it must hash to, and the directory its
//! extraction is expected to produce. The table is built once at startup and
//! never mutated; tests construct their own manifests pointing at local
//! fixtures.

/// One upstream source archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Short unique name ("binutils", "gcc", ...).
    pub id: String,
    /// Canonical upstream tarball URL.
    pub url: String,
    /// Expected SHA-512 digest, 128 hex chars. Compared case-insensitively.
    pub sha512: String,
    /// Top-level directory the archive unpacks to ("binutils-2.41").
    pub src_dir: String,
}

impl Artifact {
    pub fn new(id: &str, url: &str, sha512: &str, src_dir: &str) -> Self {
        Self {
            id: id.to_string(),
            url: url.to_string(),
            sha512: sha512.to_string(),
            src_dir: src_dir.to_string(),
        }
    }

    /// Expected digest normalized to lower case for comparison.
    pub fn sha512_lower(&self) -> String {
        self.sha512.to_lowercase()
    }
}

/// Immutable, ordered collection of artifacts for one toolchain build.
#[derive(Debug, Clone)]
pub struct Manifest {
    artifacts: Vec<Artifact>,
    /// Id of the artifact the build stage extracts first.
    primary: String,
}

impl Manifest {
    /// Build a manifest from explicit entries. `primary` must name one of them.
    pub fn new(artifacts: Vec<Artifact>, primary: &str) -> Self {
        assert!(
            artifacts.iter().any(|a| a.id == primary),
            "primary artifact '{primary}' not in manifest"
        );
        Self {
            artifacts,
            primary: primary.to_string(),
        }
    }

    /// The pinned GNU toolchain sources for the reference cross compiler.
    pub fn toolchain() -> Self {
        Self::new(
            vec![
                Artifact::new(
                    "mpfr",
                    "https://ftp.gnu.org/gnu/mpfr/mpfr-4.2.1.tar.gz",
                    "858b7c2c3018e4099a7cd6d9d38eca7c46af90fa2c307d9417518027f07b6c43\
                     c51152c60b56359a53e7101a5d0629753f3eb5c54e17574742c374830832fcfe",
                    "mpfr-4.2.1",
                ),
                Artifact::new(
                    "gmp",
                    "https://ftp.gnu.org/gnu/gmp/gmp-6.3.0.tar.gz",
                    "44672c7568b007b4dffc5544374b9169004dfbe7ff79712302f15aa95d46229e\
                     3a057266a0421aadf95ab8a4af13ce4090d8ea39615d50c5064b4703a53fe3b0",
                    "gmp-6.3.0",
                ),
                Artifact::new(
                    "mpc",
                    "https://ftp.gnu.org/gnu/mpc/mpc-1.3.1.tar.gz",
                    "4bab4ef6076f8c5dfdc99d810b51108ced61ea2942ba0c1c932d624360a5473d\
                     f20d32b300fc76f2ba4aa2a97e1f275c9fd494a1ba9f07c4cb2ad7ceaeb1ae97",
                    "mpc-1.3.1",
                ),
                Artifact::new(
                    "binutils",
                    "https://ftp.gnu.org/gnu/binutils/binutils-2.41.tar.bz2",
                    "8c4303145262e84598d828e1a6465ddbf5a8ff757efe3fd981948854f32b311a\
                     fe5b154be3966e50d85cf5d25217564c1f519d197165aac8e82efcadc9e1e47c",
                    "binutils-2.41",
                ),
                Artifact::new(
                    "gcc",
                    "https://ftp.gnu.org/gnu/gcc/gcc-13.2.0/gcc-13.2.0.tar.gz",
                    "41c8c77ac5c3f77de639c2913a8e4ff424d48858c9575fc318861209467828cc\
                     b7e6e5fe3618b42bf3d745be8c7ab4b4e50e424155e691816fa99951a2b870b9",
                    "gcc-13.2.0",
                ),
            ],
            "binutils",
        )
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn get(&self, id: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.id == id)
    }

    /// The artifact the build stage extracts first (binutils in the
    /// reference toolchain).
    pub fn primary(&self) -> &Artifact {
        self.artifacts
            .iter()
            .find(|a| a.id == self.primary)
            .expect("primary id validated in new()")
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}
