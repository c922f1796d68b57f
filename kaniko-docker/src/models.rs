use std::{fmt, path::PathBuf};

#[derive(Clone, Debug, Default, Hash, PartialOrd, Ord, PartialEq, Eq)]
pub struct RepoAddress(pub String);

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything the external builder needs to build and push one image.
#[derive(Clone, Debug, Default)]
pub struct BuildRequest {
    pub dockerfile: PathBuf,
    pub context: PathBuf,
    pub tags: Vec<String>,
    pub build_args: Vec<String>,
    pub target: Option<String>,
    pub repo: RepoAddress,
    pub mirrors: Vec<String>,
    pub labels: Vec<String>,
    pub skip_tls_verify: bool,
    pub snapshot_mode: Option<String>,
    pub cache: CachePolicy,
    pub digest_file: PathBuf,
    pub no_push: bool,
    pub verbosity: Option<String>,
    pub platform: Option<String>,
    pub skip_unused_stages: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CachePolicy {
    Disabled,
    Enabled {
        repo: Option<RepoAddress>,
        ttl_hours: Option<u32>,
    },
}

impl Default for CachePolicy {
    fn default() -> Self {
        CachePolicy::Disabled
    }
}

#[derive(Clone, Debug)]
pub struct ArtifactRequest {
    pub tags: Vec<String>,
    pub repo: RepoAddress,
    pub registry: String,
    pub artifact_file: PathBuf,
}
