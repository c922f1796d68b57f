use crate::models::RepoAddress;

pub const V1_REGISTRY_URL: &str = "https://index.docker.io/v1/";
pub const V2_REGISTRY_URL: &str = "https://index.docker.io/v2/";
pub const V2_HUB_REGISTRY_URL: &str = "https://registry.hub.docker.com/v2/";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegistryKind {
    /// The default Docker Hub endpoint. Never written into image names.
    V1,
    /// Docker Hub v2 endpoints, which the kaniko executor can't authenticate against.
    V2Index,
    V2Hub,
    Custom,
}

const WELL_KNOWN: &[(&str, RegistryKind)] = &[
    (V1_REGISTRY_URL, RegistryKind::V1),
    (V2_REGISTRY_URL, RegistryKind::V2Index),
    (V2_HUB_REGISTRY_URL, RegistryKind::V2Hub),
];

impl RegistryKind {
    pub fn of(registry: &str) -> RegistryKind {
        WELL_KNOWN
            .iter()
            .find(|(url, _)| *url == registry)
            .map(|(_, kind)| *kind)
            .unwrap_or(RegistryKind::Custom)
    }

    pub fn is_unsupported(self) -> bool {
        matches!(self, RegistryKind::V2Index | RegistryKind::V2Hub)
    }
}

/// Returns the registry to write credentials for, substituting the v1
/// endpoint for the v2 aliases. The flag tells whether a substitution happened.
pub fn normalize_registry(registry: &str) -> (&str, bool) {
    if RegistryKind::of(registry).is_unsupported() {
        (V1_REGISTRY_URL, true)
    } else {
        (registry, false)
    }
}

/// Strips the URL scheme and one trailing slash, leaving the part of the
/// registry that goes in front of an image name.
fn registry_host(registry: &str) -> &str {
    let host = registry
        .strip_prefix("https://")
        .or_else(|| registry.strip_prefix("http://"))
        .unwrap_or(registry);

    host.strip_suffix('/').unwrap_or(host)
}

/// Computes the address an image is pushed to and recorded under.
pub fn resolve_repo_address(registry: &str, repo: &str, expand: bool) -> RepoAddress {
    if !expand || registry.is_empty() || RegistryKind::of(registry) == RegistryKind::V1 {
        return RepoAddress(repo.into());
    }

    let host = registry_host(registry);
    let trimmed = registry.strip_suffix('/').unwrap_or(registry);

    // Already qualified, don't prefix it twice.
    if repo.starts_with(&format!("{}/", host)) || repo.starts_with(&format!("{}/", trimmed)) {
        return RepoAddress(repo.into());
    }

    RepoAddress(format!("{}/{}", host, repo))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(registry: &str, repo: &str, expand: bool) -> String {
        resolve_repo_address(registry, repo, expand).0
    }

    #[test]
    fn registry_kind_lookup() {
        assert_eq!(RegistryKind::of(V1_REGISTRY_URL), RegistryKind::V1);
        assert_eq!(RegistryKind::of(V2_REGISTRY_URL), RegistryKind::V2Index);
        assert_eq!(RegistryKind::of(V2_HUB_REGISTRY_URL), RegistryKind::V2Hub);
        assert_eq!(RegistryKind::of("https://gcr.io"), RegistryKind::Custom);
        assert_eq!(RegistryKind::of(""), RegistryKind::Custom);
    }

    #[test]
    fn v2_aliases_normalize_to_v1() {
        assert_eq!(normalize_registry(V2_REGISTRY_URL), (V1_REGISTRY_URL, true));
        assert_eq!(normalize_registry(V2_HUB_REGISTRY_URL), (V1_REGISTRY_URL, true));
        assert_eq!(normalize_registry(V1_REGISTRY_URL), (V1_REGISTRY_URL, false));
        assert_eq!(
            normalize_registry("https://myreg.example.com"),
            ("https://myreg.example.com", false)
        );
    }

    #[test]
    fn default_registry_is_never_prefixed() {
        assert_eq!(resolve(V1_REGISTRY_URL, "myorg/app", true), "myorg/app");
    }

    #[test]
    fn expand_disabled_keeps_repo() {
        assert_eq!(
            resolve("https://myreg.example.com", "myorg/app", false),
            "myorg/app"
        );
    }

    #[test]
    fn empty_registry_keeps_repo() {
        assert_eq!(resolve("", "myorg/app", true), "myorg/app");
    }

    #[test]
    fn expand_prefixes_registry_host() {
        assert_eq!(
            resolve("https://myreg.example.com", "myorg/app", true),
            "myreg.example.com/myorg/app"
        );
        assert_eq!(
            resolve("http://localhost:5000", "app", true),
            "localhost:5000/app"
        );
        assert_eq!(resolve("gcr.io", "proj/app", true), "gcr.io/proj/app");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        assert_eq!(
            resolve("https://myreg.example.com/", "myorg/app", true),
            "myreg.example.com/myorg/app"
        );
    }

    #[test]
    fn already_prefixed_repo_is_unchanged() {
        assert_eq!(
            resolve(
                "https://myreg.example.com",
                "myreg.example.com/myorg/app",
                true
            ),
            "myreg.example.com/myorg/app"
        );
        assert_eq!(
            resolve(
                "https://myreg.example.com/",
                "myreg.example.com/myorg/app",
                true
            ),
            "myreg.example.com/myorg/app"
        );
    }

    #[test]
    fn repo_qualified_with_full_registry_url_is_unchanged() {
        assert_eq!(
            resolve(
                "https://myreg.example.com",
                "https://myreg.example.com/myorg/app",
                true
            ),
            "https://myreg.example.com/myorg/app"
        );
        assert_eq!(
            resolve(
                "https://myreg.example.com/",
                "https://myreg.example.com/myorg/app",
                true
            ),
            "https://myreg.example.com/myorg/app"
        );
    }

    #[test]
    fn prefix_match_requires_path_separator() {
        assert_eq!(
            resolve("https://myreg.example.com", "myreg.example.company/app", true),
            "myreg.example.com/myreg.example.company/app"
        );
    }

    #[test]
    fn cache_repo_resolves_independently() {
        let registry = "https://myreg.example.com";
        let repo = resolve(registry, "myorg/app", true);
        let cache_repo = resolve(registry, "myorg/app-cache", true);

        assert_eq!(repo, "myreg.example.com/myorg/app");
        assert_eq!(cache_repo, "myreg.example.com/myorg/app-cache");
        assert_eq!(resolve(registry, "myorg/app", true), repo);
    }
}
