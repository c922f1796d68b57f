use anyhow::{anyhow, Result};
use log::{info, warn};
use std::{fs, path::PathBuf};

use crate::{
    artifact,
    auth::AuthConfigWriter,
    models::{ArtifactRequest, BuildRequest, CachePolicy, Credentials},
    registry,
    services::ImageBuilder,
};

pub const DEFAULT_DIGEST_FILE: &str = "/kaniko/digest-file";

/// Flat plugin configuration, already parsed from flags and environment.
#[derive(Clone, Debug, Default)]
pub struct Settings {
    pub dockerfile: PathBuf,
    pub context: PathBuf,
    pub tags: Vec<String>,
    pub build_args: Vec<String>,
    pub target: Option<String>,
    pub repo: String,
    pub expand_repo: bool,
    pub labels: Vec<String>,
    pub registry: String,
    pub mirrors: Vec<String>,
    pub credentials: Credentials,
    pub dockerconfig_override: bool,
    pub skip_tls_verify: bool,
    pub snapshot_mode: Option<String>,
    pub enable_cache: bool,
    pub cache_repo: String,
    pub cache_ttl: Option<u32>,
    pub digest_file: PathBuf,
    pub artifact_file: Option<PathBuf>,
    pub no_push: bool,
    pub verbosity: Option<String>,
    pub platform: Option<String>,
    pub skip_unused_stages: bool,
}

pub struct Plugin {
    builder: Box<dyn ImageBuilder>,
    auth: AuthConfigWriter,
    settings: Settings,
}

impl Plugin {
    pub fn init<B>(builder: B, auth: AuthConfigWriter, settings: Settings) -> Plugin
    where
        B: 'static + ImageBuilder,
    {
        Plugin {
            builder: Box::new(builder),
            auth,
            settings,
        }
    }

    /// Credentials are only set up when pushing or when a username was
    /// given, and never when the user supplies their own docker config.
    pub fn needs_auth(&self) -> bool {
        let settings = &self.settings;
        (!settings.no_push || !settings.credentials.username.is_empty())
            && !settings.dockerconfig_override
    }

    pub fn build_request(&self) -> BuildRequest {
        let settings = &self.settings;
        let repo = registry::resolve_repo_address(
            &settings.registry,
            &settings.repo,
            settings.expand_repo,
        );

        let cache = if settings.enable_cache {
            let repo = if settings.cache_repo.is_empty() {
                None
            } else {
                Some(registry::resolve_repo_address(
                    &settings.registry,
                    &settings.cache_repo,
                    settings.expand_repo,
                ))
            };

            CachePolicy::Enabled {
                repo,
                ttl_hours: settings.cache_ttl.filter(|ttl| *ttl > 0),
            }
        } else {
            CachePolicy::Disabled
        };

        BuildRequest {
            dockerfile: settings.dockerfile.clone(),
            context: settings.context.clone(),
            tags: settings.tags.clone(),
            build_args: settings.build_args.clone(),
            target: settings.target.clone(),
            repo,
            mirrors: settings.mirrors.clone(),
            labels: settings.labels.clone(),
            skip_tls_verify: settings.skip_tls_verify,
            snapshot_mode: settings.snapshot_mode.clone(),
            cache,
            digest_file: settings.digest_file.clone(),
            no_push: settings.no_push,
            verbosity: settings.verbosity.clone(),
            platform: settings.platform.clone(),
            skip_unused_stages: settings.skip_unused_stages,
        }
    }

    pub fn artifact_request(&self) -> Option<ArtifactRequest> {
        let settings = &self.settings;
        if settings.no_push {
            return None;
        }

        let artifact_file = settings.artifact_file.clone()?;
        Some(ArtifactRequest {
            tags: settings.tags.clone(),
            repo: registry::resolve_repo_address(
                &settings.registry,
                &settings.repo,
                settings.expand_repo,
            ),
            registry: settings.registry.clone(),
            artifact_file,
        })
    }

    pub fn exec(&mut self) -> Result<()> {
        let request = self.build_request();
        if !request.no_push && request.repo.0.is_empty() {
            return Err(anyhow!("repository name to publish image must be specified"));
        }

        if self.needs_auth() {
            self.auth
                .write(&self.settings.credentials, &self.settings.registry)?;
        } else {
            info!("skipping docker config setup");
        }

        info!("building {:?} with tags {:?}", request.repo, request.tags);
        self.builder.build(&request)?;

        if let Some(artifact_request) = self.artifact_request() {
            self.write_artifact(&artifact_request);
        }

        Ok(())
    }

    /// The image is already pushed by now, so failures here are only reported.
    fn write_artifact(&self, artifact_request: &ArtifactRequest) {
        let digest = match fs::read_to_string(&self.settings.digest_file) {
            Ok(contents) => contents.trim().to_owned(),
            Err(err) => {
                warn!(
                    "unable to read digest file {:?}: {}",
                    self.settings.digest_file, err
                );
                String::new()
            }
        };

        if let Err(err) = artifact::write_artifact_file(artifact_request, &digest) {
            warn!(
                "failed to write artifact file {:?}: {}",
                artifact_request.artifact_file, err
            );
        }
    }
}
