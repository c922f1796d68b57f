use anyhow::{anyhow, Context, Result};
use log::info;
use std::{
    env, fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use structopt::StructOpt;

use auth::{AuthConfigWriter, DEFAULT_CONFIG_DIR};
use backends::KanikoBackend;
use models::Credentials;
use plugin::{Plugin, Settings, DEFAULT_DIGEST_FILE};
use registry::V1_REGISTRY_URL;

mod artifact;
mod auth;
mod backends;
mod models;
mod plugin;
mod registry;
mod services;

const TAGS_FILE: &str = ".tags";
const DEFAULT_TAG: &str = "latest";

#[derive(Debug, StructOpt)]
#[structopt(
    name = "kaniko-docker",
    about = "Builds and pushes docker images with kaniko from a CI pipeline."
)]
struct Opt {
    /// Build dockerfile.
    #[structopt(long, env = "PLUGIN_DOCKERFILE", default_value = "Dockerfile")]
    dockerfile: PathBuf,

    /// Build context.
    #[structopt(long, env = "PLUGIN_CONTEXT", default_value = ".")]
    context: PathBuf,

    /// Build tags, read from a .tags file when not given.
    #[structopt(long, env = "PLUGIN_TAGS", use_delimiter = true)]
    tags: Vec<String>,

    /// Prepends the registry url to the repo if it isn't already there.
    #[structopt(long, env = "PLUGIN_EXPAND_REPO")]
    expand_repo: Option<Option<Switch>>,

    /// Use an existing docker config instead of generating one.
    #[structopt(long, env = "PLUGIN_DOCKERCONFIG_OVERRIDE")]
    dockerconfig_override: Option<Option<Switch>>,

    /// Build args.
    #[structopt(long, env = "PLUGIN_BUILD_ARGS", use_delimiter = true)]
    args: Vec<String>,

    /// Build target.
    #[structopt(long, env = "PLUGIN_TARGET")]
    target: Option<String>,

    /// Docker repository.
    #[structopt(long, env = "PLUGIN_REPO")]
    repo: Option<String>,

    /// Additional k=v labels.
    #[structopt(long, env = "PLUGIN_CUSTOM_LABELS", use_delimiter = true)]
    custom_labels: Vec<String>,

    /// Docker registry.
    #[structopt(long, env = "PLUGIN_REGISTRY", default_value = V1_REGISTRY_URL)]
    registry: String,

    /// Docker registry mirrors.
    #[structopt(long, env = "PLUGIN_REGISTRY_MIRRORS", use_delimiter = true)]
    registry_mirrors: Vec<String>,

    #[structopt(long, env = "PLUGIN_USERNAME")]
    username: Option<String>,

    #[structopt(long, env = "PLUGIN_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Skip registry tls verify.
    #[structopt(long, env = "PLUGIN_SKIP_TLS_VERIFY")]
    skip_tls_verify: Option<Option<Switch>>,

    /// One of full, redo or time.
    #[structopt(long, env = "PLUGIN_SNAPSHOT_MODE")]
    snapshot_mode: Option<String>,

    /// Opt into caching with kaniko.
    #[structopt(long, env = "PLUGIN_ENABLE_CACHE")]
    enable_cache: Option<Option<Switch>>,

    /// Remote repository for cached layers, requires --enable-cache.
    #[structopt(long, env = "PLUGIN_CACHE_REPO")]
    cache_repo: Option<String>,

    /// Cache timeout in hours.
    #[structopt(long, env = "PLUGIN_CACHE_TTL")]
    cache_ttl: Option<u32>,

    /// Where to write the record of pushed images.
    #[structopt(long, env = "PLUGIN_ARTIFACT_FILE")]
    artifact_file: Option<PathBuf>,

    /// Only build the image, without pushing it.
    #[structopt(long, env = "PLUGIN_NO_PUSH")]
    no_push: Option<Option<Switch>>,

    /// Kaniko log level, one of panic, fatal, error, warn, info, debug or trace.
    #[structopt(long, env = "PLUGIN_VERBOSITY")]
    verbosity: Option<String>,

    /// Build for another platform than the host.
    #[structopt(long, env = "PLUGIN_PLATFORM")]
    platform: Option<String>,

    /// Build only used stages.
    #[structopt(long, env = "PLUGIN_SKIP_UNUSED_STAGES")]
    skip_unused_stages: Option<Option<Switch>>,

    /// Where the generated docker config is written.
    #[structopt(long, env = "PLUGIN_DOCKER_CONFIG_DIR", default_value = DEFAULT_CONFIG_DIR)]
    docker_config_dir: PathBuf,
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        value => Err(anyhow!("expected a boolean, got {:?}", value)),
    }
}

/// Boolean option that can be given bare (`--no-push`) or with a value
/// (`--no-push false`), the latter being how env vars arrive.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Switch(bool);

impl FromStr for Switch {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Switch> {
        parse_flag(value).map(Switch)
    }
}

fn switch(value: Option<Option<Switch>>) -> bool {
    match value {
        None => false,
        Some(None) => true,
        Some(Some(Switch(value))) => value,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

/// Falls back to the tags file, then to `latest`, when no tags were given.
fn resolve_tags<P: AsRef<Path>>(tags: Vec<String>, tags_file: P) -> Result<Vec<String>> {
    let tags = tags
        .into_iter()
        .map(|tag| tag.trim().to_owned())
        .filter(|tag| !tag.is_empty())
        .collect::<Vec<_>>();
    if !tags.is_empty() {
        return Ok(tags);
    }

    let tags_file = tags_file.as_ref();
    if tags_file.exists() {
        let contents = fs::read_to_string(tags_file)
            .with_context(|| format!("failed to read tags file {:?}", tags_file))?;
        let tags = contents
            .split(|c: char| c == ',' || c == '\n')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(String::from)
            .collect::<Vec<_>>();

        if !tags.is_empty() {
            info!("read tags {:?} from {:?}", tags, tags_file);
            return Ok(tags);
        }
    }

    Ok(vec![DEFAULT_TAG.into()])
}

impl Opt {
    fn into_settings<P: AsRef<Path>>(self, tags_file: P) -> Result<Settings> {
        Ok(Settings {
            dockerfile: self.dockerfile,
            context: self.context,
            tags: resolve_tags(self.tags, tags_file)?,
            build_args: self.args,
            target: non_empty(self.target),
            repo: self.repo.unwrap_or_default(),
            expand_repo: switch(self.expand_repo),
            labels: self.custom_labels,
            registry: self.registry,
            mirrors: self.registry_mirrors,
            credentials: Credentials {
                username: self.username.unwrap_or_default(),
                password: self.password.unwrap_or_default(),
            },
            dockerconfig_override: switch(self.dockerconfig_override),
            skip_tls_verify: switch(self.skip_tls_verify),
            snapshot_mode: non_empty(self.snapshot_mode),
            enable_cache: switch(self.enable_cache),
            cache_repo: self.cache_repo.unwrap_or_default(),
            cache_ttl: self.cache_ttl,
            digest_file: PathBuf::from(DEFAULT_DIGEST_FILE),
            artifact_file: self
                .artifact_file
                .filter(|path| !path.as_os_str().is_empty()),
            no_push: switch(self.no_push),
            verbosity: non_empty(self.verbosity),
            platform: non_empty(self.platform),
            skip_unused_stages: switch(self.skip_unused_stages),
        })
    }
}

fn main() -> Result<()> {
    pretty_env_logger::init_custom_env("PLUGIN_LOG");

    // The env file has to be loaded before the flags read the environment.
    if let Some(env_file) = env::var_os("PLUGIN_ENV_FILE").filter(|path| !path.is_empty()) {
        dotenv::from_path(&env_file)
            .with_context(|| format!("failed to load env file {:?}", env_file))?;
        info!("loaded env file {:?}", env_file);
    }

    let opt = Opt::from_args();
    let auth = AuthConfigWriter::new(&opt.docker_config_dir);
    let settings = opt.into_settings(TAGS_FILE)?;
    info!("resolved settings {:?}", settings);

    let mut plugin = Plugin::init(KanikoBackend::new(), auth, settings);
    plugin.exec()?;

    Ok(())
}
