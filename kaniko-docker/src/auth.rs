use base64::{engine::general_purpose::STANDARD, Engine};
use crossterm::{
    style::{self, Colorize, Styler},
    QueueableCommand,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap as Map,
    fmt, fs,
    io::{self, stdout, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::{
    models::Credentials,
    registry::{self, V1_REGISTRY_URL},
};

pub const DEFAULT_CONFIG_DIR: &str = "/kaniko/.docker";
pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Field {
    Username,
    Password,
    Registry,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Field::Username => "Username",
            Field::Password => "Password",
            Field::Registry => "Registry",
        };
        f.write_str(name)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IoOperation {
    CreateDirectory,
    WriteFile,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be specified")]
    MissingField(Field),

    #[error("failed to {operation} {}", .path.display())]
    Io {
        operation: IoOperation,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl fmt::Display for IoOperation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IoOperation::CreateDirectory => f.write_str("create directory"),
            IoOperation::WriteFile => f.write_str("create docker config file"),
        }
    }
}

/// The `config.json` document read by the kaniko executor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    pub auths: Map<String, AuthEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEntry {
    pub auth: String,
}

impl AuthConfig {
    pub fn single(registry: &str, credentials: &Credentials) -> AuthConfig {
        let mut auths = Map::new();
        auths.insert(
            registry.to_owned(),
            AuthEntry {
                auth: encode_auth(credentials),
            },
        );

        AuthConfig { auths }
    }
}

pub fn encode_auth(credentials: &Credentials) -> String {
    STANDARD.encode(format!("{}:{}", credentials.username, credentials.password))
}

pub struct AuthConfigWriter {
    config_dir: PathBuf,
}

impl AuthConfigWriter {
    pub fn new<P: Into<PathBuf>>(config_dir: P) -> AuthConfigWriter {
        AuthConfigWriter {
            config_dir: config_dir.into(),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    /// Writes a fresh auth config for `registry`, replacing whatever was at
    /// the config path before.
    pub fn write(&self, credentials: &Credentials, registry: &str) -> Result<(), ConfigError> {
        if credentials.username.is_empty() {
            return Err(ConfigError::MissingField(Field::Username));
        }
        if credentials.password.is_empty() {
            return Err(ConfigError::MissingField(Field::Password));
        }
        if registry.is_empty() {
            return Err(ConfigError::MissingField(Field::Registry));
        }

        let (registry, substituted) = registry::normalize_registry(registry);
        if substituted {
            warn!("docker v2 registry is not supported, using {}", registry);
            if let Err(err) = print_v2_notice(&mut stdout()) {
                warn!("couldn't print registry notice: {}", err);
            }
        }

        fs::create_dir_all(&self.config_dir).map_err(|source| ConfigError::Io {
            operation: IoOperation::CreateDirectory,
            path: self.config_dir.clone(),
            source,
        })?;

        let config_path = self.config_path();
        let config = AuthConfig::single(registry, credentials);
        self.persist(&config_path, &config)
            .map_err(|source| ConfigError::Io {
                operation: IoOperation::WriteFile,
                path: config_path.clone(),
                source,
            })?;
        info!("wrote docker config {:?} for {}", config_path, registry);

        Ok(())
    }

    fn persist(&self, config_path: &Path, config: &AuthConfig) -> io::Result<()> {
        let mut file = NamedTempFile::new_in(&self.config_dir)?;
        serde_json::to_writer(&mut file, config)?;
        file.flush()?;
        file.persist(config_path).map_err(|err| err.error)?;

        Ok(())
    }
}

fn print_v2_notice(out: &mut impl Write) -> crossterm::Result<()> {
    out.queue(style::PrintStyledContent("INFO: ".cyan().bold()))?
        .queue(style::Print(
            "Docker v2 registry is not supported in kaniko. Refer issue: https://github.com/GoogleContainerTools/kaniko/issues/1209\n",
        ))?
        .queue(style::PrintStyledContent("INFO: ".cyan().bold()))?
        .queue(style::Print(format!(
            "Using v1 registry instead: {}\n",
            V1_REGISTRY_URL
        )))?
        .flush()?;

    Ok(())
}
