use anyhow::{anyhow, Context, Result};
use log::info;
use std::{path::PathBuf, process::Command};

use crate::{
    models::{BuildRequest, CachePolicy},
    services::ImageBuilder,
};

pub const EXECUTOR_PATH: &str = "/kaniko/executor";

pub struct KanikoBackend {
    executor: PathBuf,
}

impl KanikoBackend {
    pub fn new() -> KanikoBackend {
        KanikoBackend::with_executor(EXECUTOR_PATH)
    }

    pub fn with_executor<P: Into<PathBuf>>(executor: P) -> KanikoBackend {
        KanikoBackend {
            executor: executor.into(),
        }
    }
}

/// Translates a build request into kaniko executor flags.
pub fn executor_args(request: &BuildRequest) -> Vec<String> {
    let mut args = vec![
        format!("--dockerfile={}", request.dockerfile.display()),
        format!("--context=dir://{}", request.context.display()),
    ];

    if request.no_push {
        args.push("--no-push".into());
    } else {
        for tag in request.tags.iter() {
            args.push(format!("--destination={}:{}", request.repo.0, tag));
        }
    }

    for build_arg in request.build_args.iter() {
        args.push(format!("--build-arg={}", build_arg));
    }

    if let Some(target) = &request.target {
        args.push(format!("--target={}", target));
    }

    for mirror in request.mirrors.iter() {
        args.push(format!("--registry-mirror={}", mirror));
    }

    for label in request.labels.iter() {
        args.push(format!("--label={}", label));
    }

    if request.skip_tls_verify {
        args.push("--skip-tls-verify=true".into());
    }

    if let Some(snapshot_mode) = &request.snapshot_mode {
        args.push(format!("--snapshotMode={}", snapshot_mode));
    }

    if let CachePolicy::Enabled { repo, ttl_hours } = &request.cache {
        args.push("--cache=true".into());
        if let Some(repo) = repo {
            args.push(format!("--cache-repo={}", repo.0));
        }
        if let Some(ttl_hours) = ttl_hours {
            args.push(format!("--cache-ttl={}h", ttl_hours));
        }
    }

    args.push(format!("--digest-file={}", request.digest_file.display()));

    if let Some(verbosity) = &request.verbosity {
        args.push(format!("--verbosity={}", verbosity));
    }

    if let Some(platform) = &request.platform {
        args.push(format!("--customPlatform={}", platform));
    }

    if request.skip_unused_stages {
        args.push("--skip-unused-stages=true".into());
    }

    args
}

impl ImageBuilder for KanikoBackend {
    fn build(&mut self, request: &BuildRequest) -> Result<()> {
        let args = executor_args(request);
        info!("running {:?} {:?}", self.executor, args);

        let status = Command::new(&self.executor)
            .args(&args)
            .status()
            .with_context(|| format!("failed to run {:?}", self.executor))?;
        if !status.success() {
            return Err(anyhow!("kaniko executor failed: {}", status));
        }

        Ok(())
    }
}
