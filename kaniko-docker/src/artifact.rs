use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;

use crate::models::ArtifactRequest;

const DOCKER_ARTIFACT_V1: &str = "docker/v1";

/// Record of the images a run pushed, picked up by the CI system afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerArtifact {
    pub kind: String,
    pub data: ArtifactData,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactData {
    pub registry_type: RegistryType,
    pub registry_url: String,
    pub images: Vec<Image>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryType {
    Docker,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub image: String,
    pub digest: String,
}

impl DockerArtifact {
    pub fn new(request: &ArtifactRequest, digest: &str) -> DockerArtifact {
        let images = request
            .tags
            .iter()
            .map(|tag| Image {
                image: format!("{}:{}", request.repo.0, tag),
                digest: digest.to_owned(),
            })
            .collect();

        DockerArtifact {
            kind: DOCKER_ARTIFACT_V1.into(),
            data: ArtifactData {
                registry_type: RegistryType::Docker,
                registry_url: request.registry.clone(),
                images,
            },
        }
    }
}

pub fn write_artifact_file(request: &ArtifactRequest, digest: &str) -> Result<()> {
    let artifact = DockerArtifact::new(request, digest);
    let contents = serde_json::to_vec_pretty(&artifact)?;

    if let Some(parent) = request.artifact_file.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::write(&request.artifact_file, contents)?;
    info!("wrote artifact file {:?}", request.artifact_file);

    Ok(())
}
