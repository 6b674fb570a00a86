use crate::util::cli::{Report, Reportable};
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactType {
    Main,
    SplitMain,
    Split,
    Resources,
    ReloadDex,
    Dex,
    RestartDex,
}

impl ArtifactType {
    pub fn is_split(self) -> bool {
        matches!(self, Self::SplitMain | Self::Split)
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Artifact {
    #[serde(rename = "type")]
    pub ty: ArtifactType,
    pub file: PathBuf,
}

impl Artifact {
    pub fn new(ty: ArtifactType, file: impl Into<PathBuf>) -> Self {
        Self {
            ty,
            file: file.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read build info from {path:?}: {source}")]
    ReadFailed { path: PathBuf, source: io::Error },
    #[error("Failed to parse build info from {path:?}: {source}")]
    ParseFailed {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl Reportable for LoadError {
    fn report(&self) -> Report {
        match self {
            Self::ReadFailed { path, source } => {
                Report::error(format!("Failed to read build info from {:?}", path), source)
            }
            Self::ParseFailed { path, source } => {
                Report::error(format!("Failed to parse build info from {:?}", path), source)
            }
        }
    }
}

/// What a build left behind for deployment.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildInfo {
    application_id: String,
    #[serde(default)]
    patch: bool,
    #[serde(default)]
    artifacts: Vec<Artifact>,
}

impl BuildInfo {
    pub fn new(application_id: impl Into<String>, patch: bool, artifacts: Vec<Artifact>) -> Self {
        Self {
            application_id: application_id.into(),
            patch,
            artifacts,
        }
    }

    /// Loads build info from a JSON file. Relative artifact paths are taken
    /// relative to the directory containing that file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| LoadError::ReadFailed {
            path: path.to_owned(),
            source,
        })?;
        let mut info: Self =
            serde_json::from_str(&raw).map_err(|source| LoadError::ParseFailed {
                path: path.to_owned(),
                source,
            })?;
        if let Some(dir) = path.parent() {
            for artifact in &mut info.artifacts {
                artifact.file = dir.join(&artifact.file);
            }
        }
        log::info!(
            "loaded build info for {:?} with {} artifact(s)",
            info.application_id,
            info.artifacts.len()
        );
        Ok(info)
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    pub fn is_patch_build(&self) -> bool {
        self.patch
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    /// The split APKs, in build order. Other artifact types aren't
    /// installed this way.
    pub fn split_apks(&self) -> Vec<PathBuf> {
        self.artifacts
            .iter()
            .filter(|artifact| artifact.ty.is_split())
            .map(|artifact| artifact.file.clone())
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_split_apks_keeps_splits_in_order() {
        let info = BuildInfo::new(
            "com.example.app",
            false,
            vec![
                Artifact::new(ArtifactType::Main, "app.apk"),
                Artifact::new(ArtifactType::Split, "slice_1.apk"),
                Artifact::new(ArtifactType::Resources, "resources.ap_"),
                Artifact::new(ArtifactType::SplitMain, "main.apk"),
                Artifact::new(ArtifactType::Dex, "classes.dex"),
                Artifact::new(ArtifactType::Split, "slice_0.apk"),
                Artifact::new(ArtifactType::RestartDex, "restart.dex"),
            ],
        );
        assert_eq!(
            info.split_apks(),
            vec![
                PathBuf::from("slice_1.apk"),
                PathBuf::from("main.apk"),
                PathBuf::from("slice_0.apk"),
            ]
        );
    }

    #[test]
    fn test_parse() {
        let info: BuildInfo = serde_json::from_str(
            r#"{
                "application-id": "com.example.app",
                "patch": true,
                "artifacts": [
                    { "type": "SPLIT_MAIN", "file": "main.apk" },
                    { "type": "RELOAD_DEX", "file": "reload.dex" }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(info.application_id(), "com.example.app");
        assert!(info.is_patch_build());
        assert_eq!(
            info.artifacts()[1],
            Artifact::new(ArtifactType::ReloadDex, "reload.dex")
        );
    }

    #[test]
    fn test_parse_defaults() {
        let info: BuildInfo =
            serde_json::from_str(r#"{ "application-id": "com.example.app" }"#).unwrap();
        assert!(!info.is_patch_build());
        assert!(info.artifacts().is_empty());
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build-info.json");
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{ "application-id": "com.example.app", "artifacts": [{{ "type": "SPLIT", "file": "slices/slice_0.apk" }}] }}"#
        )
        .unwrap();
        let info = BuildInfo::load(&path).unwrap();
        assert_eq!(
            info.split_apks(),
            vec![dir.path().join("slices").join("slice_0.apk")]
        );
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build-info.json");
        fs::write(&path, "<instant-run/>").unwrap();
        assert!(matches!(
            BuildInfo::load(&path),
            Err(LoadError::ParseFailed { .. })
        ));
        assert!(matches!(
            BuildInfo::load(dir.path().join("missing.json")),
            Err(LoadError::ReadFailed { .. })
        ));
    }
}
