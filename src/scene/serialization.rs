use super::{Result, SceneError, SceneGraph, SceneObject};
use chrono::{DateTime, Utc};
use std::path::Path;

pub const FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub version: String,
    pub created: DateTime<Utc>,
    pub object_count: usize,
}

/// On-disk scene layout: ordered object records plus a metadata block.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SceneDocument {
    pub objects: Vec<SceneObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DocumentMetadata>,
}

impl SceneDocument {
    pub fn capture(scene: &SceneGraph) -> Self {
        let objects: Vec<SceneObject> = scene.objects().cloned().collect();
        Self {
            metadata: Some(DocumentMetadata {
                version: FORMAT_VERSION.to_string(),
                created: Utc::now(),
                object_count: objects.len(),
            }),
            objects,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|err| SceneError::CorruptScene(err.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let document: Self =
            serde_json::from_str(json).map_err(|err| SceneError::CorruptScene(err.to_string()))?;
        if let Some(metadata) = &document.metadata {
            if metadata.version != FORMAT_VERSION {
                log::warn!(
                    "Scene document version {} differs from {}; loading anyway",
                    metadata.version,
                    FORMAT_VERSION
                );
            }
        }
        Ok(document)
    }
}

pub fn save_scene_to_file(scene: &SceneGraph, path: &Path) -> Result<()> {
    let json = scene.serialize()?;
    std::fs::write(path, json)?;
    log::info!("Scene saved to {}", path.display());
    Ok(())
}

pub fn load_scene_from_file(scene: &mut SceneGraph, path: &Path) -> Result<()> {
    let json = std::fs::read_to_string(path)?;
    scene.deserialize(&json)?;
    log::info!("Scene loaded from {}", path.display());
    Ok(())
}
