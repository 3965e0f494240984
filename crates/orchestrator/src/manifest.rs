//! Project manifest (`spark.toml`) loading

use crate::orchestrator::Orchestrator;
use serde::{Deserialize, Serialize};
use spark_errors::{Error, ProjectError};
use spark_types::{Fragment, Payload};
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;

/// Pipeline definition plus initial fragments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectManifest {
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub fragments: Vec<FragmentEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSection {
    /// Built-in transformer names in chain order
    pub transformers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentEntry {
    pub id: String,
    pub content: Payload,
}

impl ProjectManifest {
    /// Read and validate a manifest file
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read and `InvalidManifest`
    /// if it does not parse or fails validation.
    pub async fn load(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|e| Error::io_with_path(&e, path))?;
        let manifest = Self::parse(&contents, &path.display().to_string())?;
        tracing::debug!(
            path = %path.display(),
            transformers = manifest.pipeline.transformers.len(),
            fragments = manifest.fragments.len(),
            "manifest loaded"
        );
        Ok(manifest)
    }

    /// Parse manifest text; `origin` names the source in errors
    ///
    /// # Errors
    ///
    /// Returns `InvalidManifest` for malformed TOML, an empty pipeline or
    /// repeated fragment ids.
    pub fn parse(contents: &str, origin: &str) -> Result<Self, Error> {
        let invalid = |message: String| ProjectError::InvalidManifest {
            path: origin.to_string(),
            message,
        };

        let manifest: Self = toml::from_str(contents).map_err(|e| invalid(e.to_string()))?;
        if manifest.pipeline.transformers.is_empty() {
            return Err(invalid("pipeline lists no transformers".to_string()).into());
        }
        let mut seen = HashSet::new();
        for entry in &manifest.fragments {
            if !seen.insert(entry.id.as_str()) {
                return Err(invalid(format!("fragment {} is listed twice", entry.id)).into());
            }
        }
        Ok(manifest)
    }

    /// Load the pipeline and fragments into an orchestrator
    ///
    /// # Errors
    ///
    /// Returns `UnknownTransformer` for a name with no built-in and any error
    /// from loading transformers or adding fragments.
    pub async fn apply(&self, orchestrator: &Orchestrator) -> Result<(), Error> {
        orchestrator
            .load_builtins(self.pipeline.transformers.as_slice())
            .await?;
        for entry in &self.fragments {
            orchestrator
                .project()
                .add_fragment(Fragment::new(entry.id.as_str(), entry.content.clone()))
                .await?;
        }
        if let Some(first) = self.fragments.first() {
            orchestrator
                .selection()
                .set_active_fragment(Some(first.id.as_str().into()))
                .await;
        }
        Ok(())
    }
}
