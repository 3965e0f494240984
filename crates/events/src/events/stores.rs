use serde::{Deserialize, Serialize};
use spark_types::{FragmentId, Selection, TransformerName};

/// Project store events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProjectEvent {
    /// Fragment content changed; stored results are stale
    FragmentOutOfDate { fragment: FragmentId },

    FragmentAdded { fragment: FragmentId },

    FragmentRemoved { fragment: FragmentId },
}

/// Selection tracker events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SelectionEvent {
    Changed { selection: Selection },
}

/// Transformer registry events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RegistryEvent {
    /// The chain was replaced; names are in chain order
    TransformersLoaded { transformers: Vec<TransformerName> },
}
