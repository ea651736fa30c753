use crate::profile::{AppVersion, CURVE_MIN_VERSION};
use serde::{Deserialize, Serialize};

/// Decoder configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Deepest group nesting decoded before the offending group is degraded.
    pub max_group_depth: usize,
    /// Recursion bound for legacy keyed archives.
    pub max_unarchive_depth: usize,
    /// Total values a legacy keyed archive may expand to.
    pub max_unarchive_nodes: usize,
    /// Embed bitmap payloads as base64. When off only the relative path is kept.
    pub embed_images: bool,
    /// Decode artboards on the rayon pool. Needs the `parallel` feature.
    pub parallel_artboards: bool,
    /// First app version decoded with the Curve profile.
    pub curve_min_version: AppVersion,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_group_depth: 64,
            max_unarchive_depth: 256,
            max_unarchive_nodes: 100_000,
            embed_images: true,
            parallel_artboards: false,
            curve_min_version: CURVE_MIN_VERSION,
        }
    }
}

impl DecodeOptions {
    pub fn with_max_group_depth(mut self, depth: usize) -> Self {
        self.max_group_depth = depth;
        self
    }

    pub fn with_max_unarchive_depth(mut self, depth: usize) -> Self {
        self.max_unarchive_depth = depth;
        self
    }

    pub fn with_max_unarchive_nodes(mut self, nodes: usize) -> Self {
        self.max_unarchive_nodes = nodes;
        self
    }

    pub fn with_embed_images(mut self, embed: bool) -> Self {
        self.embed_images = embed;
        self
    }

    pub fn with_parallel_artboards(mut self, parallel: bool) -> Self {
        self.parallel_artboards = parallel;
        self
    }
}
