//! Model descriptors and capability tags.

use std::path::{Path, PathBuf};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Capability tags advertised for a catalog model.
    ///
    /// Tags are informational: the host uses them for display and
    /// filtering only, never to alter requests sent to the server.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[repr(transparent)]
    pub struct ModelCapabilities: u32 {
        /// Plain text completion.
        const COMPLETION = 0b0000_0001;
        /// Multi-turn chat.
        const CHAT       = 0b0000_0010;
        /// Tuned for source code.
        const CODE       = 0b0000_0100;
        /// Fill-in-the-middle completion.
        const INFILL     = 0b0000_1000;
        /// Produces embeddings.
        const EMBEDDING  = 0b0001_0000;
    }
}

impl Default for ModelCapabilities {
    fn default() -> Self {
        Self::empty()
    }
}

impl Serialize for ModelCapabilities {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.tags().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ModelCapabilities {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let tags = Vec::<String>::deserialize(deserializer)?;
        Ok(tags
            .iter()
            .filter_map(|tag| Self::from_tag(tag))
            .fold(Self::empty(), |acc, flag| acc | flag))
    }
}

impl ModelCapabilities {
    const TAGS: [(Self, &'static str); 5] = [
        (Self::COMPLETION, "completion"),
        (Self::CHAT, "chat"),
        (Self::CODE, "code"),
        (Self::INFILL, "infill"),
        (Self::EMBEDDING, "embedding"),
    ];

    /// Parse a single lowercase tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::TAGS
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(tag))
            .map(|(flag, _)| *flag)
    }

    /// Tag names for every set flag, in declaration order.
    pub fn tags(self) -> Vec<&'static str> {
        Self::TAGS
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }
}

/// A model known to the catalog.
///
/// `name` is the identity: it is the registry key, the name sent to the
/// server's pull endpoint, and (via [`ModelDescriptor::dir_name`]) the
/// on-disk directory under the models root. `is_installed` is the only
/// field that changes after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    pub name: String,
    pub display_name: String,
    pub description: String,
    /// Human-readable download size, e.g. "1.3 GB".
    pub size: String,
    pub parameter_count: u64,
    pub capabilities: ModelCapabilities,
    pub is_installed: bool,
}

impl ModelDescriptor {
    /// Create a descriptor that is not yet installed.
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
        size: impl Into<String>,
        parameter_count: u64,
        capabilities: ModelCapabilities,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            description: description.into(),
            size: size.into(),
            parameter_count,
            capabilities,
            is_installed: false,
        }
    }

    /// Directory name used for this model under the models root.
    ///
    /// Tag separators and path separators are not portable in directory
    /// names, so `:`, `/` and `\` become `-`.
    pub fn dir_name(&self) -> String {
        self.name
            .chars()
            .map(|c| match c {
                ':' | '/' | '\\' => '-',
                other => other,
            })
            .collect()
    }

    /// Repository and tag halves of the model name (`latest` when untagged).
    pub fn name_and_tag(&self) -> (&str, &str) {
        self.name
            .split_once(':')
            .unwrap_or((self.name.as_str(), "latest"))
    }

    /// Directory holding a bundled or extracted copy of this model.
    pub fn local_dir(&self, models_root: &Path) -> PathBuf {
        models_root.join(self.dir_name())
    }

    /// Manifest the server writes after a successful pull into `models_root`.
    pub fn manifest_path(&self, models_root: &Path) -> PathBuf {
        let (repo, tag) = self.name_and_tag();
        models_root
            .join("manifests")
            .join("registry.ollama.ai")
            .join("library")
            .join(repo)
            .join(tag)
    }

    /// Whether either on-disk layout for this model exists.
    pub fn is_present_in(&self, models_root: &Path) -> bool {
        self.local_dir(models_root).is_dir() || self.manifest_path(models_root).is_file()
    }
}
