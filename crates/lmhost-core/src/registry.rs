//! Model registry: the catalog of known models and their install state.
//!
//! The registry is a map from model name to descriptor. Installed state is
//! changed only through [`ModelRegistry::set_installed`], which replaces the
//! flag under the write lock, so a concurrent [`ModelRegistry::list_catalog`]
//! never observes a half-updated descriptor.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use crate::domain::{ModelCapabilities, ModelDescriptor};
use crate::error::RegistryError;

#[derive(Debug)]
pub struct ModelRegistry {
    models: RwLock<BTreeMap<String, ModelDescriptor>>,
}

impl ModelRegistry {
    /// Build a registry from an explicit catalog.
    ///
    /// Rejects duplicate names and names that would share an on-disk
    /// directory.
    pub fn new(catalog: Vec<ModelDescriptor>) -> Result<Self, RegistryError> {
        let mut models = BTreeMap::new();
        let mut dirs: HashMap<String, String> = HashMap::new();

        for model in catalog {
            if models.contains_key(&model.name) {
                return Err(RegistryError::DuplicateName(model.name));
            }
            let dir = model.dir_name();
            if let Some(first) = dirs.insert(dir.clone(), model.name.clone()) {
                return Err(RegistryError::DirectoryCollision {
                    first,
                    second: model.name,
                    dir,
                });
            }
            models.insert(model.name.clone(), model);
        }

        Ok(Self {
            models: RwLock::new(models),
        })
    }

    /// Registry seeded with the built-in catalog, all marked not installed.
    pub fn builtin() -> Self {
        Self::new(builtin_catalog()).unwrap_or_else(|err| {
            unreachable!("built-in catalog is invalid: {err}");
        })
    }

    /// Look up a descriptor by name.
    pub fn get(&self, name: &str) -> Option<ModelDescriptor> {
        self.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Set the installed flag. Returns `false` for unknown names.
    pub fn set_installed(&self, name: &str, installed: bool) -> bool {
        let mut models = self
            .models
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match models.get_mut(name) {
            Some(model) => {
                if model.is_installed != installed {
                    debug!(model = %name, installed, "Updating install state");
                }
                model.is_installed = installed;
                true
            }
            None => false,
        }
    }

    /// Catalog in display order: installed first, then case-insensitive
    /// display name.
    pub fn list_catalog(&self) -> Vec<ModelDescriptor> {
        let mut list: Vec<ModelDescriptor> = self.read().values().cloned().collect();
        list.sort_by(|a, b| {
            b.is_installed.cmp(&a.is_installed).then_with(|| {
                a.display_name
                    .to_lowercase()
                    .cmp(&b.display_name.to_lowercase())
            })
        });
        list
    }

    /// Reconcile installed flags with what is on disk under `models_root`.
    ///
    /// Returns the number of descriptors whose flag changed.
    pub fn refresh_from_disk(&self, models_root: &Path) -> usize {
        let mut models = self
            .models
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut changed = 0;
        for model in models.values_mut() {
            let present = model.is_present_in(models_root);
            if model.is_installed != present {
                model.is_installed = present;
                changed += 1;
            }
        }
        changed
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, ModelDescriptor>> {
        self.models.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// The fixed list of models offered out of the box.
pub fn builtin_catalog() -> Vec<ModelDescriptor> {
    use ModelCapabilities as Caps;

    vec![
        ModelDescriptor::new(
            "qwen2.5-coder:1.5b",
            "Qwen2.5 Coder 1.5B",
            "Small code model with fill-in-the-middle support, fast on CPU.",
            "986 MB",
            1_540_000_000,
            Caps::COMPLETION | Caps::CODE | Caps::INFILL,
        ),
        ModelDescriptor::new(
            "qwen2.5-coder:7b",
            "Qwen2.5 Coder 7B",
            "Larger code model for higher quality completions and chat.",
            "4.7 GB",
            7_620_000_000,
            Caps::COMPLETION | Caps::CHAT | Caps::CODE | Caps::INFILL,
        ),
        ModelDescriptor::new(
            "deepseek-coder:1.3b",
            "DeepSeek Coder 1.3B",
            "Compact code completion model.",
            "776 MB",
            1_350_000_000,
            Caps::COMPLETION | Caps::CODE | Caps::INFILL,
        ),
        ModelDescriptor::new(
            "codellama:7b",
            "Code Llama 7B",
            "General code model with instruction following.",
            "3.8 GB",
            6_740_000_000,
            Caps::COMPLETION | Caps::CHAT | Caps::CODE,
        ),
        ModelDescriptor::new(
            "llama3.2:1b",
            "Llama 3.2 1B",
            "Small general-purpose chat model.",
            "1.3 GB",
            1_240_000_000,
            Caps::COMPLETION | Caps::CHAT,
        ),
        ModelDescriptor::new(
            "nomic-embed-text",
            "Nomic Embed Text",
            "Text embedding model for semantic search.",
            "274 MB",
            137_000_000,
            Caps::EMBEDDING,
        ),
    ]
}
