//! Skill Registry
//!
//! Discovers skill packages under a root directory and binds each parsed
//! descriptor to its entry point. The registry is built once at startup and
//! shared read-only (`Arc<SkillRegistry>`) by every conversation.
//!
//! ```text
//! skills/
//! ├── weather_checker/
//! │   └── SKILL.md          + entry point bound as "weather_checker"
//! └── word_count/
//!     ├── SKILL.md
//!     └── word_count.sh     executable, stem matches the folder
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::descriptor::{METADATA_FILE, SkillDescriptor};
use crate::error::{AgentError, Result};
use crate::process::{ProcessEntryPoint, is_executable};
use crate::schema::canonical_name;
use crate::skill::{EntryPoint, Skill, SkillEntry};

/// Registry mapping skill name to skill
#[derive(Default, Clone)]
pub struct SkillRegistry {
    skills: BTreeMap<String, Arc<dyn Skill>>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a skill under its descriptor name, replacing any previous
    /// skill with the same name
    pub fn register<S: Skill + 'static>(&mut self, skill: S) {
        self.register_arc(Arc::new(skill));
    }

    /// Register a shared skill
    pub fn register_arc(&mut self, skill: Arc<dyn Skill>) {
        let name = skill.descriptor().name.clone();
        if self.skills.insert(name.clone(), skill).is_some() {
            tracing::debug!(skill = %name, "Replaced previously registered skill");
        }
    }

    /// Get a skill by descriptor name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Skill>> {
        self.skills.get(name).cloned()
    }

    /// Find the first skill whose canonical tool name matches `tool_name`
    pub fn find_tool(&self, tool_name: &str) -> Option<Arc<dyn Skill>> {
        self.skills
            .iter()
            .find(|(name, _)| canonical_name(name) == tool_name)
            .map(|(_, skill)| skill.clone())
    }

    /// Skills in registry order
    pub fn skills(&self) -> impl Iterator<Item = &Arc<dyn Skill>> {
        self.skills.values()
    }

    /// Descriptors in registry order
    pub fn descriptors(&self) -> Vec<SkillDescriptor> {
        self.skills.values().map(|s| s.descriptor().clone()).collect()
    }

    /// Skill names
    pub fn names(&self) -> Vec<&str> {
        self.skills.keys().map(String::as_str).collect()
    }

    /// Number of registered skills
    pub fn len(&self) -> usize {
        self.skills.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

impl std::fmt::Debug for SkillRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillRegistry")
            .field("skills", &self.names())
            .finish()
    }
}

/// Summary of one discovery pass
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Skill names registered, in load order
    pub loaded: Vec<String>,

    /// Folders skipped, with the reason
    pub skipped: Vec<(PathBuf, String)>,
}

/// Discovers skill packages and resolves their entry points
///
/// A folder is loaded when it holds a `SKILL.md` and an entry point named
/// after the folder: either one bound with [`SkillLoader::bind`], or (when
/// enabled) an executable file whose stem equals the folder name.
#[derive(Clone)]
pub struct SkillLoader {
    bound: HashMap<String, Arc<dyn EntryPoint>>,
    executables: bool,
}

impl Default for SkillLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SkillLoader {
    pub fn new() -> Self {
        Self {
            bound: HashMap::new(),
            executables: true,
        }
    }

    /// Bind a compiled-in entry point to a skill folder name
    #[must_use]
    pub fn bind<E: EntryPoint + 'static>(mut self, module: impl Into<String>, entry_point: E) -> Self {
        self.bound.insert(module.into(), Arc::new(entry_point));
        self
    }

    /// Enable or disable executable discovery
    #[must_use]
    pub const fn allow_executables(mut self, allow: bool) -> Self {
        self.executables = allow;
        self
    }

    /// Module names with a bound entry point
    pub fn bound_modules(&self) -> Vec<&str> {
        self.bound.keys().map(String::as_str).collect()
    }

    /// Build a registry from every skill package under `root`
    pub fn load(&self, root: &Path) -> Result<SkillRegistry> {
        let mut registry = SkillRegistry::new();
        self.load_into(root, &mut registry)?;
        Ok(registry)
    }

    /// Add every skill package under `root` to an existing registry
    pub fn load_into(&self, root: &Path, registry: &mut SkillRegistry) -> Result<LoadReport> {
        let mut report = LoadReport::default();

        if !root.is_dir() {
            tracing::warn!(path = %root.display(), "Skills directory not found");
            return Ok(report);
        }

        let entries = std::fs::read_dir(root).map_err(|source| AgentError::RegistryLoad {
            path: root.to_path_buf(),
            source,
        })?;

        let mut folders: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_dir())
            .collect();
        folders.sort();

        for folder in folders {
            match self.load_folder(&folder)? {
                Ok(entry) => {
                    let name = entry.descriptor().name.clone();
                    tracing::debug!(skill = %name, path = %folder.display(), "Loaded skill");
                    registry.register(entry);
                    report.loaded.push(name);
                }
                Err(reason) => {
                    tracing::debug!(path = %folder.display(), %reason, "Skipped skill folder");
                    report.skipped.push((folder, reason));
                }
            }
        }

        tracing::info!(
            loaded = report.loaded.len(),
            skipped = report.skipped.len(),
            "Loaded skills from {}",
            root.display()
        );

        Ok(report)
    }

    /// Outer error aborts discovery, inner error skips this folder
    fn load_folder(&self, folder: &Path) -> Result<std::result::Result<SkillEntry, String>> {
        let Some(module) = folder.file_name().and_then(|n| n.to_str()) else {
            return Ok(Err("folder name is not valid UTF-8".into()));
        };

        let metadata = folder.join(METADATA_FILE);
        if !metadata.is_file() {
            return Ok(Err(format!("no {METADATA_FILE}")));
        }

        let Some(entry_point) = self.resolve_entry_point(folder, module)? else {
            return Ok(Err(format!("no entry point named '{module}'")));
        };

        let content = std::fs::read_to_string(&metadata).map_err(|source| AgentError::RegistryLoad {
            path: metadata.clone(),
            source,
        })?;

        match SkillDescriptor::parse(&content) {
            Ok(descriptor) => Ok(Ok(SkillEntry::new(descriptor, entry_point))),
            Err(e) => {
                tracing::warn!(path = %metadata.display(), error = %e, "Ignoring malformed skill");
                Ok(Err(e.to_string()))
            }
        }
    }

    fn resolve_entry_point(&self, folder: &Path, module: &str) -> Result<Option<Arc<dyn EntryPoint>>> {
        if let Some(bound) = self.bound.get(module) {
            return Ok(Some(bound.clone()));
        }

        if !self.executables {
            return Ok(None);
        }

        let entries = std::fs::read_dir(folder).map_err(|source| AgentError::RegistryLoad {
            path: folder.to_path_buf(),
            source,
        })?;

        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.file_stem().and_then(|s| s.to_str()) == Some(module))
            .filter(|path| is_executable(path))
            .collect();
        candidates.sort();

        Ok(candidates
            .into_iter()
            .next()
            .map(|program| Arc::new(ProcessEntryPoint::new(program)) as Arc<dyn EntryPoint>))
    }
}
