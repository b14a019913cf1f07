//! Manifest-defined providers
//!
//! A manifest is a YAML or JSON file declaring one provider and its rules
//! in data form. [`ManifestProviderSource`] scans a directory for manifests
//! and turns each into a [`ManifestProvider`]; the file path becomes the
//! provider's origin, so duplicate-identity errors point at the offending
//! files.
//!
//! ```yaml
//! provider:
//!   id: java-ee-descriptors
//!   phase: discovery
//!   after: [core-descriptors]
//! rules:
//!   - id: find-web-xml
//!     when:
//!       - property-matches:
//!           property: fileName
//!           pattern: '^web\.xml$'
//!     then:
//!       - add-tag:
//!           tag: java-ee
//! ```

use crate::action::DataAction;
use crate::condition::DataCondition;
use crate::context::LoadContext;
use crate::param::Parameter;
use crate::provider::{ProviderError, ProviderMetadata, ProviderSource, RuleProvider};
use crate::rule::Rule;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Error reading or interpreting a manifest file
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse manifest {file}: {message}")]
    Parse { file: PathBuf, message: String },

    #[error("invalid manifest {file}: {message}")]
    Invalid { file: PathBuf, message: String },
}

impl From<ManifestError> for ProviderError {
    fn from(err: ManifestError) -> Self {
        ProviderError::Other(err.into())
    }
}

/// Top-level manifest document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderManifest {
    pub provider: ProviderSection,

    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

/// The `provider:` section of a manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ProviderSection {
    pub id: String,

    /// Execution phase; defaults to the analysis phase
    #[serde(default)]
    pub phase: Option<String>,

    /// Marks an override provider replacing same-keyed rules
    #[serde(default)]
    pub overrides: bool,

    /// Abort the whole load if this provider's rules fail to build
    #[serde(default)]
    pub halt_on_error: bool,

    #[serde(default)]
    pub after: Vec<String>,

    #[serde(default)]
    pub before: Vec<String>,

    #[serde(default)]
    pub after_phases: Vec<String>,

    #[serde(default)]
    pub before_phases: Vec<String>,
}

/// One rule entry in a manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDefinition {
    #[serde(default)]
    pub id: Option<String>,

    // singleton_map_recursive keeps the `variant-name: {...}` map form in
    // YAML (serde_yaml would otherwise require `!variant` tags) and still
    // round-trips through JSON
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub when: Vec<DataCondition>,

    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub then: Vec<DataAction>,

    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl ProviderManifest {
    /// Parse a manifest file; the format follows the file extension
    pub fn from_path(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path)?;

        let manifest: ProviderManifest = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => {
                serde_json::from_str(&content).map_err(|e| ManifestError::Parse {
                    file: path.to_path_buf(),
                    message: e.to_string(),
                })?
            }
            _ => serde_yaml::from_str(&content).map_err(|e| ManifestError::Parse {
                file: path.to_path_buf(),
                message: e.to_string(),
            })?,
        };

        if manifest.provider.id.trim().is_empty() {
            return Err(ManifestError::Invalid {
                file: path.to_path_buf(),
                message: "provider id must not be empty".to_string(),
            });
        }

        Ok(manifest)
    }

    fn into_provider(self, origin: &Path) -> ManifestProvider {
        let section = self.provider;
        let mut metadata =
            ProviderMetadata::new(section.id).with_origin(origin.display().to_string());

        if let Some(phase) = section.phase {
            metadata = metadata.with_phase(phase);
        }
        if section.overrides {
            metadata = metadata.override_provider();
        }
        if section.halt_on_error {
            metadata = metadata.halt_on_error();
        }
        for target in section.after {
            metadata = metadata.after(target);
        }
        for target in section.before {
            metadata = metadata.before(target);
        }
        for phase in section.after_phases {
            metadata = metadata.after_phase(phase);
        }
        for phase in section.before_phases {
            metadata = metadata.before_phase(phase);
        }

        ManifestProvider {
            metadata,
            rules: self.rules,
        }
    }
}

/// A provider backed by a parsed manifest
pub struct ManifestProvider {
    metadata: ProviderMetadata,
    rules: Vec<RuleDefinition>,
}

impl ManifestProvider {
    /// Load a single manifest file
    pub fn from_path(path: &Path) -> Result<Self, ManifestError> {
        Ok(ProviderManifest::from_path(path)?.into_provider(path))
    }
}

impl fmt::Debug for ManifestProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManifestProvider")
            .field("id", &self.metadata.id)
            .field("origin", &self.metadata.origin)
            .field("rules", &self.rules.len())
            .finish()
    }
}

impl RuleProvider for ManifestProvider {
    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    fn rules(&self, _ctx: Option<&LoadContext>) -> Result<Vec<Rule>, ProviderError> {
        let mut rules = Vec::with_capacity(self.rules.len());
        for definition in &self.rules {
            let mut rule = match &definition.id {
                Some(id) => Rule::with_id(id),
                None => Rule::new(),
            };
            for condition in &definition.when {
                rule = rule.when(condition.clone());
            }
            for action in &definition.then {
                rule = rule.perform(action.clone());
            }
            for parameter in &definition.parameters {
                rule = rule.with_parameter(parameter.clone());
            }
            rules.push(rule);
        }
        Ok(rules)
    }
}

/// Scans a directory for `.yaml`, `.yml`, and `.json` provider manifests
///
/// Files are visited in name order so repeated loads over the same
/// directory discover providers in the same order.
pub struct ManifestProviderSource {
    directory: PathBuf,
}

impl ManifestProviderSource {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

impl ProviderSource for ManifestProviderSource {
    fn providers(&self, _ctx: &LoadContext) -> Result<Vec<Arc<dyn RuleProvider>>, ProviderError> {
        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in std::fs::read_dir(&self.directory)? {
            let path = entry?.path();
            let is_manifest = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yaml") | Some("yml") | Some("json")
            );
            if path.is_file() && is_manifest {
                paths.push(path);
            }
        }
        paths.sort();

        let mut providers: Vec<Arc<dyn RuleProvider>> = Vec::with_capacity(paths.len());
        for path in paths {
            debug!("reading provider manifest: {}", path.display());
            let provider = ManifestProvider::from_path(&path)?;
            providers.push(Arc::new(provider));
        }
        Ok(providers)
    }
}
