//! Resource configuration: settings structure and backend registry.
//!
//! Configuration is resolved once at process startup: a YAML settings
//! document names storages, targets and collections, and a
//! [`BackendRegistry`] maps each configured backend *kind* to a registered
//! constructor. Unknown kinds, dangling references and missing options all
//! fail while the manager is built, never at request time.

use crate::storage::ResourceStorage;
use crate::target::PublicationTarget;
use crate::{ResourceError, ResourceResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Free-form options of one configured backend, interpreted by its
/// constructor.
pub type BackendOptions = BTreeMap<String, serde_yaml::Value>;

/// One configured storage or target backend.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct BackendSettings {
    /// Registry key of the backend constructor
    pub kind: String,

    /// Options handed to the constructor
    #[serde(default)]
    pub options: BackendOptions,
}

/// One configured collection.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CollectionSettings {
    /// Name of the storage this collection reads and writes through
    pub storage: String,

    /// Name of the target this collection publishes through
    pub target: String,

    /// Optional glob patterns scoping the storage's tree
    #[serde(default)]
    pub path_patterns: Vec<String>,
}

/// Upload handling policy.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct UploadSettings {
    /// Directory uploaded temp files must come from; uploads outside it are
    /// rejected as spoofed
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,

    /// Filename extensions that are refused at import time
    #[serde(default)]
    pub extension_blacklist: Vec<String>,
}

/// The resource management settings document.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Settings {
    /// Storage backends by name
    #[serde(default)]
    pub storages: BTreeMap<String, BackendSettings>,

    /// Publication targets by name
    #[serde(default)]
    pub targets: BTreeMap<String, BackendSettings>,

    /// Collections by name
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionSettings>,

    /// Upload policy
    #[serde(default)]
    pub upload: UploadSettings,

    /// Scratch directory for temporary local copies and upload relocation;
    /// defaults to a directory below the system temp dir
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

impl Settings {
    /// Parses a settings document from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Configuration`] when the document is not
    /// valid YAML or does not match the settings structure.
    pub fn from_yaml_str(text: &str) -> ResourceResult<Self> {
        serde_yaml::from_str(text)
            .map_err(|e| ResourceError::Configuration(format!("cannot parse settings: {}", e)))
    }

    /// Reads and parses a settings document from a file.
    pub fn from_yaml_file(path: &Path) -> ResourceResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ResourceError::Configuration(format!(
                "cannot read settings file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml_str(&text)
    }
}

/// Constructor for a storage backend: (configured name, options) → backend.
pub type StorageConstructor =
    Box<dyn Fn(&str, &BackendOptions) -> ResourceResult<Arc<dyn ResourceStorage>> + Send + Sync>;

/// Constructor for a publication target.
pub type TargetConstructor =
    Box<dyn Fn(&str, &BackendOptions) -> ResourceResult<Arc<dyn PublicationTarget>> + Send + Sync>;

/// Registry mapping configured backend kinds to constructors.
///
/// Configuration names a *kind* key, never a type: a kind missing from the
/// registry is a configuration error caught while the manager is built.
#[derive(Default)]
pub struct BackendRegistry {
    storages: BTreeMap<String, StorageConstructor>,
    targets: BTreeMap<String, TargetConstructor>,
}

impl BackendRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in backends registered:
    ///
    /// - storage `filesystem` — writable content-addressed store
    ///   (option `path`)
    /// - storage `static-directory` — read-only directory tree
    ///   (option `path`)
    /// - target `filesystem` — publication into a local directory
    ///   (options `path`, `base_uri`, optional
    ///   `subdivide_hash_path_segment`, `extension_blacklist`)
    pub fn with_defaults() -> Self {
        use crate::storage::{FileSystemStorage, StaticDirectoryStorage};
        use crate::target::FileSystemTarget;

        let mut registry = Self::new();

        registry.register_storage("filesystem", |name, options| {
            let path = required_string_option(options, "path", &format!("storage '{}'", name))?;
            let storage = FileSystemStorage::new(name, Path::new(&path))?;
            Ok(Arc::new(storage))
        });

        registry.register_storage("static-directory", |name, options| {
            let path = required_string_option(options, "path", &format!("storage '{}'", name))?;
            let storage = StaticDirectoryStorage::new(name, Path::new(&path))?;
            Ok(Arc::new(storage))
        });

        registry.register_target("filesystem", |name, options| {
            let context = format!("target '{}'", name);
            let path = required_string_option(options, "path", &context)?;
            let base_uri = required_string_option(options, "base_uri", &context)?;

            let mut target = FileSystemTarget::new(name, Path::new(&path), &base_uri)?;
            if let Some(subdivide) =
                optional_bool_option(options, "subdivide_hash_path_segment", &context)?
            {
                target = target.with_subdivided_hash_path(subdivide);
            }
            if let Some(blacklist) =
                optional_string_list_option(options, "extension_blacklist", &context)?
            {
                target = target.with_extension_blacklist(blacklist);
            }
            Ok(Arc::new(target))
        });

        registry
    }

    /// Registers a storage constructor under a kind key. An existing
    /// registration for the same kind is replaced.
    pub fn register_storage<F>(&mut self, kind: &str, constructor: F)
    where
        F: Fn(&str, &BackendOptions) -> ResourceResult<Arc<dyn ResourceStorage>>
            + Send
            + Sync
            + 'static,
    {
        self.storages.insert(kind.to_owned(), Box::new(constructor));
    }

    /// Registers a target constructor under a kind key.
    pub fn register_target<F>(&mut self, kind: &str, constructor: F)
    where
        F: Fn(&str, &BackendOptions) -> ResourceResult<Arc<dyn PublicationTarget>>
            + Send
            + Sync
            + 'static,
    {
        self.targets.insert(kind.to_owned(), Box::new(constructor));
    }

    /// Builds a storage backend from its configuration entry.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Configuration`] for unknown kinds, plus
    /// whatever the constructor raises.
    pub fn build_storage(
        &self,
        name: &str,
        settings: &BackendSettings,
    ) -> ResourceResult<Arc<dyn ResourceStorage>> {
        let constructor = self.storages.get(&settings.kind).ok_or_else(|| {
            ResourceError::Configuration(format!(
                "storage '{}' refers to the unknown storage kind '{}'; registered kinds: {}",
                name,
                settings.kind,
                keys_of(&self.storages)
            ))
        })?;
        constructor(name, &settings.options)
    }

    /// Builds a publication target from its configuration entry.
    pub fn build_target(
        &self,
        name: &str,
        settings: &BackendSettings,
    ) -> ResourceResult<Arc<dyn PublicationTarget>> {
        let constructor = self.targets.get(&settings.kind).ok_or_else(|| {
            ResourceError::Configuration(format!(
                "target '{}' refers to the unknown target kind '{}'; registered kinds: {}",
                name,
                settings.kind,
                keys_of(&self.targets)
            ))
        })?;
        constructor(name, &settings.options)
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("storage_kinds", &self.storages.keys().collect::<Vec<_>>())
            .field("target_kinds", &self.targets.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn keys_of<V>(map: &BTreeMap<String, V>) -> String {
    if map.is_empty() {
        return "(none)".to_owned();
    }
    map.keys().cloned().collect::<Vec<_>>().join(", ")
}

/// Reads a required string option, failing with a configuration error that
/// names the offending backend.
pub fn required_string_option(
    options: &BackendOptions,
    key: &str,
    context: &str,
) -> ResourceResult<String> {
    match options.get(key) {
        Some(serde_yaml::Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(ResourceError::Configuration(format!(
            "option '{}' of {} must be a string",
            key, context
        ))),
        None => Err(ResourceError::Configuration(format!(
            "{} is missing the required option '{}'",
            context, key
        ))),
    }
}

/// Reads an optional boolean option.
pub fn optional_bool_option(
    options: &BackendOptions,
    key: &str,
    context: &str,
) -> ResourceResult<Option<bool>> {
    match options.get(key) {
        None => Ok(None),
        Some(serde_yaml::Value::Bool(value)) => Ok(Some(*value)),
        Some(_) => Err(ResourceError::Configuration(format!(
            "option '{}' of {} must be a boolean",
            key, context
        ))),
    }
}

/// Reads an optional list-of-strings option.
pub fn optional_string_list_option(
    options: &BackendOptions,
    key: &str,
    context: &str,
) -> ResourceResult<Option<Vec<String>>> {
    match options.get(key) {
        None => Ok(None),
        Some(serde_yaml::Value::Sequence(values)) => {
            let mut list = Vec::with_capacity(values.len());
            for value in values {
                match value {
                    serde_yaml::Value::String(text) => list.push(text.clone()),
                    _ => {
                        return Err(ResourceError::Configuration(format!(
                            "option '{}' of {} must be a list of strings",
                            key, context
                        )))
                    }
                }
            }
            Ok(Some(list))
        }
        Some(_) => Err(ResourceError::Configuration(format!(
            "option '{}' of {} must be a list of strings",
            key, context
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
storages:
  default:
    kind: filesystem
    options:
      path: /var/lib/brs/storage
targets:
  local-web:
    kind: filesystem
    options:
      path: /var/www/_resources
      base_uri: "/_resources/"
      extension_blacklist: [php, exe]
collections:
  persistent:
    storage: default
    target: local-web
  static:
    storage: default
    target: local-web
    path_patterns: ["*/Public/**"]
upload:
  extension_blacklist: [php]
"#;

    #[test]
    fn test_settings_parse() {
        let settings = Settings::from_yaml_str(SAMPLE).unwrap();

        assert_eq!(settings.storages.len(), 1);
        assert_eq!(settings.storages["default"].kind, "filesystem");
        assert_eq!(settings.targets["local-web"].kind, "filesystem");
        assert_eq!(settings.collections["persistent"].storage, "default");
        assert_eq!(
            settings.collections["static"].path_patterns,
            vec!["*/Public/**"]
        );
        assert_eq!(settings.upload.extension_blacklist, vec!["php"]);
    }

    #[test]
    fn test_settings_reject_garbage() {
        assert!(matches!(
            Settings::from_yaml_str("storages: [not, a, map]"),
            Err(ResourceError::Configuration(_))
        ));
    }

    #[test]
    fn test_registry_builds_filesystem_storage() {
        let temp = TempDir::new().unwrap();
        let registry = BackendRegistry::with_defaults();

        let settings = BackendSettings {
            kind: "filesystem".to_owned(),
            options: BTreeMap::from([(
                "path".to_owned(),
                serde_yaml::Value::String(
                    temp.path().join("storage").to_string_lossy().into_owned(),
                ),
            )]),
        };

        let storage = registry.build_storage("default", &settings).unwrap();
        assert_eq!(storage.name(), "default");
        assert!(storage.writable().is_some());
    }

    #[test]
    fn test_registry_rejects_unknown_kind() {
        let registry = BackendRegistry::with_defaults();
        let settings = BackendSettings {
            kind: "s3".to_owned(),
            options: BTreeMap::new(),
        };

        let result = registry.build_storage("cloud", &settings);
        match result {
            Err(ResourceError::Configuration(message)) => {
                assert!(message.contains("cloud"));
                assert!(message.contains("s3"));
            }
            other => panic!("expected configuration error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_missing_required_option_names_the_backend() {
        let registry = BackendRegistry::with_defaults();
        let settings = BackendSettings {
            kind: "filesystem".to_owned(),
            options: BTreeMap::new(),
        };

        match registry.build_storage("default", &settings) {
            Err(ResourceError::Configuration(message)) => {
                assert!(message.contains("storage 'default'"));
                assert!(message.contains("'path'"));
            }
            other => panic!("expected configuration error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_option_type_mismatches_are_configuration_errors() {
        let options = BTreeMap::from([(
            "path".to_owned(),
            serde_yaml::Value::Number(serde_yaml::Number::from(1)),
        )]);
        assert!(matches!(
            required_string_option(&options, "path", "storage 'default'"),
            Err(ResourceError::Configuration(_))
        ));

        let options = BTreeMap::from([(
            "subdivide_hash_path_segment".to_owned(),
            serde_yaml::Value::String("yes".to_owned()),
        )]);
        assert!(matches!(
            optional_bool_option(&options, "subdivide_hash_path_segment", "target 't'"),
            Err(ResourceError::Configuration(_))
        ));
    }
}
