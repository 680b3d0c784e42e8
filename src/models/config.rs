use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::{debug, error, info};

use super::context::{Cluster, Context, Settings, User, describe_value, key_to_string};
use crate::error::{ConfigError, ResolutionError, SchemaViolation};

pub const CONFIG_FILE_NAME: &str = ".esctlrc";
pub const CONFIG_ENV_VAR: &str = "ESCTL_CONFIG";
pub const DEFAULT_CONTEXT: &str = "localhost";
pub const DEFAULT_SERVER: &str = "http://localhost:9200";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterEntry {
    pub servers: Vec<String>,

    #[serde(default, skip_serializing_if = "Mapping::is_empty")]
    pub settings: Mapping,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UserEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub cluster: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing_if = "Mapping::is_empty")]
    pub settings: Mapping,
}

/// The on-disk configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    pub settings: Mapping,
    pub clusters: BTreeMap<String, ClusterEntry>,
    pub users: BTreeMap<String, UserEntry>,
    pub contexts: BTreeMap<String, ContextEntry>,
    #[serde(rename = "default-context")]
    pub default_context: String,
}

impl Default for ConfigDocument {
    fn default() -> Self {
        let mut clusters = BTreeMap::new();
        clusters.insert(
            DEFAULT_CONTEXT.to_string(),
            ClusterEntry {
                servers: vec![DEFAULT_SERVER.to_string()],
                settings: Mapping::new(),
            },
        );

        let mut contexts = BTreeMap::new();
        contexts.insert(
            DEFAULT_CONTEXT.to_string(),
            ContextEntry {
                cluster: DEFAULT_CONTEXT.to_string(),
                user: None,
                settings: Mapping::new(),
            },
        );

        Self {
            settings: Mapping::new(),
            clusters,
            users: BTreeMap::new(),
            contexts,
            default_context: DEFAULT_CONTEXT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum FieldType {
    Dict,
    String,
}

impl FieldType {
    fn name(self) -> &'static str {
        match self {
            FieldType::Dict => "dict",
            FieldType::String => "string",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            FieldType::Dict => value.is_mapping(),
            FieldType::String => value.is_string(),
        }
    }
}

const TOP_LEVEL_SCHEMA: [(&str, FieldType); 5] = [
    ("settings", FieldType::Dict),
    ("clusters", FieldType::Dict),
    ("users", FieldType::Dict),
    ("contexts", FieldType::Dict),
    ("default-context", FieldType::String),
];

/// Loaded, validated configuration. Immutable once built.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    document: ConfigDocument,
}

impl ConfigStore {
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
    }

    /// Load from an explicit path, or from `~/.esctlrc`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::default_path().ok_or_else(|| {
                    ConfigError::PathError("could not determine home directory".to_string())
                })?;
                Self::load_from(&path)
            }
        }
    }

    /// Load the document at `path`, writing the default document first when
    /// the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        debug!("Trying to load config file : {}", path.display());

        if !path.is_file() {
            Self::write_default(path)?;
        }

        let content = std::fs::read_to_string(path)?;
        let document = Self::parse(path, &content)?;

        debug!("clusters: {:?}", document.clusters.keys().collect::<Vec<_>>());
        debug!("contexts: {:?}", document.contexts.keys().collect::<Vec<_>>());
        debug!("users: {:?}", document.users.keys().collect::<Vec<_>>());
        debug!("default-context: {}", document.default_context);

        Ok(Self { document })
    }

    fn write_default(path: &Path) -> Result<(), ConfigError> {
        info!(
            "{} config file does not exist. Creating a default one...",
            path.display()
        );

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(&ConfigDocument::default())?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Parse and validate a configuration document.
    pub fn parse(path: &Path, content: &str) -> Result<ConfigDocument, ConfigError> {
        let raw: Value = serde_yaml::from_str(content).map_err(|err| {
            let location = err.location();
            error!("Cannot read YAML from {}", path.display());
            error!("{err}");
            ConfigError::SyntaxError {
                path: path.to_path_buf(),
                line: location.as_ref().map(|l| l.line()),
                column: location.as_ref().map(|l| l.column()),
                message: err.to_string(),
            }
        })?;

        let mut violations = validate_top_level(&raw);
        let document = if violations.is_empty() {
            decode_document(&raw, &mut violations)
        } else {
            None
        };

        match document {
            Some(document) if violations.is_empty() => Ok(document),
            _ => {
                for violation in &violations {
                    error!("{violation}");
                }
                Err(ConfigError::SchemaError {
                    path: path.to_path_buf(),
                    violations,
                })
            }
        }
    }

    pub fn document(&self) -> &ConfigDocument {
        &self.document
    }

    pub fn default_context(&self) -> &str {
        &self.document.default_context
    }

    /// Context entries in name order.
    pub fn contexts(&self) -> impl Iterator<Item = (&String, &ContextEntry)> {
        self.document.contexts.iter()
    }

    /// Pick the explicitly requested context, falling back to `default-context`.
    pub fn context_name<'a>(&'a self, explicit: Option<&'a str>) -> &'a str {
        match explicit {
            Some(name) => {
                debug!("Using provided context : {name}");
                name
            }
            None => {
                let name = self.default_context();
                debug!("No context provided. Using default context : {name}");
                name
            }
        }
    }

    /// Resolve a context name into its cluster, user and merged settings.
    pub fn resolve_context(&self, name: &str) -> Result<Context, ConfigError> {
        let entry = self
            .document
            .contexts
            .get(name)
            .ok_or_else(|| ResolutionError::UnknownContext(name.to_string()))?;

        let cluster = self.document.clusters.get(&entry.cluster).ok_or_else(|| {
            ResolutionError::UnknownCluster {
                context: name.to_string(),
                cluster: entry.cluster.clone(),
            }
        })?;

        let user = match &entry.user {
            Some(user_name) => {
                let user = self.document.users.get(user_name).ok_or_else(|| {
                    ResolutionError::UnknownUser {
                        context: name.to_string(),
                        user: user_name.clone(),
                    }
                })?;
                Some(User {
                    name: user_name.clone(),
                    username: user.username.clone(),
                    password: user.password.clone(),
                })
            }
            None => None,
        };

        // Cluster-level settings override global ones, context-level settings override both.
        let settings =
            Settings::layered([&self.document.settings, &cluster.settings, &entry.settings]);

        Ok(Context {
            name: name.to_string(),
            cluster: Cluster {
                name: entry.cluster.clone(),
                servers: cluster.servers.clone(),
            },
            user,
            settings,
        })
    }
}

fn validate_top_level(raw: &Value) -> Vec<SchemaViolation> {
    let Some(root) = raw.as_mapping() else {
        return vec![SchemaViolation {
            field: "<document>".to_string(),
            expected: FieldType::Dict.name(),
            actual: describe_value(raw),
        }];
    };

    TOP_LEVEL_SCHEMA
        .iter()
        .filter_map(|(field, field_type)| match root.get(*field) {
            Some(value) if field_type.matches(value) => None,
            Some(value) => Some(SchemaViolation {
                field: (*field).to_string(),
                expected: field_type.name(),
                actual: describe_value(value),
            }),
            None => Some(SchemaViolation {
                field: (*field).to_string(),
                expected: field_type.name(),
                actual: "<missing>".to_string(),
            }),
        })
        .collect()
}

fn decode_document(raw: &Value, violations: &mut Vec<SchemaViolation>) -> Option<ConfigDocument> {
    let settings = raw.get("settings")?.as_mapping()?.clone();
    let clusters: BTreeMap<String, ClusterEntry> =
        decode_section(raw, "clusters", "cluster definition", violations);
    let users = decode_section(raw, "users", "user definition", violations);
    let contexts = decode_section(raw, "contexts", "context definition", violations);
    let default_context = raw.get("default-context")?.as_str()?.to_string();

    for (name, cluster) in &clusters {
        if cluster.servers.is_empty() {
            violations.push(SchemaViolation {
                field: format!("clusters.{name}.servers"),
                expected: "non-empty list",
                actual: "[]".to_string(),
            });
        }
    }

    Some(ConfigDocument {
        settings,
        clusters,
        users,
        contexts,
        default_context,
    })
}

fn decode_section<T: DeserializeOwned>(
    raw: &Value,
    section: &str,
    expected: &'static str,
    violations: &mut Vec<SchemaViolation>,
) -> BTreeMap<String, T> {
    let mut entries = BTreeMap::new();
    let Some(mapping) = raw.get(section).and_then(Value::as_mapping) else {
        return entries;
    };

    for (key, value) in mapping {
        let name = key_to_string(key);
        if !key.is_string() {
            violations.push(SchemaViolation {
                field: format!("{section}.{name}"),
                expected: "string key",
                actual: name,
            });
            continue;
        }
        match serde_yaml::from_value::<T>(value.clone()) {
            Ok(entry) => {
                entries.insert(name, entry);
            }
            Err(err) => violations.push(SchemaViolation {
                field: format!("{section}.{name}"),
                expected,
                actual: err.to_string(),
            }),
        }
    }

    entries
}
