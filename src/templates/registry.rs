use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One version of a named prompt template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateVersion {
    /// Template body with `{date}` / `{participants}` / `{meetings_data}`
    /// placeholders. Opaque to the registry and the assembler.
    pub content: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_latest: bool,
}

/// Template resolution and construction errors
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template '{0}' not found")]
    TemplateNotFound(String),
    /// An explicitly requested version is never silently substituted
    #[error("version '{version}' not found for template '{name}'")]
    VersionNotFound { name: String, version: String },
    #[error("template '{name}' must have exactly one version marked is_latest ({count} found)")]
    LatestInvariant { name: String, count: usize },
}

/// Read-only store of named, versioned prompt templates. Loaded once at
/// startup (embedded catalog or operator-supplied JSON file) and passed
/// by reference into the pipeline.
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, BTreeMap<String, TemplateVersion>>,
    latest: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct TemplateFile {
    templates: BTreeMap<String, BTreeMap<String, TemplateVersion>>,
}

/// Introspection row for `templates` listings
#[derive(Debug, Clone, Serialize)]
pub struct TemplateSummary {
    pub name: String,
    pub latest_version: String,
    pub versions: Vec<String>,
    pub description: String,
}

impl TemplateRegistry {
    /// Build a registry, enforcing the latest invariant: exactly one
    /// version per template carries `is_latest`. Ambiguity is a load
    /// error, never a call-time guess.
    pub fn from_parts(
        templates: BTreeMap<String, BTreeMap<String, TemplateVersion>>,
    ) -> Result<Self, TemplateError> {
        let mut latest = BTreeMap::new();

        for (name, versions) in &templates {
            let flagged: Vec<&String> = versions
                .iter()
                .filter(|(_, v)| v.is_latest)
                .map(|(version, _)| version)
                .collect();

            if flagged.len() != 1 {
                return Err(TemplateError::LatestInvariant {
                    name: name.clone(),
                    count: flagged.len(),
                });
            }
            latest.insert(name.clone(), flagged[0].clone());
        }

        Ok(Self { templates, latest })
    }

    /// Parse a `{"templates": {name: {version: {...}}}}` JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let file: TemplateFile =
            serde_json::from_str(json).context("Failed to parse template catalog JSON")?;
        Ok(Self::from_parts(file.templates)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read template catalog from {:?}", path))?;
        Self::from_json(&content)
    }

    /// Resolve a template and version to its content.
    ///
    /// `None` and `Some("latest")` select the `is_latest` version. An
    /// explicit version that does not exist fails with `VersionNotFound`.
    pub fn resolve(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<&TemplateVersion, TemplateError> {
        self.resolve_entry(name, version).map(|(_, template)| template)
    }

    /// Like `resolve`, but also reports the concrete version string the
    /// request resolved to (callers record it in result provenance)
    pub fn resolve_entry(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<(&str, &TemplateVersion), TemplateError> {
        let versions = self
            .templates
            .get(name)
            .ok_or_else(|| TemplateError::TemplateNotFound(name.to_string()))?;

        let version = match version {
            None | Some("latest") => match self.latest.get(name) {
                Some(latest) => latest.as_str(),
                None => return Err(TemplateError::TemplateNotFound(name.to_string())),
            },
            Some(explicit) => explicit,
        };

        versions
            .get_key_value(version)
            .map(|(version, template)| (version.as_str(), template))
            .ok_or_else(|| TemplateError::VersionNotFound {
                name: name.to_string(),
                version: version.to_string(),
            })
    }

    /// The version string that `resolve(name, None)` would select
    pub fn latest_version(&self, name: &str) -> Result<&str, TemplateError> {
        self.latest
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| TemplateError::TemplateNotFound(name.to_string()))
    }

    /// Sorted version strings for a template
    pub fn list_versions(&self, name: &str) -> Result<Vec<String>, TemplateError> {
        self.templates
            .get(name)
            .map(|versions| versions.keys().cloned().collect())
            .ok_or_else(|| TemplateError::TemplateNotFound(name.to_string()))
    }

    /// All templates with their latest version and description
    pub fn list(&self) -> Vec<TemplateSummary> {
        self.templates
            .iter()
            .map(|(name, versions)| {
                let latest = &self.latest[name];
                TemplateSummary {
                    name: name.clone(),
                    latest_version: latest.clone(),
                    versions: versions.keys().cloned().collect(),
                    description: versions[latest].description.clone(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> TemplateRegistry {
        TemplateRegistry::from_json(
            r#"{
                "templates": {
                    "default": {
                        "1.0": {"content": "v1 body", "description": "first", "is_latest": false},
                        "2.0": {"content": "v2 body", "description": "second", "is_latest": true}
                    },
                    "daily_report": {
                        "1.0": {"content": "daily", "description": "daily", "is_latest": true}
                    }
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_explicit_version() {
        let registry = fixture();
        assert_eq!(registry.resolve("default", Some("1.0")).unwrap().content, "v1 body");
        assert_eq!(registry.resolve("default", Some("2.0")).unwrap().content, "v2 body");
    }

    #[test]
    fn test_resolve_latest() {
        let registry = fixture();
        assert_eq!(registry.resolve("default", None).unwrap().content, "v2 body");
        assert_eq!(
            registry.resolve("default", Some("latest")).unwrap().content,
            "v2 body"
        );
        assert_eq!(registry.latest_version("default").unwrap(), "2.0");
    }

    #[test]
    fn test_missing_version_is_never_substituted() {
        let registry = fixture();
        let err = registry.resolve("default", Some("9.9")).unwrap_err();
        assert!(matches!(
            err,
            TemplateError::VersionNotFound { ref version, .. } if version == "9.9"
        ));
    }

    #[test]
    fn test_missing_template() {
        let registry = fixture();
        let err = registry.resolve("nope", None).unwrap_err();
        assert!(matches!(err, TemplateError::TemplateNotFound(ref name) if name == "nope"));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let registry = fixture();
        let a = registry.resolve("default", Some("latest")).unwrap().content.clone();
        let b = registry.resolve("default", Some("latest")).unwrap().content.clone();
        assert_eq!(a, b);
    }

    #[test]
    fn test_no_latest_rejected_at_construction() {
        let err = TemplateRegistry::from_json(
            r#"{"templates": {"broken": {
                "1.0": {"content": "a", "is_latest": false}
            }}}"#,
        )
        .unwrap_err();

        let err = err.downcast::<TemplateError>().unwrap();
        assert!(matches!(err, TemplateError::LatestInvariant { count: 0, .. }));
    }

    #[test]
    fn test_multiple_latest_rejected_at_construction() {
        let err = TemplateRegistry::from_json(
            r#"{"templates": {"broken": {
                "1.0": {"content": "a", "is_latest": true},
                "2.0": {"content": "b", "is_latest": true}
            }}}"#,
        )
        .unwrap_err();

        let err = err.downcast::<TemplateError>().unwrap();
        assert!(matches!(err, TemplateError::LatestInvariant { count: 2, .. }));
    }

    #[test]
    fn test_from_json_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"templates": {{"only": {{"1.0": {{"content": "body", "is_latest": true}}}}}}}}"#
        )
        .unwrap();

        let registry = TemplateRegistry::from_json_file(file.path()).unwrap();
        assert_eq!(registry.resolve("only", None).unwrap().content, "body");
    }

    #[test]
    fn test_list_versions_sorted() {
        let registry = fixture();
        assert_eq!(registry.list_versions("default").unwrap(), vec!["1.0", "2.0"]);
        assert!(registry.list_versions("nope").is_err());
    }
}
