use anyhow::{Context, Result};

use super::registry::TemplateRegistry;

/// Embedded default template catalog. Operators can replace it wholesale
/// with `--templates-file`; there is no merge.
const BUILTIN_TEMPLATES: &str = include_str!("builtin_templates.json");

/// Load the embedded catalog. Validated like any other catalog, so a bad
/// edit to the embedded JSON fails at startup, not at resolve time.
pub fn builtin_registry() -> Result<TemplateRegistry> {
    TemplateRegistry::from_json(BUILTIN_TEMPLATES).context("Embedded template catalog is invalid")
}
