//! Session configuration for extensibility
//!
//! Mirrors the teacher compiler's builder-pattern configuration: an
//! embedder can extend the value environment with extra built-ins without
//! touching [`crate::symtab::SymbolTable`]'s own initialization. Also loads
//! the same declarations from a TOML document, for an embedder that wants
//! to configure a long-running `smli` session without recompiling it.

use std::fmt;

use serde::Deserialize;

use crate::types::{builtin_types, Type};

/// A value to add to a session's global environment before the first item
/// is checked.
///
/// # Type Safety
///
/// - **With a type**: the checker enforces the declared signature for every
///   use, the same as any other built-in.
/// - **Without a type (`None`)**: the checker assigns it a fresh,
///   completely unconstrained type variable, equivalent to declaring
///   `val name : 'a`. This accepts any single use but, like any other
///   non-generalized binding, will reject a second use at an incompatible
///   type within the same session.
#[derive(Debug, Clone)]
pub struct ExternalValue {
    /// The name used in source, e.g. `"journal_append"`.
    pub name: String,
    /// Optional declared type; `None` is maximally polymorphic and unsound
    /// for anything but a single use.
    pub ty: Option<Type>,
}

impl ExternalValue {
    /// Create a new external value with no declared type.
    pub fn new(name: impl Into<String>) -> Self {
        ExternalValue { name: name.into(), ty: None }
    }

    /// Create a new external value with a declared type.
    pub fn with_type(name: impl Into<String>, ty: Type) -> Self {
        ExternalValue { name: name.into(), ty: Some(ty) }
    }
}

/// Configuration for a [`crate::session::Session`].
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Extra values to register before the first item is checked.
    pub external_values: Vec<ExternalValue>,
}

impl SessionConfig {
    pub fn new() -> Self {
        SessionConfig::default()
    }

    /// Add an external value (builder pattern).
    pub fn with_value(mut self, value: ExternalValue) -> Self {
        self.external_values.push(value);
        self
    }

    /// Add multiple external values.
    pub fn with_values(mut self, values: impl IntoIterator<Item = ExternalValue>) -> Self {
        self.external_values.extend(values);
        self
    }

    /// Names of all configured external values, for diagnostics.
    pub fn external_names(&self) -> Vec<&str> {
        self.external_values.iter().map(|v| v.name.as_str()).collect()
    }

    /// Load external value declarations from a TOML document shaped like:
    ///
    /// ```toml
    /// [[external_values]]
    /// name = "pi"
    /// type = "real"
    ///
    /// [[external_values]]
    /// name = "mystery"
    /// ```
    ///
    /// `type`, when present, must be one of spec.md's six primitive type
    /// names (`int`, `real`, `string`, `bool`, `char`, `unit`); there is no
    /// surface syntax here for compound types, matching how source-level
    /// type annotations are parsed by `smlc::parser`, not by this config
    /// loader.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let spec: SessionConfigSpec = toml::from_str(source)?;
        let primitives = builtin_types();
        let mut config = SessionConfig::new();
        for v in spec.external_values {
            let value = match v.ty {
                Some(name) => {
                    let ty = primitives
                        .get(&name)
                        .cloned()
                        .ok_or_else(|| ConfigError::UnknownType(name))?;
                    ExternalValue::with_type(v.name, ty)
                }
                None => ExternalValue::new(v.name),
            };
            config = config.with_value(value);
        }
        Ok(config)
    }
}

#[derive(Debug, Deserialize)]
struct SessionConfigSpec {
    #[serde(default)]
    external_values: Vec<ExternalValueSpec>,
}

#[derive(Debug, Deserialize)]
struct ExternalValueSpec {
    name: String,
    #[serde(rename = "type")]
    ty: Option<String>,
}

/// Failure loading a [`SessionConfig`] from TOML.
#[derive(Debug)]
pub enum ConfigError {
    /// The document itself was malformed.
    Toml(toml::de::Error),
    /// A `type` field named something other than one of the six primitive
    /// type names.
    UnknownType(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Toml(e) => write!(f, "invalid config: {e}"),
            ConfigError::UnknownType(name) => write!(f, "unknown external value type: {name}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Toml(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder_accumulates_values() {
        let config = SessionConfig::new()
            .with_value(ExternalValue::with_type("pi", Type::Real))
            .with_value(ExternalValue::new("mystery"));

        assert_eq!(config.external_values.len(), 2);
        assert_eq!(config.external_names(), vec!["pi", "mystery"]);
        assert!(config.external_values[0].ty.is_some());
        assert!(config.external_values[1].ty.is_none());
    }

    #[test]
    fn config_loads_from_toml() {
        let toml = r#"
            [[external_values]]
            name = "pi"
            type = "real"

            [[external_values]]
            name = "mystery"
        "#;
        let config = SessionConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.external_names(), vec!["pi", "mystery"]);
        assert_eq!(config.external_values[0].ty, Some(Type::Real));
        assert_eq!(config.external_values[1].ty, None);
    }

    #[test]
    fn config_rejects_unknown_type_name() {
        let toml = r#"
            [[external_values]]
            name = "bogus"
            type = "tensor"
        "#;
        assert!(matches!(SessionConfig::from_toml_str(toml), Err(ConfigError::UnknownType(_))));
    }

    #[test]
    fn config_loads_from_a_file_on_disk() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[external_values]]\nname = \"pi\"\ntype = \"real\"").unwrap();

        let source = std::fs::read_to_string(file.path()).unwrap();
        let config = SessionConfig::from_toml_str(&source).unwrap();
        assert_eq!(config.external_names(), vec!["pi"]);
    }
}
