use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

/// Generator configuration, read from the manifest `config` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorConfig {
    /// Document info section
    pub info: DocumentInfo,
    /// Servers keyed by name
    pub servers: IndexMap<String, Server>,
    /// Security schemes keyed by the names namespaces refer to
    pub security_schemes: IndexMap<String, SecurityScheme>,
    /// Static type generation options
    pub typescript: TypeScriptOptions,
}

/// AsyncAPI Info object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentInfo {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// API description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// AsyncAPI Server object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pathname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// AsyncAPI Security Scheme object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityScheme {
    /// Scheme type (httpApiKey, http, userPassword, ...)
    #[serde(rename = "type")]
    pub scheme_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Header, query or cookie name for API keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "in", default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypeScriptOptions {
    /// Upper bound on the number of repeated rest arguments in acknowledged events
    pub max_overloads: usize,
    pub optional_props: OptionalPropStyle,
}

/// How optional object properties are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptionalPropStyle {
    /// `name?: T`
    pub with_question_mark: bool,
    /// `name: T | undefined`
    pub with_undefined: bool,
}

/// Overrides taken from the command line, `None` keeps the configured value
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub title: Option<String>,
    pub version: Option<String>,
    pub max_overloads: Option<usize>,
    pub no_question_mark: bool,
    pub no_undefined: bool,
}

impl Default for DocumentInfo {
    fn default() -> Self {
        Self {
            title: "Event API".to_string(),
            version: "0.1.0".to_string(),
            description: None,
        }
    }
}

impl Default for TypeScriptOptions {
    fn default() -> Self {
        Self {
            max_overloads: 3,
            optional_props: OptionalPropStyle::default(),
        }
    }
}

impl Default for OptionalPropStyle {
    fn default() -> Self {
        Self {
            with_question_mark: true,
            with_undefined: true,
        }
    }
}

impl GeneratorConfig {
    /// Applies command line overrides on top of the manifest configuration
    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(title) = &overrides.title {
            debug!("Overriding title: {}", title);
            self.info.title = title.clone();
        }
        if let Some(version) = &overrides.version {
            debug!("Overriding version: {}", version);
            self.info.version = version.clone();
        }
        if let Some(max_overloads) = overrides.max_overloads {
            self.typescript.max_overloads = max_overloads;
        }
        if overrides.no_question_mark {
            self.typescript.optional_props.with_question_mark = false;
        }
        if overrides.no_undefined {
            self.typescript.optional_props.with_undefined = false;
        }
    }
}
