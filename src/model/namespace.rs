//! Namespace identity.

use std::fmt;

/// Suffix stripped from properties namespaces ("application.properties" == "application").
const PROPERTIES_SUFFIX: &str = ".properties";

/// Format of a namespace's content, derived from its name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigFileFormat {
    Properties,
    Xml,
    Json,
    Yml,
    Yaml,
    Txt,
}

impl ConfigFileFormat {
    /// Detect the format from a namespace name. Names without a known suffix are properties.
    pub fn from_namespace(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        match lower.rsplit_once('.').map(|(_, ext)| ext) {
            Some("xml") => Self::Xml,
            Some("json") => Self::Json,
            Some("yml") => Self::Yml,
            Some("yaml") => Self::Yaml,
            Some("txt") => Self::Txt,
            _ => Self::Properties,
        }
    }

    /// Non-properties formats store the whole file under a single `content` key.
    pub fn is_file_content(&self) -> bool {
        !matches!(self, Self::Properties)
    }
}

/// Immutable `(appId, cluster, namespaceName)` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace {
    app_id: String,
    cluster: String,
    name: String,
}

impl Namespace {
    /// Create a namespace. A trailing `.properties` on the name is dropped.
    pub fn new(app_id: impl Into<String>, cluster: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            cluster: cluster.into(),
            name: normalize_name(name.into()),
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> ConfigFileFormat {
        ConfigFileFormat::from_namespace(&self.name)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}+{}", self.app_id, self.cluster, self.name)
    }
}

fn normalize_name(name: String) -> String {
    let Some(stem_len) = name.len().checked_sub(PROPERTIES_SUFFIX.len()).filter(|&n| n > 0) else {
        return name;
    };
    // `get` refuses cut points inside a multi-byte character
    match (name.get(..stem_len), name.get(stem_len..)) {
        (Some(stem), Some(suffix)) if suffix.eq_ignore_ascii_case(PROPERTIES_SUFFIX) => stem.to_string(),
        _ => name,
    }
}
