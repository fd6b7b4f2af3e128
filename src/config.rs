//! Startup configuration: sink registrations and named policies.
//!
//! ```json
//! {
//!   "builtin_sinks": true,
//!   "sinks": [
//!     {"descriptor": "comment.body", "context": "html_body"},
//!     {"descriptor": "profile.avatar", "context": "url_component", "navigable": true,
//!      "within": {"context": "html_attribute", "quote": "double"}}
//!   ],
//!   "policies": {
//!     "task.notes": {"mode": "allow_subset", "tags": ["b", "i"], "attributes": []},
//!     "comment.body": {"mode": "escape_all"}
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::classify::{SinkDescriptor, SinkRegistry};
use crate::context::{Context, Quote, UrlKind};
use crate::error::ConfigError;
use crate::policy::{AllowList, PolicySet, SanitizationPolicy, ALWAYS_DROPPED_TAGS};

/// Parsed configuration document.
///
/// # Examples
///
/// ```
/// use escape_core::{Context, SanitizerConfig, SinkDescriptor};
///
/// let config = SanitizerConfig::from_json_str(r#"{
///     "sinks": [{"descriptor": "comment.body", "context": "html_body"}],
///     "policies": {"comment.body": {"mode": "escape_all"}}
/// }"#).unwrap();
///
/// let (registry, policies) = config.build().unwrap();
/// assert_eq!(registry.classify(&SinkDescriptor::new("comment.body")).unwrap(), Context::HtmlBody);
/// assert!(policies.contains("comment.body"));
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SanitizerConfig {
    #[serde(default)]
    builtin_sinks: bool,
    #[serde(default)]
    sinks: Vec<SinkEntry>,
    #[serde(default)]
    policies: BTreeMap<String, PolicyEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct SinkEntry {
    descriptor: SinkDescriptor,
    #[serde(flatten)]
    context: ContextEntry,
    #[serde(default)]
    within: Option<ContextEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct ContextEntry {
    context: ContextName,
    #[serde(default)]
    quote: Option<QuoteName>,
    #[serde(default)]
    navigable: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ContextName {
    HtmlBody,
    HtmlAttribute,
    UrlComponent,
    JsStringLiteral,
    JsonValue,
    CssValue,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum QuoteName {
    Double,
    Single,
    None,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
enum PolicyEntry {
    EscapeAll,
    AllowSubset {
        #[serde(default)]
        tags: Vec<String>,
        #[serde(default)]
        attributes: Vec<String>,
    },
}

impl SanitizerConfig {
    /// Parses a configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON or unknown
    /// context names.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loading sanitizer configuration");
        Self::from_json_str(&json)
    }

    /// Validates the document and builds the registry and policy set.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Invalid`] for unquoted attributes, misplaced
    ///   `quote`/`navigable` fields, disallowed nestings and policies that
    ///   name tags or attributes that are never allowed
    /// - [`ConfigError::Conflict`] for a descriptor registered twice with
    ///   different contexts
    pub fn build(&self) -> Result<(SinkRegistry, PolicySet), ConfigError> {
        let mut registry = if self.builtin_sinks {
            SinkRegistry::with_builtin_sinks()
        } else {
            SinkRegistry::new()
        };

        for entry in &self.sinks {
            let name = entry.descriptor.as_str();
            let context = entry.context.resolve(name)?;
            match &entry.within {
                Some(outer) => {
                    let outer = outer.resolve(name)?;
                    registry.register_nested_sink(entry.descriptor.clone(), context, outer)?;
                }
                None => registry.register_sink(entry.descriptor.clone(), context)?,
            }
        }

        let mut policies = PolicySet::new();
        for (name, entry) in &self.policies {
            policies.insert(name.clone(), entry.resolve(name)?);
        }

        tracing::info!(
            sinks = registry.len(),
            policies = policies.len(),
            builtin_sinks = self.builtin_sinks,
            "sanitizer configuration built"
        );

        Ok((registry, policies))
    }
}

impl ContextEntry {
    fn resolve(&self, name: &str) -> Result<Context, ConfigError> {
        let invalid = |reason: &str| ConfigError::Invalid {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if self.quote.is_some() && !matches!(self.context, ContextName::HtmlAttribute) {
            return Err(invalid("`quote` only applies to html_attribute"));
        }
        if self.navigable && !matches!(self.context, ContextName::UrlComponent) {
            return Err(invalid("`navigable` only applies to url_component"));
        }

        Ok(match self.context {
            ContextName::HtmlBody => Context::HtmlBody,
            ContextName::HtmlAttribute => match self.quote {
                Some(QuoteName::Double) => Context::HtmlAttribute(Quote::Double),
                Some(QuoteName::Single) => Context::HtmlAttribute(Quote::Single),
                Some(QuoteName::None) | None => {
                    return Err(invalid(
                        "attribute sinks must declare quote \"double\" or \"single\"",
                    ))
                }
            },
            ContextName::UrlComponent if self.navigable => Context::UrlComponent(UrlKind::Navigable),
            ContextName::UrlComponent => Context::UrlComponent(UrlKind::Component),
            ContextName::JsStringLiteral => Context::JsStringLiteral,
            ContextName::JsonValue => Context::JsonValue,
            ContextName::CssValue => Context::CssValue,
        })
    }
}

impl PolicyEntry {
    fn resolve(&self, name: &str) -> Result<SanitizationPolicy, ConfigError> {
        match self {
            PolicyEntry::EscapeAll => Ok(SanitizationPolicy::EscapeAll),
            PolicyEntry::AllowSubset { tags, attributes } => {
                let allow = AllowList::new()
                    .tags(tags)
                    .attributes(attributes);

                if let Some(tag) = tags.iter().find(|tag| !allow.allows_tag(tag)) {
                    let reason = if ALWAYS_DROPPED_TAGS.contains(&tag.to_ascii_lowercase().as_str()) {
                        format!("tag '{tag}' is never allowed")
                    } else {
                        format!("'{tag}' is not a valid tag name")
                    };
                    return Err(ConfigError::Invalid {
                        name: name.to_string(),
                        reason,
                    });
                }
                if let Some(attribute) = attributes.iter().find(|attr| !allow.allows_attribute(attr)) {
                    return Err(ConfigError::Invalid {
                        name: name.to_string(),
                        reason: format!("attribute '{attribute}' is never allowed"),
                    });
                }

                Ok(SanitizationPolicy::AllowSubset(allow))
            }
        }
    }
}
