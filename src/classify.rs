//! Sink registration and classification.
//!
//! Every output destination is named by a [`SinkDescriptor`] and registered
//! once, at startup, with the context it renders into. Classification is a
//! lookup: there is no default context and no fallback.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

use crate::context::{Context, Quote, UrlKind};
use crate::error::{ConfigError, UnknownSinkError};
use crate::trusted::TrustTag;

/// Names of the sinks registered by [`SinkRegistry::with_builtin_sinks`].
pub mod builtin {
    /// Element text content.
    pub const HTML_TEXT: &str = "html.text";
    /// A double-quoted attribute value.
    pub const HTML_ATTR: &str = "html.attr";
    /// A single-quoted attribute value.
    pub const HTML_ATTR_SINGLE: &str = "html.attr.single";
    /// A double-quoted `href` attribute (navigable URL inside an attribute).
    pub const HTML_HREF: &str = "html.href";
    /// A double-quoted `src` attribute (navigable URL inside an attribute).
    pub const HTML_SRC: &str = "html.src";
    /// One query parameter value or path segment.
    pub const URL_QUERY: &str = "url.query";
    /// A URL the client navigates to or the server fetches.
    pub const URL_NAVIGATE: &str = "url.navigate";
    /// The `Location` header of a redirect.
    pub const HTTP_REDIRECT: &str = "http.redirect";
    /// The body of a quoted string in an inline script.
    pub const JS_STRING: &str = "js.string";
    /// JSON data embedded in an inline script.
    pub const JS_JSON: &str = "js.json";
    /// A CSS property value.
    pub const CSS_VALUE: &str = "css.value";
    /// A client-side `innerHTML` assignment.
    pub const DOM_INNER_HTML: &str = "dom.inner_html";
}

/// Names one output destination, e.g. `"comment.body"` or `"profile.avatar"`.
///
/// ```
/// use escape_core::SinkDescriptor;
///
/// let sink = SinkDescriptor::new("comment.body");
/// assert_eq!(sink.as_str(), "comment.body");
/// assert_eq!(sink.to_string(), "comment.body");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct SinkDescriptor(String);

impl SinkDescriptor {
    /// Creates a descriptor.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the descriptor name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SinkDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SinkDescriptor {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for SinkDescriptor {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// What a registered sink requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkSpec {
    context: Context,
    inner: Option<Context>,
}

impl SinkSpec {
    /// A sink that renders directly into `context`.
    pub fn direct(context: Context) -> Self {
        Self {
            context,
            inner: None,
        }
    }

    /// A sink that renders `inner` content inside an `outer` context.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] unless `outer` is an attribute and
    /// `inner` [`embeds_in`](Context::embeds_in) it. A URL component inside
    /// a navigable URL is already a plain navigable URL and is registered
    /// with [`SinkSpec::direct`].
    pub fn nested(inner: Context, outer: Context) -> Result<Self, ConfigError> {
        if !matches!(outer, Context::HtmlAttribute(_)) || !inner.embeds_in(outer) {
            return Err(ConfigError::Invalid {
                name: format!("{inner}>{outer}"),
                reason: "not an allowed nesting".to_string(),
            });
        }

        Ok(Self {
            context: outer,
            inner: Some(inner),
        })
    }

    /// The context the sink renders into.
    pub fn context(&self) -> Context {
        self.context
    }

    /// The context of the content inside an attribute, for nested sinks.
    pub fn inner(&self) -> Option<Context> {
        self.inner
    }

    /// The trust tag a value must carry to be written to this sink.
    pub fn required_tag(&self) -> TrustTag {
        match self.inner {
            Some(inner) => TrustTag::Nested {
                inner,
                outer: self.context,
            },
            None => TrustTag::SanitizedFor(self.context),
        }
    }
}

/// Maps sink descriptors to the context they render into.
///
/// Built once at startup and read-only afterwards; swap in a new registry
/// through [`SinkGuard::replace_registry`](crate::SinkGuard::replace_registry).
///
/// # Examples
///
/// ```
/// use escape_core::{Context, SinkDescriptor, SinkRegistry, UrlKind};
///
/// let mut registry = SinkRegistry::new();
/// registry.register_sink("webhook.url", Context::UrlComponent(UrlKind::Navigable)).unwrap();
///
/// assert_eq!(
///     registry.classify(&SinkDescriptor::new("webhook.url")).unwrap(),
///     Context::UrlComponent(UrlKind::Navigable)
/// );
/// assert!(registry.classify(&SinkDescriptor::new("webhook.name")).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SinkRegistry {
    sinks: HashMap<SinkDescriptor, SinkSpec>,
}

impl SinkRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the sinks named in [`builtin`].
    pub fn with_builtin_sinks() -> Self {
        let attr = Context::HtmlAttribute(Quote::Double);
        let navigable = Context::UrlComponent(UrlKind::Navigable);

        let mut sinks = HashMap::new();
        let mut add = |name: &str, spec: SinkSpec| {
            sinks.insert(SinkDescriptor::new(name), spec);
        };

        add(builtin::HTML_TEXT, SinkSpec::direct(Context::HtmlBody));
        add(builtin::HTML_ATTR, SinkSpec::direct(attr));
        add(
            builtin::HTML_ATTR_SINGLE,
            SinkSpec::direct(Context::HtmlAttribute(Quote::Single)),
        );
        add(builtin::HTML_HREF, nested_url(navigable, attr));
        add(builtin::HTML_SRC, nested_url(navigable, attr));
        add(
            builtin::URL_QUERY,
            SinkSpec::direct(Context::UrlComponent(UrlKind::Component)),
        );
        add(builtin::URL_NAVIGATE, SinkSpec::direct(navigable));
        add(builtin::HTTP_REDIRECT, SinkSpec::direct(navigable));
        add(builtin::JS_STRING, SinkSpec::direct(Context::JsStringLiteral));
        add(builtin::JS_JSON, SinkSpec::direct(Context::JsonValue));
        add(builtin::CSS_VALUE, SinkSpec::direct(Context::CssValue));
        add(builtin::DOM_INNER_HTML, SinkSpec::direct(Context::HtmlBody));

        Self { sinks }
    }

    /// Registers `descriptor` as rendering into `context`.
    ///
    /// Registering the same descriptor twice with the same context is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Conflict`] if `descriptor` is already
    /// registered with a different requirement.
    pub fn register_sink(
        &mut self,
        descriptor: impl Into<SinkDescriptor>,
        context: Context,
    ) -> Result<(), ConfigError> {
        self.register(descriptor.into(), SinkSpec::direct(context))
    }

    /// Registers `descriptor` as rendering `inner` content inside `outer`,
    /// for example a navigable URL inside a double-quoted `href`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a nesting that is not allowed
    /// and [`ConfigError::Conflict`] for a conflicting re-registration.
    pub fn register_nested_sink(
        &mut self,
        descriptor: impl Into<SinkDescriptor>,
        inner: Context,
        outer: Context,
    ) -> Result<(), ConfigError> {
        let descriptor = descriptor.into();
        let spec = SinkSpec::nested(inner, outer).map_err(|_| ConfigError::Invalid {
            name: descriptor.to_string(),
            reason: format!("{inner} cannot be nested inside {outer}"),
        })?;
        self.register(descriptor, spec)
    }

    fn register(&mut self, descriptor: SinkDescriptor, spec: SinkSpec) -> Result<(), ConfigError> {
        match self.sinks.get(&descriptor) {
            Some(existing) if *existing != spec => Err(ConfigError::Conflict(descriptor)),
            Some(_) => Ok(()),
            None => {
                self.sinks.insert(descriptor, spec);
                Ok(())
            }
        }
    }

    /// Returns the context `descriptor` renders into.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownSinkError`] for unregistered descriptors.
    pub fn classify(&self, descriptor: &SinkDescriptor) -> Result<Context, UnknownSinkError> {
        self.spec(descriptor).map(|spec| spec.context())
    }

    /// Returns the full requirement for `descriptor`.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownSinkError`] for unregistered descriptors.
    pub fn spec(&self, descriptor: &SinkDescriptor) -> Result<SinkSpec, UnknownSinkError> {
        self.sinks
            .get(descriptor)
            .copied()
            .ok_or_else(|| UnknownSinkError::new(descriptor.clone()))
    }

    /// Returns `true` if `descriptor` is registered.
    pub fn contains(&self, descriptor: &SinkDescriptor) -> bool {
        self.sinks.contains_key(descriptor)
    }

    /// Iterates over registered descriptors and their requirements.
    pub fn iter(&self) -> impl Iterator<Item = (&SinkDescriptor, &SinkSpec)> {
        self.sinks.iter()
    }

    /// Returns the number of registered sinks.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Returns `true` if no sinks are registered.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

fn nested_url(inner: Context, outer: Context) -> SinkSpec {
    SinkSpec {
        context: outer,
        inner: Some(inner),
    }
}
