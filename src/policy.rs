//! Sanitization policies: escape everything, or keep an allow-listed subset
//! of HTML.

use std::collections::{BTreeSet, HashMap};

use crate::context::Context;
use crate::escape::ContextSanitizer;

/// Elements that are dropped even when an allow-list names them.
pub const ALWAYS_DROPPED_TAGS: [&str; 6] = ["script", "style", "iframe", "object", "embed", "template"];

/// Attributes whose values are URLs; kept only if the navigable URL check
/// accepts them.
pub const URL_ATTRIBUTES: [&str; 7] = [
    "href",
    "src",
    "action",
    "formaction",
    "cite",
    "poster",
    "background",
];

/// How untrusted text is treated at one call site.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SanitizationPolicy {
    /// Every markup-significant character is escaped. The default.
    #[default]
    EscapeAll,
    /// Input is parsed as HTML and only allow-listed tags and attributes
    /// survive. Only meaningful for [`Context::HtmlBody`]; other contexts
    /// escape everything.
    AllowSubset(AllowList),
}

/// Tags and attributes permitted by [`SanitizationPolicy::AllowSubset`].
///
/// Names are matched case-insensitively. Event-handler attributes (`on*`),
/// `style` and the [`ALWAYS_DROPPED_TAGS`] are never allowed, whatever the
/// list says.
///
/// # Examples
///
/// ```
/// use escape_core::AllowList;
///
/// let allow = AllowList::new().tags(["b", "A"]).attribute("href").attribute("onclick");
///
/// assert!(allow.allows_tag("a"));
/// assert!(allow.allows_attribute("HREF"));
/// assert!(!allow.allows_attribute("onclick"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    tags: BTreeSet<String>,
    attributes: BTreeSet<String>,
}

impl AllowList {
    /// Creates an empty allow-list (text only).
    pub fn new() -> Self {
        Self::default()
    }

    /// Inline formatting used by comment and notes fields: `b i em strong u
    /// code br p ul ol li a`, with `href` and `title` attributes.
    pub fn basic_formatting() -> Self {
        Self::new()
            .tags(["b", "i", "em", "strong", "u", "code", "br", "p", "ul", "ol", "li", "a"])
            .attributes(["href", "title"])
    }

    /// Allows one tag.
    pub fn tag(mut self, name: &str) -> Self {
        self.tags.insert(name.to_ascii_lowercase());
        self
    }

    /// Allows several tags.
    pub fn tags<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags
            .extend(names.into_iter().map(|name| name.as_ref().to_ascii_lowercase()));
        self
    }

    /// Allows one attribute on every allowed tag.
    pub fn attribute(mut self, name: &str) -> Self {
        self.attributes.insert(name.to_ascii_lowercase());
        self
    }

    /// Allows several attributes.
    pub fn attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.attributes
            .extend(names.into_iter().map(|name| name.as_ref().to_ascii_lowercase()));
        self
    }

    /// Returns `true` if elements named `name` are kept.
    pub fn allows_tag(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        is_plain_name(&name)
            && !ALWAYS_DROPPED_TAGS.contains(&name.as_str())
            && self.tags.contains(&name)
    }

    /// Returns `true` if attributes named `name` are kept.
    pub fn allows_attribute(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        is_plain_name(&name)
            && !name.starts_with("on")
            && name != "style"
            && self.attributes.contains(&name)
    }

    /// Iterates over the configured tag names.
    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    /// Iterates over the configured attribute names.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(String::as_str)
    }
}

/// Names that serialize without quoting: ASCII letters, digits and `-`,
/// starting with a letter.
fn is_plain_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Named policies for the application's call sites.
///
/// Looking up a name with no policy yields [`SanitizationPolicy::EscapeAll`].
///
/// ```
/// use escape_core::{AllowList, PolicySet, SanitizationPolicy};
///
/// let mut policies = PolicySet::new();
/// policies.insert("task.notes", SanitizationPolicy::AllowSubset(AllowList::new().tag("b")));
///
/// assert!(matches!(policies.policy("task.notes"), SanitizationPolicy::AllowSubset(_)));
/// assert_eq!(policies.policy("comment.body"), &SanitizationPolicy::EscapeAll);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicySet {
    policies: HashMap<String, SanitizationPolicy>,
}

static ESCAPE_ALL: SanitizationPolicy = SanitizationPolicy::EscapeAll;

impl PolicySet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the policy for `name`.
    pub fn insert(&mut self, name: impl Into<String>, policy: SanitizationPolicy) {
        self.policies.insert(name.into(), policy);
    }

    /// Returns the policy for `name`, or `EscapeAll` if none is configured.
    pub fn policy(&self, name: &str) -> &SanitizationPolicy {
        self.policies.get(name).unwrap_or(&ESCAPE_ALL)
    }

    /// Returns `true` if `name` has an explicit policy.
    pub fn contains(&self, name: &str) -> bool {
        self.policies.contains_key(name)
    }

    /// Builds the sanitizer for call site `name` writing into `context`.
    pub fn sanitizer(&self, name: &str, context: Context) -> ContextSanitizer {
        ContextSanitizer::new(context, self.policy(name).clone())
    }

    /// Returns the number of named policies.
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Returns `true` if no policies are configured.
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
