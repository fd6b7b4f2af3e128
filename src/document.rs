//! A response body assembled from developer-authored markup and guarded
//! slots.

use std::cell::RefCell;

use crate::classify::SinkDescriptor;
use crate::error::SinkError;
use crate::sink::{Emission, Sink};

/// An HTML response body.
///
/// Fixed markup is appended with [`literal`](Self::literal), which only
/// accepts `&'static str`. Request data can only enter through a
/// [`DocumentSlot`], and a slot only receives values through a
/// [`SinkGuard`](crate::SinkGuard).
///
/// # Examples
///
/// ```
/// use escape_core::{
///     escape, Context, HtmlDocument, SanitizationPolicy, SinkGuard, SinkRegistry,
/// };
///
/// let guard = SinkGuard::new(SinkRegistry::with_builtin_sinks());
/// let name = escape("<Mallory>", Context::HtmlBody, &SanitizationPolicy::EscapeAll).unwrap();
///
/// let page = HtmlDocument::new();
/// page.literal("<p>Welcome back, ");
/// guard.write(&page.slot("html.text"), &name).unwrap();
/// page.literal("</p>");
///
/// assert_eq!(page.into_string(), "<p>Welcome back, &lt;Mallory&gt;</p>");
/// ```
#[derive(Debug, Default)]
pub struct HtmlDocument {
    body: RefCell<String>,
}

impl HtmlDocument {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends fixed markup.
    pub fn literal(&self, markup: &'static str) {
        self.body.borrow_mut().push_str(markup);
    }

    /// Returns a sink that appends to this document under `descriptor`.
    pub fn slot(&self, descriptor: impl Into<SinkDescriptor>) -> DocumentSlot<'_> {
        DocumentSlot {
            document: self,
            descriptor: descriptor.into(),
        }
    }

    /// Returns the length of the body so far, in bytes.
    pub fn len(&self) -> usize {
        self.body.borrow().len()
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.body.borrow().is_empty()
    }

    /// Consumes the document and returns the body.
    pub fn into_string(self) -> String {
        self.body.into_inner()
    }
}

/// A position in an [`HtmlDocument`] bound to one sink descriptor.
#[derive(Debug)]
pub struct DocumentSlot<'a> {
    document: &'a HtmlDocument,
    descriptor: SinkDescriptor,
}

impl Sink for DocumentSlot<'_> {
    fn descriptor(&self) -> &SinkDescriptor {
        &self.descriptor
    }

    fn emit(&self, emission: Emission<'_>) -> Result<(), SinkError> {
        self.document.body.borrow_mut().push_str(emission.as_str());
        Ok(())
    }
}
