//! Request adapter for mapping HTTP requests to escape-core types.

use std::collections::HashMap;

use serde::de::DeserializeOwned;

use crate::error::BodyError;
use crate::request::{Principal, RequestMeta};
use crate::trusted::TrustedString;

use super::{parse_form_body, parse_json_body, ExtractMetadata, ExtractTaintedInputs};

/// Adapter for converting framework-specific HTTP requests into escape-core
/// types.
///
/// Holds plain owned data so it never couples to a framework's request
/// types. Framework-specific code should implement
/// `From<FrameworkRequest>` for `RequestAdapter`.
///
/// # Examples
///
/// ```
/// use escape_core::web::{ExtractMetadata, ExtractTaintedInputs, RequestAdapter};
/// use escape_core::{Principal, TrustedString};
///
/// let mut adapter = RequestAdapter::new("req-12345".to_string());
/// adapter.set_principal(Some(Principal {
///     id: "user-1".to_string(),
///     name: TrustedString::untrusted("Alice"),
/// }));
/// adapter.add_query_string("search=%3Cb%3Ehi&page=2");
/// adapter.add_header("Cookie", "theme=dark; session=abc");
///
/// let meta = adapter.extract_metadata();
/// assert_eq!(meta.request_id, "req-12345");
///
/// let inputs = adapter.extract_tainted_inputs();
/// assert_eq!(inputs.query_param("search").unwrap().expose_raw(), "<b>hi");
/// assert_eq!(inputs.cookie("theme").unwrap().expose_raw(), "dark");
/// assert!(inputs.cookie("theme").unwrap().is_untrusted());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestAdapter {
    request_id: String,
    principal: Option<Principal>,
    query_params: HashMap<String, String>,
    // Keys are lowercased on insert.
    headers: HashMap<String, String>,
    cookies: HashMap<String, String>,
    path_params: HashMap<String, String>,
    fragment: Option<String>,
    body: Vec<u8>,
}

impl RequestAdapter {
    /// Creates an adapter with the given request ID and no inputs.
    pub fn new(request_id: String) -> Self {
        Self {
            request_id,
            ..Self::default()
        }
    }

    /// Sets the authenticated principal for this request.
    pub fn set_principal(&mut self, principal: Option<Principal>) {
        self.principal = principal;
    }

    /// Adds a query parameter. A repeated key replaces the earlier value.
    pub fn add_query_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.query_params.insert(key.into(), value.into());
    }

    /// Decodes an `application/x-www-form-urlencoded` query string (without
    /// the leading `?`) and adds every pair.
    ///
    /// Invalid UTF-8 in a percent-encoded sequence decodes to U+FFFD.
    pub fn add_query_string(&mut self, query: &str) {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            self.query_params.insert(key.into_owned(), value.into_owned());
        }
    }

    /// Adds a header. Header names are case-insensitive and stored
    /// lowercased.
    ///
    /// A `Cookie` header is also split into individual cookies.
    pub fn add_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into().to_ascii_lowercase();
        let value = value.into();
        if key == "cookie" {
            self.add_cookie_header(&value);
        }
        self.headers.insert(key, value);
    }

    /// Adds a single cookie.
    pub fn add_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    /// Adds a path parameter captured by the router.
    pub fn add_path_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.path_params.insert(key.into(), value.into());
    }

    /// Sets the URL fragment reported by client-side code.
    pub fn set_fragment(&mut self, fragment: impl Into<String>) {
        self.fragment = Some(fragment.into());
    }

    /// Sets the raw request body.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
    }

    /// Returns a reference to the request ID.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns a reference to the principal, if present.
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    fn add_cookie_header(&mut self, header: &str) {
        for pair in header.split(';') {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            self.cookies.insert(name.to_string(), value.to_string());
        }
    }
}

impl ExtractMetadata for RequestAdapter {
    fn extract_metadata(&self) -> RequestMeta {
        RequestMeta {
            request_id: self.request_id.clone(),
            principal: self.principal.clone(),
        }
    }
}

impl ExtractTaintedInputs for RequestAdapter {
    fn extract_tainted_inputs(&self) -> TaintedInputs {
        TaintedInputs {
            query_params: untrusted_map(&self.query_params),
            headers: untrusted_map(&self.headers),
            cookies: untrusted_map(&self.cookies),
            path_params: untrusted_map(&self.path_params),
            fragment: self.fragment.as_deref().map(TrustedString::untrusted),
            body: self.body.clone(),
        }
    }
}

fn untrusted_map(raw: &HashMap<String, String>) -> HashMap<String, TrustedString> {
    raw.iter()
        .map(|(k, v)| (k.clone(), TrustedString::untrusted(v.as_str())))
        .collect()
}

/// Every user-controlled value from one request, tagged untrusted.
///
/// Read-only. Values must go through an escaper before they can reach a
/// registered sink.
///
/// # Examples
///
/// ```
/// use escape_core::web::{ExtractTaintedInputs, RequestAdapter};
/// use escape_core::{escape, Context, SanitizationPolicy};
///
/// let mut adapter = RequestAdapter::new("req-1".to_string());
/// adapter.add_query_param("username", "<alice>");
///
/// let inputs = adapter.extract_tainted_inputs();
/// let username = inputs.query_param("username").unwrap();
///
/// let escaped = escape(username.expose_raw(), Context::HtmlBody, &SanitizationPolicy::EscapeAll).unwrap();
/// assert_eq!(escaped.sanitized_str(), Some("&lt;alice&gt;"));
/// ```
#[derive(Debug, Clone)]
pub struct TaintedInputs {
    query_params: HashMap<String, TrustedString>,
    headers: HashMap<String, TrustedString>,
    cookies: HashMap<String, TrustedString>,
    path_params: HashMap<String, TrustedString>,
    fragment: Option<TrustedString>,
    body: Vec<u8>,
}

impl TaintedInputs {
    /// Returns the query parameters.
    pub fn query_params(&self) -> &HashMap<String, TrustedString> {
        &self.query_params
    }

    /// Returns one query parameter.
    pub fn query_param(&self, key: &str) -> Option<&TrustedString> {
        self.query_params.get(key)
    }

    /// Returns the headers, keyed by lowercased name.
    pub fn headers(&self) -> &HashMap<String, TrustedString> {
        &self.headers
    }

    /// Returns one header; `name` is matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&TrustedString> {
        self.headers.get(&name.to_ascii_lowercase())
    }

    /// Returns the cookies.
    pub fn cookies(&self) -> &HashMap<String, TrustedString> {
        &self.cookies
    }

    /// Returns one cookie.
    pub fn cookie(&self, name: &str) -> Option<&TrustedString> {
        self.cookies.get(name)
    }

    /// Returns the path parameters.
    pub fn path_params(&self) -> &HashMap<String, TrustedString> {
        &self.path_params
    }

    /// Returns one path parameter.
    pub fn path_param(&self, key: &str) -> Option<&TrustedString> {
        self.path_params.get(key)
    }

    /// Returns the URL fragment, if the client reported one.
    pub fn fragment(&self) -> Option<&TrustedString> {
        self.fragment.as_ref()
    }

    /// Returns the raw body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Parses the body as JSON into `T`.
    ///
    /// # Errors
    ///
    /// See [`parse_json_body`].
    pub fn json_body<T: DeserializeOwned>(&self) -> Result<T, BodyError> {
        parse_json_body(&self.body)
    }

    /// Parses the body as a URL-encoded form into `T`.
    ///
    /// # Errors
    ///
    /// See [`parse_form_body`].
    pub fn form_body<T: DeserializeOwned>(&self) -> Result<T, BodyError> {
        parse_form_body(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trusted::TrustTag;

    #[test]
    fn request_adapter_new() {
        let adapter = RequestAdapter::new("req-test".to_string());
        assert_eq!(adapter.request_id(), "req-test");
        assert!(adapter.principal().is_none());
    }

    #[test]
    fn request_adapter_set_principal() {
        let mut adapter = RequestAdapter::new("req-1".to_string());
        adapter.set_principal(Some(Principal {
            id: "user-1".to_string(),
            name: TrustedString::untrusted("Alice"),
        }));

        assert_eq!(adapter.principal().unwrap().id, "user-1");
        assert!(adapter.principal().unwrap().name.is_untrusted());
    }

    #[test]
    fn query_string_is_decoded() {
        let mut adapter = RequestAdapter::new("req-1".to_string());
        adapter.add_query_string("q=%3Cscript%3E&name=a+b&empty=");

        let inputs = adapter.extract_tainted_inputs();
        assert_eq!(inputs.query_param("q").unwrap().expose_raw(), "<script>");
        assert_eq!(inputs.query_param("name").unwrap().expose_raw(), "a b");
        assert_eq!(inputs.query_param("empty").unwrap().expose_raw(), "");
    }

    #[test]
    fn header_names_are_case_insensitive() {
        let mut adapter = RequestAdapter::new("req-1".to_string());
        adapter.add_header("X-Custom", "value");

        let inputs = adapter.extract_tainted_inputs();
        assert!(inputs.headers().contains_key("x-custom"));
        assert_eq!(inputs.header("X-CUSTOM").unwrap().expose_raw(), "value");
    }

    #[test]
    fn cookie_header_is_split() {
        let mut adapter = RequestAdapter::new("req-1".to_string());
        adapter.add_header("Cookie", "a=1; b=\"<x>\"; broken; =nameless; c=d=e");

        let inputs = adapter.extract_tainted_inputs();
        assert_eq!(inputs.cookies().len(), 3);
        assert_eq!(inputs.cookie("b").unwrap().expose_raw(), "<x>");
        assert_eq!(inputs.cookie("c").unwrap().expose_raw(), "d=e");
        assert!(inputs.header("cookie").is_some());
    }

    #[test]
    fn request_adapter_add_path_param() {
        let mut adapter = RequestAdapter::new("req-1".to_string());
        adapter.add_path_param("id", "123");

        let inputs = adapter.extract_tainted_inputs();
        assert!(inputs.path_params().contains_key("id"));
    }

    #[test]
    fn extract_metadata_includes_principal() {
        let mut adapter = RequestAdapter::new("req-1".to_string());
        adapter.set_principal(Some(Principal {
            id: "user-1".to_string(),
            name: TrustedString::untrusted("Bob"),
        }));

        let meta = adapter.extract_metadata();
        assert_eq!(meta.request_id, "req-1");
        assert_eq!(meta.principal.unwrap().id, "user-1");
    }

    #[test]
    fn extract_tainted_inputs_wraps_all_inputs() {
        let mut adapter = RequestAdapter::new("req-1".to_string());
        adapter.add_query_param("q", "search term");
        adapter.add_header("User-Agent", "browser");
        adapter.add_cookie("session", "abc");
        adapter.add_path_param("user_id", "42");
        adapter.set_fragment("<img src=x onerror=alert(1)>");

        let inputs = adapter.extract_tainted_inputs();

        let every_value = inputs
            .query_params()
            .values()
            .chain(inputs.headers().values())
            .chain(inputs.cookies().values())
            .chain(inputs.path_params().values())
            .chain(inputs.fragment());
        let mut count = 0;
        for value in every_value {
            assert_eq!(value.trust(), TrustTag::Untrusted);
            count += 1;
        }
        assert_eq!(count, 5);
    }

    #[test]
    fn body_is_parsed_on_demand() {
        #[derive(serde::Deserialize)]
        struct Comment {
            body: TrustedString,
        }

        let mut adapter = RequestAdapter::new("req-1".to_string());
        adapter.set_body(br#"{"body": "<b>hi</b>"}"#.to_vec());

        let comment: Comment = adapter.extract_tainted_inputs().json_body().unwrap();
        assert!(comment.body.is_untrusted());
        assert_eq!(comment.body.expose_raw(), "<b>hi</b>");
    }

    #[test]
    fn multiple_extractions_produce_independent_copies() {
        let mut adapter = RequestAdapter::new("req-1".to_string());
        adapter.add_query_param("k", "v");

        let inputs1 = adapter.extract_tainted_inputs();
        let inputs2 = adapter.extract_tainted_inputs();

        assert_eq!(inputs1.query_params().len(), inputs2.query_params().len());
    }
}
