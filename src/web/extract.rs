//! Extraction boundary traits for web integration.
//!
//! Framework integrations implement these to map their request types onto
//! escape-core's request metadata and untrusted inputs.

use crate::request::RequestMeta;

use super::TaintedInputs;

/// Extracts request metadata from a framework-specific request.
///
/// Implementations map the request ID and the authenticated principal. They
/// do not escape anything; the principal's display name stays untrusted.
///
/// # Examples
///
/// ```
/// use escape_core::web::ExtractMetadata;
/// use escape_core::{Principal, RequestMeta, TrustedString};
///
/// struct MyFrameworkRequest {
///     request_id: String,
///     user: Option<(String, String)>,
/// }
///
/// impl ExtractMetadata for MyFrameworkRequest {
///     fn extract_metadata(&self) -> RequestMeta {
///         RequestMeta {
///             request_id: self.request_id.clone(),
///             principal: self.user.as_ref().map(|(id, name)| Principal {
///                 id: id.clone(),
///                 name: TrustedString::untrusted(name.as_str()),
///             }),
///         }
///     }
/// }
/// ```
pub trait ExtractMetadata {
    /// Returns the request ID and principal.
    fn extract_metadata(&self) -> RequestMeta;
}

/// Extracts untrusted inputs from a framework-specific request.
///
/// Every value that crosses the HTTP boundary (query parameters, headers,
/// cookies, path parameters, the fragment and the body) MUST come out as
/// [`TrustTag::Untrusted`](crate::TrustTag::Untrusted).
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
///
/// use escape_core::web::{ExtractTaintedInputs, RequestAdapter, TaintedInputs};
///
/// struct MyFrameworkRequest {
///     query: HashMap<String, String>,
/// }
///
/// impl ExtractTaintedInputs for MyFrameworkRequest {
///     fn extract_tainted_inputs(&self) -> TaintedInputs {
///         let mut adapter = RequestAdapter::new("req-1".to_string());
///         for (k, v) in &self.query {
///             adapter.add_query_param(k.as_str(), v.as_str());
///         }
///         adapter.extract_tainted_inputs()
///     }
/// }
/// ```
pub trait ExtractTaintedInputs {
    /// Collects every user-controlled value of the request.
    fn extract_tainted_inputs(&self) -> TaintedInputs;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Principal;
    use crate::trusted::TrustedString;
    use crate::web::RequestAdapter;

    struct TestRequest {
        id: String,
        user: Option<String>,
        cookie: Option<String>,
    }

    impl ExtractMetadata for TestRequest {
        fn extract_metadata(&self) -> RequestMeta {
            RequestMeta {
                request_id: self.id.clone(),
                principal: self.user.as_ref().map(|u| Principal {
                    id: u.clone(),
                    name: TrustedString::untrusted(u.as_str()),
                }),
            }
        }
    }

    impl ExtractTaintedInputs for TestRequest {
        fn extract_tainted_inputs(&self) -> TaintedInputs {
            let mut adapter = RequestAdapter::new(self.id.clone());
            if let Some(cookie) = &self.cookie {
                adapter.add_header("cookie", cookie.as_str());
            }
            adapter.extract_tainted_inputs()
        }
    }

    #[test]
    fn extract_metadata_trait_works() {
        let req = TestRequest {
            id: "test-1".to_string(),
            user: Some("alice".to_string()),
            cookie: None,
        };

        let meta = req.extract_metadata();
        assert_eq!(meta.request_id, "test-1");
        assert!(meta.principal.unwrap().name.is_untrusted());
    }

    #[test]
    fn extract_tainted_inputs_trait_works() {
        let req = TestRequest {
            id: "test-2".to_string(),
            user: None,
            cookie: Some("pref=<svg>".to_string()),
        };

        let inputs = req.extract_tainted_inputs();
        assert!(inputs.query_params().is_empty());
        assert!(inputs.cookie("pref").unwrap().is_untrusted());
    }
}
