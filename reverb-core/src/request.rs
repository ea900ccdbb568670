//! Buffered HTTP request description.

use http::{HeaderMap, HeaderName, HeaderValue, Method};

/// A request description handed to the transport collaborator.
///
/// Reverb deals in fully-described requests rather than builders: the
/// executors clone and re-issue the same request across attempts, and the
/// cache layer and SSE machinery mutate headers between attempts
/// (`If-None-Match`, `If-Modified-Since`, `Last-Event-ID`).
#[derive(Debug, Clone)]
pub struct Request {
    /// Target URL.
    pub url: String,
    /// HTTP method.
    pub method: Method,
    /// Outgoing headers.
    pub headers: HeaderMap,
}

impl Request {
    /// Creates a request with the given method and URL and no headers.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Request {
            url: url.into(),
            method,
            headers: HeaderMap::new(),
        }
    }

    /// Creates a GET request for the given URL.
    pub fn get(url: impl Into<String>) -> Self {
        Request::new(Method::GET, url)
    }

    /// Sets `name` to `value`, removing every previously-set value first.
    ///
    /// Conditional-request and `Last-Event-ID` headers must replace, never
    /// duplicate: a request that already carries the header gets exactly one
    /// occurrence after this call.
    pub fn replace_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Adds a header, consuming and returning the request.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.replace_header(name, value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_header_drops_prior_occurrences() {
        let mut request = Request::get("http://example.com/");
        let name = HeaderName::from_static("last-event-id");
        request
            .headers
            .append(name.clone(), HeaderValue::from_static("1"));
        request
            .headers
            .append(name.clone(), HeaderValue::from_static("2"));

        request.replace_header(name.clone(), HeaderValue::from_static("3"));

        let values: Vec<_> = request.headers.get_all(&name).iter().collect();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0], "3");
    }

    #[test]
    fn get_constructor_sets_method() {
        let request = Request::get("http://example.com/feed");
        assert_eq!(request.method, Method::GET);
        assert!(request.headers.is_empty());
    }
}
