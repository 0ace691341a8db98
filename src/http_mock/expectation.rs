//! # `expectation`
//!
//! A registered expectation: the rule mapping a request signature to a
//! canned response, with call-verification bookkeeping.
//!
//! Expectations come in two kinds: readonly ones just reply, writable ones
//! additionally record the request body and content type for comparison at
//! [`verify`](crate::HttpMocker::verify) time.

use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, warn};

use crate::http_mock::request::{strip_content_type_params, HttpRequest};
use crate::http_mock::{Method, Response};

/// Basic-auth credentials attached to an expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BasicAuthToken {
    username: String,
    password: String,
}

impl BasicAuthToken {
    pub(crate) fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Value the `Authorization` request header must carry.
    pub(crate) fn auth_header_value(&self) -> String {
        let credentials = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(credentials))
    }
}

/// One registered expectation for a (method, path) pair.
#[derive(Debug)]
pub(crate) struct Expectation {
    method: Method,
    path: String,
    response: Option<Response>,
    basic_auth: Option<BasicAuthToken>,
    kind: ExpectationKind,
    called: bool,
}

/// Tagged expectation kind: readonly, or verifying the request payload.
#[derive(Debug)]
pub(crate) enum ExpectationKind {
    Readonly,
    Writable {
        expected_content_type: String,
        expected_payload: String,
        seen_content_type: Option<String>,
        seen_payload: Option<String>,
    },
}

impl Expectation {
    pub(crate) fn readonly(method: Method, path: impl Into<String>) -> Self {
        Self::new(method, path, ExpectationKind::Readonly)
    }

    pub(crate) fn writable(
        method: Method,
        path: impl Into<String>,
        content_type: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self::new(
            method,
            path,
            ExpectationKind::Writable {
                expected_content_type: content_type.into(),
                expected_payload: payload.into(),
                seen_content_type: None,
                seen_payload: None,
            },
        )
    }

    fn new(method: Method, path: impl Into<String>, kind: ExpectationKind) -> Self {
        Self {
            method,
            path: path.into(),
            response: None,
            basic_auth: None,
            kind,
            called: false,
        }
    }

    pub(crate) fn set_response(&mut self, response: Response) {
        self.response = Some(response);
    }

    pub(crate) fn set_basic_auth(&mut self, token: BasicAuthToken) {
        self.basic_auth = Some(token);
    }

    /// Handle a matching request: record the call, check authorization and
    /// pick the response to send.
    pub(crate) fn handle(&mut self, request: &HttpRequest) -> Response {
        debug!(
            "handling request: {} {}, Content-Type: {}",
            request.method,
            request.path,
            request.content_type().unwrap_or("N/A")
        );
        self.called = true;
        if let ExpectationKind::Writable {
            seen_content_type,
            seen_payload,
            ..
        } = &mut self.kind
        {
            *seen_content_type = request.content_type().map(ToString::to_string);
            *seen_payload = Some(request.body_as_string());
        }

        if let Some(response) = self.check_authorization(request) {
            return response;
        }
        match &self.response {
            Some(response) => response.clone(),
            None => {
                warn!(
                    "no response registered for {} {}, replying 500",
                    self.method, self.path
                );
                Response::empty(500)
            }
        }
    }

    /// 401 if the `Authorization` header is missing, 403 if it doesn't match
    /// the registered credentials, `None` if the request is authorized.
    fn check_authorization(&self, request: &HttpRequest) -> Option<Response> {
        let token = self.basic_auth.as_ref()?;
        match request.header("Authorization") {
            None => Some(Response::empty(401)),
            Some(header_value) if header_value != token.auth_header_value() => {
                Some(Response::empty(403))
            }
            Some(_) => None,
        }
    }

    /// Verify that this expectation was used as registered.
    ///
    /// # Panics
    /// Panics if the expectation was never called, or if a writable
    /// expectation saw a different content type or payload.
    pub(crate) fn verify(&self) {
        assert!(
            self.called,
            "Expected request {} {} to be called",
            self.method, self.path
        );
        if let ExpectationKind::Writable {
            expected_content_type,
            expected_payload,
            seen_content_type,
            seen_payload,
        } = &self.kind
        {
            assert_eq!(
                Some(strip_content_type_params(expected_content_type)),
                seen_content_type.as_deref(),
                "content type of request {} {}",
                self.method,
                self.path
            );
            assert_eq!(
                Some(expected_payload.as_str()),
                seen_payload.as_deref(),
                "payload of request {} {}",
                self.method,
                self.path
            );
        }
    }
}

/// Fluent handle on a registered expectation, returned by
/// [`HttpMocker::given`](crate::HttpMocker::given) and
/// [`HttpMocker::given_payload`](crate::HttpMocker::given_payload).
#[derive(Debug)]
pub struct Mocking {
    slot: Arc<Mutex<Expectation>>,
}

impl Mocking {
    pub(crate) fn new(slot: Arc<Mutex<Expectation>>) -> Self {
        Self { slot }
    }

    /// Set the canned response sent for matching requests.
    pub fn will_respond(self, response: Response) -> Self {
        self.slot.lock().unwrap().set_response(response);
        self
    }

    /// Require requests to carry basic-auth credentials.
    ///
    /// Requests without an `Authorization` header are answered with 401,
    /// requests with wrong credentials with 403.
    pub fn with_basic_auth(self, username: &str, password: &str) -> Self {
        self.slot
            .lock()
            .unwrap()
            .set_basic_auth(BasicAuthToken::new(username, password));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    fn request(raw: &str) -> HttpRequest {
        HttpRequest::read_from(&mut BufReader::new(raw.as_bytes()))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn basic_auth_token_renders_standard_header_value() {
        let token = BasicAuthToken::new("Aladdin", "open sesame");
        assert_eq!(
            "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==",
            token.auth_header_value()
        );
    }

    #[test]
    fn records_call_and_replies_with_registered_response() {
        let mut expectation = Expectation::readonly(Method::Get, "/names");
        expectation.set_response(Response::text(200, "text/plain", "ok"));

        let response = expectation.handle(&request("GET /names HTTP/1.1\r\n\r\n"));
        assert_eq!(200, response.status_code());
        expectation.verify();
    }

    #[test]
    fn missing_authorization_yields_401() {
        let mut expectation = Expectation::readonly(Method::Get, "/names");
        expectation.set_response(Response::empty(200));
        expectation.set_basic_auth(BasicAuthToken::new("user", "pass"));

        let response = expectation.handle(&request("GET /names HTTP/1.1\r\n\r\n"));
        assert_eq!(401, response.status_code());
    }

    #[test]
    fn wrong_credentials_yield_403() {
        let mut expectation = Expectation::readonly(Method::Get, "/names");
        expectation.set_response(Response::empty(200));
        expectation.set_basic_auth(BasicAuthToken::new("user", "pass"));

        let response = expectation.handle(&request(
            "GET /names HTTP/1.1\r\nAuthorization: Basic d3Jvbmc6d3Jvbmc=\r\n\r\n",
        ));
        assert_eq!(403, response.status_code());
    }

    #[test]
    #[should_panic(expected = "called")]
    fn verify_of_uncalled_expectation_panics() {
        let expectation =
            Expectation::writable(Method::Put, "/names/1", "text/plain", "new name");
        expectation.verify();
    }

    #[test]
    fn verify_accepts_content_type_with_parameters() {
        let mut expectation =
            Expectation::writable(Method::Put, "/feed", "application/atom+xml", "<feed/>");
        expectation.set_response(Response::empty(204));

        expectation.handle(&request(
            "PUT /feed HTTP/1.1\r\nContent-Type: application/atom+xml;type=feed\r\nContent-Length: 7\r\n\r\n<feed/>",
        ));
        expectation.verify();
    }

    #[test]
    #[should_panic(expected = "payload of request PUT /names/1")]
    fn verify_of_mismatched_payload_panics() {
        let mut expectation =
            Expectation::writable(Method::Put, "/names/1", "text/plain", "expected body");
        expectation.set_response(Response::empty(204));

        expectation.handle(&request(
            "PUT /names/1 HTTP/1.1\r\nContent-Type: text/plain\r\nContent-Length: 6\r\n\r\nactual",
        ));
        expectation.verify();
    }
}
