//! # `http_mock`
//!
//! An embeddable HTTP mock server for driving integration tests of HTTP
//! clients.
//!
//! Tests register expected request/response pairs on an [`HttpMocker`]
//! instance, point the client under test at [`HttpMocker::base_url`], and
//! finally [`verify`](HttpMocker::verify) that every expectation was hit.
//!
//! Every response carries a set of common headers, by default the CORS
//! headers. Unknown paths are answered with 404, known paths with an
//! unregistered method with 405, and failed basic auth with 401 or 403.

mod error;
mod expectation;
mod request;
mod response;
mod router;
mod server;

pub use error::HttpMockerError;
pub use expectation::Mocking;
pub use response::Response;
pub use router::Method;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use expectation::Expectation;
use router::Router;
use server::MockHttpServer;

/// Options for the HTTP mocker
#[derive(Debug, Clone)]
pub struct HttpMockerOptions {
    /// Socket address on which the server will listen. Will be set to `127.0.0.1:0` by default.
    pub socket_addr: SocketAddr,
    /// Number of worker threads serving requests.
    pub worker_count: usize,
    /// Timeout for the server to wait for a request on an accepted connection.
    pub net_timeout: Duration,
}

impl Default for HttpMockerOptions {
    fn default() -> Self {
        Self {
            socket_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            worker_count: 10,
            net_timeout: Duration::from_secs(5),
        }
    }
}

/// An HTTP mock server instance holding its own routing table.
///
/// # Example
/// ```
/// use app_test_harness::{HttpMocker, Method, Response};
///
/// let mocker = HttpMocker::start().unwrap();
/// mocker
///     .given(Method::Get, "/names/1")
///     .will_respond(Response::text(200, "text/plain", "Arthur"));
///
/// let body = reqwest::blocking::get(format!("{}/names/1", mocker.base_url()))
///     .unwrap()
///     .text()
///     .unwrap();
/// assert_eq!("Arthur", body);
///
/// mocker.verify();
/// ```
#[derive(Debug)]
pub struct HttpMocker {
    server: MockHttpServer,
    router: Arc<Mutex<Router>>,
}

impl HttpMocker {
    /// Start a new mock server on a random free port of the local interface.
    /// The port can be retrieved with the [`HttpMocker::port`] method.
    pub fn start() -> Result<Self, HttpMockerError> {
        Self::start_with_opts(HttpMockerOptions::default())
    }

    /// Start a new mock server on the given port.
    /// If the port is already in use, the method will return an error.
    pub fn start_with_port(port: u16) -> Result<Self, HttpMockerError> {
        let mut opts = HttpMockerOptions::default();
        opts.socket_addr.set_port(port);
        Self::start_with_opts(opts)
    }

    /// Start a new mock server with the given options.
    pub fn start_with_opts(options: HttpMockerOptions) -> Result<Self, HttpMockerError> {
        let mut router = Router::default();
        for (name, value) in CORS_HEADERS {
            router.set_common_header(name, value);
        }
        let router = Arc::new(Mutex::new(router));
        let server = MockHttpServer::start(&options, Arc::clone(&router))?;
        Ok(Self { server, router })
    }

    /// Socket address on which the mock server is listening.
    pub fn socket_address(&self) -> SocketAddr {
        self.server.socket_address()
    }

    /// Port on which the mock server is listening.
    ///
    /// Listens only on the local interface.
    pub fn port(&self) -> u16 {
        self.socket_address().port()
    }

    /// Base URL of the mock server, without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.socket_address())
    }

    /// Set a header applied to every mock response.
    ///
    /// Overrides a default common header of the same name.
    pub fn set_common_header(&self, name: &str, value: &str) {
        self.router.lock().unwrap().set_common_header(name, value);
    }

    /// Register an expectation for the given request signature.
    ///
    /// A second registration for the same (method, path) pair overwrites
    /// dispatch. Attach the canned response with [`Mocking::will_respond`].
    pub fn given(&self, method: Method, path: &str) -> Mocking {
        self.register(method, path, Expectation::readonly(method, path))
    }

    /// Register an expectation that also verifies the request payload.
    ///
    /// On [`verify`](Self::verify), the expectation additionally checks that
    /// the request carried the given content type (parameters after `;`
    /// ignored) and exactly the given payload.
    pub fn given_payload(
        &self,
        method: Method,
        path: &str,
        content_type: &str,
        payload: &str,
    ) -> Mocking {
        self.register(
            method,
            path,
            Expectation::writable(method, path, content_type, payload),
        )
    }

    /// Verify all registered expectations.
    ///
    /// # Panics
    /// Panics if an expectation was never called, or if a payload-verifying
    /// one was called with a different content type or payload.
    pub fn verify(&self) {
        self.router.lock().unwrap().verify_all();
    }

    /// Stop the mock server and join its threads.
    ///
    /// Also happens on drop.
    pub fn stop(mut self) {
        self.server.stop();
    }

    fn register(&self, method: Method, path: &str, expectation: Expectation) -> Mocking {
        let slot = self
            .router
            .lock()
            .unwrap()
            .register(method, path, expectation);
        Mocking::new(slot)
    }
}

/// Common headers installed on every new mocker instance.
const CORS_HEADERS: [(&str, &str); 4] = [
    ("Access-Control-Allow-Origin", "*"),
    (
        "Access-Control-Allow-Methods",
        "GET, HEAD, PUT, DELETE, POST, OPTIONS",
    ),
    (
        "Access-Control-Allow-Headers",
        "Content-Type, Accept, Accept-Charset",
    ),
    ("Access-Control-Max-Age", "1728000"),
];
