//! # app-test-harness
//!
//! `app-test-harness` bundles two small helpers for integration tests:
//!
//! - [`AppExecutor`] launches a command-line application as a subprocess and
//!   lets the test assert on its stdout/stderr lines and exit code.
//! - [`HttpMocker`] is an embeddable HTTP mock server. Tests register
//!   expected request/response pairs, run the HTTP client under test against
//!   it, then [`verify`](HttpMocker::verify) that every expectation was hit.
//!
//! Assertion failures panic like `assert_eq!` does; environmental failures
//! (spawning, binding, stream I/O) are returned as errors.

pub mod app_executor;
pub mod http_mock;
pub mod output_collector;
pub mod packaged_app;

pub use app_executor::{AppExecutor, AppExecutorError};
pub use http_mock::{HttpMocker, HttpMockerError, HttpMockerOptions, Method, Mocking, Response};
pub use output_collector::OutputCollector;
pub use packaged_app::{PackagedApp, PackagedAppError};
