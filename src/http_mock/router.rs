//! # `router`
//!
//! The routing table of the HTTP mocker: maps (method, path) to a
//! registered expectation. An unknown path yields 404, a known path with an
//! unregistered method yields 405.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use crate::http_mock::expectation::Expectation;

/// HTTP methods understood by the mocker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
}

impl FromStr for Method {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::Get),
            "PUT" => Ok(Method::Put),
            "POST" => Ok(Method::Post),
            "DELETE" => Ok(Method::Delete),
            "OPTIONS" => Ok(Method::Options),
            "HEAD" => Ok(Method::Head),
            "PATCH" => Ok(Method::Patch),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Head => "HEAD",
            Method::Patch => "PATCH",
        };
        f.write_str(name)
    }
}

/// Outcome of a routing-table lookup.
pub(crate) enum RouteOutcome {
    /// No expectation registered under the request path.
    NotFound,
    /// The path is known but not for the request method.
    MethodNotAllowed,
    /// A matching expectation.
    Matched(Arc<Mutex<Expectation>>),
}

/// Routing table plus the common headers merged into every response.
#[derive(Debug, Default)]
pub(crate) struct Router {
    routes: HashMap<String, HashMap<Method, Arc<Mutex<Expectation>>>>,
    common_headers: Vec<(String, String)>,
}

impl Router {
    /// Register an expectation. A second registration for the same
    /// (method, path) pair overwrites dispatch.
    pub(crate) fn register(
        &mut self,
        method: Method,
        path: &str,
        expectation: Expectation,
    ) -> Arc<Mutex<Expectation>> {
        let slot = Arc::new(Mutex::new(expectation));
        self.routes
            .entry(path.to_string())
            .or_default()
            .insert(method, Arc::clone(&slot));
        slot
    }

    /// Look up the expectation for a request. The method is `None` if the
    /// request carried one the mocker doesn't understand.
    pub(crate) fn dispatch(&self, method: Option<Method>, path: &str) -> RouteOutcome {
        let Some(methods) = self.routes.get(path) else {
            return RouteOutcome::NotFound;
        };
        method
            .and_then(|method| methods.get(&method))
            .map_or(RouteOutcome::MethodNotAllowed, |slot| {
                RouteOutcome::Matched(Arc::clone(slot))
            })
    }

    /// Set a header applied to every mock response, overriding a previously
    /// set header of the same name.
    pub(crate) fn set_common_header(&mut self, name: &str, value: &str) {
        if let Some(header) = self
            .common_headers
            .iter_mut()
            .find(|(header_name, _)| header_name.eq_ignore_ascii_case(name))
        {
            header.1 = value.to_string();
        } else {
            self.common_headers
                .push((name.to_string(), value.to_string()));
        }
    }

    pub(crate) fn common_headers(&self) -> &[(String, String)] {
        &self.common_headers
    }

    /// Verify every registered expectation.
    ///
    /// # Panics
    /// Panics on the first expectation that fails verification.
    pub(crate) fn verify_all(&self) {
        for methods in self.routes.values() {
            for slot in methods.values() {
                slot.lock().unwrap().verify();
            }
        }
    }
}
