//! # `response`
//!
//! Canned responses sent by the HTTP mocker: a status code, extra headers,
//! and an optional body backed by a string or by a file on disk.

use std::fmt;
use std::fs::{self, File};
use std::io::{Cursor, Read};
use std::path::PathBuf;

use crate::http_mock::HttpMockerError::{self, UnableToReadBodyFile};

/// A canned HTTP response.
///
/// Immutable once constructed. Body accessors must only be called when
/// [`Response::has_body`] returns `true`.
///
/// # Example
/// ```
/// use app_test_harness::Response;
///
/// let no_content = Response::empty(204);
/// let ok = Response::text(200, "application/json", "{\"name\":\"test\"}")
///     .with_header("ETag", "\"1\"");
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    status_code: u16,
    headers: Vec<(String, String)>,
    body: Body,
}

/// Body source of a [`Response`].
#[derive(Debug, Clone)]
enum Body {
    Empty,
    Text { content_type: String, text: String },
    File { content_type: String, path: PathBuf },
}

impl Response {
    /// A response without a body, e.g. `Response::empty(204)`.
    pub fn empty(status_code: u16) -> Self {
        Self {
            status_code,
            headers: Vec::new(),
            body: Body::Empty,
        }
    }

    /// A response with a string body.
    pub fn text(
        status_code: u16,
        content_type: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            status_code,
            headers: Vec::new(),
            body: Body::Text {
                content_type: content_type.into(),
                text: body.into(),
            },
        }
    }

    /// A response whose body is read from a file on disk, the counterpart of
    /// serving a test-resource fixture.
    pub fn file(
        status_code: u16,
        content_type: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            status_code,
            headers: Vec::new(),
            body: Body::File {
                content_type: content_type.into(),
                path: path.into(),
            },
        }
    }

    /// Add an extra header to this response.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// HTTP status code of this response.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Extra headers of this response, sent in addition to the common ones.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Determines whether this response has a body.
    pub fn has_body(&self) -> bool {
        !matches!(self.body, Body::Empty)
    }

    /// Content type of the body.
    ///
    /// # Panics
    /// Panics if this response doesn't have a body.
    pub fn content_type(&self) -> &str {
        match &self.body {
            Body::Empty => panic!("This response doesn't have a body."),
            Body::Text { content_type, .. } | Body::File { content_type, .. } => content_type,
        }
    }

    /// Length of the body in bytes.
    ///
    /// # Panics
    /// Panics if this response doesn't have a body.
    pub fn body_length(&self) -> Result<u64, HttpMockerError> {
        match &self.body {
            Body::Empty => panic!("This response doesn't have a body."),
            Body::Text { text, .. } => Ok(text.len() as u64),
            Body::File { path, .. } => fs::metadata(path)
                .map(|metadata| metadata.len())
                .map_err(|e| UnableToReadBodyFile(path.clone(), e)),
        }
    }

    /// Open a reader over the body.
    ///
    /// # Panics
    /// Panics if this response doesn't have a body.
    pub fn open_body(&self) -> Result<Box<dyn Read + Send>, HttpMockerError> {
        match &self.body {
            Body::Empty => panic!("This response doesn't have a body."),
            Body::Text { text, .. } => Ok(Box::new(Cursor::new(text.clone().into_bytes()))),
            Body::File { path, .. } => {
                let file = File::open(path).map_err(|e| UnableToReadBodyFile(path.clone(), e))?;
                Ok(Box::new(file))
            }
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            Body::Empty => write!(f, "{} without body", self.status_code),
            Body::Text { content_type, text } => write!(
                f,
                "{} with {content_type} body of {} bytes",
                self.status_code,
                text.len()
            ),
            Body::File { content_type, path } => write!(
                f,
                "{} with {content_type} body from {}",
                self.status_code,
                path.display()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_response_has_no_body() {
        let response = Response::empty(204);
        assert_eq!(204, response.status_code());
        assert!(!response.has_body());
    }

    #[test]
    #[should_panic(expected = "This response doesn't have a body.")]
    fn content_type_of_empty_response_panics() {
        let _ = Response::empty(204).content_type();
    }

    #[test]
    #[should_panic(expected = "This response doesn't have a body.")]
    fn body_length_of_empty_response_panics() {
        let _ = Response::empty(404).body_length();
    }

    #[test]
    fn text_response_exposes_its_body() {
        let response = Response::text(200, "text/plain", "hello");
        assert!(response.has_body());
        assert_eq!("text/plain", response.content_type());
        assert_eq!(5, response.body_length().unwrap());

        let mut body = String::new();
        response.open_body().unwrap().read_to_string(&mut body).unwrap();
        assert_eq!("hello", body);
    }

    #[test]
    fn file_response_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"<feed/>").unwrap();

        let response = Response::file(200, "application/atom+xml", file.path());
        assert_eq!(7, response.body_length().unwrap());

        let mut body = String::new();
        response.open_body().unwrap().read_to_string(&mut body).unwrap();
        assert_eq!("<feed/>", body);
    }

    #[test]
    fn missing_file_is_reported() {
        let response = Response::file(200, "text/plain", "/nonexistent/fixture.txt");
        assert!(matches!(
            response.body_length(),
            Err(UnableToReadBodyFile(_, _))
        ));
    }
}
