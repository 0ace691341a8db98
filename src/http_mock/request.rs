//! # `request`
//!
//! Minimal HTTP/1.1 request parsing: request line, headers, and a
//! `Content-Length` delimited body. Just enough to drive the routing table.

use std::io::BufRead;

use crate::http_mock::HttpMockerError::{self, MalformedRequest, UnableToReadStream};

/// A parsed inbound HTTP request.
#[derive(Debug)]
pub(crate) struct HttpRequest {
    pub(crate) method: String,
    pub(crate) path: String,
    headers: Vec<(String, String)>,
    pub(crate) body: Vec<u8>,
}

impl HttpRequest {
    /// Read and parse one request from the stream.
    ///
    /// Returns `Ok(None)` if the connection was closed before any byte
    /// arrived.
    pub(crate) fn read_from(reader: &mut impl BufRead) -> Result<Option<Self>, HttpMockerError> {
        let Some(request_line) = read_crlf_line(reader)? else {
            return Ok(None);
        };
        let mut parts = request_line.split_whitespace();
        let (method, target) = match (parts.next(), parts.next(), parts.next()) {
            (Some(method), Some(target), Some(_version)) => {
                (method.to_string(), target.to_string())
            }
            _ => return Err(MalformedRequest(format!("bad request line: {request_line:?}"))),
        };
        // Route on the path only, ignoring any query string
        let path = target
            .split_once('?')
            .map_or(target.as_str(), |(path, _query)| path)
            .to_string();

        let mut headers = Vec::new();
        loop {
            let line = read_crlf_line(reader)?.ok_or_else(|| {
                MalformedRequest("connection closed in the middle of a request".to_string())
            })?;
            if line.is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| MalformedRequest(format!("bad header line: {line:?}")))?;
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }

        let mut request = Self {
            method,
            path,
            headers,
            body: Vec::new(),
        };
        let content_length = request.content_length()?;
        if content_length > 0 {
            let mut body = vec![0; content_length];
            reader.read_exact(&mut body).map_err(UnableToReadStream)?;
            request.body = body;
        }
        Ok(Some(request))
    }

    /// First header value with the given name, compared case-insensitively.
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header_name, _)| header_name.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Request content type with any parameters after `;` stripped.
    pub(crate) fn content_type(&self) -> Option<&str> {
        self.header("Content-Type").map(strip_content_type_params)
    }

    /// Request body decoded as UTF-8.
    pub(crate) fn body_as_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    fn content_length(&self) -> Result<usize, HttpMockerError> {
        match self.header("Content-Length") {
            None => Ok(0),
            Some(value) => value
                .parse()
                .map_err(|_| MalformedRequest(format!("bad Content-Length: {value:?}"))),
        }
    }
}

/// Strip any parameters after `;` from a content-type header value and trim
/// the remaining whitespace, e.g. `application/atom+xml;type=feed` becomes
/// `application/atom+xml`.
pub(crate) fn strip_content_type_params(header_value: &str) -> &str {
    header_value
        .split_once(';')
        .map_or(header_value, |(media_type, _params)| media_type)
        .trim()
}

/// Read one header/request line without its terminator. `None` on end of
/// stream.
fn read_crlf_line(reader: &mut impl BufRead) -> Result<Option<String>, HttpMockerError> {
    let mut line = String::new();
    let bytes_read = reader.read_line(&mut line).map_err(UnableToReadStream)?;
    if bytes_read == 0 {
        return Ok(None);
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Some(line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    #[test]
    fn parses_request_with_body() {
        let raw = "POST /names HTTP/1.1\r\nHost: localhost\r\nContent-Type: text/plain\r\nContent-Length: 5\r\n\r\nhello";
        let request = HttpRequest::read_from(&mut BufReader::new(raw.as_bytes()))
            .unwrap()
            .unwrap();

        assert_eq!("POST", request.method);
        assert_eq!("/names", request.path);
        assert_eq!(Some("localhost"), request.header("host"));
        assert_eq!(Some("text/plain"), request.content_type());
        assert_eq!("hello", request.body_as_string());
    }

    #[test]
    fn strips_query_string_from_path() {
        let raw = "GET /names?q=1 HTTP/1.1\r\n\r\n";
        let request = HttpRequest::read_from(&mut BufReader::new(raw.as_bytes()))
            .unwrap()
            .unwrap();
        assert_eq!("/names", request.path);
    }

    #[test]
    fn rejects_garbage_request_line() {
        let raw = "nonsense\r\n\r\n";
        let result = HttpRequest::read_from(&mut BufReader::new(raw.as_bytes()));
        assert!(matches!(result, Err(MalformedRequest(_))));
    }

    #[test]
    fn closed_connection_yields_no_request() {
        let result = HttpRequest::read_from(&mut BufReader::new("".as_bytes()));
        assert!(result.unwrap().is_none());
    }

    #[test]
    fn strips_content_type_parameters() {
        assert_eq!(
            "application/atom+xml",
            strip_content_type_params("application/atom+xml;type=feed")
        );
        assert_eq!(
            "application/json",
            strip_content_type_params(" application/json ; charset=utf-8")
        );
        assert_eq!("text/plain", strip_content_type_params("text/plain"));
    }
}
