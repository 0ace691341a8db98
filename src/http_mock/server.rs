//! # `server`
//!
//! The TCP side of the HTTP mocker: an acceptor thread feeding a small
//! fixed-size worker pool through a channel. Each worker serves one request
//! per connection and closes it.

use std::io::{self, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::http_mock::request::HttpRequest;
use crate::http_mock::router::{RouteOutcome, Router};
use crate::http_mock::HttpMockerError::{
    self, UnableToAcceptConnection, UnableToBindListener, UnableToGetLocalAddress,
    UnableToSetReadTimeout, UnableToWriteStream,
};
use crate::http_mock::{HttpMockerOptions, Response};

/// Running socket server behind an [`HttpMocker`](crate::HttpMocker).
#[derive(Debug)]
pub(crate) struct MockHttpServer {
    socket_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    acceptor: Option<JoinHandle<()>>,
    workers: Vec<JoinHandle<()>>,
}

impl MockHttpServer {
    /// Bind the listener and spawn the acceptor and worker threads.
    pub(crate) fn start(
        options: &HttpMockerOptions,
        router: Arc<Mutex<Router>>,
    ) -> Result<Self, HttpMockerError> {
        let listener = TcpListener::bind(options.socket_addr)
            .map_err(|e| UnableToBindListener(options.socket_addr, e))?;
        let socket_addr = listener.local_addr().map_err(UnableToGetLocalAddress)?;
        debug!("starting HTTP mocker on {socket_addr}");

        let (stream_tx, stream_rx) = mpsc::channel::<TcpStream>();
        let stream_rx = Arc::new(Mutex::new(stream_rx));
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(options.worker_count);
        for _ in 0..options.worker_count {
            let stream_rx = Arc::clone(&stream_rx);
            let router = Arc::clone(&router);
            let net_timeout = options.net_timeout;
            workers.push(thread::spawn(move || {
                worker_loop(&stream_rx, &router, net_timeout);
            }));
        }

        let acceptor = {
            let shutdown = Arc::clone(&shutdown);
            thread::spawn(move || loop {
                match listener.accept() {
                    Ok((stream, _addr)) => {
                        if shutdown.load(Ordering::SeqCst) || stream_tx.send(stream).is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        if shutdown.load(Ordering::SeqCst) {
                            return;
                        }
                        warn!("{}", UnableToAcceptConnection(socket_addr, err));
                    }
                }
            })
        };

        Ok(Self {
            socket_addr,
            shutdown,
            acceptor: Some(acceptor),
            workers,
        })
    }

    /// Socket address on which the mock server is listening.
    pub(crate) fn socket_address(&self) -> SocketAddr {
        self.socket_addr
    }

    /// Stop accepting connections and join all threads. Idempotent.
    pub(crate) fn stop(&mut self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("stopping HTTP mocker on {}", self.socket_addr);
        // Wake the acceptor out of its blocking accept. Dropping the stream
        // sender afterwards terminates the workers.
        drop(TcpStream::connect(self.socket_addr));
        if let Some(acceptor) = self.acceptor.take() {
            drop(acceptor.join());
        }
        for worker in self.workers.drain(..) {
            drop(worker.join());
        }
    }
}

impl Drop for MockHttpServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(
    stream_rx: &Arc<Mutex<Receiver<TcpStream>>>,
    router: &Arc<Mutex<Router>>,
    net_timeout: Duration,
) {
    loop {
        let stream = match stream_rx.lock().unwrap().recv() {
            Ok(stream) => stream,
            // Channel closed, the server is stopping
            Err(_) => return,
        };
        if let Err(err) = handle_connection(&stream, router, net_timeout) {
            warn!("{err}");
        }
    }
}

/// Serve one request on the connection, then let it close.
fn handle_connection(
    stream: &TcpStream,
    router: &Arc<Mutex<Router>>,
    net_timeout: Duration,
) -> Result<(), HttpMockerError> {
    stream
        .set_read_timeout(Some(net_timeout))
        .map_err(UnableToSetReadTimeout)?;
    let mut reader = BufReader::new(stream);

    let request = match HttpRequest::read_from(&mut reader) {
        Ok(Some(request)) => request,
        // Closed without sending anything, e.g. a health probe
        Ok(None) => return Ok(()),
        Err(err) => {
            write_response(stream, &Response::empty(400), &[])?;
            return Err(err);
        }
    };

    let (outcome, common_headers) = {
        let router = router.lock().unwrap();
        (
            router.dispatch(request.method.parse().ok(), &request.path),
            router.common_headers().to_vec(),
        )
    };
    let response = match outcome {
        RouteOutcome::NotFound => Response::empty(404),
        RouteOutcome::MethodNotAllowed => Response::empty(405),
        RouteOutcome::Matched(slot) => slot.lock().unwrap().handle(&request),
    };
    write_response(stream, &response, &common_headers)
}

fn write_response(
    mut stream: &TcpStream,
    response: &Response,
    common_headers: &[(String, String)],
) -> Result<(), HttpMockerError> {
    let mut head = format!(
        "HTTP/1.1 {} {}\r\n",
        response.status_code(),
        reason_phrase(response.status_code())
    );
    for (name, value) in common_headers.iter().chain(response.headers()) {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    if response.has_body() {
        head.push_str(&format!("Content-Type: {}\r\n", response.content_type()));
        head.push_str(&format!("Content-Length: {}\r\n", response.body_length()?));
    } else {
        head.push_str("Content-Length: 0\r\n");
    }
    head.push_str("Connection: close\r\n\r\n");

    stream
        .write_all(head.as_bytes())
        .map_err(UnableToWriteStream)?;
    if response.has_body() {
        io::copy(&mut response.open_body()?, &mut stream).map_err(UnableToWriteStream)?;
    }
    stream.flush().map_err(UnableToWriteStream)
}

fn reason_phrase(status_code: u16) -> &'static str {
    match status_code {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knows_the_reason_phrases_it_sends() {
        assert_eq!("OK", reason_phrase(200));
        assert_eq!("Method Not Allowed", reason_phrase(405));
        assert_eq!("", reason_phrase(418));
    }
}
