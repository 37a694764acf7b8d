use super::{HeaderVec, HttpResponse, Request};
use crate::resolver::RouteResolver;
use std::io::{self, Read};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{info, warn};

/// Default cap on a request body, in bytes.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1 << 20;

/// Blocking HTTP front end for a [`RouteResolver`].
///
/// Requests are accepted by `tiny_http` and resolved one at a time on a single
/// worker thread. At most `max_body_bytes` of a body are read; a longer body
/// is rejected with 400 once a POST handler matches.
pub struct HttpServer {
    resolver: Arc<RouteResolver>,
    max_body_bytes: usize,
}

/// Handle to a running HTTP server
///
/// Provides methods for waiting until the server is ready, stopping it, or
/// joining the server thread.
pub struct ServerHandle {
    addr: SocketAddr,
    server: Arc<tiny_http::Server>,
    stopping: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl ServerHandle {
    /// Address the server is bound to.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the server to be ready to accept connections
    ///
    /// # Errors
    ///
    /// Returns `TimedOut` error if the server doesn't become ready within ~250ms (50 attempts × 5ms).
    pub fn wait_ready(&self) -> io::Result<()> {
        for _ in 0..50 {
            if TcpStream::connect(self.addr).is_ok() {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"))
    }

    /// Stop accepting requests and wait for the worker thread to exit.
    pub fn stop(self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.server.unblock();
        let _ = self.handle.join();
    }

    /// Block until the server thread completes.
    ///
    /// # Errors
    ///
    /// Returns an error if the server thread panicked.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

impl HttpServer {
    /// Serve `resolver`.
    #[must_use]
    pub fn new(resolver: RouteResolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Cap request bodies at `limit` bytes.
    #[must_use]
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Bind `addr` and start serving on a background thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let server = tiny_http::Server::http(addr).map_err(|e| io::Error::other(e.to_string()))?;
        let addr = server
            .server_addr()
            .to_ip()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid address"))?;
        let server = Arc::new(server);
        let stopping = Arc::new(AtomicBool::new(false));

        let handle = {
            let server = Arc::clone(&server);
            let stopping = Arc::clone(&stopping);
            let resolver = Arc::clone(&self.resolver);
            let max_body_bytes = self.max_body_bytes;
            thread::Builder::new()
                .name("brrtresolver-http".into())
                .spawn(move || serve(&server, &resolver, max_body_bytes, &stopping))?
        };

        info!(addr = %addr, max_body_bytes = self.max_body_bytes, "HTTP server listening");
        Ok(ServerHandle {
            addr,
            server,
            stopping,
            handle,
        })
    }
}

fn serve(
    server: &tiny_http::Server,
    resolver: &RouteResolver,
    max_body_bytes: usize,
    stopping: &AtomicBool,
) {
    while !stopping.load(Ordering::SeqCst) {
        match server.recv() {
            Ok(request) => {
                if let Err(e) = handle(resolver, request, max_body_bytes) {
                    warn!(error = %e, "Failed to write response");
                }
            }
            Err(e) => {
                if !stopping.load(Ordering::SeqCst) {
                    warn!(error = %e, "Failed to accept request");
                }
                break;
            }
        }
    }
    info!("HTTP server stopped");
}

fn handle(
    resolver: &RouteResolver,
    mut request: tiny_http::Request,
    max_body_bytes: usize,
) -> io::Result<()> {
    let method = request.method().to_string();
    let url = request.url().to_string();
    let headers: HeaderVec = request
        .headers()
        .iter()
        .map(|h| (Arc::from(h.field.as_str().as_str()), h.value.as_str().to_string()))
        .collect();

    // One byte past the cap tells an oversized body from one that fits exactly.
    let mut body = Vec::new();
    let read = request
        .as_reader()
        .take((max_body_bytes as u64).saturating_add(1))
        .read_to_end(&mut body);
    let response = match read {
        Ok(n) if n > max_body_bytes => {
            warn!(method = %method, url = %url, max_body_bytes, "Request body over limit");
            let parsed = Request::parse(&method, &url, headers, b"")
                .reject_body(format!("request body exceeds {max_body_bytes} bytes"));
            resolver.resolve(&parsed)
        }
        Ok(_) => resolver.resolve(&Request::parse(&method, &url, headers, &body)),
        Err(e) => HttpResponse::internal(&anyhow::Error::new(e).context("reading request body")),
    };
    write_response(request, &response)
}

fn write_response(request: tiny_http::Request, response: &HttpResponse) -> io::Result<()> {
    let content_type =
        tiny_http::Header::from_bytes(&b"Content-Type"[..], response.content_type().as_bytes())
            .map_err(|()| io::Error::new(io::ErrorKind::InvalidData, "invalid content type"))?;
    let reply = tiny_http::Response::from_data(response.body_bytes())
        .with_status_code(response.status)
        .with_header(content_type);
    request.respond(reply)
}
