use std::convert::Infallible;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::sync::oneshot;

/// A local HTTP/1.1 server for network tests.
///
/// Every request, whatever its method or path, is answered after `delay` with a `200 OK` whose
/// body is `body_len` bytes long. Connections are served as tasks on one event loop, so
/// concurrent requests overlap their delays.
///
/// The server stops when dropped.
#[derive(Debug)]
pub struct HttpServer {
    address: SocketAddr,
    requests: Arc<AtomicUsize>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server_thread: Option<JoinHandle<()>>,
}

impl HttpServer {
    /// Starts a server on an ephemeral local port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound or the server thread cannot be started.
    #[must_use]
    pub fn start(body_len: usize, delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind HTTP test server");
        let address = listener
            .local_addr()
            .expect("bound listener has an address");
        listener
            .set_nonblocking(true)
            .expect("listener can be made non-blocking");

        let requests = Arc::new(AtomicUsize::new(0));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let body = Bytes::from(vec![b'x'; body_len]);

        let server_thread = thread::Builder::new()
            .name("test-http-server".to_string())
            .spawn({
                let requests = Arc::clone(&requests);

                move || serve(listener, shutdown_rx, requests, body, delay)
            })
            .expect("failed to start HTTP test server thread");

        Self {
            address,
            requests,
            shutdown_tx: Some(shutdown_tx),
            server_thread: Some(server_thread),
        }
    }

    /// The URL of the server root.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}/", self.address)
    }

    /// The address the server listens on.
    #[must_use]
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// How many requests have been received so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Acquire)
    }
}

impl Drop for HttpServer {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            // The server thread may already be gone if it panicked.
            drop(shutdown_tx.send(()));
        }

        if let Some(handle) = self.server_thread.take() {
            drop(handle.join());
        }
    }
}

fn serve(
    listener: TcpListener,
    mut shutdown_rx: oneshot::Receiver<()>,
    requests: Arc<AtomicUsize>,
    body: Bytes,
    delay: Duration,
) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to create HTTP test server runtime");

    runtime.block_on(async move {
        let listener =
            tokio::net::TcpListener::from_std(listener).expect("listener joins the event loop");

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let Ok((stream, _)) = accepted else {
                        continue;
                    };

                    let requests = Arc::clone(&requests);
                    let body = body.clone();

                    tokio::spawn(async move {
                        let service = service_fn(move |request| {
                            respond(request, Arc::clone(&requests), body.clone(), delay)
                        });

                        // Clients hanging up early are not the server's concern.
                        drop(
                            http1::Builder::new()
                                .serve_connection(TokioIo::new(stream), service)
                                .await,
                        );
                    });
                }
                _ = &mut shutdown_rx => return,
            }
        }
    });

    // Dropping the runtime cancels any connection still in flight.
    drop(runtime);
}

async fn respond(
    _request: Request<Incoming>,
    requests: Arc<AtomicUsize>,
    body: Bytes,
    delay: Duration,
) -> Result<Response<Full<Bytes>>, Infallible> {
    requests.fetch_add(1, Ordering::AcqRel);
    tokio::time::sleep(delay).await;

    let mut response = Response::new(Full::new(body));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));

    Ok(response)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::time::Instant;

    use super::*;

    fn get(address: SocketAddr) -> String {
        let mut stream = TcpStream::connect(address).unwrap();
        stream
            .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response.to_ascii_lowercase()
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn serves_body_of_requested_length() {
        let server = HttpServer::start(5, Duration::ZERO);

        let response = get(server.address());

        assert!(response.starts_with("http/1.1 200 ok"));
        assert!(response.contains("content-length: 5"));
        assert!(response.ends_with("\r\n\r\nxxxxx"));
        assert_eq!(server.request_count(), 1);
        assert!(server.url().starts_with("http://127.0.0.1:"));
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn concurrent_requests_overlap_their_delays() {
        let delay = Duration::from_millis(300);
        let server = HttpServer::start(1, delay);
        let address = server.address();

        let started = Instant::now();

        let clients: Vec<_> = (0..4)
            .map(|_| thread::spawn(move || get(address)))
            .collect();
        for client in clients {
            assert!(client.join().unwrap().ends_with("\r\n\r\nx"));
        }

        assert!(started.elapsed() < delay.saturating_mul(3));
        assert_eq!(server.request_count(), 4);
    }
}
