use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use tungstenite::Message;

/// A local WebSocket echo server for network tests.
///
/// Every text or binary message is sent straight back on the same connection. Each connection is
/// served on its own thread. The server stops accepting connections when dropped.
#[derive(Debug)]
pub struct EchoServer {
    address: SocketAddr,
    stopping: Arc<AtomicBool>,
    accept_thread: Option<JoinHandle<()>>,
}

impl EchoServer {
    /// Starts a server on an ephemeral local port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound or the accept thread cannot be started.
    #[must_use]
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind echo test server");
        let address = listener
            .local_addr()
            .expect("bound listener has an address");

        let stopping = Arc::new(AtomicBool::new(false));

        let accept_thread = thread::Builder::new()
            .name("test-ws-accept".to_string())
            .spawn({
                let stopping = Arc::clone(&stopping);
                move || accept_loop(&listener, &stopping)
            })
            .expect("failed to start echo test server thread");

        Self {
            address,
            stopping,
            accept_thread: Some(accept_thread),
        }
    }

    /// The `ws://` URL of the server.
    #[must_use]
    pub fn url(&self) -> String {
        format!("ws://{}/", self.address)
    }
}

impl Drop for EchoServer {
    fn drop(&mut self) {
        self.stopping.store(true, Ordering::Release);

        // Wake the accept loop so it observes the flag.
        drop(TcpStream::connect(self.address));

        if let Some(handle) = self.accept_thread.take() {
            drop(handle.join());
        }
    }
}

fn accept_loop(listener: &TcpListener, stopping: &AtomicBool) {
    for stream in listener.incoming() {
        if stopping.load(Ordering::Acquire) {
            return;
        }

        let Ok(stream) = stream else {
            continue;
        };

        drop(
            thread::Builder::new()
                .name("test-ws-conn".to_string())
                .spawn(move || echo_connection(stream)),
        );
    }
}

fn echo_connection(stream: TcpStream) {
    let Ok(mut socket) = tungstenite::accept(stream) else {
        return;
    };

    loop {
        match socket.read() {
            Ok(message @ (Message::Text(_) | Message::Binary(_))) => {
                if socket.send(message).is_err() {
                    return;
                }
            }
            // Pings and close frames are answered by tungstenite itself.
            Ok(_) => {}
            Err(_) => return,
        }
    }
}
