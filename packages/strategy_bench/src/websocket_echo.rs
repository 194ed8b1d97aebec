use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tracing::{trace, warn};
use tungstenite::client::IntoClientRequest;
use tungstenite::{HandshakeError, Message};

use crate::error::WorkloadError;
use crate::{Workload, WorkloadKind, WorkloadSpec};

/// Public echo endpoint used by the stock WebSocket benchmark.
pub const DEFAULT_ECHO_URL: &str = "wss://ws.postman-echo.com/raw";

/// Text sent on every round trip unless configured otherwise.
pub const DEFAULT_ECHO_MESSAGE: &str = "Hello, World!";

/// Round trips per connection unless configured otherwise.
pub const DEFAULT_MESSAGES_PER_CONNECTION: u32 = 100;

/// Number of connections in the stock input set.
pub const DEFAULT_CONNECTIONS: u64 = 10;

/// Timeout for connecting and for each receive unless configured otherwise.
pub const DEFAULT_ECHO_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration of a [`WebSocketEcho`] workload.
#[derive(Clone, Debug, Eq, PartialEq)]
#[expect(
    clippy::exhaustive_structs,
    reason = "plain options record, filled in with struct update syntax"
)]
pub struct WebSocketEchoOptions {
    /// Echo endpoint (`ws://` or `wss://`).
    pub url: String,

    /// Text sent on every round trip.
    pub message: String,

    /// Round trips per connection.
    pub messages_per_connection: u32,

    /// Timeout for connecting and for each receive.
    pub timeout: Duration,
}

impl Default for WebSocketEchoOptions {
    fn default() -> Self {
        Self {
            url: DEFAULT_ECHO_URL.to_string(),
            message: DEFAULT_ECHO_MESSAGE.to_string(),
            messages_per_connection: DEFAULT_MESSAGES_PER_CONNECTION,
            timeout: DEFAULT_ECHO_TIMEOUT,
        }
    }
}

/// I/O-bound workload that opens one WebSocket connection per input and performs a fixed number
/// of send/receive round trips on it.
///
/// The input is only a connection index; every connection talks to the same endpoint. The
/// output is the number of replies that matched the sent text. Any failure is logged and the
/// whole connection resolves to 0.
#[derive(Clone, Debug)]
pub struct WebSocketEcho {
    options: WebSocketEchoOptions,
}

impl WebSocketEcho {
    /// Creates the workload with the given options.
    #[must_use]
    pub fn new(options: WebSocketEchoOptions) -> Self {
        Self { options }
    }

    /// The workload configuration.
    #[must_use]
    pub fn options(&self) -> &WebSocketEchoOptions {
        &self.options
    }

    /// One input per connection, numbered from zero.
    #[must_use]
    pub fn inputs(connections: u64) -> Vec<u64> {
        (0..connections).collect()
    }

    fn echo_blocking(&self) -> Result<u64, WorkloadError> {
        let options = &self.options;

        let request = options.url.as_str().into_client_request()?;
        let uri = request.uri();

        let host = uri
            .host()
            .ok_or_else(|| WorkloadError::InvalidUrl(options.url.clone()))?;
        let port = uri
            .port_u16()
            .unwrap_or(if uri.scheme_str() == Some("wss") { 443 } else { 80 });

        let address = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| WorkloadError::InvalidUrl(options.url.clone()))?;

        let stream = TcpStream::connect_timeout(&address, options.timeout)?;
        stream.set_read_timeout(Some(options.timeout))?;
        stream.set_write_timeout(Some(options.timeout))?;

        let (mut socket, _response) =
            tungstenite::client_tls(request, stream).map_err(|e| match e {
                HandshakeError::Failure(error) => WorkloadError::from(error),
                HandshakeError::Interrupted(_) => WorkloadError::TimedOut,
            })?;

        let mut echoed = 0_u64;

        for _ in 0..options.messages_per_connection {
            socket.send(Message::text(options.message.as_str()))?;

            let reply = socket.read()?;
            if reply.to_text().is_ok_and(|text| text == options.message) {
                echoed = echoed.wrapping_add(1);
            }
        }

        // The work is done; a failed close handshake does not change the count.
        drop(socket.close(None));

        Ok(echoed)
    }

    async fn echo(&self) -> Result<u64, WorkloadError> {
        let options = &self.options;

        let (mut socket, _response) = tokio::time::timeout(
            options.timeout,
            tokio_tungstenite::connect_async(options.url.as_str()),
        )
        .await
        .map_err(|_elapsed| WorkloadError::TimedOut)??;

        let mut echoed = 0_u64;

        for _ in 0..options.messages_per_connection {
            socket.send(Message::text(options.message.as_str())).await?;

            let reply = tokio::time::timeout(options.timeout, socket.next())
                .await
                .map_err(|_elapsed| WorkloadError::TimedOut)?
                .ok_or(WorkloadError::Closed)??;

            if reply.to_text().is_ok_and(|text| text == options.message) {
                echoed = echoed.wrapping_add(1);
            }
        }

        drop(socket.close(None).await);

        Ok(echoed)
    }
}

impl Default for WebSocketEcho {
    fn default() -> Self {
        Self::new(WebSocketEchoOptions::default())
    }
}

impl Workload for WebSocketEcho {
    type Input = u64;
    type Output = u64;

    fn name(&self) -> &str {
        "websocket_echo"
    }

    fn kind(&self) -> WorkloadKind {
        WorkloadKind::Io
    }

    fn invoke(&self, input: &u64) -> u64 {
        degrade(*input, self.echo_blocking())
    }

    async fn invoke_async(&self, input: &u64) -> u64 {
        degrade(*input, self.echo().await)
    }

    fn unit(&self) -> &'static str {
        "messages"
    }

    fn spec(&self) -> Option<WorkloadSpec> {
        Some(WorkloadSpec::WebSocketEcho {
            url: self.options.url.clone(),
            message: self.options.message.clone(),
            messages_per_connection: self.options.messages_per_connection,
            timeout_ms: u64::try_from(self.options.timeout.as_millis()).unwrap_or(u64::MAX),
        })
    }
}

fn degrade(connection: u64, outcome: Result<u64, WorkloadError>) -> u64 {
    match outcome {
        Ok(echoed) => {
            trace!(connection, echoed, "echo connection completed");
            echoed
        }
        Err(error) => {
            warn!(connection, %error, "echo connection failed, recording 0 messages");
            0
        }
    }
}
