//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::{KvError, Result};
use crate::protocol::{read_request, write_reply, KeyValuePair, Reply, Request, Response};
use crate::service::StoreService;

use super::ShutdownHandle;

/// How often an idle connection checks for shutdown
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Reference to the store service
    service: Arc<StoreService>,

    /// Set when the server stops accepting work
    shutdown: ShutdownHandle,

    /// Timeout for the remainder of a frame once it started arriving
    read_timeout: Option<Duration>,

    /// Close the connection after this long without a request
    idle_timeout: Duration,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O and configures timeouts
    pub fn new(
        stream: TcpStream,
        service: Arc<StoreService>,
        shutdown: ShutdownHandle,
        config: &Config,
    ) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;
        if config.write_timeout_ms > 0 {
            stream.set_write_timeout(Some(config.write_timeout()))?;
        }

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            service,
            shutdown,
            read_timeout: (config.read_timeout_ms > 0).then(|| config.read_timeout()),
            idle_timeout: config.idle_timeout(),
            peer_addr,
        })
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Serves requests one after another. Returns when the client
    /// disconnects, goes idle, or the server shuts down between requests.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            if !self.wait_for_request()? {
                return Ok(());
            }

            let request = match read_request(&mut self.reader) {
                Ok(request) => request,
                Err(KvError::Io(ref e)) if e.kind() == ErrorKind::UnexpectedEof => {
                    tracing::debug!("Client {} disconnected mid-frame", self.peer_addr);
                    return Ok(());
                }
                Err(KvError::Io(ref e)) if is_timeout(e) => {
                    tracing::debug!("Read timeout for client {}", self.peer_addr);
                    return Ok(());
                }
                Err(KvError::Io(ref e)) if is_disconnect(e) => {
                    tracing::debug!("Connection to {} lost: {}", self.peer_addr, e);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    let _ = self.send(&status_reply(&e));
                    return Err(e);
                }
            };

            tracing::trace!("Received request from {}: {:?}", self.peer_addr, request);

            if let Err(e) = self.dispatch(request) {
                // The client going away before we could answer is not a
                // server error
                if let KvError::Io(ref io_err) = e {
                    if is_disconnect(io_err) {
                        tracing::debug!(
                            "Client {} disconnected before response could be sent: {}",
                            self.peer_addr,
                            e
                        );
                        return Ok(());
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Wait until the next request starts arriving
    ///
    /// Returns `false` when the connection should close instead: peer hung
    /// up, idle timeout, or shutdown. Never consumes request bytes.
    fn wait_for_request(&mut self) -> Result<bool> {
        if !self.reader.buffer().is_empty() {
            return Ok(true);
        }

        let stream = self.reader.get_ref();
        stream.set_read_timeout(Some(POLL_INTERVAL))?;

        let idle_since = Instant::now();
        let mut probe = [0u8; 1];
        let ready = loop {
            if self.shutdown.is_triggered() {
                tracing::debug!("Closing connection to {} for shutdown", self.peer_addr);
                break false;
            }
            match stream.peek(&mut probe) {
                Ok(0) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    break false;
                }
                Ok(_) => break true,
                Err(e) if is_timeout(&e) => {
                    if idle_since.elapsed() >= self.idle_timeout {
                        tracing::debug!("Closing idle connection to {}", self.peer_addr);
                        break false;
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) if is_disconnect(&e) => {
                    tracing::debug!("Connection to {} lost: {}", self.peer_addr, e);
                    break false;
                }
                Err(e) => return Err(e.into()),
            }
        };

        if ready {
            stream.set_read_timeout(self.read_timeout)?;
        }
        Ok(ready)
    }

    /// Execute a request and write its reply frames
    fn dispatch(&mut self, request: Request) -> Result<()> {
        match request {
            Request::Get(req) => {
                let reply = unary_reply(self.service.get(&req.key));
                self.send(&reply)
            }
            Request::Set(pair) => {
                let reply = unary_reply(self.service.set(&pair.key, &pair.value));
                self.send(&reply)
            }
            Request::List(_) => self.stream_list(),
            Request::Remove(req) => {
                let reply = Reply::Unary(self.service.remove(&req.key));
                self.send(&reply)
            }
        }
    }

    /// Stream every record, then END (or STATUS if the scan fails)
    fn stream_list(&mut self) -> Result<()> {
        let scanner = match self.service.list() {
            Ok(scanner) => scanner,
            Err(e) => return self.send(&status_reply(&e)),
        };

        let mut sent = 0u64;
        for record in scanner {
            match record {
                Ok(record) => {
                    self.send(&Reply::Item(KeyValuePair::from(record)))?;
                    sent += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        "List aborted for {} after {} records: {}",
                        self.peer_addr,
                        sent,
                        e
                    );
                    return self.send(&status_reply(&e));
                }
            }
        }

        tracing::debug!("Streamed {} records to {}", sent, self.peer_addr);
        self.send(&Reply::End)
    }

    /// Send a reply to the client
    fn send(&mut self, reply: &Reply) -> Result<()> {
        write_reply(&mut self.writer, reply)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn unary_reply(result: Result<Response>) -> Reply {
    match result {
        Ok(response) => Reply::Unary(response),
        Err(e) => status_reply(&e),
    }
}

fn status_reply(e: &KvError) -> Reply {
    Reply::status(e.status_code(), e.to_string())
}

/// Read timeouts surface as WouldBlock on Unix and TimedOut on Windows
pub(crate) fn is_timeout(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

pub(crate) fn is_disconnect(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset | ErrorKind::BrokenPipe
    )
}
