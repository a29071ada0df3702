//! TCP Client
//!
//! Issues requests to a kvlog server with a per-request deadline.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::time::{Duration, Instant};

use crate::error::{KvError, Result};
use crate::protocol::{read_reply, write_request, KeyValuePair, Reply, Request, Response};

use super::connection::is_timeout;

struct ClientConn {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl ClientConn {
    fn open(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Read one reply, giving up at `deadline`
    fn read_reply_until(&mut self, deadline: Instant, budget: Duration) -> Result<Reply> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(KvError::DeadlineExceeded(budget.as_millis() as u64));
        }
        self.reader.get_ref().set_read_timeout(Some(remaining))?;

        match read_reply(&mut self.reader) {
            Err(KvError::Io(ref e)) if is_timeout(e) => {
                Err(KvError::DeadlineExceeded(budget.as_millis() as u64))
            }
            other => other,
        }
    }
}

/// Client for a kvlog server
///
/// Requests on one client are sequential. When a request fails mid-exchange
/// (deadline, I/O, malformed reply) the connection is dropped and the next
/// request reconnects; the abandoned server-side operation still runs to
/// completion.
pub struct Client {
    addr: String,
    deadline: Duration,
    conn: Option<ClientConn>,
}

impl Client {
    /// Connect to `addr` (host:port)
    pub fn connect(addr: impl Into<String>, deadline: Duration) -> Result<Self> {
        let addr = addr.into();
        let conn = ClientConn::open(&addr)?;
        Ok(Self {
            addr,
            deadline,
            conn: Some(conn),
        })
    }

    /// Server address
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Look up a key
    pub fn get(&mut self, key: &str) -> Result<Response> {
        self.unary(&Request::get(key))
    }

    /// Store a key-value pair
    pub fn set(&mut self, key: &str, value: &str) -> Result<Response> {
        self.unary(&Request::set(key, value))
    }

    /// Remove a key (always answered with an unsupported-operation error)
    pub fn remove(&mut self, key: &str) -> Result<Response> {
        self.unary(&Request::remove(key))
    }

    /// Stream every record in log order
    ///
    /// The stream must be read to its end for the connection to be reused;
    /// dropping it early forces a reconnect.
    pub fn list(&mut self) -> Result<ListStream<'_>> {
        let deadline = Instant::now() + self.deadline;
        self.send(&Request::list())?;
        Ok(ListStream {
            client: self,
            deadline,
            done: false,
        })
    }

    fn unary(&mut self, request: &Request) -> Result<Response> {
        let deadline = Instant::now() + self.deadline;
        self.send(request)?;

        let budget = self.deadline;
        let reply = self.with_conn(|conn| conn.read_reply_until(deadline, budget))?;
        match reply {
            Reply::Unary(response) => Ok(response),
            Reply::Status(status) => Err(KvError::Status {
                code: status.code,
                message: status.message,
            }),
            other => {
                self.conn = None;
                Err(KvError::Protocol(format!(
                    "unexpected {:?} reply to a unary request",
                    other.kind()
                )))
            }
        }
    }

    fn send(&mut self, request: &Request) -> Result<()> {
        if self.conn.is_none() {
            tracing::debug!("Reconnecting to {}", self.addr);
            self.conn = Some(ClientConn::open(&self.addr)?);
        }
        self.with_conn(|conn| write_request(&mut conn.writer, request))
    }

    /// Run `f` on the open connection, dropping it if `f` fails
    fn with_conn<T>(&mut self, f: impl FnOnce(&mut ClientConn) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| KvError::Protocol("not connected".to_string()))?;
        let result = f(conn);
        if result.is_err() {
            self.conn = None;
        }
        result
    }
}

/// Server-streamed List reply
pub struct ListStream<'a> {
    client: &'a mut Client,
    deadline: Instant,
    done: bool,
}

impl Iterator for ListStream<'_> {
    type Item = Result<KeyValuePair>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let deadline = self.deadline;
        let budget = self.client.deadline;
        let reply = self
            .client
            .with_conn(|conn| conn.read_reply_until(deadline, budget));

        match reply {
            Ok(Reply::Item(pair)) => Some(Ok(pair)),
            Ok(Reply::End) => {
                self.done = true;
                None
            }
            Ok(Reply::Status(status)) => {
                self.done = true;
                Some(Err(KvError::Status {
                    code: status.code,
                    message: status.message,
                }))
            }
            Ok(Reply::Unary(_)) => {
                self.done = true;
                self.client.conn = None;
                Some(Err(KvError::Protocol(
                    "unexpected UNARY reply in a List stream".to_string(),
                )))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl Drop for ListStream<'_> {
    fn drop(&mut self) {
        if !self.done {
            // Unread frames would desync the next exchange
            self.client.conn = None;
        }
    }
}
