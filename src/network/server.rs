//! TCP Server
//!
//! Accepts connections and runs each one on its own worker thread.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{KvError, Result};
use crate::protocol::{write_reply, Reply, StatusCode};
use crate::service::StoreService;

use super::Connection;

/// How long the accept loop sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Cloneable trigger for a graceful shutdown
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown (idempotent)
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// TCP server for kvlog
///
/// ## Shutdown sequence
/// 1. Stop accepting and drop the listener
/// 2. Mark the service ShuttingDown
/// 3. Wait for connection workers to finish their in-flight request,
///    bounded by `drain_timeout_ms`
/// 4. Close the record log
pub struct Server {
    config: Config,
    service: Arc<StoreService>,

    /// Taken by `run`; dropping it halts the listener
    listener: Mutex<Option<TcpListener>>,
    local_addr: SocketAddr,

    shutdown: ShutdownHandle,
    active: Arc<AtomicUsize>,
    next_conn_id: AtomicU64,
}

impl Server {
    /// Bind the listen address. Binding errors are fatal for startup.
    pub fn bind(config: Config, service: Arc<StoreService>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            KvError::Config(format!("cannot bind {}: {}", config.listen_addr, e))
        })?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            config,
            service,
            listener: Mutex::new(Some(listener)),
            local_addr,
            shutdown: ShutdownHandle::new(),
            active: Arc::new(AtomicUsize::new(0)),
            next_conn_id: AtomicU64::new(1),
        })
    }

    /// Address the server is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle that triggers a graceful shutdown from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    /// Number of connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Serve until shutdown is triggered (blocking)
    pub fn run(&self) -> Result<()> {
        let listener = self
            .listener
            .lock()
            .take()
            .ok_or_else(|| KvError::Config("server has already been run".to_string()))?;
        listener.set_nonblocking(true)?;

        tracing::info!("Ready to serve clients on {}", self.local_addr);

        // Every worker holds a sender; the channel disconnects once all
        // of them have finished
        let (drain_tx, drain_rx) = channel::bounded::<()>(0);

        while !self.shutdown.is_triggered() {
            match listener.accept() {
                Ok((stream, peer)) => self.spawn_connection(stream, peer, drain_tx.clone()),
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::warn!("Failed to accept connection: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        drop(listener);
        tracing::info!("Stopped accepting connections");
        self.service.begin_shutdown();

        drop(drain_tx);
        self.drain(drain_rx);

        self.service.close()?;
        tracing::info!("Server stopped");
        Ok(())
    }

    fn spawn_connection(&self, stream: TcpStream, peer: SocketAddr, drain_guard: Sender<()>) {
        if let Err(e) = stream.set_nonblocking(false) {
            tracing::warn!("Dropping connection from {}: {}", peer, e);
            return;
        }

        if self.active.load(Ordering::Acquire) >= self.config.max_connections {
            tracing::warn!(
                "Rejecting connection from {}: {} connections active",
                peer,
                self.config.max_connections
            );
            let mut stream = stream;
            let _ = write_reply(
                &mut stream,
                &Reply::status(StatusCode::Unavailable, "too many connections"),
            );
            return;
        }

        let slot = ActiveSlot::acquire(Arc::clone(&self.active));
        let service = Arc::clone(&self.service);
        let shutdown = self.shutdown.clone();
        let config = self.config.clone();
        let id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);

        let spawned = thread::Builder::new()
            .name(format!("kvlog-conn-{}", id))
            .spawn(move || {
                // Dropped in reverse order: the slot is released before
                // the drain barrier sees this worker finish
                let _drain_guard = drain_guard;
                let _slot = slot;

                let result = Connection::new(stream, service, shutdown, &config)
                    .and_then(|mut conn| conn.handle());
                if let Err(e) = result {
                    tracing::warn!("Connection {} from {} closed with error: {}", id, peer, e);
                }
            });

        if let Err(e) = spawned {
            tracing::error!("Failed to spawn worker for {}: {}", peer, e);
        }
    }

    /// Wait for every connection worker, bounded by the drain timeout
    fn drain(&self, drain_rx: Receiver<()>) {
        let active = self.active_connections();
        if active > 0 {
            tracing::info!("Waiting for {} in-flight connections", active);
        }

        match drain_rx.recv_timeout(self.config.drain_timeout()) {
            Err(RecvTimeoutError::Disconnected) | Ok(()) => {
                tracing::debug!("All connections drained");
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    "Drain timed out with {} connections still active",
                    self.active_connections()
                );
            }
        }
    }
}

/// Counts a connection as active until dropped
struct ActiveSlot {
    active: Arc<AtomicUsize>,
}

impl ActiveSlot {
    fn acquire(active: Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::AcqRel);
        Self { active }
    }
}

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}
