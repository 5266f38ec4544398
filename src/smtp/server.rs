//! SMTP server implementation

use crate::mailbox::MailStore;
use crate::smtp::commands::{Outcome, SmtpCommandHandler};
use crate::smtp::error::SmtpError;
use crate::smtp::framer::LineFramer;
use crate::smtp::response::SmtpResponse;
use crate::smtp::session::SmtpSession;
use crate::smtp::sessions::SessionRegistry;

use std::io::Write;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;

use tracing::{debug, error, info, info_span, warn};

/// SMTP server that delivers accepted mail into mbox files
#[derive(Debug, Clone)]
pub struct SmtpServer {
    /// Server hostname, also the only accepted recipient domain
    hostname: Arc<str>,
    store: Arc<MailStore>,
    sessions: Arc<SessionRegistry>,
    next_session: Arc<AtomicU64>,
    /// Address of the running listener, used to wake the accept loop
    local_addr: Arc<OnceLock<SocketAddr>>,
}

impl SmtpServer {
    /// Create a server delivering into `mail_dir`
    pub fn new(hostname: &str, mail_dir: impl Into<PathBuf>) -> Self {
        Self {
            hostname: Arc::from(hostname),
            store: Arc::new(MailStore::new(mail_dir)),
            sessions: Arc::new(SessionRegistry::new()),
            next_session: Arc::new(AtomicU64::new(1)),
            local_addr: Arc::new(OnceLock::new()),
        }
    }

    /// Start the server on the specified address (blocking)
    pub fn start(&self, addr: impl ToSocketAddrs) -> Result<(), SmtpError> {
        let listener = TcpListener::bind(addr)?;
        self.start_with_listener(listener)
    }

    /// Start the server with an existing listener (blocking).
    ///
    /// Every connection is served on its own thread. Returns after
    /// [`SmtpServer::shutdown`].
    pub fn start_with_listener(&self, listener: TcpListener) -> Result<(), SmtpError> {
        let addr = listener.local_addr()?;
        let _ = self.local_addr.set(addr);
        info!(
            %addr,
            mail_dir = %self.store.mail_dir().display(),
            "SMTP server listening"
        );

        for stream in listener.incoming() {
            if self.sessions.is_closed() {
                break;
            }
            match stream {
                Ok(stream) => self.spawn_session(stream),
                Err(e) => error!(error = %e, "error accepting connection"),
            }
        }

        info!("SMTP server stopped");
        Ok(())
    }

    /// Stop accepting connections and disconnect every open session.
    ///
    /// Each client is sent a `421` notice before its socket is shut down.
    /// Returns the number of sessions that were disconnected.
    pub fn shutdown(&self) -> usize {
        let closed = self
            .sessions
            .close_all(&SmtpResponse::shutting_down(&self.hostname));
        info!(sessions = closed, "shutting down");

        // Unblock the accept loop so it can observe the closed registry
        if let Some(addr) = self.local_addr.get() {
            if let Err(e) = TcpStream::connect(wake_addr(*addr)) {
                debug!(error = %e, "could not wake accept loop");
            }
        }
        closed
    }

    fn spawn_session(&self, stream: TcpStream) {
        let id = self.next_session.fetch_add(1, Ordering::Relaxed);

        let registered = match stream.try_clone() {
            Ok(handle) => self.sessions.register(id, handle),
            Err(e) => {
                error!(error = %e, "cannot track connection");
                return;
            }
        };
        if !registered {
            debug!("refusing connection during shutdown");
            return;
        }

        let server = self.clone();
        let spawned = thread::Builder::new()
            .name(format!("smtp-session-{id}"))
            .spawn(move || {
                let span = info_span!("session", id);
                let _entered = span.enter();

                match stream.peer_addr() {
                    Ok(peer) => info!(%peer, "new connection"),
                    Err(_) => info!("new connection"),
                }
                match server.handle_client(stream) {
                    Ok(()) => info!("connection closed"),
                    Err(e) => error!(error = %e, "connection aborted"),
                }
                server.sessions.remove(id);
            });

        if let Err(e) = spawned {
            error!(error = %e, "failed to spawn session thread");
            self.sessions.remove(id);
        }
    }

    /// Serve one connection until QUIT, disconnect or a transport error
    pub fn handle_client(&self, mut stream: TcpStream) -> Result<(), SmtpError> {
        let handler = SmtpCommandHandler::new(&self.hostname, &self.store);
        let mut session = SmtpSession::new();
        let mut framer = LineFramer::new(stream.try_clone()?);

        send_response(&mut stream, &SmtpResponse::greeting(&self.hostname))?;

        while let Some(line) = framer.next_line()? {
            debug!("C: {line}");

            let outcome = match handler.process_command(&line, &mut session) {
                Ok(outcome) => outcome,
                Err(e) if e.is_protocol_error() => {
                    send_response(&mut stream, &SmtpResponse::from(&e))?;
                    continue;
                }
                Err(e) => return Err(e),
            };

            send_response(&mut stream, outcome.response())?;
            match outcome {
                Outcome::Reply(_) => {}
                Outcome::Close(_) => return Ok(()),
                Outcome::ReadBody(_) => {
                    let Some(body) = framer.read_body()? else {
                        warn!("client disconnected during DATA");
                        return Ok(());
                    };
                    debug!(bytes = body.len(), "C: <message body>");
                    for response in handler.finish_data(body, &mut session) {
                        send_response(&mut stream, &response)?;
                    }
                }
            }
        }

        debug!("client disconnected");
        Ok(())
    }
}

/// Loopback address reaching a listener bound to `addr`
fn wake_addr(addr: SocketAddr) -> SocketAddr {
    match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => {
            SocketAddr::new(Ipv4Addr::LOCALHOST.into(), addr.port())
        }
        IpAddr::V6(ip) if ip.is_unspecified() => {
            SocketAddr::new(Ipv6Addr::LOCALHOST.into(), addr.port())
        }
        _ => addr,
    }
}

/// Send a response to the client
fn send_response(stream: &mut TcpStream, response: &SmtpResponse) -> Result<(), SmtpError> {
    stream.write_all(response.format().as_bytes())?;
    stream.flush()?;
    debug!("S: {} {}", response.code, response.message);
    Ok(())
}
