//! Registry of live client connections

use crate::smtp::response::SmtpResponse;

use std::collections::HashMap;
use std::io::Write;
use std::net::{Shutdown, TcpStream};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

#[derive(Debug, Default)]
struct Sessions {
    closed: bool,
    streams: HashMap<u64, TcpStream>,
}

/// Live sessions keyed by session id.
///
/// Holds a handle to every connected socket so the server can notify and
/// disconnect all clients at shutdown. Once closed, no new session is admitted.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    inner: Mutex<Sessions>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a session's socket.
    ///
    /// Returns `false` once the registry has been closed; the caller should
    /// drop the connection instead of serving it.
    pub fn register(&self, id: u64, stream: TcpStream) -> bool {
        let mut sessions = self.lock();
        if sessions.closed {
            return false;
        }
        sessions.streams.insert(id, stream);
        true
    }

    pub fn remove(&self, id: u64) {
        self.lock().streams.remove(&id);
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Send `notice` to every live session and disconnect it.
    ///
    /// Closes the registry and returns how many sessions were disconnected.
    pub fn close_all(&self, notice: &SmtpResponse) -> usize {
        let streams = {
            let mut sessions = self.lock();
            sessions.closed = true;
            std::mem::take(&mut sessions.streams)
        };

        let count = streams.len();
        for (id, mut stream) in streams {
            if let Err(e) = stream.write_all(notice.format().as_bytes()) {
                debug!(session = id, error = %e, "could not send shutdown notice");
            }
            // The session thread sees end of input on its next read
            let _ = stream.shutdown(Shutdown::Both);
        }
        count
    }

    fn lock(&self) -> MutexGuard<'_, Sessions> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read};
    use std::net::TcpListener;

    /// A connected (client, server-side) socket pair
    fn socket_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    #[test]
    fn test_register_and_remove() {
        let registry = SessionRegistry::new();
        let (_client, server) = socket_pair();

        assert!(registry.register(7, server));
        registry.remove(7);
        assert!(!registry.is_closed());

        let notice = SmtpResponse::shutting_down("localhost");
        assert_eq!(registry.close_all(&notice), 0);
    }

    #[test]
    fn test_close_all_notifies_and_disconnects() {
        let registry = SessionRegistry::new();
        let mut clients = Vec::new();
        for id in 1..=3 {
            let (client, server) = socket_pair();
            assert!(registry.register(id, server));
            clients.push(client);
        }

        let notice = SmtpResponse::shutting_down("localhost");
        assert_eq!(registry.close_all(&notice), 3);

        for client in clients {
            let mut reader = BufReader::new(client);
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            assert_eq!(line, notice.format());

            let mut rest = Vec::new();
            assert_eq!(reader.read_to_end(&mut rest).unwrap(), 0);
        }
    }

    #[test]
    fn test_closed_registry_refuses_sessions() {
        let registry = SessionRegistry::new();
        registry.close_all(&SmtpResponse::shutting_down("localhost"));

        let (_client, server) = socket_pair();
        assert!(!registry.register(1, server));
        assert!(registry.is_closed());
    }
}
