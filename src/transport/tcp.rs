//! TCP transport.
//!
//! Each channel is its own TCP connection carrying newline-delimited JSON
//! messages of the form `{"type": KIND, "data": {...}}`.

use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::protocol::Message;

use super::{Transport, TransportError};

/// One framed TCP connection.
#[derive(Debug)]
struct Channel {
    name: &'static str,

    /// Only the owning dispatcher reads
    reader: Mutex<BufReader<TcpStream>>,

    /// Main thread writes
    writer: Mutex<TcpStream>,

    /// Clone kept outside the locks so `close` can interrupt a blocked read
    control: TcpStream,
}

impl Channel {
    fn open(name: &'static str, addr: SocketAddr, timeout: Duration) -> std::io::Result<Self> {
        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        stream.set_nodelay(true)?;
        debug!(channel = name, %addr, "channel connected");
        Ok(Self {
            name,
            reader: Mutex::new(BufReader::new(stream.try_clone()?)),
            writer: Mutex::new(stream.try_clone()?),
            control: stream,
        })
    }

    fn recv(&self) -> Result<Option<Message>, TransportError> {
        let mut reader = lock(&self.reader);
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            let frame = line.trim();
            if frame.is_empty() {
                continue;
            }
            return Ok(Some(serde_json::from_str(frame)?));
        }
    }

    fn send(&self, message: &Message) -> Result<(), TransportError> {
        let mut frame = serde_json::to_vec(message)?;
        frame.push(b'\n');
        let mut writer = lock(&self.writer);
        writer.write_all(&frame)?;
        writer.flush()?;
        Ok(())
    }

    fn shutdown(&self) {
        if let Err(e) = self.control.shutdown(Shutdown::Both) {
            debug!(channel = self.name, error = %e, "socket shutdown failed");
        }
    }
}

/// [`Transport`] over two TCP connections (game port and chat port).
#[derive(Debug)]
pub struct TcpTransport {
    config: ClientConfig,
    primary: OnceLock<Channel>,
    chat: OnceLock<Channel>,
    closed: AtomicBool,
}

impl TcpTransport {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            primary: OnceLock::new(),
            chat: OnceLock::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn channel<'a>(&self, slot: &'a OnceLock<Channel>) -> Result<&'a Channel, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        slot.get().ok_or(TransportError::NotConnected)
    }

    fn send_on(&self, slot: &OnceLock<Channel>, message: &Message) {
        let result = self.channel(slot).and_then(|channel| channel.send(message));
        if let Err(e) = result {
            debug!(kind = %message.kind(), error = %e, "send dropped");
        }
    }
}

impl Transport for TcpTransport {
    fn connect(&self) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        if self.primary.get().is_some() {
            return Ok(());
        }

        let timeout = self.config.connect_timeout();
        let primary = Channel::open("game", self.config.game_addr()?, timeout)?;
        let chat = match Channel::open("chat", self.config.chat_addr()?, timeout) {
            Ok(chat) => chat,
            Err(e) => {
                primary.shutdown();
                return Err(e.into());
            }
        };

        // A concurrent connect may have won; its channels stay, ours are dropped.
        let _ = self.primary.set(primary);
        let _ = self.chat.set(chat);
        info!(
            host = %self.config.host,
            game_port = self.config.game_port,
            chat_port = self.config.chat_port,
            "connected to server"
        );
        Ok(())
    }

    fn receive(&self) -> Result<Option<Message>, TransportError> {
        self.channel(&self.primary)?.recv()
    }

    fn receive_chat(&self) -> Result<Option<Message>, TransportError> {
        self.channel(&self.chat)?.recv()
    }

    fn send_message(&self, message: &Message) {
        self.send_on(&self.primary, message);
    }

    fn send_chat(&self, message: &Message) {
        self.send_on(&self.chat, message);
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        for channel in [self.primary.get(), self.chat.get()].into_iter().flatten() {
            channel.shutdown();
        }
        debug!("transport closed");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MessageKind;
    use pretty_assertions::assert_eq;
    use std::io::Read;
    use std::net::TcpListener;
    use std::thread;

    fn listeners() -> (TcpListener, TcpListener, ClientConfig) {
        let game = TcpListener::bind("127.0.0.1:0").unwrap();
        let chat = TcpListener::bind("127.0.0.1:0").unwrap();
        let config = ClientConfig {
            game_port: game.local_addr().unwrap().port(),
            chat_port: chat.local_addr().unwrap().port(),
            ..ClientConfig::default()
        };
        (game, chat, config)
    }

    #[test]
    fn test_not_connected() {
        let transport = TcpTransport::new(ClientConfig::default());
        assert!(matches!(
            transport.receive(),
            Err(TransportError::NotConnected)
        ));
        // Sends are silently dropped
        transport.send_message(&Message::make_move("e2e4"));
    }

    #[test]
    fn test_receive_frames() {
        let (game, chat, config) = listeners();
        let server = thread::spawn(move || {
            let (mut game_conn, _) = game.accept().unwrap();
            let (chat_conn, _) = chat.accept().unwrap();
            game_conn
                .write_all(b"{\"type\":\"WAITING\",\"data\":{\"message\":\"hold on\"}}\n\n")
                .unwrap();
            drop(game_conn);
            chat_conn
        });

        let transport = TcpTransport::new(config);
        transport.connect().unwrap();
        let _chat_conn = server.join().unwrap();

        let msg = transport.receive().unwrap().unwrap();
        assert_eq!(msg.kind(), &MessageKind::Waiting);
        assert_eq!(msg.str_field("message").unwrap(), "hold on");

        // Server closed the game socket
        assert!(transport.receive().unwrap().is_none());
    }

    #[test]
    fn test_send_frames() {
        let (game, chat, config) = listeners();
        let server = thread::spawn(move || {
            let (mut game_conn, _) = game.accept().unwrap();
            let (_chat_conn, _) = chat.accept().unwrap();
            let mut received = String::new();
            game_conn.read_to_string(&mut received).unwrap();
            received
        });

        let transport = TcpTransport::new(config);
        transport.connect().unwrap();
        transport.send_message(&Message::make_move("e2e4"));
        transport.close();

        let received = server.join().unwrap();
        let msg: Message = serde_json::from_str(received.trim()).unwrap();
        assert_eq!(msg, Message::make_move("e2e4"));
    }

    #[test]
    fn test_close_unblocks_receive_and_is_idempotent() {
        let (game, chat, config) = listeners();
        let server =
            thread::spawn(move || (game.accept().unwrap().0, chat.accept().unwrap().0));

        let transport = std::sync::Arc::new(TcpTransport::new(config));
        transport.connect().unwrap();
        let _conns = server.join().unwrap();

        let reader = {
            let transport = std::sync::Arc::clone(&transport);
            thread::spawn(move || transport.receive_chat())
        };
        thread::sleep(Duration::from_millis(50));
        transport.close();
        transport.close();

        // Either EOF from the shut-down socket or an error; never a message
        let result = reader.join().unwrap();
        assert!(!matches!(result, Ok(Some(_))));
        assert!(transport.is_closed());
        assert!(matches!(transport.receive(), Err(TransportError::Closed)));
    }

    #[test]
    fn test_connect_refused() {
        let (game, chat, config) = listeners();
        drop(game);
        drop(chat);
        let transport = TcpTransport::new(config);
        assert!(transport.connect().is_err());
    }
}
