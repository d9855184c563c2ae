//! Test doubles for the transport and renderer.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::protocol::{Board, Message, Timestamp};
use crate::render::Renderer;
use crate::transport::{Transport, TransportError};

type Scripted = Result<Option<Message>, TransportError>;

#[derive(Debug, Default)]
struct Script {
    primary: VecDeque<Scripted>,
    chat: VecDeque<Scripted>,
    closed: bool,
    released: bool,
    /// Receives currently parked on an empty queue
    waiting: usize,
}

/// Transport that replays queued receive results and records sends.
///
/// An empty queue blocks its receiver like an idle socket until more items are
/// pushed or the transport is closed (for a stubborn transport, released).
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    refuse_connect: bool,
    /// Ignore `close` when deciding whether to wake blocked receives
    stubborn: bool,
    script: Mutex<Script>,
    wake: Condvar,
    parked: Condvar,
    sent: Mutex<Vec<Message>>,
    sent_chat: Mutex<Vec<Message>>,
    connects: AtomicUsize,
    closes: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refusing() -> Self {
        Self {
            refuse_connect: true,
            ..Self::default()
        }
    }

    /// Blocked receives survive `close`; only `release` wakes them.
    pub fn stubborn() -> Self {
        Self {
            stubborn: true,
            ..Self::default()
        }
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn push(&self, item: Scripted) {
        self.script.lock().unwrap().primary.push_back(item);
        self.wake.notify_all();
    }

    pub fn push_chat(&self, item: Scripted) {
        self.script.lock().unwrap().chat.push_back(item);
        self.wake.notify_all();
    }

    pub fn release(&self) {
        self.script.lock().unwrap().released = true;
        self.wake.notify_all();
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_chat(&self) -> Vec<Message> {
        self.sent_chat.lock().unwrap().clone()
    }

    /// Block until `count` receives are parked on an empty queue.
    pub fn wait_for_blocked(&self, count: usize) {
        let script = self.script.lock().unwrap();
        let (_script, timeout) = self
            .parked
            .wait_timeout_while(script, Duration::from_secs(2), |s| s.waiting < count)
            .unwrap();
        assert!(!timeout.timed_out(), "receivers never blocked");
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn next(&self, chat: bool) -> Scripted {
        let mut script = self.script.lock().unwrap();
        loop {
            let queue = if chat {
                &mut script.chat
            } else {
                &mut script.primary
            };
            if let Some(item) = queue.pop_front() {
                return item;
            }
            if script.released || (script.closed && !self.stubborn) {
                return Ok(None);
            }
            script.waiting += 1;
            self.parked.notify_all();
            script = self.wake.wait(script).unwrap();
            script.waiting -= 1;
        }
    }
}

impl Transport for ScriptedTransport {
    fn connect(&self) -> Result<(), TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.refuse_connect {
            Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )))
        } else {
            Ok(())
        }
    }

    fn receive(&self) -> Result<Option<Message>, TransportError> {
        self.next(false)
    }

    fn receive_chat(&self) -> Result<Option<Message>, TransportError> {
        self.next(true)
    }

    fn send_message(&self, message: &Message) {
        self.sent.lock().unwrap().push(message.clone());
    }

    fn send_chat(&self, message: &Message) {
        self.sent_chat.lock().unwrap().push(message.clone());
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.script.lock().unwrap().closed = true;
        self.wake.notify_all();
    }
}

/// One renderer callback.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    Board(Board),
    GameOver(Option<String>),
    Chat(String, Timestamp),
    Shutdown,
}

/// Renderer that records every call in order.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    calls: Mutex<Vec<RenderCall>>,
}

impl RecordingRenderer {
    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&RenderCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(*c)).count()
    }

    fn record(&self, call: RenderCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Renderer for RecordingRenderer {
    fn update_board(&self, board: &Board) {
        self.record(RenderCall::Board(board.clone()));
    }

    fn show_game_over(&self, winner: Option<&str>) {
        self.record(RenderCall::GameOver(winner.map(str::to_string)));
    }

    fn display_chat(&self, text: &str, timestamp: Timestamp) {
        self.record(RenderCall::Chat(text.to_string(), timestamp));
    }

    fn shutdown(&self) {
        self.record(RenderCall::Shutdown);
    }
}

/// Attach a fresh recorder to `session`; keep the returned `Arc` alive for the test.
pub fn attach_recorder(session: &crate::state::Session) -> Arc<RecordingRenderer> {
    let recorder = Arc::new(RecordingRenderer::default());
    let renderer: Arc<dyn Renderer> = recorder.clone();
    session.attach_renderer(&renderer);
    recorder
}
