use crate::notify::Notification;
use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Periodic tick for UI refresh, debounce and state polling
  Tick,
  /// Toast raised by a background task
  Notify(Notification),
  /// The server rejected our token; go back to the login prompt
  SessionExpired,
}

/// Event handler that produces events from terminal input and a tick timer
pub struct EventHandler {
  tx: mpsc::UnboundedSender<Event>,
  rx: mpsc::UnboundedReceiver<Event>,
}

impl Default for EventHandler {
  fn default() -> Self {
    Self::new()
  }
}

impl EventHandler {
  /// Create a new event handler. Call [`EventHandler::start`] once the
  /// terminal is in raw mode.
  pub fn new() -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self { tx, rx }
  }

  /// Spawn the terminal reader with the given tick rate
  pub fn start(&self, tick_rate: Duration) {
    let tx = self.tx.clone();

    // crossterm polling blocks, keep it off the async workers
    tokio::task::spawn_blocking(move || loop {
      if event::poll(tick_rate).unwrap_or(false) {
        if let Ok(CrosstermEvent::Key(key)) = event::read() {
          if key.kind == KeyEventKind::Press && tx.send(Event::Key(key)).is_err() {
            break;
          }
        }
      } else if tx.send(Event::Tick).is_err() {
        break;
      }
    });
  }

  /// Sender for background tasks that want to raise events
  pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
    self.tx.clone()
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
