//! Debounced values for input that should settle before triggering work.

use std::time::Duration;
use tokio::time::Instant;

/// Holds the latest value until it has been stable for `delay`.
///
/// Poll-driven: the owner calls [`Debounced::poll`] from its tick handler.
#[derive(Debug, Clone)]
pub struct Debounced<T> {
  delay: Duration,
  pending: Option<(T, Instant)>,
}

impl<T> Debounced<T> {
  pub fn new(delay: Duration) -> Self {
    Self {
      delay,
      pending: None,
    }
  }

  /// Replace the pending value and restart the timer
  pub fn set(&mut self, value: T) {
    self.pending = Some((value, Instant::now()));
  }

  pub fn is_pending(&self) -> bool {
    self.pending.is_some()
  }

  /// Take the value if it has settled
  pub fn poll(&mut self) -> Option<T> {
    match &self.pending {
      Some((_, since)) if since.elapsed() >= self.delay => self.pending.take().map(|(v, _)| v),
      _ => None,
    }
  }

  /// Take the pending value immediately
  pub fn flush(&mut self) -> Option<T> {
    self.pending.take().map(|(v, _)| v)
  }

  pub fn cancel(&mut self) {
    self.pending = None;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test(start_paused = true)]
  async fn test_yields_after_quiet_period() {
    let mut search = Debounced::new(Duration::from_millis(500));
    search.set("a");
    assert_eq!(search.poll(), None);

    tokio::time::advance(Duration::from_millis(499)).await;
    assert_eq!(search.poll(), None);

    tokio::time::advance(Duration::from_millis(1)).await;
    assert_eq!(search.poll(), Some("a"));
    assert!(!search.is_pending());
    assert_eq!(search.poll(), None);
  }

  #[tokio::test(start_paused = true)]
  async fn test_keystrokes_coalesce() {
    let mut search = Debounced::new(Duration::from_millis(500));
    search.set("a".to_string());
    tokio::time::advance(Duration::from_millis(300)).await;
    search.set("ab".to_string());
    tokio::time::advance(Duration::from_millis(300)).await;
    search.set("abc".to_string());
    tokio::time::advance(Duration::from_millis(300)).await;
    assert_eq!(search.poll(), None);

    tokio::time::advance(Duration::from_millis(200)).await;
    assert_eq!(search.poll().as_deref(), Some("abc"));
  }

  #[tokio::test(start_paused = true)]
  async fn test_flush_and_cancel() {
    let mut search = Debounced::new(Duration::from_millis(500));
    search.set(1);
    assert_eq!(search.flush(), Some(1));

    search.set(2);
    search.cancel();
    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(search.poll(), None);
  }
}
