use crate::notify::{Notification, NotificationLevel};
use chrono::{DateTime, Duration, Utc};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use std::collections::VecDeque;

const MAX_VISIBLE: usize = 4;
const TOAST_WIDTH: u16 = 48;

/// Stack of transient notifications drawn in the bottom-right corner
#[derive(Debug)]
pub struct ToastStack {
  toasts: VecDeque<Notification>,
  ttl: Duration,
}

impl Default for ToastStack {
  fn default() -> Self {
    Self::new(Duration::seconds(4))
  }
}

impl ToastStack {
  pub fn new(ttl: Duration) -> Self {
    Self {
      toasts: VecDeque::new(),
      ttl,
    }
  }

  pub fn push(&mut self, notification: Notification) {
    self.toasts.push_back(notification);
    while self.toasts.len() > MAX_VISIBLE {
      self.toasts.pop_front();
    }
  }

  /// Drop toasts older than the TTL. Errors stay twice as long.
  pub fn expire(&mut self, now: DateTime<Utc>) {
    let ttl = self.ttl;
    self.toasts.retain(|toast| {
      let ttl = match toast.level {
        NotificationLevel::Error => ttl * 2,
        _ => ttl,
      };
      !toast.is_expired(now, ttl)
    });
  }

  pub fn len(&self) -> usize {
    self.toasts.len()
  }

  pub fn is_empty(&self) -> bool {
    self.toasts.is_empty()
  }

  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let width = TOAST_WIDTH.min(area.width);
    let mut bottom = area.y + area.height;

    for toast in self.toasts.iter().rev() {
      let text_width = width.saturating_sub(2).max(1) as usize;
      let lines = toast.message.chars().count().div_ceil(text_width).max(1) as u16;
      let height = lines + 2;
      if bottom < area.y + height {
        break;
      }
      bottom -= height;

      let toast_area = Rect::new(area.x + area.width - width, bottom, width, height);
      let color = level_color(toast.level);

      frame.render_widget(Clear, toast_area);
      let paragraph = Paragraph::new(toast.message.as_str())
        .wrap(Wrap { trim: true })
        .block(
          Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
            .title(format!(" {} ", level_label(toast.level))),
        );
      frame.render_widget(paragraph, toast_area);
    }
  }
}

fn level_color(level: NotificationLevel) -> Color {
  match level {
    NotificationLevel::Info => Color::Blue,
    NotificationLevel::Success => Color::Green,
    NotificationLevel::Warning => Color::Yellow,
    NotificationLevel::Error => Color::Red,
  }
}

fn level_label(level: NotificationLevel) -> &'static str {
  match level {
    NotificationLevel::Info => "info",
    NotificationLevel::Success => "ok",
    NotificationLevel::Warning => "warning",
    NotificationLevel::Error => "error",
  }
}
