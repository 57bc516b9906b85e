use crate::app::AppContext;
use crate::notify::Notification;
use crate::ui::components::{InputResult, TextInput};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::startup_view;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use tracing::{info, warn};

/// Prompt for an API token; replaces the whole stack once saved
pub struct LoginView {
  ctx: AppContext,
  token: TextInput,
  reason: Option<String>,
}

impl LoginView {
  pub fn new(ctx: AppContext) -> Self {
    Self {
      ctx,
      token: TextInput::new(),
      reason: None,
    }
  }

  /// Login prompt explaining why it was shown
  pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
    self.reason = Some(reason.into());
    self
  }

  fn submit(&mut self, token: String) -> ViewAction {
    let token = token.trim().to_string();
    if token.is_empty() {
      self
        .ctx
        .notifier
        .notify(Notification::warning("Token cannot be empty"));
      return ViewAction::None;
    }

    if let Err(e) = self.ctx.session.save(token, None) {
      warn!(error = %e, "Failed to save session");
      self
        .ctx
        .notifier
        .notify(Notification::error(format!("Could not save session: {}", e)));
      return ViewAction::None;
    }

    info!("Logged in");
    // Pages cached under the old token may not be visible to the new one
    if let Err(e) = self.ctx.cache.clear() {
      warn!(error = %e, "Failed to clear page cache");
    }
    self.ctx.notifier.notify(Notification::success("Logged in"));

    match startup_view(&self.ctx) {
      Some(view) => ViewAction::Reset(view),
      None => ViewAction::Pop,
    }
  }
}

impl View for LoginView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.token.handle_key(key) {
      InputResult::Submitted(token) => self.submit(token),
      InputResult::Cancelled => ViewAction::Pop,
      InputResult::Consumed | InputResult::NotHandled => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let width = 60.min(area.width);
    let height = 7.min(area.height);
    let popup = Rect::new(
      area.x + (area.width - width) / 2,
      area.y + (area.height - height) / 2,
      width,
      height,
    );

    let masked = "*".repeat(self.token.len());
    let mut text = vec![];
    if let Some(reason) = &self.reason {
      text.push(Line::styled(reason.as_str(), Style::default().fg(Color::Red)));
    }
    text.push(Line::styled(
      format!("API token for {}", self.ctx.client.base_url()),
      Style::default().fg(Color::DarkGray),
    ));
    text.push(Line::from(vec![
      Span::styled("> ", Style::default().fg(Color::Yellow)),
      Span::raw(masked),
      Span::styled("_", Style::default().fg(Color::Yellow)),
    ]));

    frame.render_widget(Clear, popup);
    let paragraph = Paragraph::new(text).wrap(Wrap { trim: true }).block(
      Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Login "),
    );
    frame.render_widget(paragraph, popup);
  }

  fn breadcrumb_label(&self) -> String {
    "Login".to_string()
  }

  fn captures_input(&self) -> bool {
    true
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("Enter", "save"),
      Shortcut::new("Esc", "cancel"),
    ]
  }
}
