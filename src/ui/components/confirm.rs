use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

/// Yes/no prompt shown over the current view
#[derive(Debug, Clone)]
pub struct ConfirmPrompt<T> {
  message: String,
  payload: T,
}

impl<T: Clone> ConfirmPrompt<T> {
  pub fn new(message: impl Into<String>, payload: T) -> Self {
    Self {
      message: message.into(),
      payload,
    }
  }

  /// `y` confirms with the payload, `n`/Esc cancels, everything else is
  /// swallowed while the prompt is open
  pub fn handle_key(&self, key: KeyEvent) -> KeyResult<Option<T>> {
    match key.code {
      KeyCode::Char('y') | KeyCode::Char('Y') => KeyResult::Event(Some(self.payload.clone())),
      KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc | KeyCode::Char('q') => {
        KeyResult::Event(None)
      }
      _ => KeyResult::Handled,
    }
  }

  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let width = 50.min(area.width);
    let height = 5.min(area.height);
    let popup = Rect::new(
      area.x + (area.width - width) / 2,
      area.y + (area.height - height) / 2,
      width,
      height,
    );

    frame.render_widget(Clear, popup);
    let text = vec![
      Line::from(self.message.as_str()),
      Line::from(vec![
        Span::styled("<y>", Style::default().fg(Color::Cyan)),
        Span::styled(" confirm   ", Style::default().fg(Color::DarkGray)),
        Span::styled("<n>", Style::default().fg(Color::Cyan)),
        Span::styled(" cancel", Style::default().fg(Color::DarkGray)),
      ]),
    ];
    let paragraph = Paragraph::new(text).wrap(Wrap { trim: true }).block(
      Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Confirm "),
    );
    frame.render_widget(paragraph, popup);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_confirm_and_cancel() {
    let prompt = ConfirmPrompt::new("Delete brand 7?", "7".to_string());
    assert_eq!(
      prompt.handle_key(key(KeyCode::Char('y'))),
      KeyResult::Event(Some("7".to_string()))
    );
    assert_eq!(prompt.handle_key(key(KeyCode::Esc)), KeyResult::Event(None));
    assert_eq!(prompt.handle_key(key(KeyCode::Char('j'))), KeyResult::Handled);
  }
}
