use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::commands::{Command, CommandRegistry};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};
use std::sync::Arc;

const MAX_SUGGESTIONS: usize = 8;

/// Events emitted by command input that parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEvent {
  /// Command submitted: the resolved command name, or the raw input when
  /// nothing matched
  Submitted(String),
  /// Command cancelled
  Cancelled,
}

/// Command input component with autocomplete
#[derive(Debug, Clone)]
pub struct CommandInput {
  registry: Arc<CommandRegistry>,
  input: TextInput,
  active: bool,
  selected_suggestion: usize,
}

impl CommandInput {
  pub fn new(registry: Arc<CommandRegistry>) -> Self {
    Self {
      registry,
      input: TextInput::new(),
      active: false,
      selected_suggestion: 0,
    }
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn registry(&self) -> &CommandRegistry {
    &self.registry
  }

  /// Activate command mode
  pub fn activate(&mut self) {
    self.active = true;
    self.input.clear();
    self.selected_suggestion = 0;
  }

  /// Autocomplete suggestions for current input
  pub fn suggestions(&self) -> Vec<&Command> {
    self.registry.get_suggestions(&self.input.value())
  }

  /// Handle a key event.
  /// Call this regardless of active state; it handles activation too.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<CommandEvent> {
    if !self.active {
      if key.code == KeyCode::Char(':') {
        self.activate();
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc => {
        self.active = false;
        self.input.clear();
        self.selected_suggestion = 0;
        return KeyResult::Event(CommandEvent::Cancelled);
      }
      KeyCode::Enter => {
        self.active = false;
        let cmd = self.resolve_command();
        self.input.clear();
        self.selected_suggestion = 0;
        return KeyResult::Event(CommandEvent::Submitted(cmd));
      }
      KeyCode::Tab | KeyCode::Down => {
        let count = self.suggestions().len().min(MAX_SUGGESTIONS);
        if count > 0 {
          self.selected_suggestion = (self.selected_suggestion + 1) % count;
        }
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        let count = self.suggestions().len().min(MAX_SUGGESTIONS);
        if count > 0 {
          self.selected_suggestion = if self.selected_suggestion == 0 {
            count - 1
          } else {
            self.selected_suggestion - 1
          };
        }
        return KeyResult::Handled;
      }
      _ => {}
    }

    match self.input.handle_key(key) {
      InputResult::Consumed => {
        self.selected_suggestion = 0; // Reset on input change
        KeyResult::Handled
      }
      InputResult::Submitted(_) | InputResult::Cancelled | InputResult::NotHandled => {
        KeyResult::Handled
      }
    }
  }

  /// Resolve the final command (from suggestion or direct input)
  fn resolve_command(&self) -> String {
    match self.suggestions().get(self.selected_suggestion) {
      Some(cmd) => cmd.name.clone(),
      None => self.input.value().trim().to_lowercase(),
    }
  }

  /// Render the command overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let suggestions = self.suggestions();
    let shown = suggestions.len().min(MAX_SUGGESTIONS) as u16;

    let width = (area.width * 60 / 100).clamp(30, 60).min(area.width);
    let height = (3 + shown).min(area.height);
    let overlay_area = Rect::new(area.x + 1, area.y + 1, width, height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Command ");

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Input line
        Constraint::Min(0),    // Suggestions
      ])
      .split(inner);

    let input_line = Line::from(vec![
      Span::styled(":", Style::default().fg(Color::Yellow)),
      Span::raw(self.input.value()),
      Span::styled("_", Style::default().fg(Color::Yellow)),
    ]);
    frame.render_widget(Paragraph::new(input_line), chunks[0]);

    if suggestions.is_empty() || chunks[1].height == 0 {
      return;
    }

    let items: Vec<ListItem> = suggestions
      .iter()
      .take(MAX_SUGGESTIONS)
      .map(|cmd| {
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<14}", cmd.name),
            Style::default().fg(Color::Cyan),
          ),
          Span::styled(cmd.description.clone(), Style::default().fg(Color::DarkGray)),
        ]))
      })
      .collect();

    let list =
      List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = ListState::default();
    state.select(Some(self.selected_suggestion));

    frame.render_stateful_widget(list, chunks[1], &mut state);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Config;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn input() -> CommandInput {
    let config = Config::from_yaml(
      r#"
api:
  base_url: http://localhost
resources:
  brands:
    endpoint: /brands
  invoices:
    endpoint: /invoices
"#,
    )
    .unwrap();
    CommandInput::new(Arc::new(CommandRegistry::from_config(&config)))
  }

  fn type_str(cmd: &mut CommandInput, s: &str) {
    for c in s.chars() {
      cmd.handle_key(key(KeyCode::Char(c)));
    }
  }

  #[test]
  fn test_colon_activates() {
    let mut cmd = input();
    assert_eq!(cmd.handle_key(key(KeyCode::Char('x'))), KeyResult::NotHandled);
    assert_eq!(cmd.handle_key(key(KeyCode::Char(':'))), KeyResult::Handled);
    assert!(cmd.is_active());
  }

  #[test]
  fn test_submit_resolves_suggestion() {
    let mut cmd = input();
    cmd.handle_key(key(KeyCode::Char(':')));
    type_str(&mut cmd, "inv");
    assert_eq!(
      cmd.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(CommandEvent::Submitted("invoices".to_string()))
    );
    assert!(!cmd.is_active());
  }

  #[test]
  fn test_tab_cycles_suggestions() {
    let mut cmd = input();
    cmd.handle_key(key(KeyCode::Char(':')));
    // brands, invoices, refresh, login, quit
    cmd.handle_key(key(KeyCode::Tab));
    assert_eq!(
      cmd.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(CommandEvent::Submitted("invoices".to_string()))
    );
  }

  #[test]
  fn test_unknown_input_is_passed_through() {
    let mut cmd = input();
    cmd.handle_key(key(KeyCode::Char(':')));
    type_str(&mut cmd, "Zzz");
    assert_eq!(
      cmd.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(CommandEvent::Submitted("zzz".to_string()))
    );
  }

  #[test]
  fn test_escape_cancels() {
    let mut cmd = input();
    cmd.handle_key(key(KeyCode::Char(':')));
    assert_eq!(
      cmd.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(CommandEvent::Cancelled)
    );
    assert!(!cmd.is_active());
  }
}
