use crate::ui::view::{Shortcut, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use serde_json::Value;

/// Read-only, scrollable JSON view of a single record
pub struct RecordDetailView {
  label: String,
  lines: Vec<String>,
  scroll: u16,
}

impl RecordDetailView {
  pub fn new(label: String, record: Value) -> Self {
    let pretty = serde_json::to_string_pretty(&record).unwrap_or_else(|_| record.to_string());
    Self {
      label,
      lines: pretty.lines().map(str::to_string).collect(),
      scroll: 0,
    }
  }

  fn max_scroll(&self) -> u16 {
    self.lines.len().saturating_sub(1).min(u16::MAX as usize) as u16
  }

  fn scroll_by(&mut self, delta: i32) {
    let next = (i32::from(self.scroll) + delta).clamp(0, i32::from(self.max_scroll()));
    self.scroll = next as u16;
  }
}

impl View for RecordDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.scroll_by(1),
      KeyCode::Char('k') | KeyCode::Up => self.scroll_by(-1),
      KeyCode::PageDown | KeyCode::Char(' ') => self.scroll_by(20),
      KeyCode::PageUp => self.scroll_by(-20),
      KeyCode::Char('g') | KeyCode::Home => self.scroll = 0,
      KeyCode::Char('G') | KeyCode::End => self.scroll = self.max_scroll(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(format!(" {} ", self.label))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let text: Vec<Line> = self
      .lines
      .iter()
      .map(|line| highlight_json_line(line))
      .collect();

    let paragraph = Paragraph::new(text).block(block).scroll((self.scroll, 0));
    frame.render_widget(paragraph, area);
  }

  fn breadcrumb_label(&self) -> String {
    self.label.clone()
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![Shortcut::new("j/k", "scroll"), Shortcut::new("q", "back")]
  }
}

/// Color object keys apart from their values
fn highlight_json_line(line: &str) -> Line<'static> {
  let trimmed = line.trim_start();
  let indent = &line[..line.len() - trimmed.len()];

  if trimmed.starts_with('"') {
    if let Some(split) = trimmed.find("\": ") {
      let (key, rest) = trimmed.split_at(split + 1);
      return Line::from(vec![
        Span::raw(indent.to_string()),
        Span::styled(key.to_string(), Style::default().fg(Color::Cyan)),
        Span::raw(rest.to_string()),
      ]);
    }
  }
  Line::from(line.to_string())
}
