pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::TableState;
use renderfns::{draw_footer, draw_header};

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  let title = app.title();
  let breadcrumb = app.view_breadcrumb();
  let session = app.session_label();

  if let Some(current) = app.current_view() {
    let shortcuts = view::sorted_shortcuts(current);
    draw_header(frame, chunks[0], &title, current.resource(), &shortcuts);
  }

  if let Some(current) = app.current_view_mut() {
    current.render(frame, chunks[1]);
  }

  app.command_input().render_overlay(frame, chunks[1]);
  app.toasts().render(frame, chunks[1]);

  draw_footer(frame, chunks[2], &breadcrumb, session.as_deref());
}

/// Keep the table selection inside the current rows
pub fn ensure_valid_selection(state: &mut TableState, len: usize) {
  match state.selected() {
    _ if len == 0 => state.select(None),
    None => state.select(Some(0)),
    Some(idx) if idx >= len => state.select(Some(len - 1)),
    Some(_) => {}
  }
}
