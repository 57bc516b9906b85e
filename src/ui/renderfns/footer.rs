use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the footer: view breadcrumb on the left, session status on the right
pub fn draw_footer(frame: &mut Frame, area: Rect, breadcrumb: &[String], session: Option<&str>) {
  let mut spans = vec![Span::raw(" ")];

  let last = breadcrumb.len().saturating_sub(1);
  for (i, part) in breadcrumb.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
    }
    let style = if i == last {
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::White)
    };
    spans.push(Span::styled(part.clone(), style));
  }

  let status = match session {
    Some(user) => Span::styled(format!("{} ", user), Style::default().fg(Color::Green)),
    None => Span::styled("not logged in ", Style::default().fg(Color::Red)),
  };

  let chunks = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Min(1), Constraint::Length(status.width() as u16)])
    .split(area);

  let style = Style::default().bg(Color::Black);
  frame.render_widget(Paragraph::new(Line::from(spans)).style(style), chunks[0]);
  frame.render_widget(Paragraph::new(Line::from(status)).style(style), chunks[1]);
}
