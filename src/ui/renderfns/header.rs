use crate::ui::view::Shortcut;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar with title, context, and shortcuts
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  title: &str,
  resource: Option<&str>,
  shortcuts: &[Shortcut],
) {
  let mut spans = vec![
    Span::styled(" crmdesk ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", title), Style::default().fg(Color::White)),
  ];

  if let Some(resource) = resource {
    spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));
    spans.push(Span::styled(
      format!(" {} ", resource),
      Style::default().fg(Color::Yellow).bold(),
    ));
  }

  spans.push(Span::raw(" "));
  for shortcut in shortcuts {
    // Keys highlighted, descriptions dimmed
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

/// Host part of the API base URL, used when no title is configured
pub fn extract_domain(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}
