use crate::app::AppContext;
use crate::config::ResourceConfig;
use crate::datasource::{DataState, PaginatedDataSource, Params};
use crate::debounce::Debounced;
use crate::notify::Notification;
use crate::ui::components::{ConfirmPrompt, KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{cell_text, infer_columns, record_id, truncate};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::RecordDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table, TableState};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

const PAGE_SIZES: [u32; 4] = [10, 25, 50, 100];
const MAX_CELL_WIDTH: usize = 40;

/// Paginated table over one configured resource
pub struct ListingView {
  ctx: AppContext,
  name: String,
  resource: ResourceConfig,
  source: PaginatedDataSource,
  effect: JoinHandle<()>,
  data: DataState,
  table_state: TableState,
  search: SearchInput,
  pending_search: Debounced<String>,
  confirm: Option<ConfirmPrompt<String>>,
}

impl ListingView {
  pub fn new(ctx: AppContext, name: String, resource: ResourceConfig) -> Self {
    let source = PaginatedDataSource::new(
      Some(resource.endpoint.clone()),
      Arc::new(ctx.client.clone()),
      ctx.cache.clone(),
      ctx.notifier.clone(),
    )
    .with_limit(ctx.config.page_size_for(&resource))
    .with_query(resource.query.clone());

    // Start fetching immediately, and again on every parameter change
    let effect = source.spawn_effect();
    let pending_search = Debounced::new(ctx.config.search.debounce());

    Self {
      ctx,
      name,
      resource,
      data: source.state(),
      source,
      effect,
      table_state: TableState::default(),
      search: SearchInput::new(),
      pending_search,
      confirm: None,
    }
  }

  fn columns(&self) -> Vec<String> {
    if self.resource.columns.is_empty() {
      infer_columns(&self.data.items)
    } else {
      self.resource.columns.clone()
    }
  }

  fn selected_record(&self) -> Option<&serde_json::Value> {
    self
      .table_state
      .selected()
      .and_then(|idx| self.data.items.get(idx))
  }

  fn spawn_refresh(&self) {
    let source = self.source.clone();
    tokio::spawn(async move {
      source.refresh().await;
    });
  }

  fn ask_delete(&mut self) {
    let Some(record) = self.selected_record() else {
      return;
    };
    match record_id(record, &self.resource.id_field) {
      Some(id) => {
        let message = format!("Delete {} {}?", self.name, id);
        self.confirm = Some(ConfirmPrompt::new(message, id));
      }
      None => self.ctx.notifier.notify(Notification::warning(format!(
        "Record has no '{}' field",
        self.resource.id_field
      ))),
    }
  }

  fn spawn_delete(&self, id: String) {
    let client = self.ctx.client.clone();
    let notifier = self.ctx.notifier.clone();
    let source = self.source.clone();
    let endpoint = self.resource.endpoint.clone();

    tokio::spawn(async move {
      match client.delete(&endpoint, &id).await {
        Ok(_) => {
          info!(endpoint = %endpoint, id = %id, "Deleted record");
          notifier.notify(Notification::success(format!("Deleted {}", id)));
          source.refresh().await;
        }
        // The session-expired handler already reports this one
        Err(e) if e.is_unauthenticated() => {}
        Err(e) => {
          for message in e.messages() {
            notifier.notify(Notification::error(message));
          }
        }
      }
    });
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.data.items.len();
    ensure_valid_selection(&mut self.table_state, len);

    let params = self.source.params();
    let title = listing_title(&self.name, &params, &self.data, self.source.page_count());

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if self.data.items.is_empty() {
      let content = if self.data.loading {
        "Loading..."
      } else if params.search.trim().is_empty() {
        "No records found. Press 'r' to reload."
      } else {
        "No records match the search."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let columns = self.columns();
    let header = Row::new(columns.iter().map(|c| c.to_uppercase()))
      .style(Style::default().fg(Color::Yellow).bold());

    let rows: Vec<Row> = self
      .data
      .items
      .iter()
      .map(|record| {
        Row::new(
          columns
            .iter()
            .map(|col| truncate(&cell_text(record.get(col)), MAX_CELL_WIDTH)),
        )
      })
      .collect();

    let widths = vec![Constraint::Fill(1); columns.len().max(1)];
    let table = Table::new(rows, widths)
      .header(header)
      .block(block)
      .row_highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut self.table_state);
  }
}

impl Drop for ListingView {
  fn drop(&mut self) {
    self.effect.abort();
  }
}

impl View for ListingView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if let Some(confirm) = &self.confirm {
      if let KeyResult::Event(answer) = confirm.handle_key(key) {
        self.confirm = None;
        if let Some(id) = answer {
          self.spawn_delete(id);
        }
      }
      return ViewAction::None;
    }

    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(term)) => {
        self.pending_search.set(term);
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted(term)) => {
        self.pending_search.cancel();
        self.source.search(term);
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Cancelled) => {
        self.pending_search.cancel();
        self.source.search(String::new());
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      KeyCode::Char('n') | KeyCode::Right => self.source.next_page(),
      KeyCode::Char('p') | KeyCode::Left => self.source.prev_page(),
      KeyCode::Char('+') => {
        let limit = self.source.params().limit;
        self.source.set_limit(next_page_size(limit));
      }
      KeyCode::Char('-') => {
        let limit = self.source.params().limit;
        self.source.set_limit(prev_page_size(limit));
      }
      KeyCode::Char('r') => self.refresh(),
      KeyCode::Char('d') => self.ask_delete(),
      KeyCode::Enter => {
        if let Some(record) = self.selected_record() {
          let label = record_id(record, &self.resource.id_field)
            .map(|id| format!("{} {}", self.name, id))
            .unwrap_or_else(|| self.name.clone());
          return ViewAction::Push(Box::new(RecordDetailView::new(label, record.clone())));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_table(frame, area);
    self.search.render_overlay(frame, area);
    if let Some(confirm) = &self.confirm {
      confirm.render(frame, area);
    }
  }

  fn breadcrumb_label(&self) -> String {
    title_case(&self.name)
  }

  fn resource(&self) -> Option<&str> {
    Some(&self.name)
  }

  fn tick(&mut self) {
    if let Some(term) = self.pending_search.poll() {
      self.source.search(term);
    }
    self.data = self.source.state();
  }

  fn refresh(&mut self) {
    self.spawn_refresh();
  }

  fn captures_input(&self) -> bool {
    self.search.is_active() || self.confirm.is_some()
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("/", "search").with_priority(20),
      Shortcut::new("n/p", "page").with_priority(30),
      Shortcut::new("+/-", "size").with_priority(40),
      Shortcut::new("d", "delete").with_priority(50),
      Shortcut::new("r", "refresh").with_priority(60),
      Shortcut::new("q", "back").with_priority(90),
    ]
  }
}

/// Next larger page size step, or the current one at the top
fn next_page_size(current: u32) -> u32 {
  PAGE_SIZES
    .iter()
    .copied()
    .find(|size| *size > current)
    .unwrap_or(current)
}

/// Next smaller page size step, or the current one at the bottom
fn prev_page_size(current: u32) -> u32 {
  PAGE_SIZES
    .iter()
    .rev()
    .copied()
    .find(|size| *size < current)
    .unwrap_or(current)
}

fn title_case(name: &str) -> String {
  let mut chars = name.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

/// e.g. " Brands [acme] (page 2/7, 63 rows) "
fn listing_title(name: &str, params: &Params, data: &DataState, page_count: u32) -> String {
  let mut title = format!(" {}", title_case(name));
  if !params.search.trim().is_empty() {
    title.push_str(&format!(" [{}]", params.search.trim()));
  }
  if data.loading {
    title.push_str(" (loading...) ");
  } else {
    title.push_str(&format!(
      " (page {}/{}, {} rows) ",
      params.page, page_count, data.total_rows
    ));
  }
  title
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_page_size_steps() {
    assert_eq!(next_page_size(10), 25);
    assert_eq!(next_page_size(25), 50);
    assert_eq!(next_page_size(100), 100);
    assert_eq!(next_page_size(15), 25);
    assert_eq!(prev_page_size(50), 25);
    assert_eq!(prev_page_size(10), 10);
    assert_eq!(prev_page_size(15), 10);
  }

  #[test]
  fn test_title_case() {
    assert_eq!(title_case("brands"), "Brands");
    assert_eq!(title_case(""), "");
  }

  #[test]
  fn test_listing_title() {
    let params = Params {
      page: 2,
      ..Params::default()
    };
    let data = DataState {
      total_rows: 63,
      loading: false,
      ..DataState::default()
    };
    assert_eq!(
      listing_title("brands", &params, &data, 7),
      " Brands (page 2/7, 63 rows) "
    );

    let searching = Params {
      search: " acme ".to_string(),
      ..Params::default()
    };
    let loading = DataState::default();
    assert_eq!(
      listing_title("brands", &searching, &loading, 1),
      " Brands [acme] (loading...) "
    );
  }
}
