use crate::api::ApiClient;
use crate::cache::PageCache;
use crate::commands::{CommandKind, CommandRegistry};
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::notify::{ChannelNotifier, Notification, Notifier};
use crate::session::SessionStore;
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult, ToastStack};
use crate::ui::renderfns::extract_domain;
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{resource_view, startup_view, LoginView};
use chrono::Utc;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Shared services handed to every view
#[derive(Clone)]
pub struct AppContext {
  pub config: Arc<Config>,
  pub client: ApiClient,
  pub cache: PageCache,
  pub session: SessionStore,
  pub notifier: Arc<dyn Notifier>,
}

/// Main application state
pub struct App {
  ctx: AppContext,

  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// `:` prompt with autocomplete
  command: CommandInput,

  toasts: ToastStack,

  events: EventHandler,

  should_quit: bool,
}

impl App {
  pub fn new(config: Config, session: SessionStore, cache: PageCache) -> Result<Self> {
    if config.resources.is_empty() {
      return Err(eyre!("No resources configured. See config.example.yaml."));
    }

    let events = EventHandler::new();
    let expired_tx = events.sender();
    let client = ApiClient::new(&config.api, session.clone())?.on_session_expired(move || {
      let _ = expired_tx.send(Event::SessionExpired);
    });

    let registry = Arc::new(CommandRegistry::from_config(&config));
    let ctx = AppContext {
      config: Arc::new(config),
      client,
      cache,
      session,
      notifier: Arc::new(ChannelNotifier::new(events.sender())),
    };

    let root = startup_view(&ctx).ok_or_else(|| eyre!("No startup resource"))?;

    Ok(Self {
      ctx,
      view_stack: vec![root],
      command: CommandInput::new(registry),
      toasts: ToastStack::default(),
      events,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let result = self.event_loop().await;

    // Cleanup terminal, even if the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(&mut self) -> Result<()> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    self.events.start(Duration::from_millis(100));

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match self.events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }

    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => {
        for view in &mut self.view_stack {
          view.tick();
        }
        self.toasts.expire(Utc::now());
      }
      Event::Notify(notification) => self.toasts.push(notification),
      Event::SessionExpired => self.handle_session_expired(),
    }
  }

  /// Several requests may fail at once; only the first one while logged in
  /// swaps to the login prompt
  fn handle_session_expired(&mut self) {
    if !self.ctx.session.is_logged_in() {
      return;
    }

    warn!("Session expired");
    if let Err(e) = self.ctx.session.clear() {
      warn!(error = %e, "Failed to clear session");
    }

    self.toasts.push(Notification::warning(
      "Session expired, please log in again",
    ));
    self.view_stack = vec![Box::new(
      LoginView::new(self.ctx.clone()).with_reason("Your session has expired."),
    )];
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let view_owns_keys = self
      .view_stack
      .last()
      .map(|v| v.captures_input())
      .unwrap_or(false);

    if !view_owns_keys {
      match self.command.handle_key(key) {
        KeyResult::Event(CommandEvent::Submitted(name)) => {
          self.execute_command(&name);
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::None,
    };
    self.apply(action);
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
      ViewAction::Reset(view) => self.view_stack = vec![view],
    }
  }

  fn execute_command(&mut self, name: &str) {
    let Some(command) = self.command.registry().find(name).cloned() else {
      if !name.is_empty() {
        self
          .toasts
          .push(Notification::warning(format!("Unknown command: {}", name)));
      }
      return;
    };

    info!(command = %command.name, "Running command");
    match command.kind {
      CommandKind::Resource => match resource_view(&self.ctx, &command.name) {
        Ok(view) => self.apply(ViewAction::Reset(view)),
        Err(e) => self.toasts.push(Notification::error(e.to_string())),
      },
      CommandKind::Refresh => {
        if let Some(view) = self.view_stack.last_mut() {
          view.refresh();
        }
      }
      CommandKind::Login => self
        .view_stack
        .push(Box::new(LoginView::new(self.ctx.clone()))),
      CommandKind::Quit => self.should_quit = true,
    }
  }

  // Accessors for UI rendering
  pub fn current_view(&self) -> Option<&dyn View> {
    self.view_stack.last().map(|v| v.as_ref())
  }

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn command_input(&self) -> &CommandInput {
    &self.command
  }

  pub fn toasts(&self) -> &ToastStack {
    &self.toasts
  }

  /// Configured title, else the API host
  pub fn title(&self) -> String {
    match &self.ctx.config.title {
      Some(title) => title.clone(),
      None => extract_domain(self.ctx.client.base_url()).to_string(),
    }
  }

  pub fn session_label(&self) -> Option<String> {
    if !self.ctx.session.is_logged_in() {
      return None;
    }
    Some(
      self
        .ctx
        .session
        .user()
        .unwrap_or_else(|| "logged in".to_string()),
    )
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }
}
