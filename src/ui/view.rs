use crossterm::event::KeyEvent;
use ratatui::prelude::*;

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcut {
  pub key: &'static str,
  pub label: &'static str,
  pub priority: u8, // Lower = shown first
}

impl Shortcut {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

/// Actions that a view can request in response to user input
pub enum ViewAction {
  /// No action needed
  None,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back)
  Pop,
  /// Replace the whole stack with a new root view
  Reset(Box<dyn View>),
}

/// Trait for view behavior
///
/// Views handle their own input modes (search, confirm, etc.) and return
/// actions for the App to execute: App → View → Components.
///
/// Views backed by a data source read its latest state in `tick()`.
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self) -> String;

  /// Resource shown in the header, if any
  fn resource(&self) -> Option<&str> {
    None
  }

  /// Called on each tick to poll async state and debounced input
  fn tick(&mut self) {}

  /// Reload whatever the view is showing
  fn refresh(&mut self) {}

  /// True while the view owns the keyboard (text prompts), so global
  /// shortcuts like `:` must not be intercepted
  fn captures_input(&self) -> bool {
    false
  }

  /// Keyboard shortcuts to display in the header
  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("q", "back").with_priority(90),
    ]
  }
}

/// Shortcuts sorted for display
pub fn sorted_shortcuts(view: &dyn View) -> Vec<Shortcut> {
  let mut shortcuts = view.shortcuts();
  shortcuts.sort_by_key(|s| s.priority);
  shortcuts
}
