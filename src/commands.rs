//! Available commands and autocomplete logic

use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
  /// Open the listing of a configured resource
  Resource,
  Refresh,
  Login,
  Quit,
}

#[derive(Debug, Clone)]
pub struct Command {
  pub name: String,
  pub aliases: Vec<String>,
  pub description: String,
  pub kind: CommandKind,
}

impl Command {
  fn builtin(name: &str, aliases: &[&str], description: &str, kind: CommandKind) -> Self {
    Self {
      name: name.to_string(),
      aliases: aliases.iter().map(|a| a.to_string()).collect(),
      description: description.to_string(),
      kind,
    }
  }
}

/// Commands for one configuration: one per resource plus the builtins
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
  commands: Vec<Command>,
}

impl CommandRegistry {
  pub fn from_config(config: &Config) -> Self {
    let mut commands: Vec<Command> = config
      .resources
      .iter()
      .map(|(name, resource)| Command {
        name: name.clone(),
        aliases: Vec::new(),
        description: resource
          .description
          .clone()
          .unwrap_or_else(|| format!("Browse {}", resource.endpoint)),
        kind: CommandKind::Resource,
      })
      .collect();

    commands.push(Command::builtin(
      "refresh",
      &["r", "reload"],
      "Reload the current page",
      CommandKind::Refresh,
    ));
    commands.push(Command::builtin(
      "login",
      &["token"],
      "Enter a new API token",
      CommandKind::Login,
    ));
    commands.push(Command::builtin(
      "quit",
      &["q", "exit"],
      "Exit crmdesk",
      CommandKind::Quit,
    ));

    Self { commands }
  }

  pub fn all(&self) -> &[Command] {
    &self.commands
  }

  /// Find a command by exact name or alias
  pub fn find(&self, name: &str) -> Option<&Command> {
    let name = name.trim().to_lowercase();
    self
      .commands
      .iter()
      .find(|cmd| cmd.name == name || cmd.aliases.iter().any(|a| *a == name))
  }

  /// Get autocomplete suggestions for a given input
  pub fn get_suggestions(&self, input: &str) -> Vec<&Command> {
    let input_lower = input.trim().to_lowercase();

    if input_lower.is_empty() {
      return self.commands.iter().collect();
    }

    let mut matches: Vec<(&Command, u32)> = Vec::new();

    for cmd in &self.commands {
      // Exact match on name
      if cmd.name == input_lower {
        matches.push((cmd, 0)); // Highest priority
        continue;
      }

      // Exact match on alias
      if cmd.aliases.contains(&input_lower) {
        matches.push((cmd, 1));
        continue;
      }

      // Prefix match on name
      if cmd.name.starts_with(&input_lower) {
        matches.push((cmd, 2));
        continue;
      }

      // Prefix match on alias
      if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
        matches.push((cmd, 3));
        continue;
      }

      // Fuzzy match (contains)
      if cmd.name.contains(&input_lower) {
        matches.push((cmd, 4));
        continue;
      }

      // Fuzzy match on alias
      if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
        matches.push((cmd, 5));
      }
    }

    // Stable sort keeps configuration order within a priority
    matches.sort_by_key(|(_, priority)| *priority);

    matches.into_iter().map(|(cmd, _)| cmd).collect()
  }
}
