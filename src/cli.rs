//! Non-interactive subcommands.

use crate::api::{ApiClient, ApiError};
use crate::cache::PageCache;
use crate::config::{Config, ResourceConfig};
use crate::datasource::{has_more, FetchOptions, PaginatedDataSource};
use crate::notify::LogNotifier;
use crate::session::SessionStore;
use clap::Subcommand;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde_json::{json, Value};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Subcommand, Debug)]
pub enum Action {
  /// Print one page of a resource as JSON
  Fetch {
    resource: String,
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[arg(long)]
    limit: Option<u32>,
    #[arg(long)]
    search: Option<String>,
    /// Extra filter, repeatable: --filter status=paid
    #[arg(long = "filter", value_parser = parse_filter)]
    filters: Vec<(String, String)>,
  },
  /// Write every record of a resource as JSON lines
  Export {
    resource: String,
    /// Output file (default: stdout)
    #[arg(short, long)]
    out: Option<PathBuf>,
    #[arg(long)]
    limit: Option<u32>,
  },
  /// Create a record from a JSON object
  Create {
    resource: String,
    #[arg(long)]
    data: String,
  },
  /// Update a record from a JSON object
  Update {
    resource: String,
    id: String,
    #[arg(long)]
    data: String,
  },
  /// Delete a record
  Delete { resource: String, id: String },
  /// Save an API token
  Login {
    #[arg(long)]
    token: String,
    #[arg(long)]
    user: Option<String>,
  },
  /// Forget the saved token
  Logout,
}

/// `key=value` into a pair
pub fn parse_filter(raw: &str) -> Result<(String, String), String> {
  match raw.split_once('=') {
    Some((key, value)) if !key.trim().is_empty() => {
      Ok((key.trim().to_string(), value.trim().to_string()))
    }
    _ => Err(format!("expected key=value, got '{}'", raw)),
  }
}

/// Client whose session-expired handler forgets the token and tells the
/// user how to log in again
fn cli_client(config: &Config, session: &SessionStore) -> Result<ApiClient> {
  let expired = session.clone();
  let client = ApiClient::new(&config.api, session.clone())?.on_session_expired(move || {
    if let Err(e) = expired.clear() {
      warn!(error = %e, "Failed to clear session");
    }
    eprintln!("Your session has expired. Run `crmdesk login --token <TOKEN>` to log in again.");
  });
  Ok(client)
}

fn data_source(
  client: ApiClient,
  cache: PageCache,
  resource: &ResourceConfig,
  limit: u32,
  filters: Vec<(String, String)>,
) -> PaginatedDataSource {
  let mut query = resource.query.clone();
  query.extend(filters);

  PaginatedDataSource::new(
    Some(resource.endpoint.clone()),
    Arc::new(client),
    cache,
    Arc::new(LogNotifier),
  )
  .with_limit(limit)
  .with_query(query)
}

/// Print each message of a failed request on its own line
fn report(error: ApiError) -> color_eyre::Report {
  for message in error.messages() {
    eprintln!("error: {}", message);
  }
  eyre!("Request failed")
}

fn parse_body(data: &str) -> Result<Value> {
  let body: Value =
    serde_json::from_str(data).map_err(|e| eyre!("--data is not valid JSON: {}", e))?;
  if !body.is_object() {
    return Err(eyre!("--data must be a JSON object"));
  }
  Ok(body)
}

/// Walk every page with silent, uncached fetches and write one record per
/// line. Returns the number of records written.
pub async fn export_pages<W: Write>(source: &PaginatedDataSource, out: &mut W) -> Result<u64> {
  let mut written = 0u64;
  let mut page = 1u32;

  loop {
    let options = FetchOptions {
      force: true,
      ..FetchOptions::silent().with_page(page)
    };
    let result = source
      .fetch(options)
      .await
      .ok_or_else(|| eyre!("Export stopped at page {}", page))?;

    for item in &result.items {
      serde_json::to_writer(&mut *out, item)?;
      out.write_all(b"\n")?;
      written += 1;
    }

    let limit = source.params().limit;
    if result.items.is_empty() || !has_more(page, limit, result.total_rows, result.items.len()) {
      break;
    }
    page += 1;
  }

  out.flush()?;
  Ok(written)
}

pub async fn run(
  action: Action,
  config: Config,
  session: SessionStore,
  cache: PageCache,
) -> Result<()> {
  match action {
    Action::Login { token, user } => {
      session.save(token.trim(), user)?;
      cache.clear()?;
      println!("Logged in. Session saved to {}", session.path().display());
      Ok(())
    }
    Action::Logout => {
      session.clear()?;
      cache.clear()?;
      println!("Logged out.");
      Ok(())
    }
    Action::Fetch {
      resource,
      page,
      limit,
      search,
      filters,
    } => {
      let resource = config.resource(&resource)?;
      let limit = limit.unwrap_or_else(|| config.page_size_for(resource));
      let client = cli_client(&config, &session)?;
      let source = data_source(client, cache, resource, limit, filters);

      let mut options = FetchOptions::default().with_page(page);
      if let Some(search) = search {
        options = options.with_search(search);
      }
      let result = source
        .fetch(options)
        .await
        .ok_or_else(|| eyre!("Fetch failed"))?;

      let output = json!({ "items": result.items, "total_rows": result.total_rows });
      println!("{}", serde_json::to_string_pretty(&output)?);
      Ok(())
    }
    Action::Export {
      resource,
      out,
      limit,
    } => {
      let resource = config.resource(&resource)?;
      let limit = limit.unwrap_or_else(|| config.page_size_for(resource));
      let client = cli_client(&config, &session)?;
      let source = data_source(client, cache, resource, limit, Vec::new());

      let written = match &out {
        Some(path) => {
          let file = std::fs::File::create(path)
            .map_err(|e| eyre!("Failed to create {}: {}", path.display(), e))?;
          export_pages(&source, &mut BufWriter::new(file)).await?
        }
        None => export_pages(&source, &mut std::io::stdout().lock()).await?,
      };

      info!(records = written, "Export finished");
      if let Some(path) = out {
        eprintln!("Exported {} records to {}", written, path.display());
      }
      Ok(())
    }
    Action::Create { resource, data } => {
      let resource = config.resource(&resource)?;
      let body = parse_body(&data)?;
      let client = cli_client(&config, &session)?;
      let created = client
        .create(&resource.endpoint, &body)
        .await
        .map_err(report)?;
      cache.clear()?;
      println!("{}", serde_json::to_string_pretty(&created)?);
      Ok(())
    }
    Action::Update { resource, id, data } => {
      let resource = config.resource(&resource)?;
      let body = parse_body(&data)?;
      let client = cli_client(&config, &session)?;
      let updated = client
        .update(&resource.endpoint, &id, &body)
        .await
        .map_err(report)?;
      cache.clear()?;
      println!("{}", serde_json::to_string_pretty(&updated)?);
      Ok(())
    }
    Action::Delete { resource, id } => {
      let resource = config.resource(&resource)?;
      let client = cli_client(&config, &session)?;
      client
        .delete(&resource.endpoint, &id)
        .await
        .map_err(report)?;
      cache.clear()?;
      println!("Deleted {} {}", resource.endpoint, id);
      Ok(())
    }
  }
}
