use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use syncq_core::impls::{JsonFileStore, ReqwestDispatcher};
use syncq_core::{
    EnqueueOptions, HttpMethod, RequestId, RequestMetadata, SyncConfig, SyncQueue,
};

/// Offline sync queue: enqueue HTTP mutations now, replay them later.
#[derive(Parser, Debug)]
#[command(name = "syncq", version, about, long_about = None)]
struct Cli {
    /// JSON config file (max_retries, base_delay_ms, max_delay_ms, storage_key, ...)
    #[arg(long, global = true, env = "SYNCQ_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the persisted queue
    #[arg(long, global = true, env = "SYNCQ_DATA_DIR", default_value = ".syncq")]
    data_dir: PathBuf,

    /// Base URL for relative request URLs
    #[arg(long, global = true, env = "SYNCQ_BASE_URL")]
    base_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    timeout_secs: u64,

    /// Log filter (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Queue a request for later delivery
    Enqueue(EnqueueArgs),

    /// Print queued requests
    List {
        /// Only requests that failed at least once
        #[arg(long)]
        failed: bool,

        #[arg(long)]
        entity_type: Option<String>,

        #[arg(long, requires = "entity_type")]
        entity_id: Option<String>,
    },

    /// Run one delivery pass
    Process,

    /// Remove a queued request by id
    Remove { id: RequestId },

    /// Drop every queued request
    Clear,

    /// Print pending/failed counts
    Status,
}

#[derive(Args, Debug)]
struct EnqueueArgs {
    method: HttpMethod,

    url: String,

    /// JSON body
    #[arg(long)]
    data: Option<String>,

    /// Extra header, `Name: value` (repeatable)
    #[arg(long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    #[arg(long)]
    max_retries: Option<u32>,

    #[arg(long)]
    entity_type: Option<String>,

    #[arg(long)]
    entity_id: Option<String>,

    #[arg(long)]
    description: Option<String>,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected `Name: value`, got {raw:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in {raw:?}"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

impl EnqueueArgs {
    fn options(&self) -> EnqueueOptions {
        let mut options = EnqueueOptions {
            headers: self.headers.iter().cloned().collect::<BTreeMap<_, _>>(),
            max_retries: self.max_retries,
            metadata: None,
        };
        if self.entity_type.is_some() || self.entity_id.is_some() || self.description.is_some() {
            options.metadata = Some(RequestMetadata {
                entity_type: self.entity_type.clone(),
                entity_id: self.entity_id.clone(),
                description: self.description.clone(),
            });
        }
        options
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct Enqueued {
    id: RequestId,
}

#[derive(Serialize)]
struct Removed {
    id: RequestId,
    removed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = match &cli.config {
        Some(path) => SyncConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SyncConfig::default(),
    };

    let store = JsonFileStore::new(&cli.data_dir, &config.storage_key);
    info!(path = %store.path().display(), "using queue store");

    let mut dispatcher = ReqwestDispatcher::builder().timeout(Duration::from_secs(cli.timeout_secs));
    if let Some(base_url) = &cli.base_url {
        dispatcher = dispatcher.base_url(base_url.clone());
    }
    let dispatcher = dispatcher.build().context("building http client")?;

    let queue = SyncQueue::builder(Arc::new(store), Arc::new(dispatcher))
        .config(config)
        .open()
        .await;

    match cli.command {
        Command::Enqueue(args) => {
            let data = match &args.data {
                Some(raw) => Some(
                    serde_json::from_str::<serde_json::Value>(raw).context("--data is not valid JSON")?,
                ),
                None => None,
            };
            let id = queue
                .add_to_queue(args.url.clone(), args.method, data, args.options())
                .await;
            print_json(&Enqueued { id })?;
        }
        Command::List {
            failed,
            entity_type,
            entity_id,
        } => {
            let requests = match (&entity_type, failed) {
                (Some(entity_type), _) => {
                    let mut requests = queue
                        .get_requests_by_metadata(entity_type, entity_id.as_deref())
                        .await;
                    if failed {
                        requests.retain(|r| r.has_failed());
                    }
                    requests
                }
                (None, true) => queue.get_failed_requests().await,
                (None, false) => queue.get_queue().await,
            };
            print_json(&requests)?;
        }
        Command::Process => {
            let report = queue.process_queue().await;
            print_json(&report)?;
            if report.failed() > 0 && report.delivered.is_empty() {
                bail!("{} request(s) failed to deliver", report.failed());
            }
        }
        Command::Remove { id } => {
            let removed = queue.remove_request(id).await;
            print_json(&Removed { id, removed })?;
        }
        Command::Clear => {
            queue.clear_queue().await;
            print_json(&queue.status().await)?;
        }
        Command::Status => {
            print_json(&queue.status().await)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_enqueue_with_headers_and_metadata() {
        let cli = Cli::try_parse_from([
            "syncq",
            "enqueue",
            "patch",
            "/api/maintenance/42",
            "--data",
            r#"{"status":"done"}"#,
            "--header",
            "If-Match: v3",
            "--entity-type",
            "maintenance",
            "--entity-id",
            "42",
        ])
        .unwrap();

        let Command::Enqueue(args) = cli.command else {
            panic!("expected enqueue");
        };
        assert_eq!(args.method, HttpMethod::Patch);
        let options = args.options();
        assert_eq!(options.headers.get("If-Match").map(String::as_str), Some("v3"));
        assert_eq!(
            options.metadata,
            Some(RequestMetadata::entity("maintenance", "42"))
        );
    }

    #[test]
    fn header_without_colon_is_rejected() {
        assert!(parse_header("Authorization").is_err());
        assert!(parse_header(": x").is_err());
        assert_eq!(
            parse_header("X-Device:ios").unwrap(),
            ("X-Device".to_string(), "ios".to_string())
        );
    }

    #[test]
    fn entity_id_requires_entity_type() {
        assert!(Cli::try_parse_from(["syncq", "list", "--entity-id", "42"]).is_err());
    }

    #[test]
    fn remove_parses_request_id() {
        let cli = Cli::try_parse_from(["syncq", "remove", "req-01ARZ3NDEKTSV4RRFFQ69G5FAV"]).unwrap();
        assert!(matches!(cli.command, Command::Remove { .. }));
    }
}
