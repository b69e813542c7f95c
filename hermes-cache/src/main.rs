//! Hermes cache entry point.
//!
//! Loads the cache against a live API once and prints a per-table summary.
//!
//! ```text
//! hermes-cache [--config <path>] [--refresh] [--table <name>]... [--media <id>]...
//! ```

use hermes_cache::config::CacheConfig;
use hermes_cache::context::CacheContext;
use hermes_cache::error::CacheError;
use hermes_cache::state::CacheState;
use hermes_cache::store::FetchOutcome;
use hermes_cache::telemetry;
use hermes_core::{MediaId, TableId};
use std::path::PathBuf;

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    config: Option<PathBuf>,
    refresh: bool,
    tables: Vec<TableId>,
    media: Vec<MediaId>,
}

#[tokio::main]
async fn main() -> Result<(), CacheError> {
    let args = parse_args(std::env::args().skip(1))?;
    let config = CacheConfig::load(args.config.as_deref())?;
    telemetry::init_tracing(&config.logging)?;

    let ctx = CacheContext::from_config(&config)?;
    ctx.initial_load().await;

    if args.refresh {
        ctx.refresh_all().await;
    }
    for table in &args.tables {
        ctx.fetch(*table).await;
    }
    for id in &args.media {
        if let FetchOutcome::Failed { message } = ctx.fetch_media_by_id(*id).await {
            eprintln!("media {}: {}", id, message);
        }
    }

    print!("{}", render_summary(&ctx.snapshot()));
    Ok(())
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliArgs, CacheError> {
    let mut parsed = CliArgs::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| CacheError::Usage("--config needs a path".to_string()))?;
                parsed.config = Some(PathBuf::from(path));
            }
            "--refresh" => parsed.refresh = true,
            "--table" => {
                let name = args
                    .next()
                    .ok_or_else(|| CacheError::Usage("--table needs a table name".to_string()))?;
                let table: TableId = name
                    .parse()
                    .map_err(|e| CacheError::Usage(format!("{}", e)))?;
                parsed.tables.push(table);
            }
            "--media" => {
                let raw = args
                    .next()
                    .ok_or_else(|| CacheError::Usage("--media needs an id".to_string()))?;
                let id: i64 = raw
                    .parse()
                    .map_err(|_| CacheError::Usage(format!("invalid media id '{}'", raw)))?;
                parsed.media.push(MediaId::new(id));
            }
            other => {
                return Err(CacheError::Usage(format!("unrecognized argument '{}'", other)));
            }
        }
    }
    Ok(parsed)
}

fn render_summary(state: &CacheState) -> String {
    let mut out = String::new();
    for table in TableId::ALL {
        let status = state.status(table);
        let loaded_at = status
            .loaded_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        out.push_str(&format!(
            "{:<20} rows={:<5} loading={:<5} loaded_at={}",
            table.name(),
            state.row_count(table),
            status.loading,
            loaded_at
        ));
        if let Some(error) = &status.error {
            out.push_str(&format!(" error=\"{}\"", error));
        }
        out.push('\n');
    }
    let verified = state
        .combined_reports
        .iter()
        .filter(|report| report.is_verified())
        .count();
    out.push_str(&format!(
        "{:<20} rows={:<5} verified={}\n",
        "combinedReports",
        state.combined_reports.len(),
        verified
    ));
    out
}
