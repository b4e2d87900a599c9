// ai
//! 🚀 bkt-cli — the front door, the bouncer, the maitre d' of bkt.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 Loads config, sets up logging, hands off to `bkt::run_until`, prints the tally.
//! First Ctrl-C: stop reading and flush what is buffered. Second Ctrl-C: stop retrying uploads too. 🦆

use std::path::Path;

use anyhow::{Context, Result};
use bkt::sink_service::SinkStats;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::NOTHING};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_FILE: &str = "bkt.toml";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let path_arg = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

    // 🔒 Missing file means env vars only. An unreadable path is an error.
    let config_file = Path::new(&path_arg);
    let config_file = match config_file.try_exists().context(format!(
        "💀 Couldn't check whether the configuration file exists. If it's a relative path, \
         try an absolute one. Was checking here: '{}'",
        config_file.display()
    ))? {
        true => Some(config_file),
        false => None,
    };

    let app_config = bkt::app_config::load_config(config_file)
        .context("💀 In bkt-cli, main, we couldn't load the configuration. Take a look at the file and the BKT_* env vars")?;

    let stop = CancellationToken::new();
    let abort = CancellationToken::new();
    tokio::spawn(watch_ctrl_c(stop.clone(), abort.clone()));

    match bkt::run_until(app_config, stop, abort).await {
        Ok(stats) => {
            println!("{}", summary_table(&stats));
            if stats.buffers_lost > 0 {
                error!("💀 {} buffers ({} events) could not be uploaded", stats.buffers_lost, stats.events_lost);
                std::process::exit(2);
            }
            Ok(())
        }
        Err(err) => {
            error!("💀 error: {}", err);
            // -- 🧅 peel the onion of sadness, one layer at a time
            let mut the_vibes_are_giving_connection_issues = false;
            for cause in err.chain().skip(1) {
                error!("⚠️  cause: {}", cause);
                let cause_str = cause.to_string();
                if cause_str.contains("dispatch failure")
                    || cause_str.contains("connection refused")
                    || cause_str.contains("Connection refused")
                    || cause_str.contains("dns error")
                    || cause_str.contains("timed out")
                {
                    the_vibes_are_giving_connection_issues = true;
                }
            }
            if the_vibes_are_giving_connection_issues {
                error!(
                    "🔧 hint: looks like the object store isn't reachable. Check `store_config` \
                    (region, endpoint_url) and that MinIO/LocalStack is running if you point at one. ☕"
                );
            }
            std::process::exit(1);
        }
    }
}

/// 🛑 First Ctrl-C asks nicely. Second one stops waiting for uploads.
async fn watch_ctrl_c(stop: CancellationToken, abort: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("⚠️ could not listen for Ctrl-C; the run can only end on its own");
        return;
    }
    info!("🛑 Ctrl-C: finishing up, flushing what is buffered. Press again to abandon retries.");
    stop.cancel();
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("🗑️ Ctrl-C again: abandoning in-flight upload retries");
        abort.cancel();
    }
}

fn summary_table(stats: &SinkStats) -> Table {
    // 🍽️ two columns, numbers right-aligned, no borders
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    let rows = [
        ("events accepted", stats.events_accepted),
        ("events dropped", stats.events_dropped),
        ("encode failures", stats.encode_failures),
        ("write failures", stats.write_failures),
        ("buffers flushed", stats.buffers_flushed),
        ("events flushed", stats.events_flushed),
        ("bytes flushed", stats.bytes_flushed),
        ("buffers lost", stats.buffers_lost),
        ("events lost", stats.events_lost),
    ];
    for (metric, value) in rows {
        table.add_row(vec![
            Cell::new(metric),
            Cell::new(value.to_string()).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}
