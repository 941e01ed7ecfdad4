// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ensd: the ensemble orchestrator daemon.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_env("ENS_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = ens_daemon::env::state_dir().ok().map(|dir| {
        let appender = tracing_appender::rolling::daily(dir.join("logs"), "ensd.log");
        tracing_appender::non_blocking(appender)
    });

    match file_layer {
        Some((writer, guard)) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() {
    let _guard = init_tracing();
    if let Err(e) = ens_daemon::lifecycle::run().await {
        tracing::error!("daemon failed: {e}");
        eprintln!("ensd: {e}");
        std::process::exit(1);
    }
}
