use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

use drivelink_admin::admin_router;
use drivelink_core::{CliArgs, bootstrap};
use drivelink_router::{envelope, public_router};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    let _log_guard = init_tracing(args.log_dir.as_deref());
    if let Err(err) = run(args).await {
        eprintln!("drivelink failed: {err:#}");
        std::process::exit(1);
    }
}

async fn run(args: CliArgs) -> anyhow::Result<()> {
    let booted = bootstrap(args).await?;
    let state = booted.state;
    info!(
        host = %state.global.host,
        port = state.global.port,
        proxy = %state.global.proxy.as_deref().unwrap_or(""),
        default_expiry_hours = state.global.default_expiry_hours,
        max_quota_per_link = state.global.max_quota_per_link,
        "config loaded"
    );

    let bind = format!("{}:{}", state.global.host, state.global.port);
    let app = axum::Router::new()
        .merge(public_router(state.clone()))
        .merge(admin_router(state))
        .fallback(envelope::not_found)
        .layer(CatchPanicLayer::custom(envelope::panic_response))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("bind {bind}"))?;
    info!(addr = %bind, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve")?;
    info!("shut down");
    Ok(())
}

/// Console logging always; daily-rotated files too when `log_dir` is set.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("drivelink=info,sqlx=warn"));
    let console = tracing_subscriber::fmt::layer();

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "drivelink.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(file)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .init();
            None
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
}
