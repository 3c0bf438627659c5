//! roster-bot binary entrypoint wiring the Telegram transport, the weekly
//! scheduler and the HTTP status surface around the shared roster state.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::{net::TcpListener, sync::watch};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roster_bot::{
    config::AppConfig,
    routes,
    scheduler::Scheduler,
    services::chat_service,
    state::{AppState, SharedState},
    transport::telegram::TelegramTransport,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env().context("loading configuration")?;
    let port = config.http_port;

    let transport =
        TelegramTransport::new(&config.bot_token).context("building telegram client")?;
    match transport.get_me().await {
        Ok(username) => info!(
            bot = username.as_deref().unwrap_or("unknown"),
            "telegram bot authenticated"
        ),
        Err(err) => warn!(error = %err, "telegram getMe failed; continuing"),
    }

    let state = AppState::load(config, Arc::new(transport.clone()))
        .await
        .context("restoring roster state")?;
    let scheduler = Scheduler::load(state.clone())
        .await
        .context("restoring trigger ledger")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler_task = tokio::spawn(scheduler.run(shutdown_rx.clone()));
    let (poller_task, updates) = transport.start_polling(shutdown_rx.clone());
    let dispatch_task = tokio::spawn(chat_service::dispatch(
        state.clone(),
        updates,
        shutdown_rx.clone(),
    ));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await.context("binding server")?;
    info!(%addr, "starting status server");
    let mut server_shutdown = shutdown_rx;
    let server_task = tokio::spawn(async move {
        axum::serve(listener, build_router(state).into_make_service())
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.wait_for(|stop| *stop).await;
            })
            .await
    });

    shutdown_signal().await;
    info!("shutdown requested; draining in-flight work");
    let _ = shutdown_tx.send(true);

    let (scheduler, poller, dispatch, server) =
        tokio::join!(scheduler_task, poller_task, dispatch_task, server_task);
    for (task, result) in [("scheduler", scheduler), ("poller", poller), ("dispatch", dispatch)] {
        if let Err(err) = result {
            error!(task, error = %err, "background task ended abnormally");
        }
    }
    server
        .context("status server task panicked")?
        .context("serving axum")?;

    info!("shutdown complete");
    Ok(())
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "installing SIGTERM handler failed; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
