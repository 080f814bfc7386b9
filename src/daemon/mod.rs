mod routes;

use std::fs;
use std::path::Path;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::UnixListener;
use tower_http::trace::TraceLayer;

fn cleanup(pid: &Path, sock: &Path) {
    for path in [pid, sock] {
        if path.exists() {
            let _ = fs::remove_file(path);
            tracing::debug!(path = %path.display(), "removed runtime file");
        }
    }
}

fn router() -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route(
            "/members",
            get(routes::list_members).post(routes::register_member),
        )
        .route(
            "/members/{domain}",
            get(routes::get_member).delete(routes::delete_member),
        )
        .route("/domains/allocate", post(routes::allocate_domain))
        .route("/domains/{name}", get(routes::check_domain))
        .route("/referral-codes/{identifier}", get(routes::referral_code))
        .route("/reset-database", post(routes::reset_database))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    tracing::info_span!("request", method = %req.method(), path = %req.uri().path())
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::info!(status = %res.status().as_u16(), latency_ms = latency.as_millis(), "response");
                    },
                ),
        )
}

pub async fn start(force: bool) -> anyhow::Result<()> {
    tracing::info!(
        config = %crate::paths::config_dir()?.display(),
        data = %crate::paths::data_dir()?.display(),
        runtime = %crate::paths::runtime_dir()?.display(),
        "starting daemon"
    );

    let pid = crate::paths::pid_path()?;
    let sock = crate::paths::socket_path()?;

    if pid.exists() || sock.exists() {
        if force {
            tracing::debug!("--force: removing existing runtime files");
            cleanup(&pid, &sock);
        } else {
            anyhow::bail!(
                "daemon already running (found runtime files in {}); use --force to override",
                crate::paths::runtime_dir()?.display()
            );
        }
    }

    let config = crate::config::load()?;
    if config.referral_secret().is_err() {
        tracing::warn!("no referral secret configured; member registration will fail");
    }

    crate::db::initialize()?;
    tracing::debug!("database initialized");

    fs::write(&pid, std::process::id().to_string())?;
    tracing::debug!(path = %pid.display(), pid = std::process::id(), "wrote PID file");

    let listener = UnixListener::bind(&sock)?;
    tracing::info!(socket = %sock.display(), "listening");

    axum::serve(listener, router())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Spawn a task that forces exit on a second signal.
    let (p, s) = (pid.clone(), sock.clone());
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::warn!("received second signal, forcing shutdown");
        cleanup(&p, &s);
        std::process::exit(1);
    });

    cleanup(&pid, &sock);
    tracing::info!("daemon shut down");

    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let (mut sigint, mut sigterm) = match (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) {
        (Ok(i), Ok(t)) => (i, t),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!(error = %e, "failed to install signal handlers");
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = sigint.recv() => { tracing::debug!("received SIGINT"); }
        _ = sigterm.recv() => { tracing::debug!("received SIGTERM"); }
    }
}
