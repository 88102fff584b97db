use std::{process, sync::Arc, time::Duration};

use resoconto::{
    application::{
        error::AppError,
        registry::{InMemoryTokenIndex, TokenIndex},
        reports::ReportService,
    },
    config,
    infra::{error::InfraError, http, storage::ArtifactStore, telemetry},
};
use tokio::task::JoinHandle;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let settings = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let store = Arc::new(
        ArtifactStore::new(settings.reports.directory.clone())
            .map_err(|err| AppError::from(InfraError::Io(err)))?,
    );
    let index: Arc<dyn TokenIndex> = Arc::new(InMemoryTokenIndex::new());
    let reports = Arc::new(ReportService::new(
        index,
        store,
        settings.reports.retention,
    ));

    let sweeper = spawn_retention_sweeper(reports.clone(), settings.reports.sweep_interval);

    let state = http::HttpState {
        reports,
        public_base_url: settings.server.public_base_url.clone(),
    };
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::Io(err)))?;

    info!(
        target = "resoconto",
        addr = %settings.server.addr,
        reports_dir = %settings.reports.directory.display(),
        "listening"
    );

    let result = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")));

    sweeper.abort();
    let _ = sweeper.await;

    result
}

/// Periodically remove artifacts whose retrieval link was never used.
fn spawn_retention_sweeper(reports: Arc<ReportService>, cadence: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cadence);
        interval.tick().await; // Skip the first immediate tick
        loop {
            interval.tick().await;
            reports.sweep_expired().await;
        }
    })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(target = "resoconto", error = %err, "failed to install shutdown handler");
    }
}
