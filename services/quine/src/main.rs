//! Serve the running executable as a container image

use std::io;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use quine::{ArtifactBuilder, BuildError, LISTEN_ADDR, RegistryBuilder, RegistryState};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Serve this executable as a container image over the registry API
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Log output format
    #[arg(long, env = "QUINE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("building image: {0}")]
    Build(#[from] BuildError),

    #[error("listening on {addr}: {source}")]
    Listen {
        addr: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("serving: {0}")]
    Serve(#[source] io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.log_format);

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!("{error}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("quine=info,tower_http=debug"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }
}

async fn run() -> Result<(), Error> {
    tracing::info!("starting quine");

    let artifacts = ArtifactBuilder::current_exe().build()?;
    tracing::info!(
        config = %artifacts.config_digest,
        manifest = %artifacts.manifest_digest,
        layer = %artifacts.layer_digest,
        diff_id = %artifacts.diff_id,
        "built image"
    );

    let app = RegistryBuilder::new(RegistryState::new(artifacts)).build();

    let listener = tokio::net::TcpListener::bind(LISTEN_ADDR)
        .await
        .map_err(|source| Error::Listen {
            addr: LISTEN_ADDR,
            source,
        })?;
    tracing::info!("registry listening on http://{}", LISTEN_ADDR);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(Error::Serve)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!("unable to listen for ctrl-c: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::warn!("unable to listen for SIGTERM: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutting down");
}
