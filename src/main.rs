// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{future::Future, net::SocketAddr, process::ExitCode, sync::Arc, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use sdoh_survey_gate::{
    api::router,
    cache::{CacheJanitor, MemoryCache, TokenCache},
    config::{AppConfig, ConfigError},
    gateways::{GatewayError, HttpIdentityResolver, HttpSubmissionGateway},
    handshake::{Handshake, HandshakeSettings},
    logging::{init_logging, LogFormat},
    session::SessionStore,
    state::AppState,
};

/// In-flight requests get this long to finish after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("failed to install rustls crypto provider")]
    CryptoProvider,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("failed to load TLS material: {0}")]
    Tls(std::io::Error),

    #[error("server failed: {0}")]
    Serve(std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging(LogFormat::from_env());

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Survey gate stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    // Must happen before any TLS operation.
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| StartupError::CryptoProvider)?;

    let config = AppConfig::from_env()?;

    let cache: Arc<dyn TokenCache> = Arc::new(MemoryCache::new(config.cache_capacity));
    let attempts: Arc<dyn TokenCache> = Arc::new(MemoryCache::new(config.attempt_cache_capacity));
    let sessions = SessionStore::new(cache.clone(), attempts.clone(), config.session.ttl);
    let resolver =
        HttpIdentityResolver::new(config.identity_resolver_url.clone(), config.gateway_timeout)?;
    let submitter = HttpSubmissionGateway::new(
        config.submission_gateway_url.clone(),
        config.submission_gateway_token.clone(),
        config.gateway_timeout,
    )?;
    let handshake = Handshake::new(
        sessions,
        Arc::new(resolver),
        Arc::new(submitter),
        HandshakeSettings {
            max_tries: config.session.max_tries,
            gateway_timeout: config.gateway_timeout,
            reporting_offset: config.reporting_offset,
        },
    );

    let shutdown = CancellationToken::new();
    let janitors = [cache, attempts].map(|cache| {
        tokio::spawn(CacheJanitor::new(cache, config.sweep_interval).run(shutdown.clone()))
    });

    let app = router(AppState::new(handshake), &config.allowed_origins);

    let handle = Handle::<SocketAddr>::new();
    tokio::spawn(forward_shutdown(handle.clone(), shutdown.clone(), wait_for_signal()));

    let served = match &config.tls {
        Some(tls) => {
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key)
                .await
                .map_err(StartupError::Tls)?;
            info!(addr = %config.bind_addr, "Survey gate listening on https (docs at /docs)");
            axum_server::bind_rustls(config.bind_addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
        None => {
            warn!(addr = %config.bind_addr, "TLS not configured, serving plain HTTP");
            axum_server::bind(config.bind_addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
    };

    shutdown.cancel();
    for janitor in janitors {
        if let Err(e) = janitor.await {
            warn!(error = %e, "Cache janitor did not stop cleanly");
        }
    }

    served.map_err(StartupError::Serve)
}

/// Wait for `signal`, then stop the server and background tasks.
async fn forward_shutdown(
    handle: Handle<SocketAddr>,
    shutdown: CancellationToken,
    signal: impl Future<Output = ()>,
) {
    signal.await;
    info!("Shutdown signal received");
    shutdown.cancel();
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "Cannot listen for SIGTERM; only Ctrl-C will stop the server");
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Cannot listen for Ctrl-C");
            }
            return;
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!(error = %e, "Cannot listen for Ctrl-C");
            }
        }
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Cannot listen for Ctrl-C");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signal_cancels_background_tasks() {
        let handle = Handle::<SocketAddr>::new();
        let shutdown = CancellationToken::new();

        forward_shutdown(handle.clone(), shutdown.clone(), async {}).await;

        assert!(shutdown.is_cancelled());
        assert_eq!(handle.connection_count(), 0);
    }
}
