use anyhow::{Context, Result};
use councellorx::{
    api::{self, AppState},
    config, genai, logging,
    pipeline::PipelineOrchestrator,
    upload::UploadReceiver,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing();
    let config = Arc::new(config::init_config().context("failed to load configuration")?);

    let client = Arc::new(
        genai::GeminiClient::from_config(&config).context("failed to build Gemini client")?,
    );
    let pipeline = Arc::new(PipelineOrchestrator::from_config(client, &config));
    let state = AppState {
        pipeline,
        receiver: UploadReceiver::new(config.temp_dir()),
    };
    let app = api::create_router(state, &config.allowed_origins);

    let (listener, port) = bind_listener(config.server_port)
        .await
        .context("failed to bind listener")?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await.context("server terminated")?;
    Ok(())
}

async fn bind_listener(configured: Option<u16>) -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    if let Some(port) = configured {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 8000..=8099;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 8000-8099",
    ))
}
