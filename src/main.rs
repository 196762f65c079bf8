mod app;

use app::MeagleUploader;
use eframe::CreationContext;
use meagle_uploader::api::{AssetApi, HttpApi};
use meagle_uploader::ClientConfig;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = ClientConfig::load()?;
    let api: Arc<dyn AssetApi> = Arc::new(HttpApi::new(&config)?);
    let runtime = Runtime::new()?;
    info!(
        "Uploading to {} with {} parallel uploads",
        config.api_base, config.upload_concurrency
    );

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([900.0, 700.0])
            .with_min_inner_size([600.0, 500.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "Media Library Uploader",
        options,
        Box::new(move |cc: &CreationContext| {
            Box::new(MeagleUploader::new(cc, config, api, runtime))
        }),
    )?;
    Ok(())
}
