//! Mirror daemon: listens for TUIO 2.0 bundles on UDP and forwards them to
//! every attached OSC sink; sinks are managed at runtime over the control
//! socket (`add`/`del`/`show`/`config`/`stop`).

use std::time::Duration;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use tuio2_pipeline::client::Client;
use tuio2_pipeline::codec::Codec;
use tuio2_pipeline::messages::TreeCompat;
use tuio2_pipeline::mirror::{serve_control_socket, MirrorConfig, SinkTable};

fn parse_args() -> Result<MirrorConfig> {
    let mut config = MirrorConfig::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-p" | "--port" => {
                if let Some(port) = args.next().and_then(|v| v.parse().ok()) {
                    config.port = port;
                }
            }
            "-c" | "--config" => {
                let path = args.next().context("--config requires a path")?;
                config = MirrorConfig::load(std::path::Path::new(&path))
                    .with_context(|| format!("loading {path}"))?;
            }
            "--drop-unknown" => config.accept_unknown = false,
            _ => {}
        }
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = parse_args()?;
    let sinks = SinkTable::new();

    let mut client = Client::bind(config.port, config.accept_unknown)
        .await
        .with_context(|| format!("binding TUIO port {}", config.port))?;
    tracing::info!("listening for TUIO 2.0 bundles on udp/{}", config.port);

    let codec = Codec::new(config.accept_unknown, TreeCompat::Lenient);
    let forward_sinks = sinks.clone();
    let (bundle_tx, mut bundle_rx) =
        tokio::sync::mpsc::unbounded_channel::<tuio2_pipeline::bundle::BundleHandle>();
    client.add_listener(move |bundle: &tuio2_pipeline::bundle::BundleHandle| {
        let _ = bundle_tx.send(bundle.clone());
    });

    // data plane: re-encode each delivered bundle once and fan it out
    let data_plane = tokio::spawn(async move {
        while let Some(bundle) = bundle_rx.recv().await {
            match codec.encode(&bundle) {
                Ok(data) => forward_sinks.forward_all(&data).await,
                Err(err) => tracing::warn!("bundle not forwarded: {err}"),
            }
        }
    });

    let receive_loop = tokio::spawn(async move {
        loop {
            if let Err(err) = client.load(64, Duration::from_millis(500)).await {
                tracing::warn!("receive error: {err}");
            }
        }
    });

    // the control socket owns the process lifetime
    serve_control_socket(&config, sinks, None)
        .await
        .context("control socket")?;

    receive_loop.abort();
    data_plane.abort();
    Ok(())
}
