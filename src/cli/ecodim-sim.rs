use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use clap_derive::Parser;
use ecodim_zigbee::capabilities::{BatchOpts, ChangeOpts, PendingChange};
use ecodim_zigbee::device::{Channel, EcoDimDevice};
use ecodim_zigbee::host::{CapabilityDebouncer, MemoryRegistry, SimulatedNode};
use ecodim_zigbee::logging::{self, RotationPeriod};
use ecodim_zigbee::settings::Settings;
use futures::future::join_all;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[clap(about = "Runs the EcoDim Duo driver against a simulated dual dimmer")]
pub struct Params {
    /// Settings file (JSON). Defaults are used when not set or unreadable
    #[clap(long)]
    settings: Option<String>,
    /// Directory for rolling log files (if not set, logs to stdout)
    #[clap(long)]
    log_dir: Option<String>,
    /// Log rotation period: minutely, hourly, daily or never
    #[clap(long)]
    rotation: Option<RotationPeriod>,
    /// Only drive one channel (left or right). Both when not set
    #[clap(long)]
    channel: Option<Channel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let params = Params::parse();

    let (mut settings, settings_error) = match &params.settings {
        Some(path) => match Settings::from_file(path) {
            Ok(settings) => (settings, None),
            Err(e) => (Settings::default(), Some(e)),
        },
        None => (Settings::default(), None),
    };
    if let Some(dir) = params.log_dir {
        settings.log.dir = Some(dir);
    }
    if let Some(rotation) = params.rotation {
        settings.log.rotation = rotation;
    }

    let _log_guard = logging::init(&settings.log).context("Failed to set up logging")?;
    if let Some(e) = settings_error {
        warn!("{:#}, using default settings", e);
    }

    let node = Arc::new(SimulatedNode::new(settings.node_options()));
    info!(node = %node.id(), "Simulated EcoDim Duo node ready");

    let channels = match params.channel {
        Some(channel) => vec![channel],
        None => vec![Channel::Left, Channel::Right],
    };
    let runs = channels
        .into_iter()
        .map(|channel| run_scenario(channel, node.clone(), &settings));
    for result in join_all(runs).await {
        result?;
    }
    Ok(())
}

async fn run_scenario(channel: Channel, node: Arc<SimulatedNode>, settings: &Settings) -> Result<()> {
    let registry = Arc::new(MemoryRegistry::dimmer());
    let device = Arc::new(EcoDimDevice::new(
        channel,
        node.clone(),
        registry.clone(),
        settings.dimmer_config(),
    ));
    device
        .on_node_init()
        .await
        .with_context(|| format!("Failed to initialise {} channel", channel))?;

    let (debouncer, handle) =
        CapabilityDebouncer::spawn(device.clone(), registry.clone(), settings.debounce_window());

    let fade = BatchOpts {
        dim: ChangeOpts {
            duration: Some(Duration::from_millis(1500)),
        },
        ..Default::default()
    };
    let steps = [
        ("dim to 60%", vec![(PendingChange::dim(0.6), fade)]),
        ("switch off", vec![(PendingChange::onoff(false), BatchOpts::default())]),
        ("switch on", vec![(PendingChange::onoff(true), BatchOpts::default())]),
        (
            "toggle and slide together",
            vec![
                (PendingChange::onoff(true), BatchOpts::default()),
                (PendingChange::dim(0.25), BatchOpts::default()),
            ],
        ),
        ("dim to zero", vec![(PendingChange::dim(0.0), BatchOpts::default())]),
    ];

    for (name, edits) in steps {
        let Some(((last, last_opts), rest)) = edits.split_last() else {
            continue;
        };
        for (change, opts) in rest {
            debouncer.submit(*change, *opts).await?;
        }
        match debouncer.submit_and_wait(*last, *last_opts).await? {
            Ok(resolution) => info!(%channel, ?resolution, "Step '{}' done", name),
            Err(e) => error!(%channel, "Step '{}' failed: {}", name, e),
        }

        let snapshot = registry.snapshot();
        let (on, level) = node.output(channel.endpoint()).unwrap_or_default();
        println!(
            "[{:>5}] {:<26} onoff={:<5} dim={:.2}  (device: on={} level={})",
            channel.label(),
            name,
            snapshot.onoff.unwrap_or_default(),
            snapshot.dim.unwrap_or_default(),
            on,
            level
        );
    }

    debouncer.shutdown().await;
    handle.await?;
    Ok(())
}
