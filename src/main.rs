use std::{any::Any, panic::AssertUnwindSafe, path::PathBuf};

use anyhow::Result;
use clap::Parser;
use futures::FutureExt;
use hand_tool_kiosk::{
    config::KioskConfig,
    externals::{
        display::DisplayModule, gpio::GpioModule, media::MediaModule,
        sensor_link::SensorLinkModule,
    },
    internals::core::{
        catalog::MediaCatalog, dispatcher::Dispatcher, input::DebouncedInput, ports::DisplayPort,
        telemetry_reader::TelemetryReader,
    },
    models::action::Action,
};
use tokio::signal::{
    self,
    unix::{signal as unix_signal, SignalKind},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter, warn};

/// Shop floor kiosk showing hand tool media and live meter readings.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// TOML config file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Media directory, overriding the config file.
    #[arg(short, long)]
    media_dir: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false)
        .with_max_level(args.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Err(e) = run(args).await {
        error!("Failed to start. Error: {:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let mut config = KioskConfig::load(args.config.as_deref())?;
    if let Some(directory) = args.media_dir {
        config.media.directory = directory;
    }
    let button_map = config.button_map()?;

    // Cheap enough to check before any hardware is touched.
    let mut catalog = MediaCatalog::discover(&config.media.directory, config.media.min_entries)?;
    for (channel, action) in button_map.bindings() {
        if let Action::ShowMedia(index) = action {
            if *index >= catalog.len() {
                warn!(
                    "{} shows entry #{} but only {} entries exist.",
                    channel,
                    index,
                    catalog.len()
                );
            }
        }
    }

    let DisplayModule { display_adapter } = DisplayModule::initialize(&config.display)?;
    let MediaModule {
        image_adapter,
        video_adapter,
    } = MediaModule::initialize();
    catalog.preload_images(&image_adapter, display_adapter.resolution());

    let GpioModule { input_adapter } = GpioModule::initialize(&button_map.channels())?;
    let SensorLinkModule { transport_adapter } = SensorLinkModule::initialize(&config.telemetry);

    let input = DebouncedInput::new(
        input_adapter,
        button_map.channels(),
        config.timing.debounce(),
        config.timing.settle(),
    );
    let reader = TelemetryReader::new(transport_adapter, &config.telemetry);

    let token = CancellationToken::new();
    tokio::spawn(task_listen_for_quit(token.clone()));

    let mut dispatcher = Dispatcher::new(
        input,
        reader,
        display_adapter,
        video_adapter,
        catalog,
        button_map,
        config,
        token.clone(),
    );

    if let Err(panic) = AssertUnwindSafe(dispatcher.run()).catch_unwind().await {
        error!("Dispatcher panicked. Error: {}", panic_message(&*panic));
    }
    dispatcher.terminate();
    token.cancel();

    info!("Shut down.");
    Ok(())
}

/// Task: Cancel the token on SIGINT or SIGTERM.
#[tracing::instrument(skip_all)]
async fn task_listen_for_quit(token: CancellationToken) {
    info!("Started.");
    let terminate = async {
        match unix_signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM. Error: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = token.cancelled() => {
            warn!("Cancelled.");
            return;
        },
        res = signal::ctrl_c() => match res {
            Ok(()) => info!("Received SIGINT."),
            Err(e) => error!("Failed to listen for ctrl_c. Error: {}", e),
        },
        _ = terminate => info!("Received SIGTERM."),
    }
    token.cancel();
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
