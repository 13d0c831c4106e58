use android_pq_bot::adb::{AdbBackend, AdbClient};
use android_pq_bot::args::{Args, Mode};
use android_pq_bot::config::{self, Config};
use android_pq_bot::game_automation::{
    AdbPerception, AutomationEvent, BotHandle, EventSink, HumanizedInput, QuestBot,
    create_automation_channels,
};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

const SCREENSHOT_FILE: &str = "cli-screenshot.png";

#[tokio::main]
async fn main() -> ExitCode {
    let Some(args) = Args::parse() else {
        return ExitCode::SUCCESS;
    };

    if args.mode == Mode::CreateConfig {
        return match config::write_default_config(&args.config_path) {
            Ok(()) => {
                println!("✅ Default settings written to {}", args.config_path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ {e}");
                ExitCode::FAILURE
            }
        };
    }

    let mut config = match config::load_config(&args.config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = config.apply_args(&args) {
        eprintln!("❌ {e}");
        return ExitCode::FAILURE;
    }
    init_logging(&config, args.debug_mode);

    let result = match args.mode {
        Mode::Screenshot => take_screenshot(&config).await,
        _ => run_bot(&config, args.timeout_secs).await,
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            log::error!("❌ {msg}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(config: &Config, debug: bool) {
    let level = if debug { "debug" } else { config.log_level.as_str() };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

async fn connect(config: &Config) -> Result<Arc<AdbBackend>, String> {
    log::info!(
        "🔌 Connecting to {} (impl={:?})...",
        config.adb.address,
        config.adb.backend
    );
    let client = match AdbBackend::connect(&config.adb.address, config.adb.backend).await {
        Ok(client) => client,
        Err(e) => {
            let known = visible_devices(config).await;
            return Err(format!(
                "Connect to {} failed: {e} (visible devices: {known})",
                config.adb.address
            ));
        }
    };
    let (sx, sy) = client.screen_dimensions();
    log::info!(
        "📱 Device: {} size: {}x{} (impl={:?})",
        client.device_name(),
        sx,
        sy,
        client.kind()
    );
    if (sx, sy) != (config.input.screen_width, config.input.screen_height) {
        log::warn!(
            "⚠️ Resolution {}x{} differs from {}x{}, templates and fixed positions may not match",
            sx,
            sy,
            config.input.screen_width,
            config.input.screen_height
        );
    }
    Ok(Arc::new(client))
}

/// Devices the adb server knows about, for connect-failure hints.
async fn visible_devices(config: &Config) -> String {
    match AdbBackend::list_devices(config.adb.backend).await {
        Ok(devices) if devices.is_empty() => "none".to_string(),
        Ok(devices) => devices
            .iter()
            .map(|d| format!("{} ({})", d.name, d.state))
            .collect::<Vec<_>>()
            .join(", "),
        Err(e) => format!("unknown, listing failed: {e}"),
    }
}

async fn take_screenshot(config: &Config) -> Result<(), String> {
    let client = connect(config).await?;
    let cap = client
        .screen_capture()
        .await
        .map_err(|e| format!("Screenshot failed: {e}"))?;
    tokio::fs::write(SCREENSHOT_FILE, &cap.bytes)
        .await
        .map_err(|e| format!("Write failed: {e}"))?;
    println!(
        "✅ Screenshot ({}ms) saved to {SCREENSHOT_FILE}",
        cap.duration_ms
    );
    Ok(())
}

async fn run_bot(config: &Config, timeout_secs: Option<u64>) -> Result<(), String> {
    let client = connect(config).await?;
    let perception = AdbPerception::new(
        Arc::clone(&client),
        config.match_config(),
        config.screenshot_cache(),
    );
    let actions = HumanizedInput::new(client, config.input_settings());

    let (cmd_tx, cmd_rx, event_tx, mut event_rx) = create_automation_channels();
    let handle = BotHandle::new(cmd_tx);

    let ctrl_c_handle = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("🛑 Ctrl-C received, stopping...");
            ctrl_c_handle.stop().await;
        }
    });

    if let Some(secs) = timeout_secs {
        let timeout_handle = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            log::info!("⏰ Timeout of {secs}s reached, stopping...");
            timeout_handle.stop().await;
        });
    }

    // The bot logs its own lines; state changes and stats only go to the verbose log.
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                AutomationEvent::StatsUpdated(stats) => log::trace!("📊 {stats:?}"),
                AutomationEvent::StateChanged(state) => log::debug!("🔄 Bot {state:?}"),
                AutomationEvent::Log(_) => {}
            }
        }
    });

    log::info!("🎮 Starting {} PQ bot", config.bot.quest_choice);
    let mut bot = QuestBot::new(
        perception,
        actions,
        config.bot_settings(),
        cmd_rx,
        EventSink::new(event_tx),
    );
    let summary = bot.start().await.map_err(|e| e.to_string())?;
    log::info!("🏁 Stopped: {summary}");
    Ok(())
}
