use chrono::Local;
use clap::Parser;
use studentenfutter::core::render::presenter_for;
use studentenfutter::core::SettingsStore;
use studentenfutter::utils::error::ErrorSeverity;
use studentenfutter::utils::{logger, validation::Validate};
use studentenfutter::{
    AppConfig, CliConfig, Command, Controller, Fetcher, FileSettingsStore, Result,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedSender};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting studentenfutter");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 載入並驗證配置
    let config = match AppConfig::from_cli(&cli).and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&cli, config).await {
        tracing::error!(
            "❌ Menu run failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn run(cli: &CliConfig, config: AppConfig) -> Result<()> {
    let settings = FileSettingsStore::resolve(config.settings_path.clone());

    let stored_location = settings.load_location().await.unwrap_or_else(|e| {
        tracing::warn!("Ignoring stored settings: {}", e);
        None
    });
    let location = cli.location.or(stored_location).unwrap_or_default();
    let date = cli.date.unwrap_or_else(|| Local::now().date_naive());

    let fetcher = Fetcher::with_timeout(config.clone(), config.timeout())?;
    let presenter = presenter_for(config.format, std::io::stdout(), cli.interactive);
    let mut controller = Controller::new(
        fetcher,
        settings,
        presenter,
        config.controller_options(),
        date,
        location,
    );

    if cli.location.is_some() {
        controller.set_location(location).await;
    } else {
        controller.refresh();
    }

    if cli.interactive {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(read_commands(tx));
        controller.run_interactive(rx).await
    } else {
        controller.run_until_settled().await
    }
}

async fn read_commands(tx: UnboundedSender<Command>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<Command>() {
            Ok(command) => {
                let quit = command == Command::Quit;
                if tx.send(command).is_err() || quit {
                    break;
                }
            }
            Err(e) => {
                eprintln!("❌ {}", e.user_friendly_message());
            }
        }
    }
}
