use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use xianyu_core_sdk::prelude::{config, smoke, telemetry};

use config::SmokeConfig;
use smoke::{EnvBotFactory, GeminiClientFactory};
use telemetry::TracingReporter;

/**
 * \brief Gemini 集成冒烟测试入口。
 */
#[derive(Parser, Debug)]
#[command(
    name = "xianyu-smoke",
    version,
    about = "Smoke test for the Gemini-backed Xianyu reply bot"
)]
struct Cli {
    /** \brief 指定 .env 文件路径，默认读取当前目录下的 .env */
    #[arg(long)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, Default)]
enum Commands {
    /**
     * \brief 先测连通性，通过后再测回复机器人。
     */
    #[default]
    All,

    /**
     * \brief 只测试 Gemini API 连通性。
     */
    Connectivity,

    /**
     * \brief 只测试回复机器人。
     */
    Bot,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    config::load_dotenv(cli.env_file.as_deref())?;
    telemetry::init_tracing();

    let cfg = SmokeConfig::from_env();
    telemetry::set_enabled(cfg.telemetry_enabled);

    let reporter = TracingReporter;
    let clients = GeminiClientFactory {
        api_base: cfg.api_base.clone(),
    };

    let passed = match cli.command.unwrap_or_default() {
        Commands::All => {
            smoke::run_all(&cfg, &clients, &EnvBotFactory, &reporter)
                .await
                .passed()
        }
        Commands::Connectivity => {
            let ok = smoke::connectivity_check(&cfg, &clients, &reporter).await;
            if !ok {
                smoke::report_hints(&reporter);
            }
            ok
        }
        Commands::Bot => smoke::bot_check(&EnvBotFactory, &reporter).await,
    };

    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
