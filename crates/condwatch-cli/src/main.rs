//! 조건검색 감시 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 브리지 어댑터에 연결해 "급등주" 조건식 실시간 감시
//! condwatch watch --condition 급등주 --bridge ws://127.0.0.1:8765
//!
//! # 시뮬레이션 스크립트로 30초 동안 감시
//! condwatch watch --condition 급등주 --script demos/surge.json --for-secs 30
//!
//! # 조건식 목록 보기
//! condwatch conditions --script demos/surge.json
//!
//! # 저장된 세션 파일 보기
//! condwatch show data/20240715_급등주.db --format json
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use condwatch_cli::commands::conditions::run_conditions;
use condwatch_cli::commands::output::OutputFormat;
use condwatch_cli::commands::session::BrokerSource;
use condwatch_cli::commands::show::run_show;
use condwatch_cli::commands::watch::{parse_mode, run_watch, WatchOptions};
use condwatch_core::{init_logging, AppConfig, LogConfig};

#[derive(Parser)]
#[command(name = "condwatch")]
#[command(about = "Kiwoom 조건검색 편입/이탈 추적기", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 설정 파일 경로 (기본: config/default.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// 로그 형식 (pretty, json, compact)
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// 조건식 실시간 감시
    Watch {
        /// 조건식 이름
        #[arg(short, long)]
        condition: String,

        /// 조건식 인덱스 (생략 시 목록에서 이름으로 찾음)
        #[arg(short, long)]
        index: Option<i32>,

        /// 화면번호 (기본: tracker.screen_id)
        #[arg(short, long)]
        screen: Option<String>,

        /// 조회 방식 (snapshot, live)
        #[arg(short, long)]
        mode: Option<String>,

        /// 브리지 어댑터 WebSocket URL
        #[arg(long)]
        bridge: Option<String>,

        /// 시뮬레이션 스크립트 파일
        #[arg(long)]
        script: Option<PathBuf>,

        /// 표준시 서버와 시각 동기화
        #[arg(long, default_value = "false")]
        sync_time: bool,

        /// 지정한 초가 지나면 자동 종료
        #[arg(long)]
        for_secs: Option<u64>,
    },

    /// 조건식 목록 보기
    Conditions {
        /// 브리지 어댑터 WebSocket URL
        #[arg(long)]
        bridge: Option<String>,

        /// 시뮬레이션 스크립트 파일
        #[arg(long)]
        script: Option<PathBuf>,
    },

    /// 저장된 세션 파일 보기
    Show {
        /// 세션 DB 파일 경로
        path: PathBuf,

        /// 출력 형식 (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// 적용 중인 설정 출력 (TOML)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(Some(path.as_path())),
        None => AppConfig::load_default(),
    }
    .context("설정 로드 실패")?;

    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }

    init_logging(LogConfig::from_settings(&config.logging))
        .map_err(|e| anyhow!("로깅 초기화 실패: {}", e))?;

    match cli.command {
        Commands::Watch {
            condition,
            index,
            screen,
            mode,
            bridge,
            script,
            sync_time,
            for_secs,
        } => {
            let options = WatchOptions {
                condition,
                index,
                screen,
                mode: mode.as_deref().map(parse_mode).transpose()?,
                source: BrokerSource::resolve(&config, bridge, script)?,
                sync_time,
                duration: for_secs.map(Duration::from_secs),
                print_final: true,
            };

            let report = run_watch(&config, options).await?;
            tracing::info!(screens = report.snapshots.len(), "감시 종료");
        }
        Commands::Conditions { bridge, script } => {
            let source = BrokerSource::resolve(&config, bridge, script)?;
            run_conditions(&config, &source).await?;
        }
        Commands::Show { path, format } => {
            let format = OutputFormat::parse(&format)?;
            run_show(&path, format).await?;
        }
        Commands::Config => {
            let rendered = toml::to_string_pretty(&config).context("설정 직렬화 실패")?;
            println!("{}", rendered);
        }
    }

    Ok(())
}
