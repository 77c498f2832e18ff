//! X光报告服务命令行客户端
//!
//! 上传图像、跟踪分析进度并打印诊断报告。

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt};
use xray_report_backend::{
    client::{PollOptions, PollOutcome, XrayClient, render_report},
    config::ClientConfig,
    models::DiagnosticReport,
};

/// X光报告服务命令行客户端
#[derive(Parser, Debug)]
#[command(name = "xray-cli", version, about)]
struct Cli {
    /// 服务端地址，默认 http://localhost:8080
    #[arg(long, env = "XRAY_API_URL", global = true)]
    endpoint: Option<String>,

    /// 轮询间隔（毫秒），默认 2000
    #[arg(long, global = true)]
    poll_interval_ms: Option<u64>,

    /// 最多轮询次数，默认不限
    #[arg(long, global = true)]
    max_attempts: Option<u32>,

    /// 输出格式
    #[arg(long, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 上传图像并等待报告
    Analyze {
        /// JPEG、PNG 或 DICOM 文件
        file: PathBuf,
    },
    /// 查询分析状态
    Status {
        /// 分析ID
        id: String,
    },
    /// 获取诊断报告
    Report {
        /// 报告ID
        report_id: String,
    },
}

fn print_report(report: &DiagnosticReport, format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => print!("{}", render_report(report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut client_config = ClientConfig::default();
    if let Some(endpoint) = &cli.endpoint {
        client_config.base_url = endpoint.clone();
    }
    if let Some(interval) = cli.poll_interval_ms {
        client_config.poll_interval_ms = interval;
    }
    let client = XrayClient::new(&client_config.base_url);

    match cli.command {
        Command::Analyze { file } => {
            let upload = client.upload(&file).await?;
            eprintln!("Uploaded {} as {} ({} bytes)", file.display(), upload.id, upload.size);

            let cancel = CancellationToken::new();
            let ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    ctrl_c.cancel();
                }
            });

            let options = PollOptions {
                max_attempts: cli.max_attempts,
                ..PollOptions::from(&client_config)
            };

            let outcome = client
                .poll_until_terminal(&upload.id, &options, &cancel, |status| {
                    eprintln!("[{:>3}%] {}", status.progress, status.message);
                })
                .await;

            match outcome {
                PollOutcome::Completed { report_id } => {
                    let report = client.fetch_report(&report_id).await?;
                    print_report(&report, &cli.format)?;
                }
                PollOutcome::Failed { error } => anyhow::bail!("Analysis failed: {}", error),
                PollOutcome::Cancelled => anyhow::bail!("Cancelled while waiting for analysis {}", upload.id),
                PollOutcome::GaveUp { last } => anyhow::bail!(
                    "Analysis {} still {} at {}% after {} attempts",
                    last.id,
                    last.status,
                    last.progress,
                    cli.max_attempts.unwrap_or_default()
                ),
            }
        }
        Command::Status { id } => {
            let status = client.get_status(&id).await?;
            match cli.format {
                OutputFormat::Text => {
                    println!("{} {} {}% {}", status.id, status.status, status.progress, status.message);
                    if let Some(report_id) = &status.report_id {
                        println!("report: {}", report_id);
                    }
                    if let Some(error) = &status.error {
                        println!("error: {}", error);
                    }
                }
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
            }
        }
        Command::Report { report_id } => {
            let report = client.fetch_report(&report_id).await?;
            print_report(&report, &cli.format)?;
        }
    }

    Ok(())
}
