use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use ps_verify::utils::logging;
use ps_verify::{App, Config};

/// 批量核验证件号，支持中断后续跑
#[derive(Parser, Debug)]
#[command(name = "ps-verify", version, about)]
struct Cli {
    /// TOML 配置文件，环境变量会覆盖其中的值
    #[arg(short, long, env = "PS_VERIFY_CONFIG")]
    config: Option<PathBuf>,

    /// 自行启动无头浏览器，而不是连接调试端口
    #[arg(long)]
    headless: bool,

    /// 本轮最多处理多少个证件号
    #[arg(long)]
    limit: Option<usize>,

    /// 先把 CSV 中的证件号导入数据库（只导入，不核验）
    #[arg(long, value_name = "CSV")]
    import: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // 加载配置，命令行参数优先
    let mut config = Config::load(cli.config.as_deref())?;
    if cli.headless {
        config.headless = true;
    }
    if cli.limit.is_some() {
        config.limit = cli.limit;
    }

    // 初始化日志
    logging::init(config.verbose_logging);

    let app = App::initialize(config).await?;

    if let Some(csv_path) = cli.import {
        app.import_csv(&csv_path).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let summary = app.run().await?;
    if summary.aborted {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
