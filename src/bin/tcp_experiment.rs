//! TCP 拥塞动态实验
//!
//! 在有线（client—router—server 两段点对点链路）或无线（单小区，AP 居中）拓扑上
//! 运行一条 TCP 批量流，输出 `<variant>.cwnd`、`<variant>.ssthresh`、`<variant>.throughput`。

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tcpcc_sim::experiment::{BindStrategy, ExperimentConfig, ExperimentError, ExperimentRunner};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Variant {
    Wired,
    Wireless,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Bind {
    /// 连接建立时订阅
    OnConnect,
    /// 固定延迟（实验时长的 1%）后订阅
    Deferred,
}

#[derive(Debug, Parser)]
#[command(name = "tcp-experiment", about = "TCP 拥塞动态实验：cwnd / ssthresh / 吞吐量时间序列")]
struct Args {
    /// 拓扑变体（给了 --config 时以配置文件为准）
    #[arg(long, value_enum, default_value_t = Variant::Wired)]
    variant: Variant,

    /// JSON 实验配置文件
    #[arg(long)]
    config: Option<PathBuf>,

    /// 实验时长（秒）
    #[arg(long)]
    duration_secs: Option<f64>,

    /// 吞吐量采样间隔（毫秒）
    #[arg(long)]
    interval_ms: Option<u64>,

    /// 输出目录
    #[arg(long, default_value = "outputs")]
    out_dir: PathBuf,

    /// 引擎随机种子
    #[arg(long)]
    seed: Option<u64>,

    /// 拥塞状态订阅时机
    #[arg(long, value_enum)]
    bind: Option<Bind>,
}

fn load_config(args: &Args) -> Result<ExperimentConfig, ExperimentError> {
    let mut cfg = match &args.config {
        Some(path) => ExperimentConfig::from_path(path)?,
        None => match args.variant {
            Variant::Wired => ExperimentConfig::wired(),
            Variant::Wireless => ExperimentConfig::wireless(),
        },
    };
    if let Some(d) = args.duration_secs {
        cfg.traffic.duration_secs = d;
    }
    if let Some(i) = args.interval_ms {
        cfg.sampling.interval_ms = i;
    }
    if let Some(seed) = args.seed {
        cfg.seed = seed;
    }
    match args.bind {
        Some(Bind::OnConnect) => cfg.instrumentation.bind = BindStrategy::OnConnect,
        Some(Bind::Deferred) => cfg.instrumentation.bind = BindStrategy::Deferred { delay: None },
        None => {}
    }
    Ok(cfg)
}

fn run(args: &Args) -> Result<u64, ExperimentError> {
    let cfg = load_config(args)?;
    let runner = ExperimentRunner::new(cfg)?;
    let report = runner.run_to_dir(&args.out_dir)?;
    for path in &report.outputs {
        tracing::debug!(path = %path.display(), "输出文件");
    }
    Ok(report.total_rx)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(total_rx) => {
            println!("Total Bytes Received from Client: {total_rx}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
