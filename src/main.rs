use anyhow::Result;
use clap::Parser;
use procsim::{Args, build_sim_run_blocking};
use tracing::{Level, info};
use tracing_subscriber::{self, EnvFilter, fmt::format::FmtSpan};

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .with_target(false) // 不显示目标模块
        .with_file(true) // 显示文件名
        .with_line_number(true) // 显示行号
        .with_span_events(FmtSpan::ACTIVE) // 跟踪span的生命周期
        .init();

    // 解析命令行参数
    let args = Args::parse();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?args.config.as_deref().unwrap_or("<内置默认>".as_ref()),
        "启动进程模拟器"
    );
    info!(
        trace = %args.trace,
        programs = ?args.programs,
        vectors = ?args.vectors,
        trace_dir = ?args.trace_dir.as_deref().unwrap_or(".".as_ref()),
        "输入文件"
    );
    info!(output = ?args.output, status_log = ?args.status_log, "输出文件");

    build_sim_run_blocking(args)
}
