//! 进程生命周期模拟器库

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::RngCore;
use tracing::info;

use crate::const_values::SimConfig;
use crate::simulator::{SeededTiming, Simulator, StatusLog};
use crate::utils::{TraceLoader, load_programs, load_vector_table, print_trace};

pub mod const_values;
pub mod simulator;
pub mod utils;

/// trace 驱动的进程生命周期模拟器
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// 根程序的 trace 文件
    pub trace: String,

    /// 外部程序表文件
    pub programs: PathBuf,

    /// 中断向量表文件
    pub vectors: PathBuf,

    /// 执行日志输出文件
    pub output: PathBuf,

    /// 配置文件地址，缺省使用内置配置
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 随机种子，覆盖配置文件中的值
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// 状态快照日志路径，覆盖配置文件中的值
    #[arg(long)]
    pub status_log: Option<String>,

    /// 解析程序 trace 文件名时使用的基准目录
    #[arg(short = 'd', long)]
    pub trace_dir: Option<PathBuf>,

    /// 结束后回显执行日志
    #[arg(short, long)]
    pub print_trace: bool,
}

pub fn build_sim_run_blocking(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => SimConfig::new(path)?,
        None => SimConfig::default(),
    };
    if let Some(status_log) = &args.status_log {
        config.output.status_log = status_log.clone();
    }

    let (seed, source) = match (args.seed, config.simulation.seed) {
        (Some(seed), _) => (seed, "命令行"),
        (None, Some(seed)) => (seed, "配置文件"),
        (None, None) => (rand::thread_rng().next_u64(), "随机生成"),
    };
    info!(seed, source, "随机种子");

    let programs = load_programs(&args.programs)
        .with_context(|| format!("无法加载外部程序表 {:?}", args.programs))?;
    info!(count = programs.value.len(), skipped = programs.rejected.len(), "加载外部程序表");

    let vectors = load_vector_table(&args.vectors)
        .with_context(|| format!("无法加载向量表 {:?}", args.vectors))?;
    info!(count = vectors.value.len(), skipped = vectors.rejected.len(), "加载向量表");

    let output = File::create(&args.output)
        .with_context(|| format!("无法创建输出文件 {:?}", args.output))?;

    let trace_dir = args.trace_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    let mut sim = Simulator::new(
        &config,
        programs.value,
        vectors.value,
        TraceLoader::new(trace_dir, config.trace.clone()),
        BufWriter::new(output),
        StatusLog::new(&config.output.status_log),
        SeededTiming::new(seed),
    );

    sim.boot(&args.trace)
        .with_context(|| format!("模拟 '{}' 失败", args.trace))?;
    sim.flush()?;

    info!(
        clock = sim.now(),
        processes = sim.processes().len(),
        occupied = sim.partitions().occupied_count(),
        aborted = sim.aborts().len(),
        lines = sim.lines_written(),
        "模拟结束"
    );
    drop(sim);

    if args.print_trace {
        print_trace(&args.output)?;
    }

    Ok(())
}
