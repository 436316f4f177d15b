//! 事件模拟器核心模块
//!
//! 逐条解释 trace 事件，为每个事件写出带时间戳的微步骤日志并推进时钟。
//! FORK 在进程表中生成子进程，EXEC 为目标程序分配分区后递归执行其 trace，
//! 整个运行共享同一个时钟、进程表和分区表。

mod exception;
pub mod memory;
pub mod process;
pub mod state;
pub mod status;
pub mod timing;

use std::fmt::Display;
use std::io::{self, Write};

use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::const_values::{EXEC_VECTOR, FORK_VECTOR, ProcessConfig, SimConfig, VECTOR_TABLE_SIZE};
use crate::utils::{LoadError, ProgramRegistry, TraceEvent, TraceLoader, VectorTable};

pub use exception::ExecAbort;
pub use memory::{MemoryError, MemoryPartition, Occupant, PartitionTable};
pub use process::{ProcessError, ProcessHandle, ProcessRecord, ProcessTable};
pub use state::{ClockOverflow, ExecMode, ExecOutcome, SimClock};
pub use status::StatusLog;
pub use timing::{SeededTiming, TimingSource, split_duration};

/// 致命错误，会终止整个模拟
#[derive(Debug, Error)]
pub enum SimError {
    #[error("日志写入失败: {0}")]
    Io(#[from] io::Error),
    #[error("trace加载失败: {0}")]
    Load(#[from] LoadError),
    #[error("内存错误: {0}")]
    Memory(#[from] MemoryError),
    #[error("进程表错误: {0}")]
    Process(#[from] ProcessError),
    #[error("{0}")]
    Clock(#[from] ClockOverflow),
    #[error("中断向量 {0} 超出向量表范围")]
    InvalidVector(usize),
}

/// 一次 trace 执行的局部状态
struct TraceFrame {
    /// 当前进程
    ctx: ProcessHandle,
    /// 是否从根记录开始执行，在进入时确定
    initial: bool,
    /// SYSCALL 数据传输的两种措辞交替使用
    transfer_to_display: bool,
}

/// 模拟器
pub struct Simulator<W: Write, T: TimingSource> {
    clock: SimClock,
    processes: ProcessTable,
    partitions: PartitionTable,
    vectors: VectorTable,
    programs: ProgramRegistry,
    traces: TraceLoader,
    /// 执行日志（主输出）
    exec_log: W,
    /// 状态快照日志（次输出）
    status: StatusLog,
    timing: T,
    init: ProcessConfig,
    aborts: Vec<ExecAbort>,
    lines: usize,
}

impl<W: Write, T: TimingSource> Simulator<W, T> {
    /// 创建模拟器，进程表中只有根记录，所有分区空闲
    pub fn new(
        config: &SimConfig,
        programs: ProgramRegistry,
        vectors: VectorTable,
        traces: TraceLoader,
        exec_log: W,
        status: StatusLog,
        timing: T,
    ) -> Self {
        let init = config.process.clone();
        Self {
            clock: SimClock::new(),
            processes: ProcessTable::new(
                init.init_pid,
                &init.init_program,
                init.init_size,
                init.init_partition,
            ),
            partitions: PartitionTable::new(&config.memory.partitions),
            vectors,
            programs,
            traces,
            exec_log,
            status,
            timing,
            init,
            aborts: Vec::new(),
            lines: 0,
        }
    }

    /// 启动流程：fork 根记录，拍一张初始快照，再以启动模式装入根 trace。
    /// 返回根 trace 执行完毕后的上下文
    pub fn boot(&mut self, root_trace: &str) -> Result<ProcessHandle, SimError> {
        let root = self.processes.root();
        let init = self.processes.fork(root)?;
        info!(pid = self.processes.get(init).pid, "fork init进程");
        self.snapshot()?;

        match self.exec_program(init, root_trace, 0, ExecMode::Boot)? {
            ExecOutcome::Completed { resume } => Ok(resume),
            ExecOutcome::Aborted(_) => Ok(init),
        }
    }

    /// 在 `ctx` 上下文中执行一段 trace，返回结束时的上下文
    pub fn run_trace(
        &mut self,
        ctx: ProcessHandle,
        events: &[TraceEvent],
    ) -> Result<ProcessHandle, SimError> {
        let mut frame = TraceFrame {
            ctx,
            initial: ctx == self.processes.root(),
            transfer_to_display: false,
        };
        for event in events {
            self.dispatch(&mut frame, event)?;
        }
        Ok(frame.ctx)
    }

    /// 处理一次 FORK 事件，返回子进程句柄
    pub fn fork(&mut self, ctx: ProcessHandle, duration: u64) -> Result<ProcessHandle, SimError> {
        let initial = ctx == self.processes.root();
        self.fork_event(ctx, duration, initial)
    }

    /// 处理一次 EXEC 事件
    pub fn exec(
        &mut self,
        ctx: ProcessHandle,
        program: &str,
        duration: u64,
    ) -> Result<ExecOutcome, SimError> {
        let initial = ctx == self.processes.root();
        self.exec_event(ctx, program, duration, initial)
    }

    fn dispatch(&mut self, frame: &mut TraceFrame, event: &TraceEvent) -> Result<(), SimError> {
        match event {
            TraceEvent::Cpu { duration } => {
                self.step(*duration, "CPU execution")?;
                self.processes.add_cpu_time(frame.ctx, *duration);
            }
            TraceEvent::Syscall { vector, duration } => {
                self.syscall_event(frame, *vector, *duration)?;
            }
            TraceEvent::EndIo { vector, duration } => {
                self.end_io_event(*vector, *duration)?;
                self.processes.add_io_time(frame.ctx, *duration);
            }
            TraceEvent::Fork { duration } => {
                frame.ctx = self.fork_event(frame.ctx, *duration, frame.initial)?;
            }
            TraceEvent::Exec { program, duration } => {
                match self.exec_event(frame.ctx, program, *duration, frame.initial)? {
                    ExecOutcome::Completed { resume } => frame.ctx = resume,
                    ExecOutcome::Aborted(_) => {
                        debug!(ctx = %frame.ctx, "EXEC已中止，保持当前上下文");
                    }
                }
            }
        }
        Ok(())
    }

    fn syscall_event(
        &mut self,
        frame: &mut TraceFrame,
        vector: usize,
        duration: u64,
    ) -> Result<(), SimError> {
        let parts = split_duration(duration, 3, &mut self.timing);

        self.step(1, "switch to kernel mode")?;
        let context = self.timing.pick(1, 3);
        self.step(context, "context saved")?;
        self.vector_steps(vector)?;
        self.step(parts[0], "SYSCALL: run the ISR")?;
        let transfer = if frame.transfer_to_display {
            "transfer data to display"
        } else {
            "transfer data"
        };
        frame.transfer_to_display = !frame.transfer_to_display;
        self.step(parts[1], transfer)?;
        self.step(parts[2], "check for errors")?;
        self.iret_with_snapshot()
    }

    fn end_io_event(&mut self, vector: usize, duration: u64) -> Result<(), SimError> {
        self.step(1, "check priority of interrupt")?;
        self.step(1, "check if masked")?;
        self.step(1, "switch to kernel mode")?;
        self.step(3, "context saved")?;
        self.vector_steps(vector)?;
        self.step(duration, "END_IO")?;
        self.iret_with_snapshot()
    }

    fn fork_event(
        &mut self,
        ctx: ProcessHandle,
        duration: u64,
        initial: bool,
    ) -> Result<ProcessHandle, SimError> {
        if !initial {
            let parts = split_duration(duration, 2, &mut self.timing);
            self.step(1, "switch to kernel mode")?;
            self.step(3, "context saved")?;
            self.vector_steps(FORK_VECTOR)?;
            self.step(parts[0], "FORK: copy parent PCB to child PCB")?;
            self.step(parts[1], "scheduler called")?;
            self.log_line(1, "IRET")?;
        }
        let child = self.processes.fork(ctx)?;
        debug!(
            parent = self.processes.get(ctx).pid,
            child = self.processes.get(child).pid,
            "fork"
        );
        self.snapshot()?;
        self.clock.advance(1)?;
        Ok(child)
    }

    #[instrument(level = "debug", skip(self))]
    fn exec_event(
        &mut self,
        ctx: ProcessHandle,
        program: &str,
        duration: u64,
        initial: bool,
    ) -> Result<ExecOutcome, SimError> {
        // 先确认能装入，再写任何日志
        let (size, partition) = match self.resolve_exec(program, ExecMode::Event) {
            Ok(found) => found,
            Err(reason) => return Ok(self.abort(reason)),
        };
        if !initial {
            self.step(1, "switch to kernel mode")?;
            let context = self.timing.pick(1, 3);
            self.step(context, "context saved")?;
            self.vector_steps(EXEC_VECTOR)?;
        }
        self.load_and_run(ctx, program, duration, size, partition, ExecMode::Event)
    }

    fn exec_program(
        &mut self,
        ctx: ProcessHandle,
        program: &str,
        duration: u64,
        mode: ExecMode,
    ) -> Result<ExecOutcome, SimError> {
        match self.resolve_exec(program, mode) {
            Ok((size, partition)) => self.load_and_run(ctx, program, duration, size, partition, mode),
            Err(reason) => Ok(self.abort(reason)),
        }
    }

    /// 查找程序大小和最佳适配分区，不修改任何状态
    fn resolve_exec(&self, program: &str, mode: ExecMode) -> Result<(u64, usize), ExecAbort> {
        let size = match mode {
            ExecMode::Boot => self.init.init_size,
            ExecMode::Event => {
                self.programs
                    .size_of(program)
                    .ok_or_else(|| ExecAbort::UnknownProgram {
                        program: program.to_string(),
                    })?
            }
        };
        let partition = self
            .partitions
            .allocate_best_fit(size)
            .ok_or_else(|| ExecAbort::NoPartition {
                program: program.to_string(),
                size,
            })?;
        Ok((size, partition))
    }

    fn load_and_run(
        &mut self,
        ctx: ProcessHandle,
        program: &str,
        duration: u64,
        size: u64,
        partition: usize,
        mode: ExecMode,
    ) -> Result<ExecOutcome, SimError> {
        if mode == ExecMode::Event {
            let parts = split_duration(duration, 4, &mut self.timing);
            self.step(parts[0], format!("EXEC: load {program} of size {size}Mb"))?;
            self.step(
                parts[1],
                format!("found partition {partition} with {size}Mb of space"),
            )?;
            self.step(parts[2], format!("partition {partition} marked as occupied"))?;
            self.step(parts[3], "updating PCB with new information")?;
            self.step(1, "scheduler called")?;
            self.log_line(1, "IRET")?;
        }

        self.partitions.mark_occupied(partition, program)?;
        let record_name = match mode {
            ExecMode::Boot => self.init.init_program.clone(),
            ExecMode::Event => program.to_string(),
        };
        self.processes.load_program(ctx, &record_name, size, partition);

        if mode == ExecMode::Event {
            self.snapshot()?;
            self.clock.advance(1)?;
        }

        let trace = self.traces.load(program)?;
        info!(
            program = %program,
            pid = self.processes.get(ctx).pid,
            partition,
            events = trace.value.len(),
            skipped = trace.rejected.len(),
            "装入程序"
        );
        // 嵌套 trace 中 fork 出的上下文不带回调用方
        self.run_trace(ctx, &trace.value)?;

        let resume = self.processes.parent(ctx).unwrap_or(ctx);
        Ok(ExecOutcome::Completed { resume })
    }

    fn abort(&mut self, reason: ExecAbort) -> ExecOutcome {
        error!(program = %reason.program(), "EXEC中止: {}", reason);
        self.aborts.push(reason.clone());
        ExecOutcome::Aborted(reason)
    }

    fn vector_steps(&mut self, vector: usize) -> Result<(), SimError> {
        if vector >= VECTOR_TABLE_SIZE {
            return Err(SimError::InvalidVector(vector));
        }
        self.step(
            1,
            format!("find vector {vector} in memory position 0x{:04X}", vector * 2),
        )?;
        let address = self.vectors.address(vector).unwrap_or_else(|| {
            warn!(vector, "向量表中没有该向量，按地址0处理");
            0
        });
        self.step(1, format!("load address 0X{address:04X} into the PC"))
    }

    /// IRET 与其后的快照共用一个时间单位
    fn iret_with_snapshot(&mut self) -> Result<(), SimError> {
        self.log_line(1, "IRET")?;
        self.snapshot()?;
        self.clock.advance(1)?;
        Ok(())
    }

    /// 写一行日志并把时钟推进 `duration`
    fn step(&mut self, duration: u64, description: impl Display) -> Result<(), SimError> {
        self.log_line(duration, description)?;
        self.clock.advance(duration)?;
        Ok(())
    }

    fn log_line(&mut self, duration: u64, description: impl Display) -> Result<(), SimError> {
        writeln!(self.exec_log, "{}, {}, {}", self.clock.now(), duration, description)?;
        self.lines += 1;
        Ok(())
    }

    fn snapshot(&mut self) -> Result<(), SimError> {
        self.status
            .snapshot(self.clock.now(), self.processes.non_root())?;
        Ok(())
    }

    /// 刷新执行日志
    pub fn flush(&mut self) -> Result<(), SimError> {
        self.exec_log.flush()?;
        Ok(())
    }

    #[inline(always)]
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub fn processes(&self) -> &ProcessTable {
        &self.processes
    }

    pub fn partitions(&self) -> &PartitionTable {
        &self.partitions
    }

    pub fn status(&self) -> &StatusLog {
        &self.status
    }

    /// 本次运行中被中止的 EXEC
    pub fn aborts(&self) -> &[ExecAbort] {
        &self.aborts
    }

    /// 已写入执行日志的行数
    pub fn lines_written(&self) -> usize {
        self.lines
    }

    pub fn exec_log(&self) -> &W {
        &self.exec_log
    }
}

#[cfg(test)]
mod tests {
    use super::timing::tests::{LowTiming, ScriptedTiming};
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const VECTORS: &str = "0X01E3\n0X029C\n0X0695\n0X042B\n0X0292\n0X048B\n0X0639\n0X00BD\n";

    fn simulator<T: TimingSource>(
        dir: &Path,
        programs: &str,
        timing: T,
    ) -> Simulator<Vec<u8>, T> {
        let config = SimConfig::default();
        Simulator::new(
            &config,
            ProgramRegistry::parse(programs).value,
            VectorTable::parse(VECTORS).value,
            TraceLoader::new(dir, config.trace.clone()),
            Vec::new(),
            StatusLog::new(dir.join("status.txt")),
            timing,
        )
    }

    fn log_text<T: TimingSource>(sim: &Simulator<Vec<u8>, T>) -> String {
        String::from_utf8(sim.exec_log().clone()).unwrap()
    }

    fn timestamps(text: &str) -> Vec<u64> {
        text.lines()
            .map(|line| line.split(',').next().unwrap().trim().parse().unwrap())
            .collect()
    }

    fn write_trace(dir: &TempDir, name: &str, body: &str) {
        fs::write(dir.path().join(name), body).unwrap();
    }

    fn child_of_root<T: TimingSource>(sim: &mut Simulator<Vec<u8>, T>) -> ProcessHandle {
        let root = sim.processes().root();
        sim.fork(root, 0).unwrap()
    }

    #[test]
    fn test_cpu_event() {
        let dir = tempfile::tempdir().unwrap();
        let mut sim = simulator(dir.path(), "", LowTiming);
        let ctx = child_of_root(&mut sim);
        sim.run_trace(ctx, &[TraceEvent::Cpu { duration: 50 }]).unwrap();
        assert_eq!(log_text(&sim), "1, 50, CPU execution\n");
        assert_eq!(sim.now(), 51);
        assert_eq!(sim.processes().get(ctx).cpu_time, 50);
    }

    #[test]
    fn test_syscall_steps_and_toggle() {
        let dir = tempfile::tempdir().unwrap();
        let mut sim = simulator(dir.path(), "", ScriptedTiming::new(&[10, 5, 2, 3, 0, 1]));
        let ctx = child_of_root(&mut sim);
        let events = [
            TraceEvent::Syscall { vector: 4, duration: 20 },
            TraceEvent::Syscall { vector: 4, duration: 4 },
        ];
        sim.run_trace(ctx, &events).unwrap();
        assert_eq!(
            log_text(&sim),
            "1, 1, switch to kernel mode\n\
             2, 2, context saved\n\
             4, 1, find vector 4 in memory position 0x0008\n\
             5, 1, load address 0X0292 into the PC\n\
             6, 10, SYSCALL: run the ISR\n\
             16, 5, transfer data\n\
             21, 5, check for errors\n\
             26, 1, IRET\n\
             27, 1, switch to kernel mode\n\
             28, 1, context saved\n\
             29, 1, find vector 4 in memory position 0x0008\n\
             30, 1, load address 0X0292 into the PC\n\
             31, 3, SYSCALL: run the ISR\n\
             34, 0, transfer data to display\n\
             34, 1, check for errors\n\
             35, 1, IRET\n"
        );
        assert_eq!(sim.now(), 36);
        // 根 fork + 两次 SYSCALL
        assert_eq!(sim.status().snapshots(), 3);
    }

    #[test]
    fn test_end_io_steps() {
        let dir = tempfile::tempdir().unwrap();
        let mut sim = simulator(dir.path(), "", LowTiming);
        let ctx = child_of_root(&mut sim);
        sim.run_trace(ctx, &[TraceEvent::EndIo { vector: 7, duration: 40 }])
            .unwrap();
        assert_eq!(
            log_text(&sim),
            "1, 1, check priority of interrupt\n\
             2, 1, check if masked\n\
             3, 1, switch to kernel mode\n\
             4, 3, context saved\n\
             7, 1, find vector 7 in memory position 0x000E\n\
             8, 1, load address 0X00BD into the PC\n\
             9, 40, END_IO\n\
             49, 1, IRET\n"
        );
        assert_eq!(sim.now(), 50);
        assert_eq!(sim.processes().get(ctx).io_time, 40);
    }

    #[test]
    fn test_fork_event_switches_context() {
        let dir = tempfile::tempdir().unwrap();
        let mut sim = simulator(dir.path(), "", ScriptedTiming::new(&[6]));
        let ctx = child_of_root(&mut sim);
        let end = sim.run_trace(ctx, &[TraceEvent::Fork { duration: 10 }]).unwrap();
        assert_eq!(
            log_text(&sim),
            "1, 1, switch to kernel mode\n\
             2, 3, context saved\n\
             5, 1, find vector 2 in memory position 0x0004\n\
             6, 1, load address 0X0695 into the PC\n\
             7, 6, FORK: copy parent PCB to child PCB\n\
             13, 4, scheduler called\n\
             17, 1, IRET\n"
        );
        assert_eq!(sim.now(), 18);
        assert_eq!(sim.processes().get(end).pid, 12);
        assert_eq!(sim.processes().parent(end), Some(ctx));
    }

    #[test]
    fn test_fork_from_root_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let mut sim = simulator(dir.path(), "", LowTiming);
        let root = sim.processes().root();
        let end = sim.run_trace(root, &[TraceEvent::Fork { duration: 10 }]).unwrap();
        assert_eq!(sim.lines_written(), 0);
        assert_eq!(sim.now(), 1);
        assert_eq!(sim.status().snapshots(), 1);
        assert_eq!(sim.processes().get(end).pid, 11);
    }

    #[test]
    fn test_missing_vector_reports_zero_address() {
        let dir = tempfile::tempdir().unwrap();
        let mut sim = simulator(dir.path(), "", LowTiming);
        let ctx = child_of_root(&mut sim);
        sim.run_trace(ctx, &[TraceEvent::EndIo { vector: 200, duration: 1 }])
            .unwrap();
        assert!(log_text(&sim).contains("load address 0X0000 into the PC"));
        assert!(log_text(&sim).contains("find vector 200 in memory position 0x0190"));
    }

    #[test]
    fn test_vector_beyond_table_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut sim = simulator(dir.path(), "", LowTiming);
        let ctx = child_of_root(&mut sim);
        let result = sim.run_trace(
            ctx,
            &[TraceEvent::EndIo {
                vector: 9_223_372_036_854_775_808,
                duration: 1,
            }],
        );
        assert!(matches!(result, Err(SimError::InvalidVector(_))));
    }

    #[test]
    fn test_clock_overflow_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut sim = simulator(dir.path(), "", LowTiming);
        let ctx = child_of_root(&mut sim);
        let events = [
            TraceEvent::Cpu { duration: u64::MAX },
            TraceEvent::Cpu { duration: 1 },
        ];
        assert!(matches!(
            sim.run_trace(ctx, &events),
            Err(SimError::Clock(ClockOverflow { now: 1, .. }))
        ));
        assert_eq!(sim.now(), 1);
    }

    #[test]
    fn test_fork_past_max_pid_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SimConfig::default();
        config.process.init_pid = u32::MAX;
        let mut sim = Simulator::new(
            &config,
            ProgramRegistry::default(),
            VectorTable::parse(VECTORS).value,
            TraceLoader::new(dir.path(), config.trace.clone()),
            Vec::new(),
            StatusLog::new(dir.path().join("status.txt")),
            LowTiming,
        );
        assert!(matches!(
            sim.boot("trace.txt"),
            Err(SimError::Process(ProcessError::PidOverflow { pid: u32::MAX }))
        ));
    }

    #[test]
    fn test_exec_loads_program_and_returns_to_parent() {
        let dir = tempfile::tempdir().unwrap();
        write_trace(&dir, "alpha.txt", "CPU, 5\n");
        let mut sim = simulator(dir.path(), "alpha, 3\n", ScriptedTiming::new(&[2, 1, 0, 1]));
        let root = sim.processes().root();
        let child = sim.fork(root, 0).unwrap();

        let outcome = sim.exec(child, "alpha", 8).unwrap();
        assert_eq!(outcome, ExecOutcome::Completed { resume: root });
        assert_eq!(
            log_text(&sim),
            "1, 1, switch to kernel mode\n\
             2, 2, context saved\n\
             4, 1, find vector 3 in memory position 0x0006\n\
             5, 1, load address 0X042B into the PC\n\
             6, 1, EXEC: load alpha of size 3Mb\n\
             7, 0, found partition 5 with 3Mb of space\n\
             7, 1, partition 5 marked as occupied\n\
             8, 6, updating PCB with new information\n\
             14, 1, scheduler called\n\
             15, 1, IRET\n\
             16, 5, CPU execution\n"
        );
        let record = sim.processes().get(child);
        assert_eq!(record.program_name, "alpha");
        assert_eq!(record.program_size, 3);
        assert_eq!(record.partition_number, 5);
        assert_eq!(
            sim.partitions().get(5).unwrap().occupant,
            Occupant::Program("alpha".to_string())
        );
    }

    #[test]
    fn test_snapshot_after_fork_and_exec() {
        let dir = tempfile::tempdir().unwrap();
        write_trace(&dir, "alpha.txt", "");
        let mut sim = simulator(dir.path(), "alpha, 3\n", LowTiming);
        let child = child_of_root(&mut sim);
        sim.exec(child, "alpha", 0).unwrap();

        let text = fs::read_to_string(sim.status().path()).unwrap();
        let last = text.rsplit("Save Time:").next().unwrap();
        let rows: Vec<&str> = last.lines().filter(|l| l.starts_with("| 1")).collect();
        assert_eq!(rows, vec!["| 11   | alpha        | 5                | 3    |"]);
    }

    #[test]
    fn test_unknown_program_aborts_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut sim = simulator(dir.path(), "alpha, 3\n", LowTiming);
        let ctx = child_of_root(&mut sim);
        let events = [
            TraceEvent::Exec { program: "ghost".to_string(), duration: 30 },
            TraceEvent::Cpu { duration: 4 },
        ];
        let end = sim.run_trace(ctx, &events).unwrap();

        assert_eq!(
            sim.aborts(),
            &[ExecAbort::UnknownProgram { program: "ghost".to_string() }]
        );
        assert_eq!(log_text(&sim), "1, 4, CPU execution\n");
        assert_eq!(end, ctx);
        assert_eq!(sim.partitions().occupied_count(), 0);
        assert_eq!(sim.processes().len(), 2);
    }

    #[test]
    fn test_no_partition_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let mut sim = simulator(dir.path(), "huge, 41\n", LowTiming);
        let ctx = child_of_root(&mut sim);
        let outcome = sim.exec(ctx, "huge", 10).unwrap();
        assert_eq!(
            outcome,
            ExecOutcome::Aborted(ExecAbort::NoPartition { program: "huge".to_string(), size: 41 })
        );
        assert!(outcome.is_aborted());
        assert_eq!(sim.lines_written(), 0);
        assert_eq!(sim.now(), 1);
    }

    #[test]
    fn test_partitions_exhaust_after_repeated_exec() {
        let dir = tempfile::tempdir().unwrap();
        write_trace(&dir, "tiny.txt", "");
        let mut sim = simulator(dir.path(), "tiny, 1\n", LowTiming);
        let ctx = child_of_root(&mut sim);
        let events: Vec<TraceEvent> = (0..7)
            .map(|_| TraceEvent::Exec { program: "tiny".to_string(), duration: 0 })
            .collect();
        sim.run_trace(ctx, &events).unwrap();
        assert_eq!(sim.partitions().occupied_count(), 6);
        assert_eq!(sim.aborts().len(), 1);
    }

    #[test]
    fn test_nested_fork_stays_in_nested_trace() {
        let dir = tempfile::tempdir().unwrap();
        write_trace(&dir, "shell.txt", "FORK, 2\nCPU, 1\n");
        let mut sim = simulator(dir.path(), "shell, 4\n", LowTiming);
        let root = sim.processes().root();
        let a = sim.fork(root, 0).unwrap();
        let b = sim.fork(a, 0).unwrap();

        let events = [
            TraceEvent::Exec { program: "shell".to_string(), duration: 0 },
            TraceEvent::Cpu { duration: 1 },
        ];
        let end = sim.run_trace(b, &events).unwrap();
        // 嵌套 trace 里 fork 出 pid 13，但调用方回到 b 的父进程 a
        assert_eq!(end, a);
        let pids: Vec<u32> = sim.processes().non_root().map(|r| r.pid).collect();
        assert_eq!(pids, vec![11, 12, 13]);
    }

    #[test]
    fn test_boot_runs_root_trace_silently() {
        let dir = tempfile::tempdir().unwrap();
        write_trace(&dir, "trace.txt", "CPU, 10\n");
        let mut sim = simulator(dir.path(), "", LowTiming);
        let end = sim.boot("trace.txt").unwrap();

        assert_eq!(end, sim.processes().root());
        assert_eq!(log_text(&sim), "0, 10, CPU execution\n");
        let init = sim.processes().non_root().next().unwrap();
        assert_eq!(init.pid, 11);
        assert_eq!(init.program_name, "init");
        assert_eq!(init.partition_number, 6);
        assert_eq!(
            sim.partitions().get(6).unwrap().occupant,
            Occupant::Program("trace.txt".to_string())
        );
        assert_eq!(sim.status().snapshots(), 1);
    }

    #[test]
    fn test_boot_missing_trace_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut sim = simulator(dir.path(), "", LowTiming);
        assert!(matches!(sim.boot("absent.txt"), Err(SimError::Load(_))));
    }

    #[test]
    fn test_clock_monotonic_with_random_timing() {
        let dir = tempfile::tempdir().unwrap();
        write_trace(
            &dir,
            "trace.txt",
            "CPU, 13\nSYSCALL 2, 77\nFORK, 9\nEXEC program1, 31\nEND_IO 5, 40\nSYSCALL 3, 0\nCPU, 2\n",
        );
        fs::create_dir_all(dir.path().join("additionalFiles")).unwrap();
        fs::write(
            dir.path().join("additionalFiles/program1.txt"),
            "CPU, 6\nSYSCALL 4, 19\nEND_IO 4, 8\n",
        )
        .unwrap();
        for seed in 0..20 {
            let mut sim = simulator(dir.path(), "program1, 10\n", SeededTiming::new(seed));
            sim.boot("trace.txt").unwrap();
            let stamps = timestamps(&log_text(&sim));
            assert!(stamps.windows(2).all(|w| w[0] <= w[1]), "seed {seed}");

            // 每行的时间戳加时长不超过最终时钟
            let text = log_text(&sim);
            for line in text.lines() {
                let mut fields = line.split(", ");
                let t: u64 = fields.next().unwrap().parse().unwrap();
                let d: u64 = fields.next().unwrap().parse().unwrap();
                assert!(t + d <= sim.now());
            }
        }
    }
}
