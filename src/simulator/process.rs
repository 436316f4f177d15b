//! 进程控制块 (PCB) 表
//!
//! 所有记录按创建顺序存放在一个只增不减的数组中，父进程通过下标引用。
//! 子进程 pid 由直接父进程的 pid 加一得到，而非全局计数器，
//! 因此从两个 pid 相同的记录分别 fork 会得到两个 pid 相同的子进程。

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProcessError {
    #[error("pid {pid} 无法再 fork 子进程")]
    PidOverflow { pid: u32 },
}

/// 进程记录在表中的下标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessHandle(usize);

impl ProcessHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 进程控制块
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    pub pid: u32,
    pub program_name: String,
    pub program_size: u64,
    /// 所在分区号，完成 EXEC 之后才有意义
    pub partition_number: usize,
    pub cpu_time: u64,
    pub io_time: u64,
    pub remaining_cpu_time: u64,
    /// 父进程，只用于返回控制权
    pub parent: Option<ProcessHandle>,
}

/// 进程表，根记录 (下标 0) 在创建时就存在
#[derive(Debug, Clone)]
pub struct ProcessTable {
    records: Vec<ProcessRecord>,
}

impl ProcessTable {
    pub fn new(pid: u32, program_name: &str, program_size: u64, partition_number: usize) -> Self {
        let root = ProcessRecord {
            pid,
            program_name: program_name.to_string(),
            program_size,
            partition_number,
            cpu_time: 0,
            io_time: 0,
            remaining_cpu_time: 0,
            parent: None,
        };
        Self {
            records: vec![root],
        }
    }

    pub fn root(&self) -> ProcessHandle {
        ProcessHandle(0)
    }

    /// 复制 `current` 生成子进程并追加到表尾，返回子进程句柄。
    /// 不推进时钟，也不写日志
    pub fn fork(&mut self, current: ProcessHandle) -> Result<ProcessHandle, ProcessError> {
        let parent = &self.records[current.0];
        let pid = parent
            .pid
            .checked_add(1)
            .ok_or(ProcessError::PidOverflow { pid: parent.pid })?;
        let child = ProcessRecord {
            pid,
            parent: Some(current),
            ..parent.clone()
        };
        self.records.push(child);
        Ok(ProcessHandle(self.records.len() - 1))
    }

    /// EXEC 成功后更新程序信息
    pub fn load_program(
        &mut self,
        handle: ProcessHandle,
        program_name: &str,
        program_size: u64,
        partition_number: usize,
    ) {
        let record = &mut self.records[handle.0];
        record.program_name = program_name.to_string();
        record.program_size = program_size;
        record.partition_number = partition_number;
    }

    pub fn add_cpu_time(&mut self, handle: ProcessHandle, duration: u64) {
        let record = &mut self.records[handle.0];
        record.cpu_time = record.cpu_time.saturating_add(duration);
    }

    pub fn add_io_time(&mut self, handle: ProcessHandle, duration: u64) {
        let record = &mut self.records[handle.0];
        record.io_time = record.io_time.saturating_add(duration);
    }

    pub fn get(&self, handle: ProcessHandle) -> &ProcessRecord {
        &self.records[handle.0]
    }

    pub fn parent(&self, handle: ProcessHandle) -> Option<ProcessHandle> {
        self.records[handle.0].parent
    }

    /// 除根记录外的全部记录，按创建顺序
    pub fn non_root(&self) -> impl Iterator<Item = &ProcessRecord> {
        self.records.iter().skip(1)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
