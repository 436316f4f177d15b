//! EXEC 中止原因

use thiserror::Error;

/// 可恢复的 EXEC 失败：该事件被跳过，trace 继续执行下一事件
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecAbort {
    #[error("外部程序表中找不到程序 {program}")]
    UnknownProgram { program: String },

    #[error("没有能容纳程序 {program} ({size}Mb) 的空闲分区")]
    NoPartition { program: String, size: u64 },
}

impl ExecAbort {
    pub fn program(&self) -> &str {
        match self {
            ExecAbort::UnknownProgram { program } | ExecAbort::NoPartition { program, .. } => {
                program
            }
        }
    }
}
