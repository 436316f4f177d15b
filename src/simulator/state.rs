//! 模拟时钟与执行状态

use thiserror::Error;

use super::exception::ExecAbort;
use super::process::ProcessHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("时钟溢出: {now} + {duration}")]
pub struct ClockOverflow {
    pub now: u64,
    pub duration: u64,
}

/// 全局模拟时钟 (单位: ms)，只增不减
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimClock {
    now: u64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn now(&self) -> u64 {
        self.now
    }

    #[inline(always)]
    pub fn advance(&mut self, duration: u64) -> Result<(), ClockOverflow> {
        self.now = self.now.checked_add(duration).ok_or(ClockOverflow {
            now: self.now,
            duration,
        })?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// trace 中的 EXEC 事件
    Event,
    /// 启动时装入根 trace：大小固定、不写日志、不拍快照
    Boot,
}

/// EXEC 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    /// 嵌套 trace 执行完毕，调用方从 `resume` 继续
    Completed { resume: ProcessHandle },
    /// 未做任何修改即中止，调用方保持原上下文
    Aborted(ExecAbort),
}

impl ExecOutcome {
    pub fn is_aborted(&self) -> bool {
        matches!(self, ExecOutcome::Aborted(_))
    }
}
