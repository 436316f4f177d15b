//! trace 文件解析

use std::path::PathBuf;

use super::{LoadError, Parsed, RejectReason, numbered_lines, read_input, reject};
use crate::const_values::{EXEC_VECTOR, FORK_VECTOR, MAX_DURATION, TraceConfig, VECTOR_TABLE_SIZE};

/// trace 中的一条事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    Cpu { duration: u64 },
    Syscall { vector: usize, duration: u64 },
    EndIo { vector: usize, duration: u64 },
    Fork { duration: u64 },
    Exec { program: String, duration: u64 },
}

impl TraceEvent {
    /// 事件使用的中断向量，CPU 事件没有向量
    pub fn vector(&self) -> Option<usize> {
        match self {
            TraceEvent::Cpu { .. } => None,
            TraceEvent::Syscall { vector, .. } | TraceEvent::EndIo { vector, .. } => Some(*vector),
            TraceEvent::Fork { .. } => Some(FORK_VECTOR),
            TraceEvent::Exec { .. } => Some(EXEC_VECTOR),
        }
    }
}

/// 解析单行事件
///
/// 支持的格式:
/// - `CPU, <duration>`
/// - `SYSCALL <vector>, <duration>`
/// - `END_IO <vector>, <duration>`
/// - `FORK, <duration>`
/// - `EXEC <program_name>, <duration>`
///
/// 时长不得超过 [`MAX_DURATION`]，向量号必须小于 [`VECTOR_TABLE_SIZE`]，
/// 否则返回 [`RejectReason::OutOfRange`]。
pub fn parse_event(line: &str) -> Result<TraceEvent, RejectReason> {
    use RejectReason::{OutOfRange, Unrecognized};

    let (head, tail) = line.split_once(',').ok_or(Unrecognized)?;
    let duration: u64 = tail.trim().parse().map_err(|_| Unrecognized)?;
    let head = head.trim();

    let mut words = head.split_whitespace();
    let keyword = words.next().ok_or(Unrecognized)?;
    let event = match keyword {
        "CPU" | "FORK" => {
            if words.next().is_some() {
                return Err(Unrecognized);
            }
            if keyword == "CPU" {
                TraceEvent::Cpu { duration }
            } else {
                TraceEvent::Fork { duration }
            }
        }
        "SYSCALL" | "END_IO" => {
            let vector: usize = words
                .next()
                .and_then(|word| word.parse().ok())
                .ok_or(Unrecognized)?;
            if words.next().is_some() {
                return Err(Unrecognized);
            }
            if keyword == "SYSCALL" {
                TraceEvent::Syscall { vector, duration }
            } else {
                TraceEvent::EndIo { vector, duration }
            }
        }
        "EXEC" => {
            // 程序名可以包含空格，取关键字之后到逗号之前的全部内容
            let program = head[keyword.len()..].trim();
            if program.is_empty() {
                return Err(Unrecognized);
            }
            TraceEvent::Exec {
                program: program.to_string(),
                duration,
            }
        }
        _ => return Err(Unrecognized),
    };

    if duration > MAX_DURATION || event.vector().is_some_and(|v| v >= VECTOR_TABLE_SIZE) {
        return Err(OutOfRange);
    }
    Ok(event)
}

/// 解析整个 trace 文本，无效的行被报告并跳过
pub fn parse_trace(text: &str) -> Parsed<Vec<TraceEvent>> {
    let mut events = Vec::new();
    let mut rejected = Vec::new();
    for (line_no, line) in numbered_lines(text) {
        match parse_event(line) {
            Ok(event) => events.push(event),
            Err(reason) => reject(&mut rejected, line_no, line, reason),
        }
    }
    Parsed {
        value: events,
        rejected,
    }
}

/// 根据程序名定位并读取 trace 文件
#[derive(Debug, Clone)]
pub struct TraceLoader {
    base_dir: PathBuf,
    config: TraceConfig,
}

impl TraceLoader {
    pub fn new(base_dir: impl Into<PathBuf>, config: TraceConfig) -> Self {
        Self {
            base_dir: base_dir.into(),
            config,
        }
    }

    /// 文件名解析规则:
    /// 1. 已带扩展名的按原样打开
    /// 2. 带保留前缀的放在保留目录下并补扩展名
    /// 3. 其余补扩展名
    pub fn resolve(&self, name: &str) -> PathBuf {
        let suffix = format!(".{}", self.config.extension);
        if name.ends_with(&suffix) {
            self.base_dir.join(name)
        } else if name.starts_with(&self.config.reserved_prefix) {
            self.base_dir
                .join(&self.config.reserved_dir)
                .join(format!("{name}{suffix}"))
        } else {
            self.base_dir.join(format!("{name}{suffix}"))
        }
    }

    pub fn load(&self, name: &str) -> Result<Parsed<Vec<TraceEvent>>, LoadError> {
        let path = self.resolve(name);
        tracing::debug!(program = %name, path = %path.display(), "加载trace文件");
        let text = read_input(&path)?;
        Ok(parse_trace(&text))
    }
}
