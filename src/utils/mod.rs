//! 工具模块：trace、外部程序表、向量表等输入文件的读取

pub mod printer;
pub mod programs;
pub mod trace;
pub mod vectors;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use printer::print_trace;
pub use programs::{ProgramRegistry, load_programs};
pub use trace::{TraceEvent, TraceLoader, parse_trace};
pub use vectors::{VectorTable, load_vector_table};

/// 输入文件加载错误（均为致命错误）
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("无法打开文件 {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// 行被丢弃的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// 无法识别的行格式
    Unrecognized,
    /// 外部程序表中的重复名称
    Duplicate,
    /// 超出向量表容量
    Overflow,
    /// 格式正确，但时长或向量号超出允许范围
    OutOfRange,
}

/// 被跳过的输入行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedLine {
    /// 行号 (从 1 开始)
    pub line_no: usize,
    pub text: String,
    pub reason: RejectReason,
}

/// 解析结果：有效内容 + 被跳过的行
#[derive(Debug, Clone)]
pub struct Parsed<T> {
    pub value: T,
    pub rejected: Vec<RejectedLine>,
}

/// 按行遍历，跳过空行；行号从 1 开始
fn numbered_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
}

fn reject(rejected: &mut Vec<RejectedLine>, line_no: usize, text: &str, reason: RejectReason) {
    tracing::warn!(line = line_no, text = %text, ?reason, "跳过无效行");
    rejected.push(RejectedLine {
        line_no,
        text: text.to_string(),
        reason,
    });
}

fn read_input(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}
