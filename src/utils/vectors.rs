//! 中断向量表

use std::path::Path;

use super::{LoadError, Parsed, RejectReason, numbered_lines, read_input, reject};
use crate::const_values::VECTOR_TABLE_SIZE;

/// 向量号 -> ISR 地址
#[derive(Debug, Clone, Default)]
pub struct VectorTable {
    entries: Vec<u32>,
}

impl VectorTable {
    /// 每行一个十六进制地址，依次占用下标 0, 1, 2...；无效行不占用下标
    pub fn parse(text: &str) -> Parsed<Self> {
        let mut entries = Vec::new();
        let mut rejected = Vec::new();
        for (line_no, line) in numbered_lines(text) {
            match parse_hex(line) {
                Some(_) if entries.len() >= VECTOR_TABLE_SIZE => {
                    reject(&mut rejected, line_no, line, RejectReason::Overflow)
                }
                Some(addr) => entries.push(addr),
                None => reject(&mut rejected, line_no, line, RejectReason::Unrecognized),
            }
        }
        Parsed {
            value: Self { entries },
            rejected,
        }
    }

    pub fn address(&self, vector: usize) -> Option<u32> {
        self.entries.get(vector).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_hex(text: &str) -> Option<u32> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u32::from_str_radix(digits, 16).ok()
}

pub fn load_vector_table(path: impl AsRef<Path>) -> Result<Parsed<VectorTable>, LoadError> {
    let text = read_input(path.as_ref())?;
    Ok(VectorTable::parse(&text))
}
