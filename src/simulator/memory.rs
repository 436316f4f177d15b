//! 固定分区内存管理模块

use std::fmt;

use thiserror::Error;

/// 内存错误类型
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("分区号越界: {number}, 共 {count} 个分区")]
    InvalidPartition { number: usize, count: usize },
}

/// 分区占用状态
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Occupant {
    #[default]
    Free,
    Program(String),
}

impl fmt::Display for Occupant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Occupant::Free => write!(f, "free"),
            Occupant::Program(name) => write!(f, "{name}"),
        }
    }
}

/// 单个内存分区
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryPartition {
    /// 分区号，从 1 开始
    pub number: usize,
    /// 容量 (Mb)
    pub size: u64,
    pub occupant: Occupant,
}

impl MemoryPartition {
    pub fn is_free(&self) -> bool {
        self.occupant == Occupant::Free
    }
}

/// 分区表：数量和容量在整个运行期间固定，只有占用状态会从空闲变为占用
#[derive(Debug, Clone)]
pub struct PartitionTable {
    partitions: Vec<MemoryPartition>,
}

impl PartitionTable {
    /// 按声明顺序建表，分区号依次为 1, 2, 3...
    pub fn new(capacities: &[u64]) -> Self {
        let partitions = capacities
            .iter()
            .enumerate()
            .map(|(i, &size)| MemoryPartition {
                number: i + 1,
                size,
                occupant: Occupant::Free,
            })
            .collect();
        Self { partitions }
    }

    /// 最佳适配：在所有容量足够的空闲分区中选容量最小者，容量相同时取分区号最小者。
    /// 只查找，不修改分区表
    pub fn allocate_best_fit(&self, requested: u64) -> Option<usize> {
        let mut best: Option<&MemoryPartition> = None;
        for partition in &self.partitions {
            if !partition.is_free() || partition.size < requested {
                continue;
            }
            if best.is_none_or(|b| partition.size < b.size) {
                best = Some(partition);
            }
        }
        best.map(|p| p.number)
    }

    /// 无条件写入占用者，调用方须先经 `allocate_best_fit` 确认分区空闲
    pub fn mark_occupied(&mut self, number: usize, program: &str) -> Result<(), MemoryError> {
        let count = self.partitions.len();
        let partition = number
            .checked_sub(1)
            .and_then(|i| self.partitions.get_mut(i))
            .ok_or(MemoryError::InvalidPartition { number, count })?;
        partition.occupant = Occupant::Program(program.to_string());
        Ok(())
    }

    pub fn get(&self, number: usize) -> Option<&MemoryPartition> {
        number.checked_sub(1).and_then(|i| self.partitions.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemoryPartition> {
        self.partitions.iter()
    }

    pub fn occupied_count(&self) -> usize {
        self.partitions.iter().filter(|p| !p.is_free()).count()
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}
