//! 外部程序表：程序名 -> 程序大小 (Mb)

use std::path::Path;

use rustc_hash::FxHashMap;

use super::{LoadError, Parsed, RejectReason, numbered_lines, read_input, reject};

/// 外部程序表，启动时加载一次，之后只读
#[derive(Debug, Clone, Default)]
pub struct ProgramRegistry {
    sizes: FxHashMap<String, u64>,
}

impl ProgramRegistry {
    /// 每行格式为 `<program_name>, <size>`，重名时以先声明者为准
    pub fn parse(text: &str) -> Parsed<Self> {
        let mut registry = Self::default();
        let mut rejected = Vec::new();
        for (line_no, line) in numbered_lines(text) {
            let Some((name, size)) = parse_entry(line) else {
                reject(&mut rejected, line_no, line, RejectReason::Unrecognized);
                continue;
            };
            if registry.sizes.contains_key(name) {
                reject(&mut rejected, line_no, line, RejectReason::Duplicate);
                continue;
            }
            registry.sizes.insert(name.to_string(), size);
        }
        Parsed {
            value: registry,
            rejected,
        }
    }

    pub fn size_of(&self, program: &str) -> Option<u64> {
        self.sizes.get(program).copied()
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

fn parse_entry(line: &str) -> Option<(&str, u64)> {
    let (name, size) = line.split_once(',')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name, size.trim().parse().ok()?))
}

/// 从文件加载外部程序表
pub fn load_programs(path: impl AsRef<Path>) -> Result<Parsed<ProgramRegistry>, LoadError> {
    let text = read_input(path.as_ref())?;
    Ok(ProgramRegistry::parse(&text))
}
