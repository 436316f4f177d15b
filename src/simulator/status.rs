//! 系统状态快照日志

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::process::ProcessRecord;

const OUTER_RULE: &str = "!----------------------------------------------------------!";
const TABLE_RULE: &str = "+-----------------------------------------------+";

/// 快照日志：第一次写入时截断文件，之后追加
#[derive(Debug)]
pub struct StatusLog {
    path: PathBuf,
    file: Option<File>,
    snapshots: usize,
}

impl StatusLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            snapshots: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 已写入的快照数
    pub fn snapshots(&self) -> usize {
        self.snapshots
    }

    /// 写入一张快照，`records` 为除根记录外的全部进程
    pub fn snapshot<'a>(
        &mut self,
        time: u64,
        records: impl IntoIterator<Item = &'a ProcessRecord>,
    ) -> io::Result<()> {
        let text = render_snapshot(time, records);
        let file = match self.file.take() {
            Some(file) => file,
            None => {
                if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
                    fs::create_dir_all(dir)?;
                }
                File::create(&self.path)?
            }
        };
        self.file.insert(file).write_all(text.as_bytes())?;
        self.snapshots += 1;
        Ok(())
    }
}

/// 渲染快照表格
pub fn render_snapshot<'a>(
    time: u64,
    records: impl IntoIterator<Item = &'a ProcessRecord>,
) -> String {
    let mut out = String::new();
    // 写入 String 不会失败
    let _ = writeln!(out, "{OUTER_RULE}");
    let _ = writeln!(out, "Save Time: {time} ms");
    let _ = writeln!(out, "{TABLE_RULE}");
    let _ = writeln!(out, "| PID  | Program Name | Partition Number | Size |");
    let _ = writeln!(out, "{TABLE_RULE}");
    for record in records {
        let _ = writeln!(
            out,
            "| {:<4} | {:<12} | {:<16} | {:<4} |",
            record.pid, record.program_name, record.partition_number, record.program_size
        );
    }
    let _ = writeln!(out, "{TABLE_RULE}");
    let _ = writeln!(out, "{OUTER_RULE}");
    out
}
