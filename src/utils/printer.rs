//! 执行日志回显

use std::path::Path;

use colored::Colorize;

use super::{LoadError, read_input};

fn line_label(index: usize) -> String {
    format!("Execution Trace Line {index}:")
}

/// 将执行日志逐行打印到标准输出
pub fn print_trace(path: impl AsRef<Path>) -> Result<usize, LoadError> {
    let text = read_input(path.as_ref())?;
    let mut count = 0;
    for (i, line) in text.lines().enumerate() {
        println!("{} {}", line_label(i).cyan(), line);
        count += 1;
    }
    Ok(count)
}
