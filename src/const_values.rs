use anyhow::{self, Context};
use serde::Deserialize;
use std::path::Path;

/// FORK 事件隐含的中断向量号
pub const FORK_VECTOR: usize = 2;
/// EXEC 事件隐含的中断向量号
pub const EXEC_VECTOR: usize = 3;
/// 向量表最大表项数，trace 中的向量号必须小于该值
pub const VECTOR_TABLE_SIZE: usize = 256;
/// trace 中单个事件允许的最大时长 (ms)
pub const MAX_DURATION: u64 = u32::MAX as u64;

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MemoryConfig {
    /// 各分区容量 (Mb)，分区号即声明位置 (从 1 开始)
    pub partitions: Vec<u64>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            partitions: vec![40, 25, 15, 10, 8, 2],
        }
    }
}

/// 根进程 (init 模板) 的初始值
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ProcessConfig {
    pub init_pid: u32,
    pub init_program: String,
    pub init_size: u64,
    pub init_partition: usize,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            init_pid: 10,
            init_program: "init".to_string(),
            init_size: 1,
            init_partition: 6,
        }
    }
}

/// trace 文件名解析规则
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct TraceConfig {
    pub extension: String,
    pub reserved_prefix: String,
    pub reserved_dir: String,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            extension: "txt".to_string(),
            reserved_prefix: "program".to_string(),
            reserved_dir: "additionalFiles".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub status_log: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            status_log: "logs/system_status.txt".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct SimulationConfig {
    /// 随机种子，缺省时每次运行重新生成
    pub seed: Option<u64>,
}

/// 模拟器配置（来自 profile/config.toml），各节均可省略
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct SimConfig {
    pub memory: MemoryConfig,
    pub process: ProcessConfig,
    pub trace: TraceConfig,
    pub output: OutputConfig,
    pub simulation: SimulationConfig,
}

impl SimConfig {
    pub fn new(path: impl AsRef<Path>) -> anyhow::Result<SimConfig> {
        let toml_str = std::fs::read_to_string(&path)
            .with_context(|| format!("无法读取配置文件: {:?}", &path.as_ref().as_os_str()))?;
        let config: SimConfig = toml::from_str(&toml_str)
            .with_context(|| format!("无法解析配置文件: {:?}", &path.as_ref().as_os_str()))?;
        config
            .validate()
            .with_context(|| format!("配置文件无效: {:?}", &path.as_ref().as_os_str()))?;
        anyhow::Ok(config)
    }

    /// 检查各节之间的约束
    pub fn validate(&self) -> anyhow::Result<()> {
        let count = self.memory.partitions.len();
        anyhow::ensure!(count > 0, "至少需要一个内存分区");
        anyhow::ensure!(
            (1..=count).contains(&self.process.init_partition),
            "init_partition {} 不在 1..={} 范围内",
            self.process.init_partition,
            count
        );
        // 每次 fork 子进程 pid 加一，至少要给 init 留出一个
        anyhow::ensure!(
            self.process.init_pid < u32::MAX,
            "init_pid {} 过大",
            self.process.init_pid
        );
        Ok(())
    }
}
