//! 随机时长来源与时长拆分

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// 模拟器的随机时长来源，测试中可替换为固定脚本
pub trait TimingSource {
    /// 返回闭区间 `[low, high]` 内的一个值，要求 `low <= high`
    fn pick(&mut self, low: u64, high: u64) -> u64;
}

/// 基于 ChaCha8 的可复现随机来源
#[derive(Debug, Clone)]
pub struct SeededTiming {
    seed: u64,
    rng: ChaCha8Rng,
}

impl SeededTiming {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl TimingSource for SeededTiming {
    fn pick(&mut self, low: u64, high: u64) -> u64 {
        self.rng.gen_range(low..=high)
    }
}

/// 把 `total` 拆成 `parts` 段非负整数，总和严格等于 `total`。
/// 第 i 段从剩余预算中取，最后一段取走全部余量
pub fn split_duration(total: u64, parts: usize, source: &mut impl TimingSource) -> Vec<u64> {
    let mut out = Vec::with_capacity(parts);
    if parts == 0 {
        return out;
    }
    let mut remaining = total;
    for _ in 0..parts - 1 {
        let part = source.pick(0, remaining);
        remaining -= part;
        out.push(part);
    }
    out.push(remaining);
    out
}
