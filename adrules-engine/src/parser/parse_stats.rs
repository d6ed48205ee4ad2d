//! 解析统计：逐行结果计数，按源累计后汇总进 RunStats

use super::LineOutcome;

/// 规则解析统计信息
/// 记录解析过程中的各类行数：
/// 1. 总行数 / 空行与注释
/// 2. 有效规则数
/// 3. 语法无效与不支持的规则数
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ParseStats {
    /// 读入的总行数
    pub total_lines: u64,
    /// 空行、注释、列表头
    pub skipped_lines: u64,
    /// 解析出规范化规则的行数
    pub accepted: u64,
    /// 语法无效的行数（已丢弃）
    pub invalid: u64,
    /// 语法有效但无法在目标格式中表达的行数（已丢弃）
    pub unsupported: u64,
}

impl ParseStats {
    /// 记录单行结果
    pub fn record(&mut self, outcome: &LineOutcome) {
        self.total_lines += 1;
        match outcome {
            LineOutcome::Rule(_) => self.accepted += 1,
            LineOutcome::Skipped => self.skipped_lines += 1,
            LineOutcome::Invalid(_) => self.invalid += 1,
            LineOutcome::Unsupported(_) => self.unsupported += 1,
        }
    }

    /// 非空非注释的原始规则行数
    pub fn raw_rules(&self) -> u64 {
        self.total_lines - self.skipped_lines
    }

    /// 累加另一批次的统计
    pub fn merge(&mut self, other: &ParseStats) {
        self.total_lines += other.total_lines;
        self.skipped_lines += other.skipped_lines;
        self.accepted += other.accepted;
        self.invalid += other.invalid;
        self.unsupported += other.unsupported;
    }

    /// 格式化输出统计信息（结构化日志）
    /// 参数：label - 批次标识（通常是源名称），total_time - 解析耗时
    pub fn print_stats(&self, label: &str, total_time: std::time::Duration) {
        log::debug!(
            "Parse completed [{}] | Time: {:?} | Lines: {} | Skipped: {} | Accepted: {} | Invalid: {} | Unsupported: {}",
            label,
            total_time,
            self.total_lines,
            self.skipped_lines,
            self.accepted,
            self.invalid,
            self.unsupported
        );
    }
}
