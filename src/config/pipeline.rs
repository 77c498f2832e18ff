use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 分析流水线与工作池配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 并发工作者数量
    pub workers: usize,
    /// 任务队列容量
    pub queue_capacity: usize,
    /// 预处理阶段的模拟延迟（毫秒）
    pub preprocess_delay_ms: u64,
    /// 报告生成阶段的模拟延迟（毫秒）
    pub finalize_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 256,
            preprocess_delay_ms: 2000,
            finalize_delay_ms: 1000,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 || self.workers > 64 {
            return Err("工作者数量应在1-64之间".into());
        }
        if self.queue_capacity == 0 {
            return Err("任务队列容量必须大于0".into());
        }
        Ok(())
    }

    pub fn preprocess_delay(&self) -> Duration {
        Duration::from_millis(self.preprocess_delay_ms)
    }

    pub fn finalize_delay(&self) -> Duration {
        Duration::from_millis(self.finalize_delay_ms)
    }

    /// 无延迟配置（测试用）
    pub fn immediate() -> Self {
        Self {
            preprocess_delay_ms: 0,
            finalize_delay_ms: 0,
            ..Self::default()
        }
    }
}
