use serde::{Deserialize, Serialize};

/// 数据质量问题类别。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    // 价格区间过窄，图表近乎一条直线
    Flatness,
    // K 线数量远少于该周期的期望值
    InsufficientData,
    // 平均成交量过低
    LowVolume,
    // 实际覆盖时长与期望时长偏差过大
    TimeSpanMismatch,
    // 大部分 K 线为 OHLC 完全相同的平 K 线
    Degeneracy,
}

/// 单条诊断信息。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub kind: IssueKind,
    pub message: String,
}

/// # Summary
/// 对一个 K 线窗口的数据质量评估结果。
///
/// # Invariants
/// - 仅用于日志与诊断，不持久化，也不阻断渲染。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityVerdict {
    pub suitable: bool,
    pub issues: Vec<QualityIssue>,
    pub price_range_percent: f64,
    pub avg_volume: f64,
    pub data_point_count: usize,
    pub time_span_minutes: f64,
    pub expected_count: usize,
    pub expected_span_minutes: f64,
    pub flat_ratio: f64,
}

impl QualityVerdict {
    pub fn has_issue(&self, kind: IssueKind) -> bool {
        self.issues.iter().any(|issue| issue.kind == kind)
    }
}

/// # Summary
/// 质量评估阈值。默认值为经验常量，可通过配置覆盖。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    // 价格区间百分比低于该值视为过平
    pub flatness_percent: f64,
    // 实际数量低于 期望数量 × 该比例 视为数据不足
    pub sufficiency_ratio: f64,
    // 平均成交量下限
    pub min_avg_volume: f64,
    // 时长偏差容忍度（比例）
    pub span_tolerance: f64,
    // 平 K 线比例上限
    pub degeneracy_ratio: f64,
    // 容忍少量问题时要求的最小价格区间百分比
    pub tolerated_min_range_percent: f64,
    // 可容忍的问题数量上限
    pub max_tolerated_issues: usize,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            flatness_percent: 0.05,
            sufficiency_ratio: 0.5,
            min_avg_volume: 1.0,
            span_tolerance: 0.30,
            degeneracy_ratio: 0.80,
            tolerated_min_range_percent: 0.01,
            max_tolerated_issues: 2,
        }
    }
}
