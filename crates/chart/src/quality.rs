use candela_core::common::Interval;
use candela_core::market::entity::CandleWindow;
use candela_core::quality::entity::{IssueKind, QualityIssue, QualityThresholds, QualityVerdict};

/// # Summary
/// 各周期下期望的 K 线数量，用于判断数据是否充足。
pub fn expected_count(interval: Interval) -> usize {
    match interval {
        Interval::Minute1 => 120,
        Interval::Minute5 => 60,
        Interval::Minute15 => 48,
        Interval::Hour1 => 24,
        Interval::Hour4 => 20,
        Interval::Day1 => 20,
    }
}

/// # Summary
/// 数据质量分析器，按可配置阈值为窗口打分。
///
/// # Invariants
/// - 纯计算，无 I/O；结论仅供诊断，不阻断渲染。
#[derive(Debug, Clone, Default)]
pub struct QualityAnalyzer {
    thresholds: QualityThresholds,
}

impl QualityAnalyzer {
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &QualityThresholds {
        &self.thresholds
    }

    /// # Summary
    /// 对窗口计算各项风险指标并给出适用性结论。
    ///
    /// # Logic
    /// 1. 平坦度：全部 OHLC 值的 (max - min) / avg × 100。
    /// 2. 充足性：数量与周期期望数量的比例。
    /// 3. 成交量：平均成交量下限。
    /// 4. 时长一致性：实际覆盖时长 (末根 - 首根 + 一个周期) 与 周期 × 数量 的偏差。
    /// 5. 退化度：平 K 线占比。
    /// 6. 无问题，或问题数不超过上限且价格区间不至于过平，则判定可用。
    ///
    /// # Arguments
    /// * `window`: 归一化后的窗口。
    /// * `interval`: 目标周期。
    ///
    /// # Returns
    /// `QualityVerdict`。
    pub fn analyze(&self, window: &CandleWindow, interval: Interval) -> QualityVerdict {
        let t = &self.thresholds;
        let candles = &window.candles;
        let count = candles.len();
        let mut issues = Vec::new();

        let prices: Vec<f64> = candles
            .iter()
            .flat_map(|c| [c.open, c.high, c.low, c.close])
            .collect();
        let price_range_percent = price_range_percent(&prices);
        if price_range_percent < t.flatness_percent {
            issues.push(QualityIssue {
                kind: IssueKind::Flatness,
                message: format!(
                    "Price range {:.4}% is below {}%; chart would look flat",
                    price_range_percent, t.flatness_percent
                ),
            });
        }

        let expected = expected_count(interval);
        if count_f64(count) < t.sufficiency_ratio * count_f64(expected) {
            issues.push(QualityIssue {
                kind: IssueKind::InsufficientData,
                message: format!(
                    "Only {} candles for {}, expected about {}",
                    count, interval, expected
                ),
            });
        }

        let avg_volume = if count > 0 {
            candles.iter().map(|c| c.volume).sum::<f64>() / count_f64(count)
        } else {
            0.0
        };
        if avg_volume < t.min_avg_volume {
            issues.push(QualityIssue {
                kind: IssueKind::LowVolume,
                message: format!("Average volume {:.4} is below {}", avg_volume, t.min_avg_volume),
            });
        }

        let interval_minutes = secs_to_minutes(interval.minutes().saturating_mul(60));
        let expected_span_minutes = interval_minutes * count_f64(count);
        let time_span_minutes = match (candles.first(), candles.last()) {
            (Some(first), Some(last)) => {
                secs_to_minutes(last.timestamp.saturating_sub(first.timestamp)) + interval_minutes
            }
            _ => 0.0,
        };
        if expected_span_minutes > 0.0 {
            let deviation = (time_span_minutes - expected_span_minutes).abs() / expected_span_minutes;
            if deviation > t.span_tolerance {
                issues.push(QualityIssue {
                    kind: IssueKind::TimeSpanMismatch,
                    message: format!(
                        "Window covers {:.0} minutes, expected {:.0} ({:.0}% off)",
                        time_span_minutes,
                        expected_span_minutes,
                        deviation * 100.0
                    ),
                });
            }
        }

        let flat_ratio = if count > 0 {
            count_f64(candles.iter().filter(|c| c.is_flat()).count()) / count_f64(count)
        } else {
            0.0
        };
        if flat_ratio > t.degeneracy_ratio {
            issues.push(QualityIssue {
                kind: IssueKind::Degeneracy,
                message: format!("{:.0}% of candles are flat (O=H=L=C)", flat_ratio * 100.0),
            });
        }

        let suitable = issues.is_empty()
            || (issues.len() <= t.max_tolerated_issues
                && price_range_percent >= t.tolerated_min_range_percent);

        QualityVerdict {
            suitable,
            issues,
            price_range_percent,
            avg_volume,
            data_point_count: count,
            time_span_minutes,
            expected_count: expected,
            expected_span_minutes,
            flat_ratio,
        }
    }
}

/// 使用默认阈值分析窗口。
pub fn analyze(window: &CandleWindow, interval: Interval) -> QualityVerdict {
    QualityAnalyzer::default().analyze(window, interval)
}

// 窗口规模远小于 u32::MAX，超出时按上限计
fn count_f64(n: usize) -> f64 {
    u32::try_from(n).map_or(f64::from(u32::MAX), f64::from)
}

// 秒数换算为分钟，整分钟部分在 i32 范围内饱和
fn secs_to_minutes(secs: i64) -> f64 {
    let whole = i32::try_from(secs / 60).unwrap_or(if secs < 0 { i32::MIN } else { i32::MAX });
    let rest = i32::try_from(secs % 60).unwrap_or(0);
    f64::from(whole) + f64::from(rest) / 60.0
}

fn price_range_percent(prices: &[f64]) -> f64 {
    if prices.is_empty() {
        return 0.0;
    }
    let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
    let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = prices.iter().sum::<f64>() / count_f64(prices.len());
    if avg > 0.0 {
        (max - min) / avg * 100.0
    } else {
        0.0
    }
}
