// ==========================================
// 赛季排赛引擎 - 评分权重配置
// ==========================================
// 职责: 对阵评分与时段偏好的整数权重
// 覆写: ScoringWeightOverrides 中为 None 的字段保持原值
// ==========================================

use serde::{Deserialize, Serialize};

/// 评分权重（整数分值，全部可经 JSON / 覆写调整）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// 同校对阵的哨兵分（保留为分值而非过滤，排序口径统一）
    pub same_school_sentinel: i64,

    /// 同 tier 加分
    pub tier_match: i64,

    /// 同 cluster 加分
    pub cluster_match: i64,

    /// 同教练加分（教练执教的两队互打，便于集中安排）
    pub same_coach: i64,

    /// 宿敌对阵加分
    pub rival: i64,

    /// 主场场馆加分（必须压过其余所有项之和）
    pub home_facility: i64,

    /// 组别优先场馆填充加分
    pub priority_facility_fill: i64,

    /// 满足能力要求的其他场馆填充加分
    pub secondary_facility_fill: i64,

    /// 周末比赛日的填充加分倍数
    pub weekend_fill_multiplier: i64,

    /// 场馆当日已排场次的利用率加分（每场）
    pub utilization_step: i64,

    /// 利用率加分的场次上限
    pub utilization_cap: u32,

    /// 教练比赛落在同一 Block 相邻时段
    pub coach_block_bonus: i64,

    /// 教练比赛落在同场馆同日时间窗内
    pub coach_window_bonus: i64,

    /// 学校比赛落在同一 Block 相邻时段
    pub school_block_bonus: i64,

    /// 学校比赛落在同场馆同日时间窗内
    pub school_window_bonus: i64,

    /// 集中安排的时间窗（分钟）
    pub consolidation_window_minutes: u32,

    /// 每经过一个赛季日的衰减分
    pub day_decay: i64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            same_school_sentinel: -999_999,
            tier_match: 400,
            cluster_match: 10_000,
            same_coach: 90,
            rival: 80,
            home_facility: 100_000,
            priority_facility_fill: 90,
            secondary_facility_fill: 45,
            weekend_fill_multiplier: 2,
            utilization_step: 5,
            utilization_cap: 6,
            coach_block_bonus: 300,
            coach_window_bonus: 120,
            school_block_bonus: 150,
            school_window_bonus: 60,
            consolidation_window_minutes: 120,
            day_decay: 1,
        }
    }
}

/// 评分权重覆写（未设置的项沿用基准值）
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScoringWeightOverrides {
    #[serde(default)]
    pub tier_match: Option<i64>,

    #[serde(default)]
    pub cluster_match: Option<i64>,

    #[serde(default)]
    pub same_coach: Option<i64>,

    #[serde(default)]
    pub rival: Option<i64>,

    #[serde(default)]
    pub priority_facility_fill: Option<i64>,

    #[serde(default)]
    pub secondary_facility_fill: Option<i64>,

    /// 同 Block 集中加分（教练/学校同时覆写，学校取一半）
    #[serde(default)]
    pub consolidation_block: Option<i64>,

    #[serde(default)]
    pub day_decay: Option<i64>,
}

impl ScoringWeightOverrides {
    pub fn apply(&self, base: &ScoringWeights) -> ScoringWeights {
        let mut w = base.clone();
        if let Some(v) = self.tier_match {
            w.tier_match = v;
        }
        if let Some(v) = self.cluster_match {
            w.cluster_match = v;
        }
        if let Some(v) = self.same_coach {
            w.same_coach = v;
        }
        if let Some(v) = self.rival {
            w.rival = v;
        }
        if let Some(v) = self.priority_facility_fill {
            w.priority_facility_fill = v;
        }
        if let Some(v) = self.secondary_facility_fill {
            w.secondary_facility_fill = v;
        }
        if let Some(v) = self.consolidation_block {
            w.coach_block_bonus = v;
            w.school_block_bonus = v / 2;
        }
        if let Some(v) = self.day_decay {
            w.day_decay = v;
        }
        w
    }

    pub fn is_empty(&self) -> bool {
        self.tier_match.is_none()
            && self.cluster_match.is_none()
            && self.same_coach.is_none()
            && self.rival.is_none()
            && self.priority_facility_fill.is_none()
            && self.secondary_facility_fill.is_none()
            && self.consolidation_block.is_none()
            && self.day_decay.is_none()
    }
}
