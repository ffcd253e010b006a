// ==========================================
// 赛季排赛引擎 - 评分模型 (ScoringModel)
// ==========================================
// score(a, b):             对阵本身的偏好分
// slot_score(a, b, slot):  对阵落在某时段的偏好分 (读取已排比赛)
// 红线: 纯整数函数,不修改任何状态
// 红线: 主场加分压过其余所有项
// ==========================================

use crate::config::{ScoringWeights, SeasonRules};
use crate::domain::roster::Roster;
use crate::domain::slot::TimeSlot;
use crate::domain::types::TeamId;
use crate::engine::state::AssignmentState;

pub struct ScoringModel<'a> {
    weights: &'a ScoringWeights,
    rules: &'a SeasonRules,
    roster: &'a Roster,
}

impl<'a> ScoringModel<'a> {
    pub fn new(weights: &'a ScoringWeights, rules: &'a SeasonRules, roster: &'a Roster) -> Self {
        Self {
            weights,
            rules,
            roster,
        }
    }

    pub fn weights(&self) -> &ScoringWeights {
        self.weights
    }

    /// 对阵偏好分
    ///
    /// # 加分项
    /// - 同校: 哨兵负分 (不作为过滤,排序口径统一)
    /// - 同 tier / 同 cluster / 同教练 / 宿敌
    pub fn score(&self, a: TeamId, b: TeamId) -> i64 {
        let w = self.weights;
        let ta = self.roster.team(a);
        let tb = self.roster.team(b);

        let mut score = 0;
        if ta.shares_school_with(tb) {
            score += w.same_school_sentinel;
        }
        if matches!((ta.tier, tb.tier), (Some(x), Some(y)) if x == y) {
            score += w.tier_match;
        }
        if matches!((&ta.cluster, &tb.cluster), (Some(x), Some(y)) if x == y) {
            score += w.cluster_match;
        }
        if ta.shares_coach_with(tb) {
            score += w.same_coach;
        }
        if ta.is_rival_of(tb) {
            score += w.rival;
        }
        score
    }

    /// 时段偏好分
    ///
    /// # 加分项
    /// 1. 主场场馆
    /// 2. 组别优先/次要场馆填充 (周末比赛日加倍) + 当日利用率
    /// 3. 教练/学校集中: 同一 Block 相邻时段, 或同场馆同日时间窗内
    /// 4. 赛季日衰减 (越晚越低)
    pub fn slot_score(&self, a: TeamId, b: TeamId, slot: &TimeSlot, state: &AssignmentState) -> i64 {
        let w = self.weights;
        let ta = self.roster.team(a);
        let tb = self.roster.team(b);
        let facility = self.roster.facility(slot.facility);

        let mut score = 0;

        // 1. 主场
        if facility.is_home_of(ta.school) || facility.is_home_of(tb.school) {
            score += w.home_facility;
        }

        // 2. 场馆填充
        let division = self.roster.division(ta.division);
        let fill = if division.priority_facilities.contains(&slot.facility) {
            w.priority_facility_fill
        } else if division
            .required_capability
            .as_deref()
            .map_or(true, |cap| facility.has_capability(cap))
        {
            w.secondary_facility_fill
        } else {
            0
        };
        let multiplier = if self.rules.windows.is_weekend(slot.weekday()) {
            w.weekend_fill_multiplier
        } else {
            1
        };
        score += fill * multiplier;
        score += w.utilization_step
            * state.facility_tally(slot.facility, slot.date).min(w.utilization_cap) as i64;

        // 3. 集中安排
        let mut coach_bonus = 0;
        for coach in [ta.coach, tb.coach].into_iter().flatten() {
            coach_bonus = coach_bonus.max(self.consolidation(
                state.coach_slots(coach),
                slot,
                w.coach_block_bonus,
                w.coach_window_bonus,
            ));
        }
        let mut school_bonus = 0;
        for school in [ta.school, tb.school] {
            school_bonus = school_bonus.max(self.consolidation(
                state.school_slots(school),
                slot,
                w.school_block_bonus,
                w.school_window_bonus,
            ));
        }
        score += coach_bonus + school_bonus;

        // 4. 衰减
        let elapsed = (slot.date - self.rules.season_start).num_days().max(0);
        score -= w.day_decay * elapsed;

        score
    }

    fn consolidation(&self, placed: &[TimeSlot], slot: &TimeSlot, block_bonus: i64, window_bonus: i64) -> i64 {
        let window = self.weights.consolidation_window_minutes as i64;
        let mut best = 0;
        for p in placed {
            if p.date != slot.date || p.facility != slot.facility {
                continue;
            }
            if p.court == slot.court && (p.end == slot.start || p.start == slot.end) {
                return block_bonus;
            }
            if (p.start - slot.start).num_minutes().abs() <= window {
                best = window_bonus;
            }
        }
        best
    }
}
