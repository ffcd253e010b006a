// ==========================================
// 赛季排赛引擎 - 贪心分配器 (GreedyAssigner)
// ==========================================
// 职责: 候选按分值降序逐个放置,每个候选选择得分最高的可行 Block
// 拒绝条件 (任一命中即不放置):
//   1. 任一球队已达目标场次
//   2. 球队对场次达到当前上限 (严格模式: 不重赛)
//   3. 捆绑: 学校对见面次数达到上限 / Block 连续时段不足
//   4. 场地已占用 / 场馆能力不符
//   5. 球队、学校、教练在 (日期, 开始) 冲突 / 学校停赛日
//   6. 最少休息天数、同日双赛、7/14 天频次、学校当日单场馆
//   7. 场地当晚已被其他学校对的捆绑占用
// 红线: 每次提交前重新检查可行性; 不回滚
// ==========================================

use crate::config::{RelaxationSchedule, SchedulerConfig, SeasonRules};
use crate::domain::facility::DateAvailability;
use crate::domain::roster::Roster;
use crate::domain::slot::{Block, TimeSlot};
use crate::domain::types::TeamId;
use crate::engine::calendar::ResourceCalendar;
use crate::engine::catalog::{MatchupCandidate, Pairing};
use crate::engine::home_away::HomeAwayPolicy;
use crate::engine::scoring::ScoringModel;
use crate::engine::state::{AssignmentState, CourtNight};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, instrument, warn};

// ==========================================
// RejectReason - 不可放置原因 (正常分支结果,不是错误)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    Ineligible,
    TargetReached,
    PairLimit,
    SchoolMeetingLimit,
    NoBlock,
    SlotTaken,
    CapabilityMismatch,
    TeamBusy,
    SchoolBusy,
    CoachBusy,
    SchoolBlackout,
    FacilitySplit,
    CourtNightTaken,
    RestDays,
    DoubleheaderLimit,
    DoubleheaderRest,
    WeeklyCap,
    BiweeklyCap,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::Ineligible => "ineligible",
            RejectReason::TargetReached => "target_reached",
            RejectReason::PairLimit => "pair_limit",
            RejectReason::SchoolMeetingLimit => "school_meeting_limit",
            RejectReason::NoBlock => "no_block",
            RejectReason::SlotTaken => "slot_taken",
            RejectReason::CapabilityMismatch => "capability_mismatch",
            RejectReason::TeamBusy => "team_busy",
            RejectReason::SchoolBusy => "school_busy",
            RejectReason::CoachBusy => "coach_busy",
            RejectReason::SchoolBlackout => "school_blackout",
            RejectReason::FacilitySplit => "facility_split",
            RejectReason::CourtNightTaken => "court_night_taken",
            RejectReason::RestDays => "rest_days",
            RejectReason::DoubleheaderLimit => "doubleheader_limit",
            RejectReason::DoubleheaderRest => "doubleheader_rest",
            RejectReason::WeeklyCap => "weekly_cap",
            RejectReason::BiweeklyCap => "biweekly_cap",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// Thresholds - 当前阶段的约束阈值
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestRule {
    /// 固定天数
    Fixed(u32),
    /// 按放宽计划: 有轮次档位则用之,否则按已赛场次
    Tiered { round_floor: Option<u32> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thresholds {
    pub round: u32,
    pub pair_game_limit: u32,
    pub school_meeting_limit: u32,
    pub rest: RestRule,
    pub allow_partial_bundle: bool,
    pub allow_mixed_court_night: bool,
    pub enforce_frequency: bool,
    pub enforce_doubleheader: bool,
    pub enforce_single_facility: bool,
}

impl Thresholds {
    /// 首轮: 只用严格阈值
    pub fn strict(rules: &SeasonRules) -> Self {
        Self {
            round: 0,
            pair_game_limit: 1,
            school_meeting_limit: rules.school_pair_meeting_cap,
            rest: RestRule::Fixed(rules.strict_rest_days),
            allow_partial_bundle: false,
            allow_mixed_court_night: false,
            enforce_frequency: true,
            enforce_doubleheader: true,
            enforce_single_facility: true,
        }
    }

    /// 第 round 轮放宽 (round >= 1)
    pub fn relaxed(round: u32, rules: &SeasonRules, relax: &RelaxationSchedule) -> Self {
        Self {
            round,
            pair_game_limit: (1 + round * relax.rematch_step).min(rules.rematch_ceiling),
            school_meeting_limit: (rules.school_pair_meeting_cap + round)
                .min(rules.school_pair_meeting_ceiling),
            rest: RestRule::Tiered {
                round_floor: relax
                    .round_rest(round)
                    .map(|r| r.min(rules.strict_rest_days)),
            },
            allow_partial_bundle: round >= relax.partial_bundle_round,
            allow_mixed_court_night: round >= relax.mixed_court_round,
            enforce_frequency: true,
            enforce_doubleheader: true,
            enforce_single_facility: true,
        }
    }

    /// 兜底扫描: 只保留不可违反的硬约束
    pub fn desperate(rules: &SeasonRules, relax: &RelaxationSchedule) -> Self {
        Self {
            round: relax.max_rounds + 1,
            pair_game_limit: rules.rematch_ceiling,
            school_meeting_limit: rules.school_pair_meeting_ceiling,
            rest: RestRule::Fixed(0),
            allow_partial_bundle: true,
            allow_mixed_court_night: true,
            enforce_frequency: false,
            enforce_doubleheader: false,
            enforce_single_facility: false,
        }
    }

    /// 除轮次号以外与另一阈值相同
    pub fn same_limits(&self, other: &Thresholds) -> bool {
        Thresholds {
            round: other.round,
            ..self.clone()
        } == *other
    }
}

// ==========================================
// AssignReport - 一次分配的汇总
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct AssignReport {
    /// 新提交的比赛 id
    pub games: Vec<u32>,
    pub placed_candidates: usize,
    /// 未放置候选在输入中的下标
    pub unplaced: Vec<usize>,
    pub rejections: BTreeMap<RejectReason, usize>,
}

// ==========================================
// GreedyAssigner - 贪心分配器
// ==========================================
pub struct GreedyAssigner<'a> {
    roster: &'a Roster,
    rules: &'a SeasonRules,
    relaxation: &'a RelaxationSchedule,
    scoring: &'a ScoringModel<'a>,
    policy: &'a dyn HomeAwayPolicy,
    blocks: Vec<Block>,
}

impl<'a> GreedyAssigner<'a> {
    pub fn new(
        roster: &'a Roster,
        config: &'a SchedulerConfig,
        calendar: &ResourceCalendar<'a>,
        scoring: &'a ScoringModel<'a>,
        policy: &'a dyn HomeAwayPolicy,
    ) -> Self {
        let blocks: Vec<Block> = calendar.blocks().collect();
        debug!(blocks = blocks.len(), "贪心分配器已加载时段块");
        Self {
            roster,
            rules: &config.rules,
            relaxation: &config.relaxation,
            scoring,
            policy,
            blocks,
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn roster(&self) -> &'a Roster {
        self.roster
    }

    pub fn scoring(&self) -> &'a ScoringModel<'a> {
        self.scoring
    }

    // ==========================================
    // 批量分配
    // ==========================================

    /// 按输入顺序逐个放置候选 (调用方负责按分值排序)
    #[instrument(skip_all, fields(candidates = candidates.len(), round = thresholds.round))]
    pub fn assign(
        &self,
        candidates: &[MatchupCandidate],
        thresholds: &Thresholds,
        state: &mut AssignmentState,
    ) -> AssignReport {
        let mut report = AssignReport::default();
        for (idx, candidate) in candidates.iter().enumerate() {
            match self.place(candidate, thresholds, state) {
                Ok(ids) => {
                    report.placed_candidates += 1;
                    report.games.extend(ids);
                }
                Err(reason) => {
                    *report.rejections.entry(reason).or_insert(0) += 1;
                    report.unplaced.push(idx);
                }
            }
        }
        info!(
            placed = report.placed_candidates,
            games = report.games.len(),
            unplaced = report.unplaced.len(),
            "贪心分配完成"
        );
        report
    }

    // ==========================================
    // 单个候选
    // ==========================================

    /// 为候选选择最佳 Block 并提交
    ///
    /// # 选择规则
    /// 1. 放置场次多者优先 (仅部分放置模式下有差异)
    /// 2. 时段偏好分之和高者优先
    /// 3. 同分取日历顺序最早者
    pub fn place(
        &self,
        candidate: &MatchupCandidate,
        thresholds: &Thresholds,
        state: &mut AssignmentState,
    ) -> Result<Vec<u32>, RejectReason> {
        if candidate.is_empty() {
            return Err(RejectReason::Ineligible);
        }
        let claim = match candidate.schools {
            Some((a, b)) => CourtNight::Bundle(a, b),
            None => CourtNight::Mixed,
        };
        if let Some((a, b)) = candidate.schools {
            if state.school_meetings(a, b) >= thresholds.school_meeting_limit {
                return Err(RejectReason::SchoolMeetingLimit);
            }
        }
        let partial = thresholds.allow_partial_bundle && candidate.len() > 1;
        if !partial {
            for p in &candidate.pairings {
                self.check_static(p, thresholds, state)?;
            }
        }

        let mut best: Option<(usize, i64, Vec<(Pairing, TimeSlot)>)> = None;
        let mut last_reason = RejectReason::NoBlock;
        for block in &self.blocks {
            if !partial && block.len() < candidate.len() {
                continue;
            }
            match self.fit(candidate, block, claim, partial, thresholds, state) {
                Ok(placed) => {
                    let score: i64 = placed
                        .iter()
                        .map(|(p, s)| self.scoring.slot_score(p.a, p.b, s, state))
                        .sum();
                    let better = match &best {
                        None => true,
                        Some((n, sc, _)) => (placed.len(), score) > (*n, *sc),
                    };
                    if better {
                        best = Some((placed.len(), score, placed));
                    }
                }
                Err(reason) => last_reason = reason,
            }
        }

        let Some((_, _, placed)) = best else {
            return Err(last_reason);
        };

        let mut ids = Vec::with_capacity(placed.len());
        for (p, slot) in placed {
            // 提交前复检
            if let Err(reason) = self.check(&p, &slot, claim, thresholds, state) {
                warn!(reason = %reason, slot = %slot, "提交前复检未通过,跳过该场");
                continue;
            }
            let (home, away) = self.resolve_home_away(&p, &slot, state);
            ids.push(state.commit(self.roster, home, away, p.division, slot, claim));
        }
        if ids.is_empty() {
            return Err(last_reason);
        }
        if let Some((a, b)) = candidate.schools {
            state.record_school_meeting(a, b);
        }
        debug!(games = ids.len(), score = candidate.score, "候选已放置");
        Ok(ids)
    }

    /// 把候选按顺序放进 Block 的连续时段
    fn fit(
        &self,
        candidate: &MatchupCandidate,
        block: &Block,
        claim: CourtNight,
        partial: bool,
        thresholds: &Thresholds,
        state: &AssignmentState,
    ) -> Result<Vec<(Pairing, TimeSlot)>, RejectReason> {
        let mut placed = Vec::with_capacity(candidate.len());
        let mut last_reason = RejectReason::NoBlock;
        for p in &candidate.pairings {
            let Some(slot) = block.slots.get(placed.len()) else {
                break;
            };
            match self.check(p, slot, claim, thresholds, state) {
                Ok(()) => placed.push((*p, *slot)),
                Err(reason) if partial => last_reason = reason,
                Err(reason) => return Err(reason),
            }
        }
        if placed.is_empty() {
            return Err(last_reason);
        }
        if !partial && placed.len() < candidate.len() {
            return Err(RejectReason::NoBlock);
        }
        Ok(placed)
    }

    // ==========================================
    // 可行性检查
    // ==========================================

    /// 与时段无关的检查
    pub fn check_static(
        &self,
        p: &Pairing,
        thresholds: &Thresholds,
        state: &AssignmentState,
    ) -> Result<(), RejectReason> {
        let ta = self.roster.team(p.a);
        let tb = self.roster.team(p.b);
        if p.a == p.b || ta.shares_school_with(tb) || ta.forbids(tb) {
            return Err(RejectReason::Ineligible);
        }
        if state.count(p.a) >= ta.target_games || state.count(p.b) >= tb.target_games {
            return Err(RejectReason::TargetReached);
        }
        let limit = thresholds.pair_game_limit.min(self.rules.rematch_ceiling);
        if state.pair_count(p.a, p.b) >= limit {
            return Err(RejectReason::PairLimit);
        }
        Ok(())
    }

    /// 对阵落在指定时段的完整可行性检查
    pub fn check(
        &self,
        p: &Pairing,
        slot: &TimeSlot,
        claim: CourtNight,
        thresholds: &Thresholds,
        state: &AssignmentState,
    ) -> Result<(), RejectReason> {
        self.check_static(p, thresholds, state)?;
        if !state.is_slot_free(slot) {
            return Err(RejectReason::SlotTaken);
        }

        let facility = self.roster.facility(slot.facility);
        if let Some(cap) = &self.roster.division(p.division).required_capability {
            if !facility.has_capability(cap) {
                return Err(RejectReason::CapabilityMismatch);
            }
        }

        let at = slot.time_key();
        let teams = [self.roster.team(p.a), self.roster.team(p.b)];
        for t in teams {
            if state.team_busy(t.id, at) {
                return Err(RejectReason::TeamBusy);
            }
            if state.school_busy(t.school, at) {
                return Err(RejectReason::SchoolBusy);
            }
            if let Some(coach) = t.coach {
                if state.coach_busy(coach, at) {
                    return Err(RejectReason::CoachBusy);
                }
            }
            if !self.roster.school(t.school).is_available(slot.date) {
                return Err(RejectReason::SchoolBlackout);
            }
        }

        if thresholds.enforce_single_facility
            && self.rules.single_facility_days.contains(&slot.weekday())
        {
            for t in teams {
                if let Some(used) = state.school_facility_on(t.school, slot.date) {
                    if used != slot.facility {
                        return Err(RejectReason::FacilitySplit);
                    }
                }
            }
        }

        if !thresholds.allow_mixed_court_night {
            if let Some(owner) = state.court_night(slot) {
                if owner != claim {
                    return Err(RejectReason::CourtNightTaken);
                }
            }
        }

        let rest = self.rest_days(p, thresholds, state) as i64;
        let needed_gap = (self.rules.match_duration_minutes + self.rules.doubleheader_break_minutes) as i64;
        for t in teams {
            if let Some(gap) = state.nearest_gap_days(t.id, slot.date) {
                if gap < rest {
                    return Err(RejectReason::RestDays);
                }
            }
            if thresholds.enforce_doubleheader {
                let same_day = state.same_day_slots(t.id, slot.date);
                if !same_day.is_empty() {
                    if same_day.len() >= 2
                        || state.doubleheader_days(t.id) >= self.rules.max_doubleheaders
                    {
                        return Err(RejectReason::DoubleheaderLimit);
                    }
                    if same_day
                        .iter()
                        .any(|s| (s.start - slot.start).num_minutes().abs() < needed_gap)
                    {
                        return Err(RejectReason::DoubleheaderRest);
                    }
                }
            }
            if thresholds.enforce_frequency {
                if state.window_load_with(t.id, slot.date, 7) > self.rules.max_games_per_7_days {
                    return Err(RejectReason::WeeklyCap);
                }
                if state.window_load_with(t.id, slot.date, 14) > self.rules.max_games_per_14_days {
                    return Err(RejectReason::BiweeklyCap);
                }
            }
        }
        Ok(())
    }

    /// 按主客场策略确定 (主, 客)
    pub fn resolve_home_away(
        &self,
        p: &Pairing,
        slot: &TimeSlot,
        state: &AssignmentState,
    ) -> (TeamId, TeamId) {
        self.policy.resolve(p.a, p.b, slot, self.roster, state)
    }

    /// 对阵的最少休息天数 (取两队中较宽松者)
    pub fn rest_days(&self, p: &Pairing, thresholds: &Thresholds, state: &AssignmentState) -> u32 {
        let strict = self.rules.strict_rest_days;
        match thresholds.rest {
            RestRule::Fixed(days) => days,
            RestRule::Tiered {
                round_floor: Some(days),
            } => days,
            RestRule::Tiered { round_floor: None } => self
                .relaxation
                .count_rest(state.count(p.a), strict)
                .min(self.relaxation.count_rest(state.count(p.b), strict)),
        }
    }
}
