// ==========================================
// 赛季排赛引擎 - 校验结果模型
// ==========================================
// 职责: 违规类型(封闭集合)、违规记录、校验结果、球队赛程统计
// 红线: is_valid == false 当且仅当存在硬约束违规
// ==========================================

use crate::domain::types::{Severity, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ==========================================
// ViolationKind - 违规类型 (封闭集合)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    // ===== 硬约束 =====
    SlotConflict,
    TeamDoubleBooking,
    SchoolDoubleBooking,
    CoachDoubleBooking,
    SameSchoolPairing,
    ForbiddenPairing,
    RematchCeiling,
    TargetShortfall,
    TargetExceeded,
    WeeklyFrequency,
    BiweeklyFrequency,
    DoubleheaderRest,
    DoubleheaderCeiling,
    FinalGameDeadline,
    FacilityUnavailable,
    CapabilityMismatch,
    ClusterRestriction,
    SchoolBlackout,
    OutsideOpenWindow,
    UnknownReference,

    // ===== 软约束 =====
    HomeAwayImbalance,
    MissingRivalMatchup,
    FacilitySpread,
    DivisionGrouping,
}

impl ViolationKind {
    pub fn severity(&self) -> Severity {
        match self {
            ViolationKind::HomeAwayImbalance
            | ViolationKind::MissingRivalMatchup
            | ViolationKind::FacilitySpread
            | ViolationKind::DivisionGrouping => Severity::Soft,
            _ => Severity::Hard,
        }
    }

    /// 单次违规的基础罚分
    pub fn base_penalty(&self) -> f64 {
        match self {
            ViolationKind::SlotConflict => 3000.0,
            ViolationKind::TeamDoubleBooking => 2000.0,
            ViolationKind::SchoolDoubleBooking => 1500.0,
            ViolationKind::CoachDoubleBooking => 1500.0,
            ViolationKind::SameSchoolPairing => 5000.0,
            ViolationKind::ForbiddenPairing => 1000.0,
            ViolationKind::RematchCeiling => 800.0,
            ViolationKind::TargetShortfall => 250.0,
            ViolationKind::TargetExceeded => 250.0,
            ViolationKind::WeeklyFrequency => 500.0,
            ViolationKind::BiweeklyFrequency => 300.0,
            ViolationKind::DoubleheaderRest => 400.0,
            ViolationKind::DoubleheaderCeiling => 400.0,
            ViolationKind::FinalGameDeadline => 600.0,
            ViolationKind::FacilityUnavailable => 900.0,
            ViolationKind::CapabilityMismatch => 700.0,
            ViolationKind::ClusterRestriction => 1000.0,
            ViolationKind::SchoolBlackout => 500.0,
            ViolationKind::OutsideOpenWindow => 500.0,
            ViolationKind::UnknownReference => 5000.0,
            ViolationKind::HomeAwayImbalance => 10.0,
            ViolationKind::MissingRivalMatchup => 80.0,
            ViolationKind::FacilitySpread => 25.0,
            ViolationKind::DivisionGrouping => 20.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::SlotConflict => "slot_conflict",
            ViolationKind::TeamDoubleBooking => "team_double_booking",
            ViolationKind::SchoolDoubleBooking => "school_double_booking",
            ViolationKind::CoachDoubleBooking => "coach_double_booking",
            ViolationKind::SameSchoolPairing => "same_school_pairing",
            ViolationKind::ForbiddenPairing => "forbidden_pairing",
            ViolationKind::RematchCeiling => "rematch_ceiling",
            ViolationKind::TargetShortfall => "target_shortfall",
            ViolationKind::TargetExceeded => "target_exceeded",
            ViolationKind::WeeklyFrequency => "weekly_frequency",
            ViolationKind::BiweeklyFrequency => "biweekly_frequency",
            ViolationKind::DoubleheaderRest => "doubleheader_rest",
            ViolationKind::DoubleheaderCeiling => "doubleheader_ceiling",
            ViolationKind::FinalGameDeadline => "final_game_deadline",
            ViolationKind::FacilityUnavailable => "facility_unavailable",
            ViolationKind::CapabilityMismatch => "capability_mismatch",
            ViolationKind::ClusterRestriction => "cluster_restriction",
            ViolationKind::SchoolBlackout => "school_blackout",
            ViolationKind::OutsideOpenWindow => "outside_open_window",
            ViolationKind::UnknownReference => "unknown_reference",
            ViolationKind::HomeAwayImbalance => "home_away_imbalance",
            ViolationKind::MissingRivalMatchup => "missing_rival_matchup",
            ViolationKind::FacilitySpread => "facility_spread",
            ViolationKind::DivisionGrouping => "division_grouping",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// Violation - 单条违规
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub severity: Severity,
    pub description: String,
    pub penalty: f64,
    pub teams: Vec<TeamId>,
    pub games: Vec<u32>,
}

impl Violation {
    /// 按类型默认严重度与基础罚分构造; multiplier 为违规次数/幅度
    pub fn new(
        kind: ViolationKind,
        description: impl Into<String>,
        multiplier: f64,
        teams: Vec<TeamId>,
        games: Vec<u32>,
    ) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            description: description.into(),
            penalty: (kind.base_penalty() * multiplier).max(0.0),
            teams,
            games,
        }
    }
}

// ==========================================
// TeamScheduleStats - 球队赛程统计
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamScheduleStats {
    pub games: u32,
    pub home: u32,
    pub away: u32,
    pub doubleheaders: u32,
    /// ISO 周号 -> 场次
    pub games_by_week: BTreeMap<u32, u32>,
}

// ==========================================
// ValidationResult - 校验结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub hard: Vec<Violation>,
    pub soft: Vec<Violation>,
    pub total_penalty: f64,
    pub team_stats: BTreeMap<TeamId, TeamScheduleStats>,
}

impl ValidationResult {
    /// 由违规列表汇总
    pub fn from_violations(
        violations: Vec<Violation>,
        team_stats: BTreeMap<TeamId, TeamScheduleStats>,
    ) -> Self {
        let (hard, soft): (Vec<_>, Vec<_>) = violations
            .into_iter()
            .partition(|v| v.severity == Severity::Hard);
        let total_penalty = hard.iter().chain(soft.iter()).map(|v| v.penalty).sum();
        Self {
            is_valid: hard.is_empty(),
            hard,
            soft,
            total_penalty,
            team_stats,
        }
    }

    pub fn count_of(&self, kind: ViolationKind) -> usize {
        self.hard
            .iter()
            .chain(self.soft.iter())
            .filter(|v| v.kind == kind)
            .count()
    }

    /// 按违规类型计数的文字摘要
    pub fn summary(&self) -> String {
        let mut by_kind: BTreeMap<ViolationKind, usize> = BTreeMap::new();
        for v in self.hard.iter().chain(self.soft.iter()) {
            *by_kind.entry(v.kind).or_insert(0) += 1;
        }
        let mut out = format!(
            "valid={} hard={} soft={} penalty={:.1}",
            self.is_valid,
            self.hard.len(),
            self.soft.len(),
            self.total_penalty
        );
        for (kind, count) in by_kind {
            out.push_str(&format!("\n  {}: {}", kind, count));
        }
        out
    }
}
