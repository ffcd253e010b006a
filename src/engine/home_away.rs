// ==========================================
// 赛季排赛引擎 - 主客场判定策略
// ==========================================
// 可插拔: 分配器只依赖 HomeAwayPolicy trait
// ==========================================

use crate::domain::roster::Roster;
use crate::domain::slot::TimeSlot;
use crate::domain::types::TeamId;
use crate::engine::state::AssignmentState;

pub trait HomeAwayPolicy {
    /// 返回 (home, away)
    fn resolve(
        &self,
        a: TeamId,
        b: TeamId,
        slot: &TimeSlot,
        roster: &Roster,
        state: &AssignmentState,
    ) -> (TeamId, TeamId);

    fn name(&self) -> &str;
}

/// 默认策略: 场馆所属学校的球队为主 -> 主场次数较少者为主 -> 先列出者为主
#[derive(Debug, Clone, Copy, Default)]
pub struct FacilityOwnerHomeAway;

impl HomeAwayPolicy for FacilityOwnerHomeAway {
    fn resolve(
        &self,
        a: TeamId,
        b: TeamId,
        slot: &TimeSlot,
        roster: &Roster,
        state: &AssignmentState,
    ) -> (TeamId, TeamId) {
        let facility = roster.facility(slot.facility);
        let a_home = facility.is_home_of(roster.team(a).school);
        let b_home = facility.is_home_of(roster.team(b).school);
        match (a_home, b_home) {
            (true, false) => (a, b),
            (false, true) => (b, a),
            _ => {
                if state.home_count(b) < state.home_count(a) {
                    (b, a)
                } else {
                    (a, b)
                }
            }
        }
    }

    fn name(&self) -> &str {
        "facility_owner"
    }
}

/// 仅按场馆归属,否则先列出者为主
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnershipOnlyHomeAway;

impl HomeAwayPolicy for OwnershipOnlyHomeAway {
    fn resolve(
        &self,
        a: TeamId,
        b: TeamId,
        slot: &TimeSlot,
        roster: &Roster,
        _state: &AssignmentState,
    ) -> (TeamId, TeamId) {
        let facility = roster.facility(slot.facility);
        if facility.is_home_of(roster.team(b).school) && !facility.is_home_of(roster.team(a).school) {
            (b, a)
        } else {
            (a, b)
        }
    }

    fn name(&self) -> &str {
        "ownership_only"
    }
}
