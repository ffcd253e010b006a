// ==========================================
// 赛季排赛引擎 - 学校/组别/球队领域模型
// ==========================================
// 红线: 同校球队永不对阵
// 红线: 禁赛名单(do-not-play)中的对阵永不生成
// ==========================================

use crate::domain::facility::DateAvailability;
use crate::domain::types::{CoachId, DivisionId, FacilityId, SchoolId, TeamId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ==========================================
// School - 学校 (Group)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct School {
    pub id: SchoolId,
    pub name: String,
    pub cluster: Option<String>,
    pub tier: Option<u8>,
    pub blackout_dates: BTreeSet<NaiveDate>,
    pub teams: Vec<TeamId>,
}

impl DateAvailability for School {
    fn is_available(&self, date: NaiveDate) -> bool {
        !self.blackout_dates.contains(&date)
    }
}

// ==========================================
// Division - 组别 (Category)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Division {
    pub id: DivisionId,
    pub name: String,
    /// 场馆能力要求 (例如低篮筐); 有要求时组别受地理分区限制
    pub required_capability: Option<String>,
    /// 优先填充场馆 (主要); 其余满足能力要求的场馆为次要
    pub priority_facilities: Vec<FacilityId>,
    /// 是否需要在同一 Block 内连续编排 (娱乐组)
    pub grouped: bool,
    pub teams: Vec<TeamId>,
}

impl Division {
    pub fn is_capability_restricted(&self) -> bool {
        self.required_capability.is_some()
    }
}

// ==========================================
// Team - 球队 (Entity)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub school: SchoolId,
    pub division: DivisionId,
    pub coach: Option<CoachId>,
    pub tier: Option<u8>,          // 已回落到学校的 tier
    pub cluster: Option<String>,   // 已回落到学校的 cluster
    pub rivals: BTreeSet<TeamId>,
    pub do_not_play: BTreeSet<TeamId>,
    pub target_games: u32,
}

impl Team {
    /// 双向检查禁赛名单
    pub fn forbids(&self, other: &Team) -> bool {
        self.do_not_play.contains(&other.id) || other.do_not_play.contains(&self.id)
    }

    /// 双向检查宿敌名单
    pub fn is_rival_of(&self, other: &Team) -> bool {
        self.rivals.contains(&other.id) || other.rivals.contains(&self.id)
    }

    pub fn shares_school_with(&self, other: &Team) -> bool {
        self.school == other.school
    }

    pub fn shares_coach_with(&self, other: &Team) -> bool {
        matches!((self.coach, other.coach), (Some(a), Some(b)) if a == b)
    }

    /// 两队 cluster 均已设置且不同
    pub fn clusters_differ(&self, other: &Team) -> bool {
        matches!((&self.cluster, &other.cluster), (Some(a), Some(b)) if a != b)
    }
}
