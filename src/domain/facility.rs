// ==========================================
// 赛季排赛引擎 - 场馆领域模型
// ==========================================
// 红线: 不可用日期优先于可用日期白名单
// 用途: 时段生成 + 校验器的场馆可用性判断
// ==========================================

use crate::domain::types::{FacilityId, SchoolId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ==========================================
// FacilityAvailability - 按日期的可用性
// ==========================================
// allow 为空 = 不限制; deny 命中 = 不可用
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityAvailability {
    pub allow: BTreeSet<NaiveDate>,
    pub deny: BTreeSet<NaiveDate>,
}

impl FacilityAvailability {
    pub fn unrestricted() -> Self {
        Self::default()
    }

    pub fn only(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            allow: dates.into_iter().collect(),
            deny: BTreeSet::new(),
        }
    }

    pub fn except(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            allow: BTreeSet::new(),
            deny: dates.into_iter().collect(),
        }
    }
}

// ==========================================
// Facility - 场馆
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facility {
    pub id: FacilityId,
    pub name: String,
    pub availability: FacilityAvailability,
    pub courts: u32,                   // 场地数 (0 = 不产出任何时段)
    pub capabilities: BTreeSet<String>, // 能力标签,例如 "low_rim"
    pub owner: Option<SchoolId>,       // 所属学校 (主场判定)
}

// ==========================================
// Trait: DateAvailability
// ==========================================
// 用途: 场馆可用日 / 学校停赛日的统一判定接口
pub trait DateAvailability {
    /// 指定日期是否可用
    fn is_available(&self, date: NaiveDate) -> bool;
}

impl DateAvailability for FacilityAvailability {
    fn is_available(&self, date: NaiveDate) -> bool {
        if self.deny.contains(&date) {
            return false;
        }
        if !self.allow.is_empty() {
            return self.allow.contains(&date);
        }
        true
    }
}

impl DateAvailability for Facility {
    fn is_available(&self, date: NaiveDate) -> bool {
        self.availability.is_available(date)
    }
}

impl Facility {
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    /// 是否为该学校的主场
    pub fn is_home_of(&self, school: SchoolId) -> bool {
        self.owner == Some(school)
    }
}
