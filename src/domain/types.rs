// ==========================================
// 赛季排赛引擎 - 领域类型定义
// ==========================================
// 职责: 内部化标识 (interned id) 与基础枚举
// 红线: 标识为名册内的稠密下标,只在同一份 Roster 内有效
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! dense_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl $name {
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

dense_id!(
    /// 球队 (Entity)
    TeamId,
    "T"
);
dense_id!(
    /// 学校 (Group)
    SchoolId,
    "S"
);
dense_id!(
    /// 组别 (Category)
    DivisionId,
    "D"
);
dense_id!(
    /// 场馆 (Resource)
    FacilityId,
    "F"
);
dense_id!(
    /// 教练 (staff)
    CoachId,
    "C"
);

// ==========================================
// 约束严重度
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Hard, // 必须满足
    Soft, // 偏好,计罚分
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Hard => write!(f, "hard"),
            Severity::Soft => write!(f, "soft"),
        }
    }
}

// ==========================================
// 对阵生成模式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingMode {
    /// 组别内单循环
    WithinDivision,
    /// 两校之间跨组别打包
    SchoolPairBundle,
}

impl fmt::Display for GroupingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupingMode::WithinDivision => write!(f, "within_division"),
            GroupingMode::SchoolPairBundle => write!(f, "school_pair_bundle"),
        }
    }
}

/// 无序球队对的规范键 (小 id 在前)
#[inline]
pub fn team_pair_key(a: TeamId, b: TeamId) -> (TeamId, TeamId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// 无序学校对的规范键
#[inline]
pub fn school_pair_key(a: SchoolId, b: SchoolId) -> (SchoolId, SchoolId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_keys_are_order_independent() {
        assert_eq!(team_pair_key(TeamId(3), TeamId(1)), (TeamId(1), TeamId(3)));
        assert_eq!(team_pair_key(TeamId(1), TeamId(3)), (TeamId(1), TeamId(3)));
        assert_eq!(
            school_pair_key(SchoolId(9), SchoolId(2)),
            school_pair_key(SchoolId(2), SchoolId(9))
        );
    }

    #[test]
    fn test_id_display() {
        assert_eq!(TeamId(7).to_string(), "T7");
        assert_eq!(FacilityId(0).to_string(), "F0");
        assert_eq!(Severity::Hard.to_string(), "hard");
    }
}
