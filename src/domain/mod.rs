// ==========================================
// 赛季排赛引擎 - 领域模型层
// ==========================================
// 职责: 定义实体、值类型、校验结果模型
// 红线: 不含分配逻辑,不含配置加载
// ==========================================

pub mod facility;
pub mod game;
pub mod roster;
pub mod slot;
pub mod team;
pub mod types;
pub mod validation;

// 重导出核心类型
pub use facility::{DateAvailability, Facility, FacilityAvailability};
pub use game::{Game, Schedule};
pub use roster::{DivisionRecord, FacilityRecord, Roster, SchoolRecord, TeamRecord};
pub use slot::{Block, SlotKey, TimeKey, TimeSlot};
pub use team::{Division, School, Team};
pub use types::{
    school_pair_key, team_pair_key, CoachId, DivisionId, FacilityId, GroupingMode, SchoolId,
    Severity, TeamId,
};
pub use validation::{TeamScheduleStats, ValidationResult, Violation, ViolationKind};
