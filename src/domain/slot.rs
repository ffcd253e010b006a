// ==========================================
// 赛季排赛引擎 - 时段与连续时段块
// ==========================================
// TimeSlot: (日期, 开始, 结束, 场馆, 场地号) 原子可预订单元
// Block: 同一场馆/场地/日期上的连续时段
// ==========================================

use crate::domain::types::FacilityId;
use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// TimeSlot - 时段
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeSlot {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub facility: FacilityId,
    pub court: u32, // 从 1 开始
}

impl TimeSlot {
    /// 场地占用键
    #[inline]
    pub fn key(&self) -> SlotKey {
        SlotKey {
            date: self.date,
            start: self.start,
            facility: self.facility,
            court: self.court,
        }
    }

    /// 球队/学校/教练冲突键
    #[inline]
    pub fn time_key(&self) -> TimeKey {
        TimeKey {
            date: self.date,
            start: self.start,
        }
    }

    pub fn weekday(&self) -> Weekday {
        self.date.weekday()
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}-{} {} court {}",
            self.date,
            self.start.format("%H:%M"),
            self.end.format("%H:%M"),
            self.facility,
            self.court
        )
    }
}

/// (日期, 开始, 场馆, 场地) - 物理资源唯一键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub facility: FacilityId,
    pub court: u32,
}

/// (日期, 开始) - 参与者时间唯一键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeKey {
    pub date: NaiveDate,
    pub start: NaiveTime,
}

// ==========================================
// Block - 连续时段块
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub facility: FacilityId,
    pub court: u32,
    pub date: NaiveDate,
    /// 从当前偏移到当天窗口结束的连续时段 (非空)
    pub slots: Vec<TimeSlot>,
}

impl Block {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn first(&self) -> Option<&TimeSlot> {
        self.slots.first()
    }

    /// 取前 n 个连续时段; 不足 n 个返回 None
    pub fn leading(&self, n: usize) -> Option<&[TimeSlot]> {
        if n == 0 || n > self.slots.len() {
            return None;
        }
        Some(&self.slots[..n])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(h: u32) -> TimeSlot {
        TimeSlot {
            date: NaiveDate::from_ymd_opt(2026, 1, 6).unwrap(),
            start: NaiveTime::from_hms_opt(h, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(h + 1, 0, 0).unwrap(),
            facility: FacilityId(0),
            court: 1,
        }
    }

    #[test]
    fn test_keys_and_duration() {
        let s = slot(17);
        assert_eq!(s.duration_minutes(), 60);
        assert_eq!(s.time_key().start, s.key().start);
        assert_eq!(s.weekday(), Weekday::Tue);
    }

    #[test]
    fn test_block_leading() {
        let block = Block {
            facility: FacilityId(0),
            court: 1,
            date: NaiveDate::from_ymd_opt(2026, 1, 6).unwrap(),
            slots: vec![slot(17), slot(18)],
        };
        assert_eq!(block.leading(2).map(|s| s.len()), Some(2));
        assert!(block.leading(3).is_none());
        assert!(block.leading(0).is_none());
    }
}
