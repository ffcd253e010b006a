// ==========================================
// 赛季排赛引擎 - 名册 (导入记录 -> 内部化实体)
// ==========================================
// 职责: 将外部导入记录内部化为稠密 id,并在分配前快速失败
// 输入: SchoolRecord / DivisionRecord / FacilityRecord / TeamRecord
// 输出: Roster
// 红线: 任何引用缺失/容量为负/球队无组别 -> 直接报错,不进入分配
// ==========================================

use crate::domain::facility::{Facility, FacilityAvailability};
use crate::domain::team::{Division, School, Team};
use crate::domain::types::{CoachId, DivisionId, FacilityId, SchoolId, TeamId};
use crate::error::{SchedulerError, SchedulerResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

fn default_target_games() -> u32 {
    8
}

// ==========================================
// 导入记录 (由外部导入协作方提供)
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolRecord {
    pub name: String,
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub tier: Option<u8>,
    #[serde(default)]
    pub blackout_dates: Vec<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DivisionRecord {
    pub name: String,
    #[serde(default)]
    pub required_capability: Option<String>,
    #[serde(default)]
    pub priority_facilities: Vec<String>,
    #[serde(default)]
    pub grouped: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityRecord {
    pub name: String,
    #[serde(default)]
    pub available_dates: Vec<NaiveDate>,
    #[serde(default)]
    pub unavailable_dates: Vec<NaiveDate>,
    /// 原始容量,允许导入方传入负数以便在此处拒绝
    pub courts: i64,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub owner_school: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamRecord {
    pub id: String,
    pub school: String,
    #[serde(default)]
    pub division: Option<String>,
    #[serde(default)]
    pub coach: Option<String>,
    #[serde(default)]
    pub tier: Option<u8>,
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub rivals: Vec<String>,
    #[serde(default)]
    pub do_not_play: Vec<String>,
    #[serde(default = "default_target_games")]
    pub target_games: u32,
}

// ==========================================
// Roster - 内部化名册
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roster {
    pub schools: Vec<School>,
    pub divisions: Vec<Division>,
    pub facilities: Vec<Facility>,
    pub teams: Vec<Team>,
    pub coaches: Vec<String>,
}

impl Roster {
    /// 构建名册
    ///
    /// # 校验规则
    /// 1. 学校/组别/场馆/球队名称非空且唯一
    /// 2. 场馆容量非负
    /// 3. 球队必须有组别,且学校/组别存在
    /// 4. 宿敌/禁赛名单、优先场馆、场馆所属学校必须引用已存在对象
    ///
    /// # 返回
    /// - `Ok(Roster)`: 通过校验
    /// - `Err(SchedulerError)`: 第一条不合法数据的描述
    pub fn build(
        schools: Vec<SchoolRecord>,
        divisions: Vec<DivisionRecord>,
        facilities: Vec<FacilityRecord>,
        teams: Vec<TeamRecord>,
    ) -> SchedulerResult<Self> {
        // 1. 学校
        let mut school_ids: HashMap<String, SchoolId> = HashMap::new();
        let mut built_schools = Vec::with_capacity(schools.len());
        for record in schools {
            let name = non_empty(&record.name, "school")?;
            let id = SchoolId(built_schools.len() as u32);
            if school_ids.insert(name.clone(), id).is_some() {
                return Err(SchedulerError::DuplicateId {
                    kind: "school".to_string(),
                    id: name,
                });
            }
            built_schools.push(School {
                id,
                name,
                cluster: clean_opt(record.cluster),
                tier: record.tier,
                blackout_dates: record.blackout_dates.into_iter().collect(),
                teams: Vec::new(),
            });
        }

        // 2. 场馆
        let mut facility_ids: HashMap<String, FacilityId> = HashMap::new();
        let mut built_facilities = Vec::with_capacity(facilities.len());
        for record in facilities {
            let name = non_empty(&record.name, "facility")?;
            if record.courts < 0 {
                return Err(SchedulerError::NegativeCapacity {
                    facility: name,
                    courts: record.courts,
                });
            }
            let owner = match clean_opt(record.owner_school) {
                Some(school) => Some(
                    *school_ids
                        .get(&school)
                        .ok_or_else(|| SchedulerError::unknown("school", &school, &name))?,
                ),
                None => None,
            };
            let id = FacilityId(built_facilities.len() as u32);
            if facility_ids.insert(name.clone(), id).is_some() {
                return Err(SchedulerError::DuplicateId {
                    kind: "facility".to_string(),
                    id: name,
                });
            }
            if record.courts == 0 {
                warn!(facility = %name, "场馆容量为 0,不会产出任何时段");
            }
            let courts = u32::try_from(record.courts).map_err(|_| {
                SchedulerError::InvalidRoster(format!(
                    "场馆 {} 的场地数 {} 超出范围",
                    name, record.courts
                ))
            })?;
            built_facilities.push(Facility {
                id,
                name,
                availability: FacilityAvailability {
                    allow: record.available_dates.into_iter().collect(),
                    deny: record.unavailable_dates.into_iter().collect(),
                },
                courts,
                capabilities: record.capabilities.into_iter().collect(),
                owner,
            });
        }

        // 3. 组别
        let mut division_ids: HashMap<String, DivisionId> = HashMap::new();
        let mut built_divisions = Vec::with_capacity(divisions.len());
        for record in divisions {
            let name = non_empty(&record.name, "division")?;
            let mut priority_facilities = Vec::with_capacity(record.priority_facilities.len());
            for facility in &record.priority_facilities {
                let fid = facility_ids
                    .get(facility.trim())
                    .ok_or_else(|| SchedulerError::unknown("facility", facility, &name))?;
                priority_facilities.push(*fid);
            }
            let id = DivisionId(built_divisions.len() as u32);
            if division_ids.insert(name.clone(), id).is_some() {
                return Err(SchedulerError::DuplicateId {
                    kind: "division".to_string(),
                    id: name,
                });
            }
            built_divisions.push(Division {
                id,
                name,
                required_capability: clean_opt(record.required_capability),
                priority_facilities,
                grouped: record.grouped,
                teams: Vec::new(),
            });
        }

        // 4. 球队 (先分配 id,再解析宿敌/禁赛引用)
        let mut team_ids: HashMap<String, TeamId> = HashMap::new();
        for (idx, record) in teams.iter().enumerate() {
            let id = non_empty(&record.id, "team")?;
            if team_ids.insert(id.clone(), TeamId(idx as u32)).is_some() {
                return Err(SchedulerError::DuplicateId {
                    kind: "team".to_string(),
                    id,
                });
            }
        }

        let mut coach_ids: HashMap<String, CoachId> = HashMap::new();
        let mut coaches: Vec<String> = Vec::new();
        let mut built_teams = Vec::with_capacity(teams.len());
        for (idx, record) in teams.into_iter().enumerate() {
            let name = record.id.trim().to_string();
            let school = *school_ids
                .get(record.school.trim())
                .ok_or_else(|| SchedulerError::unknown("school", &record.school, &name))?;
            let division_name = clean_opt(record.division)
                .ok_or_else(|| SchedulerError::MissingDivision { team: name.clone() })?;
            let division = *division_ids
                .get(&division_name)
                .ok_or_else(|| SchedulerError::unknown("division", &division_name, &name))?;

            let coach = clean_opt(record.coach).map(|coach_name| {
                *coach_ids.entry(coach_name.clone()).or_insert_with(|| {
                    coaches.push(coach_name);
                    CoachId((coaches.len() - 1) as u32)
                })
            });

            let rivals = resolve_team_refs(&record.rivals, &team_ids, &name)?;
            let do_not_play = resolve_team_refs(&record.do_not_play, &team_ids, &name)?;

            let school_ref = &built_schools[school.index()];
            let id = TeamId(idx as u32);
            built_teams.push(Team {
                id,
                name,
                school,
                division,
                coach,
                tier: record.tier.or(school_ref.tier),
                cluster: clean_opt(record.cluster).or_else(|| school_ref.cluster.clone()),
                rivals,
                do_not_play,
                target_games: record.target_games,
            });
            built_schools[school.index()].teams.push(id);
            built_divisions[division.index()].teams.push(id);
        }

        for team in &built_teams {
            if team.rivals.contains(&team.id) || team.do_not_play.contains(&team.id) {
                return Err(SchedulerError::InvalidRoster(format!(
                    "球队 {} 的宿敌/禁赛名单包含自身",
                    team.name
                )));
            }
        }

        info!(
            schools = built_schools.len(),
            divisions = built_divisions.len(),
            facilities = built_facilities.len(),
            teams = built_teams.len(),
            coaches = coaches.len(),
            "名册构建完成"
        );

        Ok(Self {
            schools: built_schools,
            divisions: built_divisions,
            facilities: built_facilities,
            teams: built_teams,
            coaches,
        })
    }

    // ==========================================
    // 查询
    // ==========================================

    #[inline]
    pub fn team(&self, id: TeamId) -> &Team {
        &self.teams[id.index()]
    }

    #[inline]
    pub fn school(&self, id: SchoolId) -> &School {
        &self.schools[id.index()]
    }

    #[inline]
    pub fn division(&self, id: DivisionId) -> &Division {
        &self.divisions[id.index()]
    }

    #[inline]
    pub fn facility(&self, id: FacilityId) -> &Facility {
        &self.facilities[id.index()]
    }

    pub fn get_team(&self, id: TeamId) -> Option<&Team> {
        self.teams.get(id.index())
    }

    pub fn get_division(&self, id: DivisionId) -> Option<&Division> {
        self.divisions.get(id.index())
    }

    pub fn get_facility(&self, id: FacilityId) -> Option<&Facility> {
        self.facilities.get(id.index())
    }

    pub fn team_by_name(&self, name: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.name == name)
    }

    pub fn facility_by_name(&self, name: &str) -> Option<&Facility> {
        self.facilities.iter().find(|f| f.name == name)
    }

    pub fn school_of(&self, team: TeamId) -> &School {
        self.school(self.team(team).school)
    }

    /// 结构校验: 不经过 build 得到的名册 (例如反序列化) 在分配前必须通过
    ///
    /// # 校验规则
    /// 1. 每个实体的 id 等于其下标
    /// 2. 球队引用的学校/组别/教练/宿敌/禁赛对象存在
    /// 3. 学校/组别成员列表、场馆所属学校、优先场馆引用存在
    pub fn validate(&self) -> SchedulerResult<()> {
        let invalid = |msg: String| Err(SchedulerError::InvalidRoster(msg));

        for (idx, school) in self.schools.iter().enumerate() {
            if school.id.index() != idx {
                return invalid(format!("学校 {} 的 id {} 与位置 {} 不符", school.name, school.id, idx));
            }
            if let Some(t) = school.teams.iter().find(|t| t.index() >= self.teams.len()) {
                return invalid(format!("学校 {} 引用了不存在的球队 {}", school.name, t));
            }
        }
        for (idx, facility) in self.facilities.iter().enumerate() {
            if facility.id.index() != idx {
                return invalid(format!("场馆 {} 的 id {} 与位置 {} 不符", facility.name, facility.id, idx));
            }
            if let Some(owner) = facility.owner.filter(|s| s.index() >= self.schools.len()) {
                return invalid(format!("场馆 {} 的所属学校 {} 不存在", facility.name, owner));
            }
        }
        for (idx, division) in self.divisions.iter().enumerate() {
            if division.id.index() != idx {
                return invalid(format!("组别 {} 的 id {} 与位置 {} 不符", division.name, division.id, idx));
            }
            if let Some(f) = division
                .priority_facilities
                .iter()
                .find(|f| f.index() >= self.facilities.len())
            {
                return invalid(format!("组别 {} 的优先场馆 {} 不存在", division.name, f));
            }
            if let Some(t) = division.teams.iter().find(|t| t.index() >= self.teams.len()) {
                return invalid(format!("组别 {} 引用了不存在的球队 {}", division.name, t));
            }
        }
        for (idx, team) in self.teams.iter().enumerate() {
            if team.id.index() != idx {
                return invalid(format!("球队 {} 的 id {} 与位置 {} 不符", team.name, team.id, idx));
            }
            if team.school.index() >= self.schools.len() {
                return invalid(format!("球队 {} 的学校 {} 不存在", team.name, team.school));
            }
            if team.division.index() >= self.divisions.len() {
                return invalid(format!("球队 {} 的组别 {} 不存在", team.name, team.division));
            }
            if let Some(coach) = team.coach.filter(|c| c.index() >= self.coaches.len()) {
                return invalid(format!("球队 {} 的教练 {} 不存在", team.name, coach));
            }
            if let Some(t) = team
                .rivals
                .iter()
                .chain(team.do_not_play.iter())
                .find(|t| t.index() >= self.teams.len() || **t == team.id)
            {
                return invalid(format!("球队 {} 的宿敌/禁赛名单引用无效球队 {}", team.name, t));
            }
        }
        Ok(())
    }

    /// 球队总数
    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// 全部球队的目标场次之和
    pub fn total_target_games(&self) -> u64 {
        self.teams.iter().map(|t| t.target_games as u64).sum()
    }
}

// ==========================================
// 辅助函数
// ==========================================

fn non_empty(raw: &str, kind: &str) -> SchedulerResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SchedulerError::InvalidRoster(format!("{} 名称为空", kind)));
    }
    Ok(trimmed.to_string())
}

fn clean_opt(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn resolve_team_refs(
    names: &[String],
    team_ids: &HashMap<String, TeamId>,
    referenced_by: &str,
) -> SchedulerResult<BTreeSet<TeamId>> {
    let mut out = BTreeSet::new();
    for name in names {
        let key = name.trim();
        if key.is_empty() {
            continue;
        }
        let id = team_ids
            .get(key)
            .ok_or_else(|| SchedulerError::unknown("team", key, referenced_by))?;
        out.insert(*id);
    }
    debug!(team = referenced_by, refs = out.len(), "球队引用解析完成");
    Ok(out)
}
