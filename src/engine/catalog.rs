// ==========================================
// 赛季排赛引擎 - 对阵目录 (MatchupCatalog)
// ==========================================
// 职责: 按分组模式枚举合法对阵并预先评分
//   - WithinDivision:    组别内单循环
//   - SchoolPairBundle:  两校之间跨组别打包 (每个组别内一对一配对)
// 排除 (永不产出):
//   1. 同校对阵
//   2. 禁赛名单中的对阵 (任一方向)
//   3. 有能力要求的组别中 cluster 均已设置且不同的对阵
// 排序: 分值降序,同分保持生成顺序 (稳定排序)
// ==========================================

use crate::domain::roster::Roster;
use crate::domain::types::{DivisionId, GroupingMode, SchoolId, TeamId};
use crate::engine::scoring::ScoringModel;
use std::collections::BTreeMap;

/// 单场对阵
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pairing {
    pub a: TeamId,
    pub b: TeamId,
    pub division: DivisionId,
    pub score: i64,
}

impl Pairing {
    pub fn teams(&self) -> [TeamId; 2] {
        [self.a, self.b]
    }
}

/// 候选对阵: 单场或同一 Block 连续编排的捆绑
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchupCandidate {
    pub pairings: Vec<Pairing>,
    pub score: i64,
    /// 捆绑所属学校对; 单场为 None
    pub schools: Option<(SchoolId, SchoolId)>,
}

impl MatchupCandidate {
    pub fn single(pairing: Pairing) -> Self {
        Self {
            score: pairing.score,
            pairings: vec![pairing],
            schools: None,
        }
    }

    pub fn is_bundle(&self) -> bool {
        self.schools.is_some()
    }

    pub fn len(&self) -> usize {
        self.pairings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairings.is_empty()
    }
}

pub struct MatchupCatalog<'a> {
    roster: &'a Roster,
    scoring: &'a ScoringModel<'a>,
}

impl<'a> MatchupCatalog<'a> {
    pub fn new(roster: &'a Roster, scoring: &'a ScoringModel<'a>) -> Self {
        Self { roster, scoring }
    }

    /// 对阵是否合法 (同组别 + 排除规则)
    pub fn is_eligible(&self, a: TeamId, b: TeamId) -> bool {
        if a == b {
            return false;
        }
        let ta = self.roster.team(a);
        let tb = self.roster.team(b);
        if ta.division != tb.division || ta.shares_school_with(tb) || ta.forbids(tb) {
            return false;
        }
        let division = self.roster.division(ta.division);
        !(division.is_capability_restricted() && ta.clusters_differ(tb))
    }

    fn pairing(&self, a: TeamId, b: TeamId) -> Pairing {
        Pairing {
            a,
            b,
            division: self.roster.team(a).division,
            score: self.scoring.score(a, b),
        }
    }

    /// 组别内单循环 (惰性,按输入顺序 i < j)
    pub fn pairings<'t>(&'t self, teams: &'t [TeamId]) -> Box<dyn Iterator<Item = Pairing> + 't> {
        Box::new(teams.iter().enumerate().flat_map(move |(i, &a)| {
            teams[i + 1..]
                .iter()
                .filter(move |&&b| self.is_eligible(a, b))
                .map(move |&b| self.pairing(a, b))
        }))
    }

    /// 组别内单循环候选 (已排序)
    pub fn within_division(&self, teams: &[TeamId]) -> Vec<MatchupCandidate> {
        let mut out: Vec<MatchupCandidate> =
            self.pairings(teams).map(MatchupCandidate::single).collect();
        out.sort_by(|x, y| y.score.cmp(&x.score));
        out
    }

    /// 按分组方式生成候选
    pub fn candidates(&self, mode: GroupingMode, scope: &[TeamId]) -> Vec<MatchupCandidate> {
        match mode {
            GroupingMode::WithinDivision => self.within_division(scope),
            GroupingMode::SchoolPairBundle => self.school_pair_bundles(scope),
        }
    }

    /// 某球队在给定范围内的全部合法对手
    pub fn opponents_for(&self, team: TeamId, scope: &[TeamId]) -> Vec<Pairing> {
        scope
            .iter()
            .filter(|&&o| self.is_eligible(team, o))
            .map(|&o| self.pairing(team, o))
            .collect()
    }

    /// 学校对捆绑候选 (已排序)
    ///
    /// # 规则
    /// - 每对学校、每个组别内,两校球队一对一配对 (一支球队在一个捆绑中只出场一次)
    /// - 配对按分值择优,再按教练聚类排序,使同一教练的比赛相邻
    /// - 捆绑分值 = 各场分值的平均
    pub fn school_pair_bundles(&self, scope: &[TeamId]) -> Vec<MatchupCandidate> {
        // 学校 -> 组别 -> 球队
        let mut by_school: BTreeMap<SchoolId, BTreeMap<DivisionId, Vec<TeamId>>> = BTreeMap::new();
        for &t in scope {
            let team = self.roster.team(t);
            by_school
                .entry(team.school)
                .or_default()
                .entry(team.division)
                .or_default()
                .push(t);
        }
        let schools: Vec<SchoolId> = by_school.keys().copied().collect();

        let mut out = Vec::new();
        for (i, &sa) in schools.iter().enumerate() {
            for &sb in &schools[i + 1..] {
                let mut pairings = Vec::new();
                for (division, teams_a) in &by_school[&sa] {
                    let Some(teams_b) = by_school[&sb].get(division) else {
                        continue;
                    };
                    pairings.extend(self.match_one_to_one(teams_a, teams_b));
                }
                if pairings.is_empty() {
                    continue;
                }
                let pairings = self.cluster_by_coach(pairings);
                let score = pairings.iter().map(|p| p.score).sum::<i64>() / pairings.len() as i64;
                out.push(MatchupCandidate {
                    pairings,
                    score,
                    schools: Some((sa, sb)),
                });
            }
        }
        out.sort_by(|x, y| y.score.cmp(&x.score));
        out
    }

    fn match_one_to_one(&self, teams_a: &[TeamId], teams_b: &[TeamId]) -> Vec<Pairing> {
        let mut all: Vec<Pairing> = teams_a
            .iter()
            .flat_map(|&a| teams_b.iter().map(move |&b| (a, b)))
            .filter(|&(a, b)| self.is_eligible(a, b))
            .map(|(a, b)| self.pairing(a, b))
            .collect();
        all.sort_by(|x, y| y.score.cmp(&x.score));

        let mut used: Vec<TeamId> = Vec::new();
        let mut chosen = Vec::new();
        for p in all {
            if used.contains(&p.a) || used.contains(&p.b) {
                continue;
            }
            used.push(p.a);
            used.push(p.b);
            chosen.push(p);
        }
        chosen
    }

    /// 多队教练的比赛优先且相邻,其余保持原顺序
    fn cluster_by_coach(&self, pairings: Vec<Pairing>) -> Vec<Pairing> {
        let mut per_coach: BTreeMap<_, Vec<usize>> = BTreeMap::new();
        for (idx, p) in pairings.iter().enumerate() {
            for t in p.teams() {
                if let Some(coach) = self.roster.team(t).coach {
                    per_coach.entry(coach).or_default().push(idx);
                }
            }
        }
        let mut coaches: Vec<_> = per_coach.into_iter().filter(|(_, v)| v.len() > 1).collect();
        coaches.sort_by(|x, y| y.1.len().cmp(&x.1.len()));

        let mut taken = vec![false; pairings.len()];
        let mut ordered = Vec::with_capacity(pairings.len());
        for (_, idxs) in coaches {
            for idx in idxs {
                if !taken[idx] {
                    taken[idx] = true;
                    ordered.push(pairings[idx]);
                }
            }
        }
        for (idx, p) in pairings.iter().enumerate() {
            if !taken[idx] {
                ordered.push(*p);
            }
        }
        ordered
    }
}
