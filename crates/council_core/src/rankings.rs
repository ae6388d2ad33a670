//! Member and party leaderboards built from the full member and question
//! lists.

use crate::error::Result;
use crate::filter::QuestionFilter;
use crate::members::list_members;
use crate::query::{QueryContext, get_top_liked_questions, list_questions};
use crate::schema::{CouncilMember, EnrichedQuestion, Id};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub const UNAFFILIATED: &str = "無所属";

/// Matches both 議長 (chair) and 副議長 (vice-chair).
pub const CHAIR_MARKER: &str = "議長";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemberRanking {
    pub member_id: Id,
    pub name: String,
    pub party: Option<String>,
    pub position: Option<String>,
    pub photo_url: Option<String>,
    pub question_count: usize,
    pub like_total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PartyStat {
    pub party: String,
    pub member_count: usize,
    pub question_count: usize,
    pub like_total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Rankings {
    pub total_questions: usize,
    /// Every member, in input order.
    pub member_question_counts: Vec<MemberRanking>,
    /// Question-eligible members by question count.
    pub regular: Vec<MemberRanking>,
    /// Question-eligible members by likes received.
    pub like_leaders: Vec<MemberRanking>,
    pub chairpersons: Vec<MemberRanking>,
    pub party_stats: Vec<PartyStat>,
    pub top_liked_questions: Vec<EnrichedQuestion>,
}

/// Display badge for a 1-based leaderboard position. Purely visual: ties
/// are already broken by list order before a badge is assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RankBadge {
    Gold,
    Silver,
    Bronze,
    Numeric(usize),
}

impl RankBadge {
    pub fn for_rank(rank: usize) -> Self {
        match rank {
            1 => RankBadge::Gold,
            2 => RankBadge::Silver,
            3 => RankBadge::Bronze,
            n => RankBadge::Numeric(n),
        }
    }
}

impl fmt::Display for RankBadge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankBadge::Gold => write!(f, "[1位]"),
            RankBadge::Silver => write!(f, "[2位]"),
            RankBadge::Bronze => write!(f, "[3位]"),
            RankBadge::Numeric(n) => write!(f, "{n}位"),
        }
    }
}

pub fn is_chairperson(member: &CouncilMember) -> bool {
    member
        .position
        .as_deref()
        .is_some_and(|position| position.contains(CHAIR_MARKER))
}

fn party_key(party: Option<&str>) -> String {
    party
        .map(str::trim)
        .filter(|party| !party.is_empty())
        .unwrap_or(UNAFFILIATED)
        .to_string()
}

/// Per-member counts sum to `total_questions` whenever every question's
/// member resolves, which the `questions` foreign key guarantees for stored
/// rows. A question with an unknown member still counts toward its party
/// bucket and the total.
pub fn compute_rankings(
    members: &[CouncilMember],
    questions: &[EnrichedQuestion],
    top_liked_questions: Vec<EnrichedQuestion>,
) -> Rankings {
    let mut tallies: HashMap<&str, (usize, usize)> = HashMap::new();
    for question in questions {
        let entry = tallies
            .entry(question.question.council_member_id.as_str())
            .or_insert((0, 0));
        entry.0 += 1;
        entry.1 += question.like_count;
    }

    let member_question_counts: Vec<MemberRanking> = members
        .iter()
        .map(|member| {
            let (question_count, like_total) = tallies.get(member.id.as_str()).copied().unwrap_or((0, 0));
            MemberRanking {
                member_id: member.id.clone(),
                name: member.name.clone(),
                party: member.party.clone(),
                position: member.position.clone(),
                photo_url: member.photo_url.clone(),
                question_count,
                like_total,
            }
        })
        .collect();

    let (chairpersons, eligible): (Vec<_>, Vec<_>) = members
        .iter()
        .zip(member_question_counts.iter().cloned())
        .partition(|(member, _)| is_chairperson(member));
    let chairpersons: Vec<MemberRanking> = chairpersons.into_iter().map(|(_, rank)| rank).collect();
    let eligible: Vec<MemberRanking> = eligible.into_iter().map(|(_, rank)| rank).collect();

    let mut regular = eligible.clone();
    regular.sort_by(|a, b| b.question_count.cmp(&a.question_count));
    let mut like_leaders = eligible;
    like_leaders.sort_by(|a, b| b.like_total.cmp(&a.like_total));

    Rankings {
        total_questions: questions.len(),
        party_stats: party_stats(members, questions),
        member_question_counts,
        regular,
        like_leaders,
        chairpersons,
        top_liked_questions,
    }
}

/// Every question lands in exactly one party bucket; questions whose member
/// does not resolve count as unaffiliated.
fn party_stats(members: &[CouncilMember], questions: &[EnrichedQuestion]) -> Vec<PartyStat> {
    let mut stats: Vec<PartyStat> = Vec::new();
    let mut slot_of: HashMap<String, usize> = HashMap::new();
    let mut bucket = |stats: &mut Vec<PartyStat>, party: String| -> usize {
        *slot_of.entry(party.clone()).or_insert_with(|| {
            stats.push(PartyStat {
                party,
                member_count: 0,
                question_count: 0,
                like_total: 0,
            });
            stats.len() - 1
        })
    };

    let mut party_of_member: HashMap<&str, usize> = HashMap::new();
    for member in members {
        let slot = bucket(&mut stats, party_key(member.party.as_deref()));
        stats[slot].member_count += 1;
        party_of_member.insert(member.id.as_str(), slot);
    }

    for question in questions {
        let slot = match party_of_member.get(question.question.council_member_id.as_str()) {
            Some(slot) => *slot,
            None => bucket(&mut stats, UNAFFILIATED.to_string()),
        };
        stats[slot].question_count += 1;
        stats[slot].like_total += question.like_count;
    }

    stats.sort_by(|a, b| b.question_count.cmp(&a.question_count));
    stats
}

/// Loads members, the full question list and the top-liked leaderboard,
/// then ranks them.
pub fn load_rankings(ctx: &QueryContext<'_>, top_liked_limit: usize) -> Result<Rankings> {
    let members = list_members(ctx.conn, ctx.blobs, false)?;
    let questions = list_questions(ctx, &QuestionFilter::default())?;
    let top_liked = get_top_liked_questions(ctx, top_liked_limit)?;
    Ok(compute_rankings(&members, &questions, top_liked))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Question, QuestionStatus};

    fn member(id: &str, party: Option<&str>, position: Option<&str>) -> CouncilMember {
        CouncilMember {
            id: id.to_string(),
            name: format!("議員{id}"),
            party: party.map(str::to_string),
            position: position.map(str::to_string),
            term_start: None,
            term_end: None,
            is_active: true,
            email: None,
            phone: None,
            website: None,
            bio: None,
            photo_url: None,
            photo_storage_id: None,
            created_at: 0,
        }
    }

    fn question(id: &str, member_id: &str, likes: usize) -> EnrichedQuestion {
        EnrichedQuestion {
            question: Question {
                id: id.to_string(),
                title: id.to_string(),
                content: String::new(),
                category: "一般".to_string(),
                council_member_id: member_id.to_string(),
                session_date: 0,
                session_number: None,
                links: Vec::new(),
                status: QuestionStatus::Pending,
                created_at: 0,
            },
            member_name: String::new(),
            member_party: None,
            member_photo_url: None,
            response_count: 0,
            like_count: likes,
            is_liked: false,
        }
    }

    fn fixture() -> (Vec<CouncilMember>, Vec<EnrichedQuestion>) {
        let members = vec![
            member("chair", Some("みらい党"), Some("議長")),
            member("a", Some("みらい党"), Some("議員")),
            member("b", None, None),
            member("c", Some("市民の会"), Some("副議長")),
            member("d", Some("市民の会"), None),
        ];
        let questions = vec![
            question("q1", "chair", 1),
            question("q2", "chair", 0),
            question("q3", "chair", 4),
            question("q4", "a", 2),
            question("q5", "b", 7),
            question("q6", "b", 0),
            question("q7", "d", 3),
        ];
        (members, questions)
    }

    #[test]
    fn chairpersons_never_enter_regular_leaderboard() {
        let (members, questions) = fixture();
        let rankings = compute_rankings(&members, &questions, Vec::new());

        let regular: Vec<&str> = rankings.regular.iter().map(|r| r.member_id.as_str()).collect();
        assert_eq!(regular, vec!["b", "a", "d"]);
        let chairs: Vec<&str> = rankings.chairpersons.iter().map(|r| r.member_id.as_str()).collect();
        assert_eq!(chairs, vec!["chair", "c"]);
        assert_eq!(rankings.chairpersons[0].question_count, 3);
    }

    #[test]
    fn like_leaders_rank_by_likes_received() {
        let (members, questions) = fixture();
        let rankings = compute_rankings(&members, &questions, Vec::new());
        let leaders: Vec<(&str, usize)> = rankings
            .like_leaders
            .iter()
            .map(|r| (r.member_id.as_str(), r.like_total))
            .collect();
        assert_eq!(leaders, vec![("b", 7), ("d", 3), ("a", 2)]);
    }

    #[test]
    fn party_totals_cover_every_question() {
        let (members, questions) = fixture();
        let rankings = compute_rankings(&members, &questions, Vec::new());

        let party_total: usize = rankings.party_stats.iter().map(|p| p.question_count).sum();
        assert_eq!(party_total, questions.len());

        let unaffiliated = rankings
            .party_stats
            .iter()
            .find(|p| p.party == UNAFFILIATED)
            .expect("unaffiliated bucket");
        assert_eq!(unaffiliated.member_count, 1);
        assert_eq!(unaffiliated.question_count, 2);

        let per_member: usize = rankings
            .member_question_counts
            .iter()
            .map(|m| m.question_count)
            .sum();
        assert_eq!(per_member, questions.len());
    }

    #[test]
    fn unresolved_member_lands_in_the_unaffiliated_bucket_only() {
        let (members, mut questions) = fixture();
        questions.push(question("q8", "ghost", 1));
        let rankings = compute_rankings(&members, &questions, Vec::new());

        let party_total: usize = rankings.party_stats.iter().map(|p| p.question_count).sum();
        assert_eq!(party_total, questions.len());
        let unaffiliated = rankings
            .party_stats
            .iter()
            .find(|p| p.party == UNAFFILIATED)
            .expect("unaffiliated bucket");
        assert_eq!(unaffiliated.question_count, 3);

        let per_member: usize = rankings
            .member_question_counts
            .iter()
            .map(|m| m.question_count)
            .sum();
        assert_eq!(per_member, questions.len() - 1);
    }

    #[test]
    fn badges_distinguish_podium_from_numeric_ranks() {
        assert_eq!(RankBadge::for_rank(1), RankBadge::Gold);
        assert_eq!(RankBadge::for_rank(3), RankBadge::Bronze);
        assert_eq!(RankBadge::for_rank(4), RankBadge::Numeric(4));
        assert_eq!(RankBadge::for_rank(12).to_string(), "12位");
    }
}
