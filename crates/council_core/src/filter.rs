//! Predicate, sort and pagination rules shared by the paginated endpoints,
//! the unpaginated list and the client-side list view.

use crate::schema::{EnrichedQuestion, Pagination, Question, QuestionStatus};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::ops::Range;

/// Fields every question-shaped row exposes to the shared rules.
pub trait QuestionView {
    fn question(&self) -> &Question;

    /// Raw rows carry no member join, so search never sees a name for them.
    fn member_name(&self) -> Option<&str> {
        None
    }

    fn like_count(&self) -> usize {
        0
    }
}

impl QuestionView for Question {
    fn question(&self) -> &Question {
        self
    }
}

impl QuestionView for EnrichedQuestion {
    fn question(&self) -> &Question {
        &self.question
    }

    fn member_name(&self) -> Option<&str> {
        Some(&self.member_name)
    }

    fn like_count(&self) -> usize {
        self.like_count
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionFilter {
    pub category: Option<String>,
    pub member_id: Option<String>,
    pub search_term: Option<String>,
    pub session_number: Option<String>,
    pub status: Option<QuestionStatus>,
}

impl QuestionFilter {
    pub fn matches<T: QuestionView>(&self, item: &T) -> bool {
        let question = item.question();

        if let Some(category) = non_blank(&self.category) {
            if question.category != category {
                return false;
            }
        }
        if let Some(member_id) = non_blank(&self.member_id) {
            if question.council_member_id != member_id {
                return false;
            }
        }
        if let Some(session_number) = non_blank(&self.session_number) {
            if question.session_number.as_deref() != Some(session_number) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if question.status != status {
                return false;
            }
        }
        match non_blank(&self.search_term) {
            Some(term) => matches_search(item, term),
            None => true,
        }
    }

    pub fn member_id(&self) -> Option<&str> {
        non_blank(&self.member_id)
    }
}

/// Case-insensitive substring match on title or body, plus member name
/// when the row carries one.
pub fn matches_search<T: QuestionView>(item: &T, term: &str) -> bool {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    let question = item.question();
    question.title.to_lowercase().contains(&needle)
        || question.content.to_lowercase().contains(&needle)
        || item
            .member_name()
            .is_some_and(|name| name.to_lowercase().contains(&needle))
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Newest,
    Oldest,
    Title,
    Likes,
}

/// Stable sort: rows that tie on the key keep their input order.
pub fn sort_questions<T: QuestionView>(items: &mut [T], sort: SortBy) {
    match sort {
        SortBy::Newest => items.sort_by(|a, b| {
            b.question().session_date.cmp(&a.question().session_date)
        }),
        SortBy::Oldest => items.sort_by(|a, b| {
            a.question().session_date.cmp(&b.question().session_date)
        }),
        SortBy::Title => items.sort_by(|a, b| compare_titles(&a.question().title, &b.question().title)),
        SortBy::Likes => items.sort_by(|a, b| b.like_count().cmp(&a.like_count())),
    }
}

/// Orders Japanese titles the way a reader expects: katakana sorts with
/// hiragana, full-width Latin with half-width, case is ignored.
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    a.chars()
        .map(collation_char)
        .cmp(b.chars().map(collation_char))
        .then_with(|| a.cmp(b))
}

fn collation_char(c: char) -> char {
    let folded = match c as u32 {
        // katakana ァ..ヶ -> hiragana ぁ..ゖ
        0x30A1..=0x30F6 => char::from_u32(c as u32 - 0x60).unwrap_or(c),
        // full-width ！..～ -> ASCII
        0xFF01..=0xFF5E => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
        0x3000 => ' ',
        _ => c,
    };
    folded.to_lowercase().next().unwrap_or(folded)
}

impl Pagination {
    pub fn new(current_page: usize, page_size: usize, total_count: usize) -> Self {
        let page_size = page_size.max(1);
        let total_pages = total_count.div_ceil(page_size);
        Self {
            current_page,
            total_pages,
            total_count,
            page_size,
            has_next_page: current_page < total_pages,
            has_prev_page: current_page > 1,
        }
    }
}

/// Index range of a 1-based page, clamped to `len`.
pub fn page_bounds(page: usize, page_size: usize, len: usize) -> Range<usize> {
    let start = page.saturating_sub(1).saturating_mul(page_size).min(len);
    let end = start.saturating_add(page_size).min(len);
    start..end
}

pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    &items[page_bounds(page, page_size, items.len())]
}
