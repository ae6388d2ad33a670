//! Client-side refinement over the unpaginated question list. Uses the same
//! predicate and sort rules as the server endpoints, with member-name search
//! and a likes sort on top.

use crate::filter::{QuestionFilter, SortBy, paginate, sort_questions};
use crate::schema::{EnrichedQuestion, Pagination, QuestionStatus};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const LIST_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionListState {
    pub filter: QuestionFilter,
    pub sort: SortBy,
    pub page: usize,
    pub page_size: usize,
}

impl Default for QuestionListState {
    fn default() -> Self {
        Self {
            filter: QuestionFilter::default(),
            sort: SortBy::Newest,
            page: 1,
            page_size: LIST_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListViewPage {
    pub rows: Vec<EnrichedQuestion>,
    pub pagination: Pagination,
}

impl QuestionListState {
    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.filter.search_term = Some(term.into());
        self.page = 1;
    }

    pub fn set_category(&mut self, category: Option<String>) {
        self.filter.category = category;
        self.page = 1;
    }

    pub fn set_member(&mut self, member_id: Option<String>) {
        self.filter.member_id = member_id;
        self.page = 1;
    }

    pub fn set_session_number(&mut self, session_number: Option<String>) {
        self.filter.session_number = session_number;
        self.page = 1;
    }

    pub fn set_status(&mut self, status: Option<QuestionStatus>) {
        self.filter.status = status;
        self.page = 1;
    }

    pub fn set_sort(&mut self, sort: SortBy) {
        self.sort = sort;
        self.page = 1;
    }

    pub fn go_to_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    /// Filters, sorts and slices `questions`; a page past the end is
    /// clamped to the last one.
    pub fn apply(&self, questions: &[EnrichedQuestion]) -> ListViewPage {
        let mut visible: Vec<EnrichedQuestion> = questions
            .iter()
            .filter(|question| self.filter.matches(*question))
            .cloned()
            .collect();
        sort_questions(&mut visible, self.sort);

        let page_size = self.page_size.max(1);
        let last_page = visible.len().div_ceil(page_size).max(1);
        let page = self.page.clamp(1, last_page);

        ListViewPage {
            rows: paginate(&visible, page, page_size).to_vec(),
            pagination: Pagination::new(page, page_size, visible.len()),
        }
    }
}

/// Distinct categories in first-seen order, for the filter dropdown.
pub fn category_options(questions: &[EnrichedQuestion]) -> Vec<String> {
    let mut options: Vec<String> = Vec::new();
    for question in questions {
        if !options.contains(&question.question.category) {
            options.push(question.question.category.clone());
        }
    }
    options
}

/// Distinct session numbers in first-seen order.
pub fn session_options(questions: &[EnrichedQuestion]) -> Vec<String> {
    let mut options: Vec<String> = Vec::new();
    for number in questions.iter().filter_map(|q| q.question.session_number.as_ref()) {
        if !options.contains(number) {
            options.push(number.clone());
        }
    }
    options
}
