//! YAML fixtures for standing up a site: users, members, questions with
//! their responses, news, slides and FAQs. Seeding is an operator action
//! and bypasses the admin guard.

use crate::auth::grant_admin;
use crate::db::{self, new_id, now_ms};
use crate::identity::ensure_user;
use crate::members::write_member;
use crate::news::write_news;
use crate::faq::write_faq;
use crate::schema::{AdminRole, CouncilMember, Faq, News, Question, QuestionStatus, Response, SlideshowSlide};
use crate::slides::write_slide;
use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use time::macros::format_description;
use time::Date;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FixtureDate {
    Millis(i64),
    Day(String),
}

impl FixtureDate {
    pub fn to_millis(&self) -> Result<i64> {
        match self {
            FixtureDate::Millis(ms) => Ok(*ms),
            FixtureDate::Day(day) => {
                let date = Date::parse(day, format_description!("[year]-[month]-[day]"))
                    .with_context(|| format!("invalid date: {day}"))?;
                Ok(date.midnight().assume_utc().unix_timestamp() * 1000)
            }
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeedFile {
    pub users: Vec<SeedUser>,
    pub members: Vec<SeedMember>,
    pub questions: Vec<SeedQuestion>,
    pub news: Vec<SeedNews>,
    pub slides: Vec<SeedSlide>,
    pub faqs: Vec<SeedFaq>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    pub email: String,
    pub name: Option<String>,
    pub role: Option<AdminRole>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedMember {
    /// Fixture-local handle that questions refer to.
    pub key: String,
    pub name: String,
    pub party: Option<String>,
    pub position: Option<String>,
    pub term_start: Option<FixtureDate>,
    pub term_end: Option<FixtureDate>,
    #[serde(default = "yes")]
    pub is_active: bool,
    pub email: Option<String>,
    pub website: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedQuestion {
    pub member: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub session_date: FixtureDate,
    pub session_number: Option<String>,
    #[serde(default)]
    pub links: Vec<String>,
    pub status: Option<QuestionStatus>,
    #[serde(default)]
    pub responses: Vec<SeedResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedResponse {
    pub content: String,
    pub respondent_title: String,
    pub department: Option<String>,
    pub response_date: FixtureDate,
    pub document_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedNews {
    pub title: String,
    pub content: String,
    pub category: String,
    pub published_at: FixtureDate,
    #[serde(default = "yes")]
    pub is_published: bool,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedSlide {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub background_color: Option<String>,
    #[serde(default = "yes")]
    pub is_active: bool,
    #[serde(default)]
    pub order: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedFaq {
    pub category: String,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub order: i64,
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub members: usize,
    pub questions: usize,
    pub responses: usize,
    pub news: usize,
    pub slides: usize,
    pub faqs: usize,
}

pub fn load_seed_file(path: &Path) -> Result<SeedFile> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(serde_yaml::from_str(&raw)?)
}

/// Writes the whole fixture in one transaction.
pub fn apply_seed(conn: &Connection, seed: &SeedFile) -> Result<SeedReport> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let now = now_ms();
    let mut report = SeedReport::default();

    let mut author_id = None;
    for user in &seed.users {
        let created = ensure_user(&tx, &user.email, user.name.as_deref())?;
        if let Some(role) = user.role {
            grant_admin(&tx, &created.email, role, None)?;
            author_id.get_or_insert(created.id.clone());
        }
        report.users += 1;
    }

    let mut member_ids: HashMap<&str, String> = HashMap::new();
    for member in &seed.members {
        let record = CouncilMember {
            id: new_id(),
            name: member.name.clone(),
            party: member.party.clone(),
            position: member.position.clone(),
            term_start: member.term_start.as_ref().map(FixtureDate::to_millis).transpose()?,
            term_end: member.term_end.as_ref().map(FixtureDate::to_millis).transpose()?,
            is_active: member.is_active,
            email: member.email.clone(),
            phone: None,
            website: member.website.clone(),
            bio: member.bio.clone(),
            photo_url: member.photo_url.clone(),
            photo_storage_id: None,
            created_at: now,
        };
        write_member(&tx, &record)?;
        member_ids.insert(member.key.as_str(), record.id);
        report.members += 1;
    }

    for question in &seed.questions {
        let member_id = member_ids
            .get(question.member.as_str())
            .ok_or_else(|| anyhow!("question '{}' names unknown member '{}'", question.title, question.member))?;
        let default_status = if question.responses.is_empty() {
            QuestionStatus::Pending
        } else {
            QuestionStatus::Answered
        };
        let record = Question {
            id: new_id(),
            title: question.title.clone(),
            content: question.content.clone(),
            category: question.category.clone(),
            council_member_id: member_id.clone(),
            session_date: question.session_date.to_millis()?,
            session_number: question.session_number.clone(),
            links: question.links.clone(),
            status: question.status.unwrap_or(default_status),
            created_at: now,
        };
        db::insert_question(&tx, &record)?;
        report.questions += 1;

        for response in &question.responses {
            db::insert_response(
                &tx,
                &Response {
                    id: new_id(),
                    question_id: record.id.clone(),
                    content: response.content.clone(),
                    respondent_title: response.respondent_title.clone(),
                    department: response.department.clone(),
                    response_date: response.response_date.to_millis()?,
                    document_url: response.document_url.clone(),
                    created_at: now,
                },
            )?;
            report.responses += 1;
        }
    }

    let author_id = author_id.unwrap_or_else(|| "seed".to_string());
    for news in &seed.news {
        write_news(
            &tx,
            &News {
                id: new_id(),
                title: news.title.clone(),
                content: news.content.clone(),
                category: news.category.clone(),
                published_at: news.published_at.to_millis()?,
                is_published: news.is_published,
                thumbnail_url: news.thumbnail_url.clone(),
                thumbnail_storage_id: None,
                author_id: author_id.clone(),
                created_at: now,
                updated_at: now,
            },
        )?;
        report.news += 1;
    }

    for slide in &seed.slides {
        write_slide(
            &tx,
            &SlideshowSlide {
                id: new_id(),
                title: slide.title.clone(),
                description: slide.description.clone(),
                image_url: slide.image_url.clone(),
                image_storage_id: None,
                link_url: slide.link_url.clone(),
                background_color: slide.background_color.clone(),
                is_active: slide.is_active,
                order: slide.order,
                created_at: now,
            },
        )?;
        report.slides += 1;
    }

    for faq in &seed.faqs {
        write_faq(
            &tx,
            &Faq {
                id: new_id(),
                category: faq.category.clone(),
                question: faq.question.clone(),
                answer: faq.answer.clone(),
                order: faq.order,
                is_published: true,
            },
        )?;
        report.faqs += 1;
    }

    tx.commit()?;
    tracing::info!(?report, "applied seed");
    Ok(report)
}
