use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub type Id = String;

/// Patch field reader: an absent key stays `None` (keep the stored value),
/// an explicit `null` becomes `Some(None)` (clear it). Needs
/// `#[serde(default)]` alongside.
pub fn clearable<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CouncilMember {
    pub id: Id,
    pub name: String,
    pub party: Option<String>,
    pub position: Option<String>, // e.g. "議長", "副議長", "議員"
    pub term_start: Option<i64>,
    pub term_end: Option<i64>,
    pub is_active: bool,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>, // resolved from photo_storage_id on read when set
    pub photo_storage_id: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum QuestionStatus {
    Pending,
    Answered,
    Archived,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Id,
    pub title: String,
    pub content: String,
    pub category: String, // free-text tag
    pub council_member_id: Id,
    pub session_date: i64,
    pub session_number: Option<String>,
    pub links: Vec<String>,
    pub status: QuestionStatus,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub id: Id,
    pub question_id: Id,
    pub content: String,
    pub respondent_title: String,
    pub department: Option<String>,
    pub response_date: i64,
    pub document_url: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    pub id: Id,
    pub user_id: Id,
    pub question_id: Id,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct News {
    pub id: Id,
    pub title: String,
    pub content: String,
    pub category: String,
    pub published_at: i64,
    pub is_published: bool,
    pub thumbnail_url: Option<String>,
    pub thumbnail_storage_id: Option<String>,
    pub author_id: Id,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AdminRole {
    Admin,
    SuperAdmin,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: Id,
    pub user_id: Id,
    pub role: AdminRole,
    pub granted_by: Option<Id>,
    pub granted_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SlideshowSlide {
    pub id: Id,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub image_storage_id: Option<String>,
    pub link_url: Option<String>,
    pub background_color: Option<String>,
    pub is_active: bool,
    pub order: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Faq {
    pub id: Id,
    pub category: String,
    pub question: String,
    pub answer: String,
    pub order: i64,
    pub is_published: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FaqGroup {
    pub category: String,
    pub items: Vec<Faq>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContactCategory {
    General,
    Question,
    Suggestion,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    Unread,
    Read,
    Resolved,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmission {
    pub id: Id,
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
    pub category: ContactCategory,
    pub status: ContactStatus,
    pub user_id: Option<Id>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Id,
    pub name: Option<String>,
    pub email: String,
    pub created_at: i64,
}

/// A question joined with its member, responses and likes at read time.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedQuestion {
    #[serde(flatten)]
    pub question: Question,
    pub member_name: String,
    pub member_party: Option<String>,
    pub member_photo_url: Option<String>,
    pub response_count: usize,
    pub like_count: usize,
    pub is_liked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDetail {
    pub question: EnrichedQuestion,
    pub member: Option<CouncilMember>,
    pub responses: Vec<Response>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_count: usize,
    pub page_size: usize,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPage {
    pub questions: Vec<EnrichedQuestion>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CursorPage {
    pub page: Vec<EnrichedQuestion>,
    pub is_done: bool,
    pub continue_cursor: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LikeState {
    pub liked: bool,
    pub like_count: usize,
}

macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok($ty::$variant),)+
                    _ => Err(format!("unknown {}: {value}", stringify!($ty))),
                }
            }
        }
    };
}

text_enum!(QuestionStatus {
    Pending => "pending",
    Answered => "answered",
    Archived => "archived",
});

text_enum!(AdminRole {
    Admin => "admin",
    SuperAdmin => "superAdmin",
});

text_enum!(ContactCategory {
    General => "general",
    Question => "question",
    Suggestion => "suggestion",
    Other => "other",
});

text_enum!(ContactStatus {
    Unread => "unread",
    Read => "read",
    Resolved => "resolved",
});
