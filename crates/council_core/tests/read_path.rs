use council_core::db;
use council_core::filter::QuestionFilter;
use council_core::identity::ensure_user;
use council_core::auth::grant_admin;
use council_core::likes::toggle_like;
use council_core::media::LocalBlobStore;
use council_core::members::{MemberInput, create_member};
use council_core::query::{
    ListQuestionsPaginated, PagedSort, PaginationOpts, QueryContext, SearchQuestionsPaged,
    UNKNOWN_MEMBER_NAME, get_question, get_top_liked_questions, list_questions,
    list_questions_paginated, search_questions_paged,
};
use council_core::questions::{QuestionInput, ResponseInput, create_question, create_response};
use council_core::rankings::load_rankings;
use council_core::schema::{AdminRole, QuestionStatus};
use council_core::CouncilError;
use rusqlite::Connection;

const DAY: i64 = 86_400_000;

struct Fixture {
    conn: Connection,
    blobs: LocalBlobStore,
    admin: String,
    citizen: String,
    members: Vec<String>,
    questions: Vec<String>,
}

fn member(name: &str, party: Option<&str>, position: Option<&str>) -> MemberInput {
    MemberInput {
        name: name.to_string(),
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
    }
}

fn question(title: &str, category: &str, member_id: &str, day: i64) -> QuestionInput {
    QuestionInput {
        title: title.to_string(),
        content: format!("{title}について伺います"),
        category: category.to_string(),
        council_member_id: member_id.to_string(),
        session_date: day * DAY,
        session_number: Some(format!("第{}回定例会", day % 3 + 1)),
        links: Vec::new(),
        status: None,
    }
}

/// Three members and twelve questions on distinct session dates.
fn fixture() -> Fixture {
    let conn = db::open_in_memory().expect("open db");
    let blobs = LocalBlobStore::new("http://storage.test");
    let admin = ensure_user(&conn, "admin@city.example.jp", Some("事務局")).expect("admin user");
    grant_admin(&conn, &admin.email, AdminRole::SuperAdmin, None).expect("grant");
    let citizen = ensure_user(&conn, "citizen@example.jp", None).expect("citizen");

    let caller = Some(admin.id.as_str());
    let members: Vec<String> = [
        member("山田太郎", Some("みらい党"), Some("議長")),
        member("佐藤花子", Some("みらい党"), Some("議員")),
        member("鈴木一郎", None, None),
    ]
    .into_iter()
    .map(|input| create_member(&conn, caller, input).expect("member"))
    .collect();

    let categories = ["福祉", "教育", "防災"];
    let questions = (1..=12)
        .map(|day| {
            let member_id = &members[(day as usize) % members.len()];
            let category = categories[(day as usize) % categories.len()];
            create_question(
                &conn,
                caller,
                question(&format!("質問{day:02}"), category, member_id, day),
            )
            .expect("question")
        })
        .collect();

    Fixture {
        conn,
        blobs,
        admin: admin.id,
        citizen: citizen.id,
        members,
        questions,
    }
}

impl Fixture {
    fn ctx<'a>(&'a self, caller: Option<&'a str>) -> QueryContext<'a> {
        QueryContext::new(&self.conn, &self.blobs, caller)
    }
}

fn ids<'a>(rows: impl IntoIterator<Item = &'a council_core::schema::EnrichedQuestion>) -> Vec<String> {
    rows.into_iter().map(|row| row.question.id.clone()).collect()
}

#[test]
fn list_questions_is_newest_first_and_filtered() {
    let fx = fixture();
    let all = list_questions(&fx.ctx(None), &QuestionFilter::default()).expect("list");
    assert_eq!(all.len(), 12);
    assert!(all.windows(2).all(|w| w[0].question.session_date >= w[1].question.session_date));

    let welfare = list_questions(
        &fx.ctx(None),
        &QuestionFilter {
            category: Some("福祉".to_string()),
            ..QuestionFilter::default()
        },
    )
    .expect("filtered");
    assert_eq!(welfare.len(), 4);
    assert!(welfare.iter().all(|row| row.question.category == "福祉"));

    let blank = list_questions(
        &fx.ctx(None),
        &QuestionFilter {
            category: Some("  ".to_string()),
            ..QuestionFilter::default()
        },
    )
    .expect("blank filter");
    assert_eq!(blank.len(), 12);
}

#[test]
fn offset_pages_partition_the_filtered_list() {
    let fx = fixture();
    let member_id = fx.members[1].clone();
    let full = list_questions(
        &fx.ctx(None),
        &QuestionFilter {
            member_id: Some(member_id.clone()),
            ..QuestionFilter::default()
        },
    )
    .expect("list");
    assert_eq!(full.len(), 4);

    let mut seen = Vec::new();
    for page in 1..=2 {
        let result = search_questions_paged(
            &fx.ctx(None),
            SearchQuestionsPaged {
                page,
                page_size: Some(3),
                member_id: Some(member_id.clone()),
                ..SearchQuestionsPaged::default()
            },
        )
        .expect("page");
        assert_eq!(result.pagination.total_count, 4);
        assert_eq!(result.pagination.total_pages, 2);
        assert_eq!(result.pagination.has_prev_page, page > 1);
        assert_eq!(result.pagination.has_next_page, page < 2);
        seen.extend(ids(&result.questions));
    }
    assert_eq!(seen, ids(&full));

    let past_end = search_questions_paged(
        &fx.ctx(None),
        SearchQuestionsPaged {
            page: 5,
            page_size: Some(3),
            ..SearchQuestionsPaged::default()
        },
    )
    .expect("past end");
    assert!(past_end.questions.is_empty());
    assert_eq!(past_end.pagination.total_count, 12);
}

#[test]
fn offset_sorts_by_title_and_oldest() {
    let fx = fixture();
    let oldest = search_questions_paged(
        &fx.ctx(None),
        SearchQuestionsPaged {
            page: 1,
            page_size: Some(2),
            sort_by: Some(PagedSort::Oldest),
            ..SearchQuestionsPaged::default()
        },
    )
    .expect("oldest");
    let titles: Vec<&str> = oldest.questions.iter().map(|q| q.question.title.as_str()).collect();
    assert_eq!(titles, vec!["質問01", "質問02"]);

    let by_title = search_questions_paged(
        &fx.ctx(None),
        SearchQuestionsPaged {
            page: 2,
            page_size: Some(5),
            sort_by: Some(PagedSort::Title),
            ..SearchQuestionsPaged::default()
        },
    )
    .expect("title");
    assert_eq!(by_title.questions[0].question.title, "質問06");
}

#[test]
fn offset_rejects_non_positive_page_arguments() {
    let fx = fixture();
    let err = search_questions_paged(&fx.ctx(None), SearchQuestionsPaged::default())
        .expect_err("page 0");
    assert!(matches!(err, CouncilError::Validation(_)));

    let err = search_questions_paged(
        &fx.ctx(None),
        SearchQuestionsPaged {
            page: 1,
            page_size: Some(0),
            ..SearchQuestionsPaged::default()
        },
    )
    .expect_err("size 0");
    assert!(matches!(err, CouncilError::Validation(_)));
}

#[test]
fn cursor_pages_walk_every_question_once() {
    let fx = fixture();
    let mut cursor = None;
    let mut seen = Vec::new();
    loop {
        let page = list_questions_paginated(
            &fx.ctx(None),
            ListQuestionsPaginated {
                pagination_opts: PaginationOpts {
                    num_items: 5,
                    cursor: cursor.clone(),
                },
                category: None,
                member_id: None,
                search_term: None,
            },
        )
        .expect("page");
        assert!(page.page.len() <= 5);
        seen.extend(ids(&page.page));
        if page.is_done {
            break;
        }
        cursor = Some(page.continue_cursor);
    }
    let all = list_questions(&fx.ctx(None), &QuestionFilter::default()).expect("list");
    assert_eq!(seen, ids(&all));
}

#[test]
fn oversized_page_size_returns_everything_in_one_page() {
    let fx = fixture();
    let page = list_questions_paginated(
        &fx.ctx(None),
        ListQuestionsPaginated {
            pagination_opts: PaginationOpts {
                num_items: usize::MAX,
                cursor: None,
            },
            category: None,
            member_id: None,
            search_term: None,
        },
    )
    .expect("page");
    assert_eq!(page.page.len(), 12);
    assert!(page.is_done);
}

#[test]
fn cursor_filter_applies_after_paging() {
    let fx = fixture();
    let page = list_questions_paginated(
        &fx.ctx(None),
        ListQuestionsPaginated {
            pagination_opts: PaginationOpts {
                num_items: 6,
                cursor: None,
            },
            category: Some("教育".to_string()),
            member_id: None,
            search_term: None,
        },
    )
    .expect("page");
    assert_eq!(page.page.len(), 2);
    assert!(!page.is_done);
    assert!(page.page.iter().all(|row| row.question.category == "教育"));
}

#[test]
fn malformed_cursor_is_a_validation_error() {
    let fx = fixture();
    let err = list_questions_paginated(
        &fx.ctx(None),
        ListQuestionsPaginated {
            pagination_opts: PaginationOpts {
                num_items: 5,
                cursor: Some("%%%".to_string()),
            },
            category: None,
            member_id: None,
            search_term: None,
        },
    )
    .expect_err("bad cursor");
    assert!(matches!(err, CouncilError::Validation(_)));
}

#[test]
fn like_toggle_is_an_involution() {
    let fx = fixture();
    let target = &fx.questions[0];

    let liked = toggle_like(&fx.conn, Some(&fx.citizen), target).expect("like");
    assert!(liked.liked);
    assert_eq!(liked.like_count, 1);

    let detail = get_question(&fx.ctx(Some(&fx.citizen)), target)
        .expect("detail")
        .expect("present");
    assert!(detail.question.is_liked);
    let anonymous = get_question(&fx.ctx(None), target)
        .expect("detail")
        .expect("present");
    assert!(!anonymous.question.is_liked);
    assert_eq!(anonymous.question.like_count, 1);

    let unliked = toggle_like(&fx.conn, Some(&fx.citizen), target).expect("unlike");
    assert!(!unliked.liked);
    assert_eq!(unliked.like_count, 0);
}

#[test]
fn like_requires_a_caller_and_an_existing_question() {
    let fx = fixture();
    assert!(matches!(
        toggle_like(&fx.conn, None, &fx.questions[0]),
        Err(CouncilError::AuthenticationRequired)
    ));
    assert!(matches!(
        toggle_like(&fx.conn, Some(&fx.citizen), "missing"),
        Err(CouncilError::NotFound(_))
    ));
}

#[test]
fn top_liked_orders_by_like_count() {
    let fx = fixture();
    toggle_like(&fx.conn, Some(&fx.citizen), &fx.questions[3]).expect("like");
    toggle_like(&fx.conn, Some(&fx.admin), &fx.questions[3]).expect("like");
    toggle_like(&fx.conn, Some(&fx.citizen), &fx.questions[7]).expect("like");

    let top = get_top_liked_questions(&fx.ctx(None), 3).expect("top");
    assert_eq!(top.len(), 3);
    assert_eq!(top[0].question.id, fx.questions[3]);
    assert_eq!(top[0].like_count, 2);
    assert_eq!(top[1].question.id, fx.questions[7]);
}

#[test]
fn detail_carries_responses_and_answered_status() {
    let fx = fixture();
    let target = &fx.questions[2];
    create_response(
        &fx.conn,
        Some(&fx.admin),
        target,
        ResponseInput {
            content: "来年度予算に計上します".to_string(),
            respondent_title: "市長".to_string(),
            department: Some("企画課".to_string()),
            response_date: 20 * DAY,
            document_url: None,
        },
    )
    .expect("response");

    let detail = get_question(&fx.ctx(None), target).expect("detail").expect("present");
    assert_eq!(detail.responses.len(), 1);
    assert_eq!(detail.question.response_count, 1);
    assert_eq!(detail.question.question.status, QuestionStatus::Answered);
    assert!(detail.member.is_some());

    assert!(get_question(&fx.ctx(None), "missing").expect("lookup").is_none());
}

#[test]
fn dangling_member_falls_back_to_placeholder() {
    let fx = fixture();
    // Rows written before the member foreign key existed can still dangle.
    fx.conn
        .pragma_update(None, "foreign_keys", "OFF")
        .expect("disable foreign keys");
    fx.conn
        .execute("DELETE FROM council_members WHERE id = ?1", [&fx.members[0]])
        .expect("remove member");
    let rows = list_questions(
        &fx.ctx(None),
        &QuestionFilter {
            member_id: Some(fx.members[0].clone()),
            ..QuestionFilter::default()
        },
    )
    .expect("list");
    assert!(!rows.is_empty());
    assert!(rows.iter().all(|row| row.member_name == UNKNOWN_MEMBER_NAME));
}

#[test]
fn rankings_separate_the_chair_and_cover_every_question() {
    let fx = fixture();
    let rankings = load_rankings(&fx.ctx(None), 5).expect("rankings");
    assert_eq!(rankings.total_questions, 12);
    assert_eq!(rankings.chairpersons.len(), 1);
    assert_eq!(rankings.chairpersons[0].member_id, fx.members[0]);
    assert!(rankings.regular.iter().all(|r| r.member_id != fx.members[0]));
    let party_total: usize = rankings.party_stats.iter().map(|p| p.question_count).sum();
    assert_eq!(party_total, 12);
}
