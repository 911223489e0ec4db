//! Prints a JSON store dump usable with `kampus-ctl --store`

use std::collections::BTreeSet;

use chrono::{Duration, Utc};
use kampus_api::{
    store::to_fields, Audience, Category, Comment, CommentId, DocumentId, Fields, HomeworkId,
    HomeworkItem, Post, PostId, Subgroup, Time,
};
use kampus_mock_store::StoreDump;
use rand::{seq::SliceRandom, Rng};

const USERS: &[(&str, &str)] = &[
    ("ira", "🦊"),
    ("taras", "🐻"),
    ("olena", "🦉"),
    ("max", "🐢"),
];

const SUBJECTS: &[&str] = &[
    "Calculus",
    "Linear algebra",
    "Mechanics",
    "Algorithms",
    "Databases",
    "Operating systems",
];

const NUM_HOMEWORK: usize = 40;
const NUM_POSTS: usize = 15;
const MAX_TOP_LEVEL_COMMENTS: usize = 6;
const MAX_REPLY_DEPTH: usize = 3;
const TITLE_WORDS: usize = 6;
const CONTENT_WORDS: usize = 40;
const COMMENT_WORDS: usize = 15;

fn gen_user(rng: &mut impl Rng) -> (&'static str, &'static str) {
    *USERS.choose(rng).unwrap()
}

fn gen_time_around(rng: &mut impl Rng, now: Time, days_before: i64, days_after: i64) -> Time {
    let minutes = rng.gen_range(-days_before * 24 * 60..=days_after * 24 * 60);
    now + Duration::minutes(minutes)
}

fn into_document_fields<T: serde::Serialize>(value: &T) -> Fields {
    let mut fields = to_fields(value);
    fields.remove("id");
    fields
}

fn gen_homework(rng: &mut impl Rng, now: Time) -> HomeworkItem {
    let (added_by, _) = gen_user(rng);
    // a few items are already past their deadline, some of them expired
    let deadline = gen_time_around(rng, now, 3, 21);
    let completed_by = USERS
        .iter()
        .filter(|_| rng.gen_bool(0.3))
        .map(|(name, _)| String::from(*name))
        .collect::<BTreeSet<_>>();
    HomeworkItem {
        id: HomeworkId(String::new()),
        subject: String::from(*SUBJECTS.choose(rng).unwrap()),
        description: lipsum::lipsum_words(rng.gen_range(0..CONTENT_WORDS)),
        deadline,
        subgroup: match rng.gen_range(0..3) {
            0 => Audience::Everyone,
            1 => Audience::Subgroup(Subgroup::One),
            _ => Audience::Subgroup(Subgroup::Two),
        },
        is_public: rng.gen_bool(0.85),
        added_by: String::from(added_by),
        completed_by,
        completed: false,
        created_at: deadline - Duration::days(rng.gen_range(1..14)),
    }
}

fn gen_comments(
    rng: &mut impl Rng,
    post_id: &PostId,
    after: Time,
    now: Time,
    depth: usize,
) -> Vec<Comment> {
    let max = match depth {
        0 => MAX_TOP_LEVEL_COMMENTS,
        d if d >= MAX_REPLY_DEPTH => 0,
        _ => 2,
    };
    let mut res = Vec::new();
    let mut at = after;
    for _ in 0..rng.gen_range(0..=max) {
        let (author, avatar) = gen_user(rng);
        let span = (now - at).num_minutes().max(1);
        at = at + Duration::minutes(rng.gen_range(0..span));
        res.push(Comment {
            id: CommentId::generate(),
            post_id: post_id.clone(),
            author: String::from(author),
            avatar: String::from(avatar),
            content: lipsum::lipsum_words(rng.gen_range(1..=COMMENT_WORDS)),
            created_at: at,
            likes: rng.gen_range(0..5),
            replies: gen_comments(rng, post_id, at, now, depth + 1),
        });
    }
    res
}

fn gen_post(rng: &mut impl Rng, id: &PostId, now: Time) -> Post {
    let (author, avatar) = gen_user(rng);
    let created_at = gen_time_around(rng, now, 30, 0);
    Post {
        id: id.clone(),
        title: lipsum::lipsum_title(),
        content: lipsum::lipsum_words(rng.gen_range(TITLE_WORDS..CONTENT_WORDS)),
        author: String::from(author),
        avatar: String::from(avatar),
        category: *Category::ALL.choose(rng).unwrap(),
        created_at,
        likes: rng.gen_range(0..20),
        comments: gen_comments(rng, id, created_at, now, 0),
    }
}

fn main() {
    let mut rng = rand::thread_rng();
    let now = Utc::now();
    let mut dump = StoreDump::default();

    for i in 0..NUM_HOMEWORK {
        let hw = gen_homework(&mut rng, now);
        dump.homework
            .insert(DocumentId(format!("hw{i:03}")), into_document_fields(&hw));
    }

    for i in 0..NUM_POSTS {
        let id = PostId(format!("post{i:03}"));
        let post = gen_post(&mut rng, &id, now);
        dump.posts
            .insert(DocumentId::from(&id), into_document_fields(&post));
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&dump).expect("serializing store dump")
    );
}
