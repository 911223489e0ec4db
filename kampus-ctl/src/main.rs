use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use kampus_client::{
    api::{
        Audience, Category, CategoryFilter, Comment, CommentId, CompletionFilter, Error,
        HomeworkId, NewHomework, NewPost, PostId, Subgroup, Theme, Time, UserProfile, Viewer,
    },
    profile::{self, FileStorage},
    DeadlineLabel, ForumBoard, HomeworkBoard, TimeAgo,
};
use kampus_mock_store::{MockStore, StoreDump};

#[derive(structopt::StructOpt)]
struct Opt {
    /// JSON dump of the document store, created if missing
    #[structopt(short, long, default_value = "kampus-store.json")]
    store: PathBuf,

    /// Timezone calendar days are counted in
    #[structopt(long, default_value = "UTC")]
    tz: Tz,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Homework list
    Homework(HomeworkCmd),

    /// Discussion forum
    Forum(ForumCmd),

    /// Who is using this device
    Profile(ProfileCmd),
}

#[derive(structopt::StructOpt)]
enum HomeworkCmd {
    /// Show the homework visible to you
    List {
        /// active, completed or all
        #[structopt(long, default_value = "active")]
        filter: CompletionFilter,
    },

    Add {
        subject: String,

        /// RFC 3339, or "YYYY-MM-DD HH:MM" in the configured timezone
        deadline: String,

        #[structopt(short, long, default_value = "")]
        description: String,

        /// all, 1 or 2
        #[structopt(long, default_value = "all")]
        subgroup: Audience,

        /// Only you will see it
        #[structopt(long)]
        private: bool,
    },

    /// Mark as done, or as not done anymore
    Toggle { id: String },

    Delete { id: String },
}

#[derive(structopt::StructOpt)]
enum ForumCmd {
    List {
        /// all, or a category name
        #[structopt(long, default_value = "all")]
        category: CategoryFilter,
    },

    Post {
        category: Category,
        title: String,
        content: String,
    },

    Like { post: String },

    Comment {
        post: String,
        content: String,

        /// Reply to this comment instead of the post
        #[structopt(long)]
        parent: Option<String>,
    },

    LikeComment { post: String, comment: String },

    DeleteComment { post: String, comment: String },

    DeletePost { post: String },
}

#[derive(structopt::StructOpt)]
enum ProfileCmd {
    Login {
        email: String,
        nickname: String,

        #[structopt(long, default_value = "🎓")]
        avatar: String,

        #[structopt(long, default_value = "1")]
        subgroup: Subgroup,

        #[structopt(long, default_value = "light")]
        theme: Theme,
    },

    Show,

    Logout,
}

fn profile_storage() -> FileStorage {
    let path = std::env::var("KAMPUS_PROFILE")
        .unwrap_or_else(|_| String::from("kampus-profile.json"));
    FileStorage::new(path)
}

fn viewer() -> anyhow::Result<Viewer> {
    let profile = profile::load_profile(&profile_storage())
        .context("loading profile")?
        .context("not logged in, run `kampus-ctl profile login` first")?;
    Ok(profile.viewer())
}

fn load_store(path: &PathBuf) -> anyhow::Result<MockStore> {
    let dump = match std::fs::read(path) {
        Ok(data) => serde_json::from_slice::<StoreDump>(&data)
            .with_context(|| format!("parsing store dump {path:?}"))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(?path, "no store dump yet, starting empty");
            StoreDump::default()
        }
        Err(e) => return Err(e).with_context(|| format!("reading store dump {path:?}")),
    };
    Ok(MockStore::from_dump(dump))
}

fn save_store(path: &PathBuf, store: &MockStore) -> anyhow::Result<()> {
    let data = serde_json::to_vec_pretty(&store.dump())
        .context("serializing store dump")?;
    std::fs::write(path, data).with_context(|| format!("writing store dump {path:?}"))
}

fn parse_deadline(s: &str, tz: &Tz) -> anyhow::Result<Time> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    let local = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")
        .with_context(|| format!("parsing deadline {s:?}"))?;
    let t = tz
        .from_local_datetime(&local)
        .earliest()
        .with_context(|| format!("{s:?} does not exist in {tz}"))?;
    Ok(t.with_timezone(&Utc))
}

/// Vanished targets only get a notice, everything else fails the command
fn report<T>(res: Result<T, Error>) -> anyhow::Result<Option<T>> {
    match res {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_silent() => {
            eprintln!("{}", e.notice());
            Ok(None)
        }
        Err(e) => {
            let notice = e.notice();
            Err(anyhow::Error::new(e).context(notice))
        }
    }
}

fn print_comments(comments: &[Comment], depth: usize, now: Time, tz: &Tz) {
    for c in comments {
        println!(
            "{:indent$}{} {} ({}, {} likes) [{}]",
            "",
            c.avatar,
            c.author,
            TimeAgo::new(c.created_at, now, tz),
            c.likes,
            c.id,
            indent = 4 * (depth + 1),
        );
        for line in c.content.lines() {
            println!("{:indent$}{}", "", line, indent = 4 * (depth + 1) + 2);
        }
        print_comments(&c.replies, depth + 1, now, tz);
    }
}

async fn run_homework(store: Arc<MockStore>, tz: &Tz, cmd: HomeworkCmd) -> anyhow::Result<()> {
    let viewer = viewer()?;
    let mut board = HomeworkBoard::start(store)
        .await
        .context("subscribing to homework")?;
    board
        .next_update()
        .await
        .context("homework feed ended early")?;
    match cmd {
        HomeworkCmd::List { filter } => {
            let now = Utc::now();
            for h in board.visible(&viewer, filter) {
                let label = DeadlineLabel::new(h.deadline, now, tz);
                let done = match h.is_completed_by(&viewer.name) {
                    true => "x",
                    false => " ",
                };
                println!(
                    "[{done}] {} {} ({}, {}) [{}]",
                    h.subject,
                    label,
                    label.urgency().color(),
                    h.added_by,
                    h.id,
                );
                if !h.description.is_empty() {
                    println!("      {}", h.description);
                }
            }
        }
        HomeworkCmd::Add {
            subject,
            deadline,
            description,
            subgroup,
            private,
        } => {
            let mut hw = NewHomework::new(&viewer.name, &subject, parse_deadline(&deadline, tz)?);
            hw.description = description;
            hw.subgroup = subgroup;
            hw.is_public = !private;
            if let Some(id) = report(board.add(hw).await)? {
                println!("{id}");
            }
        }
        HomeworkCmd::Toggle { id } => {
            report(board.toggle_complete(&HomeworkId(id), &viewer).await)?;
        }
        HomeworkCmd::Delete { id } => {
            report(board.delete(&HomeworkId(id), &viewer).await)?;
        }
    }
    board.stop();
    Ok(())
}

async fn run_forum(store: Arc<MockStore>, tz: &Tz, cmd: ForumCmd) -> anyhow::Result<()> {
    let viewer = viewer()?;
    let mut board = ForumBoard::start(store)
        .await
        .context("subscribing to posts")?;
    board.next_update().await.context("posts feed ended early")?;
    match cmd {
        ForumCmd::List { category } => {
            let now = Utc::now();
            for p in board.filtered(category) {
                println!(
                    "{} {} ({}, {}, {}, {} likes, {} comments) [{}]",
                    p.avatar,
                    p.title,
                    p.category,
                    p.author,
                    TimeAgo::new(p.created_at, now, tz),
                    p.likes,
                    p.comment_count(),
                    p.id,
                );
                for line in p.content.lines() {
                    println!("    {line}");
                }
                print_comments(&p.comments, 0, now, tz);
            }
        }
        ForumCmd::Post {
            category,
            title,
            content,
        } => {
            let post = NewPost {
                title,
                content,
                category,
                author: viewer.name.clone(),
                avatar: viewer.avatar.clone(),
            };
            if let Some(id) = report(board.add_post(post).await)? {
                println!("{id}");
            }
        }
        ForumCmd::Like { post } => {
            report(board.toggle_like(&PostId(post)).await)?;
        }
        ForumCmd::Comment {
            post,
            content,
            parent,
        } => {
            let parent = parent.map(CommentId);
            let res = board
                .add_comment(
                    &PostId(post),
                    &content,
                    &viewer.name,
                    &viewer.avatar,
                    parent.as_ref(),
                )
                .await;
            if let Some(id) = report(res)? {
                println!("{id}");
            }
        }
        ForumCmd::LikeComment { post, comment } => {
            report(
                board
                    .toggle_comment_like(&PostId(post), &CommentId(comment))
                    .await,
            )?;
        }
        ForumCmd::DeleteComment { post, comment } => {
            report(
                board
                    .delete_comment(&PostId(post), &CommentId(comment), &viewer.name)
                    .await,
            )?;
        }
        ForumCmd::DeletePost { post } => {
            report(board.delete_post(&PostId(post), &viewer.name).await)?;
        }
    }
    board.stop();
    Ok(())
}

fn run_profile(cmd: ProfileCmd) -> anyhow::Result<()> {
    let mut storage = profile_storage();
    match cmd {
        ProfileCmd::Login {
            email,
            nickname,
            avatar,
            subgroup,
            theme,
        } => {
            let mut p = UserProfile::new(&email, &nickname);
            p.avatar = avatar;
            p.subgroup = subgroup;
            p.theme = theme;
            profile::save_profile(&mut storage, &p)
                .with_context(|| format!("saving profile to {:?}", storage.path()))?;
        }
        ProfileCmd::Show => match profile::load_profile(&storage)? {
            None => println!("not logged in"),
            Some(p) => println!(
                "{} {} <{}>, subgroup {}, {:?} theme",
                p.avatar, p.nickname, p.email, p.subgroup, p.theme
            ),
        },
        ProfileCmd::Logout => {
            profile::clear_profile(&mut storage).context("clearing profile")?;
        }
    }
    Ok(())
}

// Single-threaded: the feed task drains every pending snapshot, expiry deletes
// included, whenever the command awaits
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opt = <Opt as structopt::StructOpt>::from_args();

    match opt.cmd {
        Command::Profile(cmd) => run_profile(cmd),
        Command::Homework(cmd) => {
            let store = Arc::new(load_store(&opt.store)?);
            run_homework(store.clone(), &opt.tz, cmd).await?;
            save_store(&opt.store, &store)
        }
        Command::Forum(cmd) => {
            let store = Arc::new(load_store(&opt.store)?);
            run_forum(store.clone(), &opt.tz, cmd).await?;
            save_store(&opt.store, &store)
        }
    }
}
