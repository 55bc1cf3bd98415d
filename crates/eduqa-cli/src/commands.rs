//! Subcommands and their handlers.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use clap::{Args, Subcommand};

use eduqa_core::config::StorageBackend;
use eduqa_core::forms::{AnswerForm, LoginForm, QuestionForm};
use eduqa_core::models::{Attachment, DateRange, ProfileUpdate, QuestionQuery, SortOrder};
use eduqa_core::{AuthStatus, Config};

use crate::app::{App, Route};
use crate::prompt;
use crate::render;

// ============================================================================
// Command line
// ============================================================================

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account and sign in
    Register,
    /// Sign out and forget the stored session
    Logout,
    /// Show the session and cache state
    Status,
    /// Browse, ask and manage questions
    #[command(subcommand)]
    Questions(QuestionCommand),
    /// Post, like and delete answers
    #[command(subcommand)]
    Answers(AnswerCommand),
    /// Saved questions and answers
    #[command(subcommand)]
    Bookmarks(BookmarkCommand),
    /// Notification inbox
    #[command(subcommand)]
    Notifications(NotificationCommand),
    /// View and edit your profile
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Keep the session verified until interrupted
    Watch,
    /// Show or change stored settings
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Delete all cached forum data
    ClearCache,
}

#[derive(Debug, Subcommand)]
pub enum QuestionCommand {
    /// List the question feed
    List(ListArgs),
    /// Show a question with its answers
    Show { id: String },
    /// Questions you asked
    Mine,
    /// Ask a new question
    Ask {
        #[arg(long)]
        title: String,
        /// Markdown body
        #[arg(long)]
        content: String,
        /// Comma separated
        #[arg(long, default_value = "")]
        tags: String,
        /// File to attach; repeat for more
        #[arg(long = "attach")]
        attachments: Vec<PathBuf>,
    },
    /// Edit one of your questions
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        tags: Option<String>,
        #[arg(long = "attach")]
        attachments: Vec<PathBuf>,
        /// Existing attachment path to remove; repeat for more
        #[arg(long = "remove")]
        remove: Vec<String>,
    },
    /// Delete one of your questions
    Delete {
        id: String,
        #[arg(long, short)]
        yes: bool,
    },
    Like { id: String },
    Unlike { id: String },
    /// Mark your question solved
    Solve { id: String },
    Unsolve { id: String },
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long, short)]
    search: Option<String>,
    /// Filter by tag; takes the place of --search
    #[arg(long, short)]
    tag: Option<String>,
    /// newest, oldest, most_liked, most_answered, solved or unsolved
    #[arg(long, default_value = "newest", value_parser = parse_sort)]
    sort: SortOrder,
    #[arg(long, short)]
    page: Option<u32>,
    #[arg(long)]
    limit: Option<u32>,
    #[arg(long, conflicts_with = "unsolved")]
    solved: bool,
    #[arg(long)]
    unsolved: bool,
    /// today, week, month or year
    #[arg(long, value_parser = parse_range)]
    range: Option<DateRange>,
    #[arg(long)]
    min_likes: Option<u32>,
    #[arg(long)]
    min_answers: Option<u32>,
    /// Print tag and contributor totals for the page
    #[arg(long)]
    stats: bool,
}

impl ListArgs {
    fn query(&self) -> QuestionQuery {
        QuestionQuery {
            search: self.search.clone(),
            tag: self.tag.clone(),
            sort: self.sort,
            page: self.page,
            limit: self.limit,
            solved: match (self.solved, self.unsolved) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            },
            date_range: self.range,
            min_likes: self.min_likes,
            min_answers: self.min_answers,
        }
    }
}

fn parse_sort(s: &str) -> Result<SortOrder, String> {
    SortOrder::parse(s).ok_or_else(|| format!("unknown sort order '{}'", s))
}

fn parse_range(s: &str) -> Result<DateRange, String> {
    DateRange::parse(s).ok_or_else(|| format!("unknown date range '{}'", s))
}

#[derive(Debug, Subcommand)]
pub enum AnswerCommand {
    /// Answer a question
    Add {
        question_id: String,
        #[arg(long)]
        content: String,
        #[arg(long = "attach")]
        attachments: Vec<PathBuf>,
    },
    Like { question_id: String, answer_id: String },
    Unlike { question_id: String, answer_id: String },
    Delete {
        question_id: String,
        answer_id: String,
        #[arg(long, short)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum BookmarkCommand {
    /// Saved questions and answers
    List,
    /// Save or unsave a question
    Question { id: String },
    /// Save or unsave an answer
    Answer { id: String },
}

#[derive(Debug, Subcommand)]
pub enum NotificationCommand {
    List,
    /// Mark a notification read and show its question
    Open { id: String },
    ReadAll,
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    Show,
    Edit {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        branch: Option<String>,
    },
    /// Upload a new profile picture
    Avatar { path: PathBuf },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    Show,
    Set {
        #[arg(long)]
        api_url: Option<String>,
        /// file or keyring
        #[arg(long)]
        storage: Option<String>,
        #[arg(long)]
        reverify_secs: Option<u64>,
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

async fn load_attachments(paths: &[PathBuf]) -> Result<Vec<Attachment>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(Attachment::from_path(path).await?);
    }
    Ok(files)
}

// ============================================================================
// Dispatch
// ============================================================================

pub async fn run(app: &App, command: Command) -> Result<()> {
    match command {
        Command::Config(cmd) => return config(app, cmd),
        Command::ClearCache => {
            app.forum.cache().clear()?;
            println!("Cache cleared.");
            return Ok(());
        }
        _ => {}
    }

    app.bootstrap().await;

    match command {
        Command::Login { email } => login(app, email).await,
        Command::Register => register(app).await,
        Command::Logout => {
            app.auth.logout().await;
            app.forum.clear_private();
            println!("Signed out.");
            Ok(())
        }
        Command::Status => {
            render::session(&app.session.snapshot());
            println!("API: {}", app.base_url());
            render::cache_ages(&app.forum.cache().get_cache_ages());
            Ok(())
        }
        Command::Questions(cmd) => questions(app, cmd).await,
        Command::Answers(cmd) => answers(app, cmd).await,
        Command::Bookmarks(cmd) => bookmarks(app, cmd).await,
        Command::Notifications(cmd) => notifications(app, cmd).await,
        Command::Profile(cmd) => profile(app, cmd).await,
        Command::Watch => watch(app).await,
        Command::Config(_) | Command::ClearCache => Ok(()),
    }
}

// ============================================================================
// Auth
// ============================================================================

async fn login(app: &App, email: Option<String>) -> Result<()> {
    if let Some(user) = app.session.user() {
        println!("Already signed in as {}.", user.display_name());
        return Ok(());
    }

    let email = match email {
        Some(email) => email,
        None => prompt::read_line("Email", app.config.last_email.as_deref())?
            .ok_or_else(|| anyhow!("Email is required"))?,
    };
    let password = rpassword::prompt_password("Password: ")?;

    app.login(&LoginForm { email, password }).await?;
    if let Some(user) = app.session.user() {
        println!("Signed in as {}.", user.display_name());
    }
    Ok(())
}

async fn register(app: &App) -> Result<()> {
    if app.session.user().is_some() {
        bail!("Sign out before creating another account");
    }
    let name = prompt::read_line("Name", None)?.ok_or_else(|| anyhow!("Name is required"))?;
    let form = prompt::read_register_form(name)?;
    app.register(&form).await?;
    if let Some(user) = app.session.user() {
        println!("Welcome, {}.", user.display_name());
    }
    Ok(())
}

async fn watch(app: &App) -> Result<()> {
    if app.session.status() != AuthStatus::Authenticated {
        bail!("Not signed in");
    }

    let handle = app.bootstrap.spawn_reverification(app.config.reverify_interval());
    let mut changes = app.session.subscribe();
    render::session(&changes.borrow_and_update());
    println!("Re-verifying every {}s. Press Ctrl-C to stop.", app.config.reverify_interval().as_secs());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let session = changes.borrow_and_update().clone();
                render::session(&session);
                if session.user.is_none() {
                    break;
                }
            }
        }
    }

    handle.cancel();
    Ok(())
}

// ============================================================================
// Questions
// ============================================================================

async fn questions(app: &App, cmd: QuestionCommand) -> Result<()> {
    match cmd {
        QuestionCommand::List(args) => {
            app.enter(&Route::Feed).await?;
            let query = args.query();
            let fetched = app.forum.questions_or_cached(&query).await?;
            if app.json {
                return render::json(&fetched.data);
            }
            render::cached(fetched.cached_age.as_deref());
            if args.stats {
                render::feed_stats(&fetched.data.questions);
            }
            render::question_page(&fetched.data, &query, app.user_id().as_deref());
            Ok(())
        }
        QuestionCommand::Show { id } => {
            app.enter(&Route::Question(id.clone())).await?;
            let fetched = app.forum.question_or_cached(&id).await?;
            if app.json {
                return render::json(&fetched.data);
            }
            render::cached(fetched.cached_age.as_deref());
            render::question_detail(&fetched.data, app.base_url(), app.session.user().as_ref());
            Ok(())
        }
        QuestionCommand::Mine => {
            if !app.enter(&Route::MyQuestions).await? {
                return Ok(());
            }
            let questions = app.forum.my_questions().await?;
            if app.json {
                return render::json(&questions);
            }
            render::question_list("Your questions", &questions, app.user_id().as_deref());
            Ok(())
        }
        QuestionCommand::Ask {
            title,
            content,
            tags,
            attachments,
        } => {
            if !app.enter(&Route::Ask).await? {
                return Ok(());
            }
            let form = QuestionForm {
                title,
                content,
                tags,
                attachments: load_attachments(&attachments).await?,
            };
            let question = app.forum.ask_question(&form).await?;
            println!("Posted question {}.", question.id);
            Ok(())
        }
        QuestionCommand::Edit {
            id,
            title,
            content,
            tags,
            attachments,
            remove,
        } => {
            if !app.enter(&Route::EditQuestion(id.clone())).await? {
                return Ok(());
            }
            let existing = app.forum.question(&id).await?;
            if !app.user_id().is_some_and(|uid| existing.is_owned_by(&uid)) {
                bail!("Only the author can edit this question");
            }
            if let Some(unknown) = remove.iter().find(|path| !existing.attachments.contains(path)) {
                bail!("'{}' is not attached to this question", unknown);
            }
            let form = QuestionForm {
                title: title.unwrap_or_else(|| existing.title.clone()),
                content: content.unwrap_or_else(|| existing.content.clone()),
                tags: tags.unwrap_or_else(|| existing.tags.join(", ")),
                attachments: load_attachments(&attachments).await?,
            };
            app.forum
                .edit_question(&existing, &form, &remove)
                .await?;
            println!("Updated question {}.", id);
            Ok(())
        }
        QuestionCommand::Delete { id, yes } => {
            if !app.require_sign_in(&Route::Question(id.clone())).await? {
                return Ok(());
            }
            if !yes && !prompt::confirm("Delete this question and all its answers?")? {
                println!("Cancelled.");
                return Ok(());
            }
            app.forum.delete_question(&id).await?;
            println!("Deleted question {}.", id);
            Ok(())
        }
        QuestionCommand::Like { id } => set_question_like(app, id, true).await,
        QuestionCommand::Unlike { id } => set_question_like(app, id, false).await,
        QuestionCommand::Solve { id } => set_solved(app, id, true).await,
        QuestionCommand::Unsolve { id } => set_solved(app, id, false).await,
    }
}

async fn set_question_like(app: &App, id: String, like: bool) -> Result<()> {
    if !app.require_sign_in(&Route::Question(id.clone())).await? {
        return Ok(());
    }
    app.forum.set_question_like(&id, like).await?;
    println!("{} question {}.", if like { "Liked" } else { "Unliked" }, id);
    Ok(())
}

async fn set_solved(app: &App, id: String, solved: bool) -> Result<()> {
    if !app.require_sign_in(&Route::Question(id.clone())).await? {
        return Ok(());
    }
    app.forum.set_solved(&id, solved).await?;
    println!("Marked question {} {}.", id, if solved { "solved" } else { "unsolved" });
    Ok(())
}

// ============================================================================
// Answers
// ============================================================================

async fn answers(app: &App, cmd: AnswerCommand) -> Result<()> {
    match cmd {
        AnswerCommand::Add {
            question_id,
            content,
            attachments,
        } => {
            if !app.require_sign_in(&Route::Question(question_id.clone())).await? {
                return Ok(());
            }
            let form = AnswerForm {
                content,
                attachments: load_attachments(&attachments).await?,
            };
            app.forum.add_answer(&question_id, &form).await?;
            println!("Answer posted.");
        }
        AnswerCommand::Like { question_id, answer_id } => {
            set_answer_like(app, question_id, answer_id, true).await?;
        }
        AnswerCommand::Unlike { question_id, answer_id } => {
            set_answer_like(app, question_id, answer_id, false).await?;
        }
        AnswerCommand::Delete {
            question_id,
            answer_id,
            yes,
        } => {
            if !app.require_sign_in(&Route::Question(question_id.clone())).await? {
                return Ok(());
            }
            if !yes && !prompt::confirm("Delete this answer?")? {
                println!("Cancelled.");
                return Ok(());
            }
            app.forum
                .delete_answer(&question_id, &answer_id)
                .await?;
            println!("Deleted answer {}.", answer_id);
        }
    }
    Ok(())
}

async fn set_answer_like(app: &App, question_id: String, answer_id: String, like: bool) -> Result<()> {
    if !app.require_sign_in(&Route::Question(question_id.clone())).await? {
        return Ok(());
    }
    app.forum
        .set_answer_like(&question_id, &answer_id, like)
        .await?;
    println!("{} answer {}.", if like { "Liked" } else { "Unliked" }, answer_id);
    Ok(())
}

// ============================================================================
// Bookmarks
// ============================================================================

async fn bookmarks(app: &App, cmd: BookmarkCommand) -> Result<()> {
    if !app.enter(&Route::Bookmarks).await? {
        return Ok(());
    }
    match cmd {
        BookmarkCommand::List => {
            let (questions, answers) = tokio::join!(app.forum.saved_questions(), app.forum.saved_answers());
            let questions = questions?;
            let answers = answers?;
            if app.json {
                return render::json(&serde_json::json!({
                    "questions": questions,
                    "answers": answers,
                }));
            }
            render::question_list("Saved questions", &questions, app.user_id().as_deref());
            println!();
            render::saved_answers(&answers);
        }
        BookmarkCommand::Question { id } => {
            let saved = app.forum.toggle_question_bookmark(&id).await?;
            println!("Question {} {}.", id, if saved { "saved" } else { "removed from saved" });
        }
        BookmarkCommand::Answer { id } => {
            let saved = app.forum.toggle_answer_bookmark(&id).await?;
            println!("Answer {} {}.", id, if saved { "saved" } else { "removed from saved" });
        }
    }
    Ok(())
}

// ============================================================================
// Notifications
// ============================================================================

async fn notifications(app: &App, cmd: NotificationCommand) -> Result<()> {
    if !app.enter(&Route::Notifications).await? {
        return Ok(());
    }
    match cmd {
        NotificationCommand::List => {
            let inbox = app.forum.notifications().await?;
            if app.json {
                return render::json(&inbox);
            }
            render::notifications(&inbox);
        }
        NotificationCommand::Open { id } => {
            let inbox = app.forum.notifications().await?;
            let notification = inbox
                .notifications
                .iter()
                .find(|n| n.id == id)
                .ok_or_else(|| anyhow!("No notification with id {}", id))?;
            match app.forum.open_notification(notification).await {
                Some(question_id) => {
                    let question = app.forum.question(&question_id).await?;
                    render::question_detail(&question, app.base_url(), app.session.user().as_ref());
                }
                None => println!("{}", notification.message),
            }
        }
        NotificationCommand::ReadAll => {
            app.forum.mark_all_notifications_read().await?;
            println!("All notifications marked read.");
        }
    }
    Ok(())
}

// ============================================================================
// Profile
// ============================================================================

async fn profile(app: &App, cmd: ProfileCommand) -> Result<()> {
    if !app.enter(&Route::Profile).await? {
        return Ok(());
    }
    match cmd {
        ProfileCommand::Show => {
            let user = app.session.user().ok_or_else(|| anyhow!("Not signed in"))?;
            if app.json {
                return render::json(&user.without_token());
            }
            render::profile(&user, app.base_url());
        }
        ProfileCommand::Edit {
            name,
            email,
            department,
            branch,
        } => {
            let update = ProfileUpdate {
                name,
                email,
                department,
                branch,
            };
            if update.is_empty() {
                bail!("Nothing to change; pass --name, --email, --department or --branch");
            }
            let user = app.auth.edit_profile(&update).await?;
            println!("Profile updated.");
            render::profile(&user, app.base_url());
        }
        ProfileCommand::Avatar { path } => {
            let image = Attachment::from_path(&path).await?;
            let user = app.auth.upload_profile_image(image).await?;
            println!("Profile picture updated.");
            render::profile(&user, app.base_url());
        }
    }
    Ok(())
}

// ============================================================================
// Config
// ============================================================================

fn config(app: &App, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            println!("api url:          {}", app.base_url());
            println!("storage:          {:?}", app.config.storage);
            println!("reverify every:   {}s", app.config.reverify_interval().as_secs());
            println!("request timeout:  {}s", app.config.request_timeout().as_secs());
            if let Some(email) = &app.config.last_email {
                println!("last email:       {}", email);
            }
        }
        ConfigCommand::Set {
            api_url,
            storage,
            reverify_secs,
            timeout_secs,
        } => {
            let mut stored = Config::load_stored()?;
            if let Some(url) = api_url {
                stored.api_base_url = Some(url.trim().to_string()).filter(|u| !u.is_empty());
            }
            if let Some(raw) = storage {
                stored.storage =
                    StorageBackend::parse(&raw).ok_or_else(|| anyhow!("Unknown storage '{}'; use file or keyring", raw))?;
            }
            if let Some(secs) = reverify_secs {
                stored.reverify_interval_secs = secs;
            }
            if let Some(secs) = timeout_secs {
                stored.request_timeout_secs = secs;
            }
            stored.save()?;
            println!("Settings saved.");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::Cli;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("eduqa").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_list_args_build_query() {
        let cli = parse(&[
            "questions", "list", "--tag", "rust", "--sort", "most_liked", "--unsolved", "--range", "week", "--page", "2",
        ]);
        let Command::Questions(QuestionCommand::List(args)) = cli.command else {
            panic!("expected questions list");
        };
        let query = args.query();
        assert_eq!(query.tag.as_deref(), Some("rust"));
        assert_eq!(query.sort, SortOrder::MostLiked);
        assert_eq!(query.solved, Some(false));
        assert_eq!(query.date_range, Some(DateRange::Week));
        assert_eq!(query.page, Some(2));
        assert_eq!(query.active_filter_count(), 2);
    }

    #[test]
    fn test_rejects_unknown_sort() {
        let result = Cli::try_parse_from(["eduqa", "questions", "list", "--sort", "random"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_solved_flags_conflict() {
        let result = Cli::try_parse_from(["eduqa", "questions", "list", "--solved", "--unsolved"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_repeated_attachments() {
        let cli = parse(&[
            "questions", "ask", "--title", "How do lifetimes work?", "--content", "x", "--attach", "a.png", "--attach", "b.pdf",
        ]);
        let Command::Questions(QuestionCommand::Ask { attachments, tags, .. }) = cli.command else {
            panic!("expected questions ask");
        };
        assert_eq!(attachments, vec![PathBuf::from("a.png"), PathBuf::from("b.pdf")]);
        assert_eq!(tags, "");
    }
}
