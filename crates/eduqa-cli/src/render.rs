//! Plain-text rendering of forum data.

use anyhow::Result;
use serde::Serialize;

use eduqa_core::auth::Session;
use eduqa_core::cache::CacheAges;
use eduqa_core::models::{
    Answer, FeedStats, Notification, NotificationInbox, PageInfo, Question, QuestionPage, QuestionQuery, User,
};
use eduqa_core::utils::format::{is_image_path, plain_preview};
use eduqa_core::utils::{format_date, page_window, resolve_asset_url, truncate_string, unread_badge, PageItem};

/// Width of a title in list rows.
const TITLE_WIDTH: usize = 60;

/// Width of the content preview under a title.
const PREVIEW_WIDTH: usize = 90;

/// Tags shown in the feed summary.
const SUMMARY_TAGS: usize = 8;

pub fn json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn notice(message: &str) {
    eprintln!("Note: {}", message);
}

pub fn sign_in_required(path: &str) {
    println!("Sign in to view {}. Run `eduqa login` and try again.", path);
}

pub fn cached(age: Option<&str>) {
    if let Some(age) = age {
        notice(&format!("server unreachable, showing data cached {}", age));
    }
}

fn date(raw: Option<&str>) -> String {
    raw.map(format_date).unwrap_or_default()
}

// ============================================================================
// Questions
// ============================================================================

fn question_row(question: &Question, user_id: Option<&str>) {
    let status = if question.solved { "[solved]" } else { "" };
    let liked = match user_id {
        Some(id) if question.is_liked_by(id) => "*",
        _ => "",
    };
    println!(
        "{:<26} {:<60} {}",
        question.id,
        truncate_string(&question.title, TITLE_WIDTH),
        status
    );
    println!(
        "    {} | {} likes{} | {} answers | {}{}",
        question.author_name(),
        question.like_total(),
        liked,
        question.answer_total(),
        date(question.created_at.as_deref()),
        tags_suffix(&question.tags)
    );
    let preview = plain_preview(&question.content, PREVIEW_WIDTH);
    if !preview.is_empty() {
        println!("    {}", preview);
    }
}

fn tags_suffix(tags: &[String]) -> String {
    if tags.is_empty() {
        String::new()
    } else {
        format!(" | #{}", tags.join(" #"))
    }
}

pub fn question_page(page: &QuestionPage, query: &QuestionQuery, user_id: Option<&str>) {
    let filters = query.active_filter_count();
    if filters > 0 {
        println!("{} questions ({} filters active)\n", page.total, filters);
    } else {
        println!("{} questions\n", page.total);
    }

    if page.questions.is_empty() {
        println!("No questions match.");
        return;
    }
    for question in &page.questions {
        question_row(question, user_id);
        println!();
    }
    if let Some(info) = &page.pagination {
        pager(info);
    }
}

pub fn pager(info: &PageInfo) {
    let window = page_window(info.page, info.total_pages);
    if window.is_empty() {
        return;
    }
    let links: Vec<String> = window
        .iter()
        .map(|item| match item {
            PageItem::Page(n) if *n == info.page => format!("[{}]", n),
            other => other.to_string(),
        })
        .collect();
    let prev = if info.has_prev_page { "< prev  " } else { "" };
    let next = if info.has_next_page { "  next >" } else { "" };
    println!("{}{}{}", prev, links.join(" "), next);
}

pub fn feed_stats(questions: &[Question]) {
    let stats = FeedStats::from_questions(questions);
    println!("Summary");
    println!(
        "  {} answers, {} likes, {:.1} answers per question",
        stats.total_answers,
        stats.total_likes,
        stats.answers_per_question(questions.len())
    );
    if !stats.tags.is_empty() {
        let tags: Vec<String> = stats
            .tags
            .iter()
            .take(SUMMARY_TAGS)
            .map(|t| format!("#{} ({})", t.name, t.count))
            .collect();
        println!("  Popular tags: {}", tags.join(", "));
    }
    if !stats.contributors.is_empty() {
        println!("  Top contributors:");
        for c in &stats.contributors {
            let department = c.department.as_deref().map(|d| format!(", {}", d)).unwrap_or_default();
            println!(
                "    {}{}: {} rep, {} questions, {} answers",
                c.name, department, c.reputation, c.questions, c.answers
            );
        }
    }
    println!();
}

pub fn question_list(title: &str, questions: &[Question], user_id: Option<&str>) {
    println!("{} ({})\n", title, questions.len());
    if questions.is_empty() {
        println!("Nothing here yet.");
        return;
    }
    for question in questions {
        question_row(question, user_id);
        println!();
    }
}

fn attachments(base_url: &str, paths: &[String], indent: &str) {
    for path in paths {
        let kind = if is_image_path(path) { "image" } else { "file" };
        println!("{}{}: {}", indent, kind, resolve_asset_url(base_url, Some(path)));
    }
}

pub fn question_detail(question: &Question, base_url: &str, user: Option<&User>) {
    let user_id = user.and_then(|u| u.id.as_deref());
    println!("{}", question.title);
    println!(
        "asked by {} on {}{}",
        question.author_name(),
        date(question.created_at.as_deref()),
        if question.solved { " | solved" } else { "" }
    );
    let liked = user_id.is_some_and(|id| question.is_liked_by(id));
    let saved = user.is_some_and(|u| u.has_saved_question(&question.id));
    println!(
        "{} likes{}{}{}",
        question.like_total(),
        if liked { " (you)" } else { "" },
        if saved { " | saved" } else { "" },
        tags_suffix(&question.tags)
    );
    println!("\n{}\n", question.content.trim());
    attachments(base_url, &question.attachments, "  ");

    println!("\n{} answers", question.answer_total());
    for answer in question.populated_answers() {
        answer_block(answer, base_url, user, question.is_best_answer(&answer.id));
    }
}

fn answer_block(answer: &Answer, base_url: &str, user: Option<&User>, best: bool) {
    let user_id = user.and_then(|u| u.id.as_deref());
    let liked = user_id.is_some_and(|id| answer.is_liked_by(id));
    let saved = user.is_some_and(|u| u.has_saved_answer(&answer.id));
    println!(
        "\n--- {} {}{} | {} likes{}{}",
        answer.id,
        answer.author_name(),
        if best { " | best answer" } else { "" },
        answer.likes.len(),
        if liked { " (you)" } else { "" },
        if saved { " | saved" } else { "" }
    );
    println!("{}", answer.content.trim());
    attachments(base_url, &answer.attachments, "  ");
}

pub fn saved_answers(answers: &[Answer]) {
    println!("Saved answers ({})\n", answers.len());
    for answer in answers {
        let question = answer.question.as_ref().map(|q| q.id().to_string()).unwrap_or_default();
        println!("{:<26} on {} by {}", answer.id, question, answer.author_name());
        println!("    {}", plain_preview(&answer.content, PREVIEW_WIDTH));
    }
}

// ============================================================================
// Notifications
// ============================================================================

fn notification_row(notification: &Notification) {
    let marker = if notification.read { " " } else { "*" };
    let sender = notification
        .sender()
        .and_then(|a| a.name.as_deref())
        .unwrap_or("EduQA");
    println!(
        "{} {:<26} {} - {} ({})",
        marker,
        notification.id,
        sender,
        notification.message,
        date(notification.created_at.as_deref())
    );
}

pub fn notifications(inbox: &NotificationInbox) {
    match unread_badge(inbox.unread()) {
        Some(badge) => println!("Notifications ({} unread)\n", badge),
        None => println!("Notifications\n"),
    }
    if inbox.notifications.is_empty() {
        println!("You're all caught up.");
        return;
    }
    for notification in &inbox.notifications {
        notification_row(notification);
    }
}

// ============================================================================
// Session and profile
// ============================================================================

pub fn profile(user: &User, base_url: &str) {
    println!("{}", user.display_name());
    if let Some(email) = &user.email {
        println!("  email:      {}", email);
    }
    if let Some(role) = &user.role {
        println!("  role:       {}", role);
    }
    if let Some(department) = &user.department {
        println!("  department: {}", department);
    }
    if let Some(branch) = &user.branch {
        println!("  branch:     {}", branch);
    }
    if let Some(reputation) = user.reputation {
        println!("  reputation: {}", reputation);
    }
    println!("  avatar:     {}", resolve_asset_url(base_url, user.profile_image.as_deref()));
    if let Some(created) = user.created_at.as_deref() {
        println!("  joined:     {}", format_date(created));
    }
}

pub fn session(session: &Session) {
    match &session.user {
        Some(user) => println!("{} as {}", session.status, user.display_name()),
        None => println!("{}", session.status),
    }
    if let Some(error) = &session.error {
        println!("  last error: {}", error);
    }
}

pub fn cache_ages(ages: &CacheAges) {
    let show = |age: &Option<String>| age.clone().unwrap_or_else(|| "-".to_string());
    println!("Cache (last updated {})", ages.last_updated());
    println!("  feed:            {}", show(&ages.feed));
    println!("  my questions:    {}", show(&ages.my_questions));
    println!("  saved questions: {}", show(&ages.saved_questions));
    println!("  notifications:   {}", show(&ages.notifications));
}
