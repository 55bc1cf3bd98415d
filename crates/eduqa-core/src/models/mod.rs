//! Data models for EduQA Campus entities.
//!
//! - `User`, `ProfileUpdate`, `Role`: the signed-in account
//! - `Question`, `Answer`, `QuestionQuery`: feed and detail data
//! - `Notification`, `NotificationInbox`: the notification inbox
//! - `Attachment`: a file queued for upload
//! - `ApiResponse`, `AuthResponse`, `PageInfo`: response envelopes

pub mod attachment;
pub mod envelope;
pub mod notification;
pub mod question;
pub mod user;

pub use attachment::Attachment;
pub use envelope::{ApiResponse, AuthResponse, PageInfo};
pub use notification::{Notification, NotificationInbox, QuestionRef};
pub use question::{
    Answer, AnswerRef, Author, Contributor, DateRange, FeedStats, Question, QuestionPage, QuestionQuery,
    SortOrder, TagCount, UserRef,
};
pub use user::{ProfileUpdate, Role, User};
