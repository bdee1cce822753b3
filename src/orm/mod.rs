//! SeaORM entities, one module per table.

pub mod answer_comment_histories;
pub mod answer_comments;
pub mod answer_histories;
pub mod answers;
pub mod notifications;
pub mod post_comment_histories;
pub mod post_comments;
pub mod post_histories;
pub mod post_images;
pub mod post_tag_links;
pub mod post_tags;
pub mod posts;
pub mod question_histories;
pub mod question_images;
pub mod question_tag_links;
pub mod question_tags;
pub mod questions;
pub mod reactions;
pub mod user_actions;
pub mod user_avatars;
pub mod user_backdrops;
pub mod user_password_resets;
pub mod user_sns;
pub mod user_verification_emails;
pub mod users;
pub mod votes;
