//! Schema descriptors for the tables the scrubber touches.
//!
//! Names are prefix-relative; `RunContext::table` applies the prefix.

/// Identity table and its columns.
pub const USERS_TABLE: &str = "users";
pub const USER_ID_COLUMN: &str = "ID";
pub const USER_EMAIL_COLUMN: &str = "user_email";
pub const USER_PASS_COLUMN: &str = "user_pass";

/// Columns reset to `user-<ID>` regardless of classification.
pub const USER_LABEL_COLUMNS: &[&str] = &["user_login", "user_nicename", "display_name"];

/// Identity columns run through the classifier.
pub const USER_CLASSIFIED_COLUMNS: &[&str] = &["user_email", "user_url"];

pub const COMMENTS_TABLE: &str = "comments";
pub const COMMENT_OWNER_COLUMN: &str = "user_id";
pub const COMMENT_AUTHOR_EMAIL_COLUMN: &str = "comment_author_email";

/// Comment author sub-fields; `comment_content` is never touched here.
pub const COMMENT_AUTHOR_COLUMNS: &[&str] = &[
    "comment_author",
    "comment_author_email",
    "comment_author_url",
    "comment_author_IP",
];

pub const POSTS_TABLE: &str = "posts";

/// A generic key/value table attached to identities or content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaTable {
    pub table: &'static str,
    pub owner_column: &'static str,
    pub key_column: &'static str,
    pub value_column: &'static str,
}

pub const USER_META: MetaTable = MetaTable {
    table: "usermeta",
    owner_column: "user_id",
    key_column: "meta_key",
    value_column: "meta_value",
};

pub const POST_META: MetaTable = MetaTable {
    table: "postmeta",
    owner_column: "post_id",
    key_column: "meta_key",
    value_column: "meta_value",
};
