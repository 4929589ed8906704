// src/table/schema.rs

use arrow::datatypes::{DataType, Field, TimeUnit};

use crate::decode::Category;

/// Declared semantic type of a column. Every column is nullable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Int,
    Str,
    Timestamp,
}

impl ColumnType {
    /// Map a declared column type into an Arrow DataType.
    ///
    /// - Int       → Int64
    /// - Str       → Utf8
    /// - Timestamp → Timestamp(ms, no zone); the dump's dates carry no offset
    pub fn arrow_type(&self) -> DataType {
        match self {
            ColumnType::Int => DataType::Int64,
            ColumnType::Str => DataType::Utf8,
            ColumnType::Timestamp => DataType::Timestamp(TimeUnit::Millisecond, None),
        }
    }

    pub fn field(&self, name: &str) -> Field {
        Field::new(name, self.arrow_type(), true)
    }
}

/// Per-table column declarations plus the code columns that get decoded.
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub columns: &'static [(&'static str, ColumnType)],
    pub categories: &'static [Category],
}

impl TableSchema {
    /// Declared type for `name`; columns the schema does not know pass through as strings.
    pub fn column_type(&self, name: &str) -> ColumnType {
        self.columns
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, ty)| *ty)
            .unwrap_or(ColumnType::Str)
    }

    /// True when `name` is the code column of one of this table's categories.
    pub fn is_code_column(&self, name: &str) -> bool {
        self.categories.iter().any(|c| c.code_column() == name)
    }
}

use ColumnType::{Int, Str, Timestamp};

pub const POSTS: TableSchema = TableSchema {
    columns: &[
        ("Id", Int),
        ("PostTypeId", Int),
        ("AcceptedAnswerId", Int),
        ("ParentId", Int),
        ("CreationDate", Timestamp),
        ("DeletionDate", Timestamp),
        ("Score", Int),
        ("ViewCount", Int),
        ("Body", Str),
        ("OwnerUserId", Int),
        ("OwnerDisplayName", Str),
        ("LastEditorUserId", Int),
        ("LastEditorDisplayName", Str),
        ("LastEditDate", Timestamp),
        ("LastActivityDate", Timestamp),
        ("Title", Str),
        ("Tags", Str),
        ("AnswerCount", Int),
        ("CommentCount", Int),
        ("FavoriteCount", Int),
        ("ClosedDate", Timestamp),
        ("CommunityOwnedDate", Timestamp),
        ("ContentLicense", Str),
    ],
    categories: &[Category::PostType],
};

pub const POST_HISTORY: TableSchema = TableSchema {
    columns: &[
        ("Id", Int),
        ("PostHistoryTypeId", Int),
        ("PostId", Int),
        ("RevisionGUID", Str),
        ("CreationDate", Timestamp),
        ("UserId", Int),
        ("UserDisplayName", Str),
        ("Comment", Str),
        ("Text", Str),
        ("ContentLicense", Str),
    ],
    categories: &[Category::PostHistoryType],
};

pub const USERS: TableSchema = TableSchema {
    columns: &[
        ("Id", Int),
        ("Reputation", Int),
        ("CreationDate", Timestamp),
        ("DisplayName", Str),
        ("LastAccessDate", Timestamp),
        ("WebsiteUrl", Str),
        ("Location", Str),
        ("AboutMe", Str),
        ("Views", Int),
        ("UpVotes", Int),
        ("DownVotes", Int),
        ("ProfileImageUrl", Str),
        ("AccountId", Int),
    ],
    categories: &[],
};

pub const VOTES: TableSchema = TableSchema {
    columns: &[
        ("Id", Int),
        ("PostId", Int),
        ("VoteTypeId", Int),
        ("UserId", Int),
        ("CreationDate", Timestamp),
        ("BountyAmount", Int),
    ],
    categories: &[Category::VoteType],
};

pub const TAGS: TableSchema = TableSchema {
    columns: &[
        ("Id", Int),
        ("TagName", Str),
        ("Count", Int),
        ("ExcerptPostId", Int),
        ("WikiPostId", Int),
        ("IsModeratorOnly", Str),
        ("IsRequired", Str),
    ],
    categories: &[],
};

pub const POST_LINKS: TableSchema = TableSchema {
    columns: &[
        ("Id", Int),
        ("CreationDate", Timestamp),
        ("PostId", Int),
        ("RelatedPostId", Int),
        ("LinkTypeId", Int),
    ],
    categories: &[Category::LinkType],
};

pub const BADGES: TableSchema = TableSchema {
    columns: &[
        ("Id", Int),
        ("UserId", Int),
        ("Name", Str),
        ("Date", Timestamp),
        ("Class", Int),
        ("TagBased", Str),
    ],
    categories: &[Category::BadgeClass],
};

pub const COMMENTS: TableSchema = TableSchema {
    columns: &[
        ("Id", Int),
        ("PostId", Int),
        ("Score", Int),
        ("Text", Str),
        ("CreationDate", Timestamp),
        ("UserDisplayName", Str),
        ("UserId", Int),
        ("ContentLicense", Str),
    ],
    categories: &[],
};
