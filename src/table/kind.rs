// src/table/kind.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use super::schema::{self, TableSchema};
use crate::parse::ParseStrategy;

/// The logical tables of a site dump.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum TableKind {
    Posts,
    PostHistory,
    Users,
    Votes,
    Tags,
    PostLinks,
    Badges,
    Comments,
}

impl TableKind {
    pub const ALL: [TableKind; 8] = [
        TableKind::Posts,
        TableKind::PostHistory,
        TableKind::Users,
        TableKind::Votes,
        TableKind::Tags,
        TableKind::PostLinks,
        TableKind::Badges,
        TableKind::Comments,
    ];

    /// File name inside the extracted dump.
    pub fn file_name(&self) -> &'static str {
        match self {
            TableKind::Posts => "Posts.xml",
            TableKind::PostHistory => "PostHistory.xml",
            TableKind::Users => "Users.xml",
            TableKind::Votes => "Votes.xml",
            TableKind::Tags => "Tags.xml",
            TableKind::PostLinks => "PostLinks.xml",
            TableKind::Badges => "Badges.xml",
            TableKind::Comments => "Comments.xml",
        }
    }

    /// Base name of the exported files (`<name>.csv`, `<name>.json`).
    pub fn output_name(&self) -> &'static str {
        match self {
            TableKind::Posts => "posts",
            TableKind::PostHistory => "posthistory",
            TableKind::Users => "users",
            TableKind::Votes => "votes",
            TableKind::Tags => "tags",
            TableKind::PostLinks => "postLinks",
            TableKind::Badges => "badges",
            TableKind::Comments => "comments",
        }
    }

    /// Fixed parser policy. Posts, PostHistory and Comments are the tables
    /// that outgrow memory on large sites, so they are streamed.
    pub fn strategy(&self) -> ParseStrategy {
        match self {
            TableKind::Posts | TableKind::PostHistory | TableKind::Comments => {
                ParseStrategy::Streaming
            }
            TableKind::Users
            | TableKind::Votes
            | TableKind::Tags
            | TableKind::PostLinks
            | TableKind::Badges => ParseStrategy::Bulk,
        }
    }

    pub fn schema(&self) -> TableSchema {
        match self {
            TableKind::Posts => schema::POSTS,
            TableKind::PostHistory => schema::POST_HISTORY,
            TableKind::Users => schema::USERS,
            TableKind::Votes => schema::VOTES,
            TableKind::Tags => schema::TAGS,
            TableKind::PostLinks => schema::POST_LINKS,
            TableKind::Badges => schema::BADGES,
            TableKind::Comments => schema::COMMENTS,
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.output_name())
    }
}
