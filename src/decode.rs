// src/decode.rs
use arrow::array::{Array, Int64Array, StringArray};

/// The five fixed enumerations carried by the dump as integer code columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    PostType,
    PostHistoryType,
    VoteType,
    BadgeClass,
    LinkType,
}

impl Category {
    /// Column holding the integer code.
    pub fn code_column(&self) -> &'static str {
        match self {
            Category::PostType => "PostTypeId",
            Category::PostHistoryType => "PostHistoryTypeId",
            Category::VoteType => "VoteTypeId",
            Category::BadgeClass => "Class",
            Category::LinkType => "LinkTypeId",
        }
    }

    /// Column appended with the decoded label.
    pub fn label_column(&self) -> &'static str {
        match self {
            Category::PostType => "PostType",
            Category::PostHistoryType => "PostHistoryType",
            Category::VoteType => "VoteType",
            Category::BadgeClass => "ClassType",
            Category::LinkType => "LinkType",
        }
    }

    pub fn decode(&self, code: i64) -> Option<&'static str> {
        match self {
            Category::PostType => post_type(code),
            Category::PostHistoryType => post_history_type(code),
            Category::VoteType => vote_type(code),
            Category::BadgeClass => badge_class(code),
            Category::LinkType => link_type(code),
        }
    }

    /// Map a code array to a label array of the same length. Null codes and
    /// codes without a label both produce null.
    pub fn decode_array(&self, codes: &Int64Array) -> StringArray {
        codes
            .iter()
            .map(|c| c.and_then(|c| self.decode(c)))
            .collect()
    }
}

pub fn post_type(code: i64) -> Option<&'static str> {
    Some(match code {
        1 => "Question",
        2 => "Answer",
        3 => "Orphaned tag wiki",
        4 => "Tag wiki excerpt",
        5 => "Tag wiki",
        6 => "Moderator nomination",
        7 => "Wiki placeholder",
        8 => "Privilege wiki",
        _ => return None,
    })
}

// 23, 26-30, 32, 39-49 and 51 are unassigned.
pub fn post_history_type(code: i64) -> Option<&'static str> {
    Some(match code {
        1 => "Initial Title",
        2 => "Initial Body",
        3 => "Initial Tags",
        4 => "Edit Title",
        5 => "Edit Body",
        6 => "Edit Tags",
        7 => "Rollback Title",
        8 => "Rollback Body",
        9 => "Rollback Tags",
        10 => "Post Closed",
        11 => "Post Reopened",
        12 => "Post Deleted",
        13 => "Post Undeleted",
        14 => "Post Locked",
        15 => "Post Unlocked",
        16 => "Community Owned",
        // trailing space is part of the published label
        17 => "Post Migrated ",
        18 => "Question Merged - question merged with deleted question",
        19 => "Question Protected - question was protected by a moderator.",
        20 => "Question Unprotected - question was unprotected by a moderator.",
        21 => "Post Disassociated - OwnerUserId removed from post by admin",
        22 => "Question Unmerged - answers/votes restored to previously merged question",
        24 => "Suggested Edit Applied",
        25 => "Post Tweeted",
        31 => "Comment discussion moved to chat",
        33 => "Post notice added",
        34 => "Post notice removed",
        35 => "Post migrated away",
        36 => "Post migrated here",
        37 => "Post merge source",
        38 => "Post merge destination",
        50 => "Bumped by Community User",
        52 => "Question became hot network question (main) / Hot Meta question (meta)",
        53 => "Question removed from hot network/meta questions by a moderator",
        _ => return None,
    })
}

// 13 and 14 are unassigned.
pub fn vote_type(code: i64) -> Option<&'static str> {
    Some(match code {
        1 => "AcceptedByOriginator",
        2 => "UpMod",
        3 => "DownMod",
        4 => "Offensive",
        5 => "Favorite",
        6 => "Close",
        7 => "Reopen",
        8 => "BountyStart",
        9 => "BountyClose",
        10 => "Deletion",
        11 => "Undeletion",
        12 => "Spam",
        15 => "ModeratorReview",
        16 => "ApproveEditSuggestion",
        _ => return None,
    })
}

pub fn badge_class(code: i64) -> Option<&'static str> {
    Some(match code {
        1 => "Gold",
        2 => "Silver",
        3 => "Bronze",
        _ => return None,
    })
}

pub fn link_type(code: i64) -> Option<&'static str> {
    Some(match code {
        1 => "Linked",
        3 => "Duplicate",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Category; 5] = [
        Category::PostType,
        Category::PostHistoryType,
        Category::VoteType,
        Category::BadgeClass,
        Category::LinkType,
    ];

    #[test]
    fn sentinel_zero_has_no_label() {
        for cat in ALL {
            assert_eq!(cat.decode(0), None, "{:?}", cat);
        }
    }

    #[test]
    fn decode_is_total_over_wide_range() {
        for cat in ALL {
            for code in -1_000..1_000 {
                let _ = cat.decode(code);
            }
            assert_eq!(cat.decode(i64::MIN), None);
            assert_eq!(cat.decode(i64::MAX), None);
        }
    }

    #[test]
    fn post_history_gaps_are_null() {
        let gaps = [23, 26, 27, 28, 29, 30, 39, 40, 45, 49, 51, 54];
        for code in gaps {
            assert_eq!(post_history_type(code), None, "code {}", code);
        }
        assert_eq!(post_history_type(24), Some("Suggested Edit Applied"));
        assert_eq!(post_history_type(50), Some("Bumped by Community User"));
        assert_eq!(post_history_type(17), Some("Post Migrated "));
    }

    #[test]
    fn defined_label_counts() {
        let count = |f: fn(i64) -> Option<&'static str>| (0..100).filter(|c| f(*c).is_some()).count();
        assert_eq!(count(post_type), 8);
        assert_eq!(count(post_history_type), 34);
        assert_eq!(count(vote_type), 14);
        assert_eq!(count(badge_class), 3);
        assert_eq!(count(link_type), 2);
    }

    #[test]
    fn known_labels() {
        assert_eq!(post_type(2), Some("Answer"));
        assert_eq!(vote_type(13), None);
        assert_eq!(vote_type(16), Some("ApproveEditSuggestion"));
        assert_eq!(badge_class(3), Some("Bronze"));
        assert_eq!(link_type(2), None);
        assert_eq!(link_type(3), Some("Duplicate"));
    }

    #[test]
    fn decode_array_keeps_length_and_nulls() {
        let codes = Int64Array::from(vec![Some(1), None, Some(13), Some(2)]);
        let labels = Category::VoteType.decode_array(&codes);
        assert_eq!(labels.len(), 4);
        assert_eq!(labels.value(0), "AcceptedByOriginator");
        assert!(labels.is_null(1));
        assert!(labels.is_null(2));
        assert_eq!(labels.value(3), "UpMod");
    }
}
