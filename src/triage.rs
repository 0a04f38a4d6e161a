//! Maps a match decision onto the mailbox action for the message being processed.
//!
//! A message whose rendered body contains a target image has its link followed and
//! is then deleted; any other message is put back to unread.

use crate::matcher::MatchResult;
use std::path::PathBuf;

/// What to do with the message that was just inspected.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageAction {
    /// A target image was found: follow the embedded link, then delete the message.
    FollowAndDelete {
        /// Reference image that matched.
        reference_path: PathBuf,
        /// Match rate of the winning comparison.
        match_rate: f64,
    },
    /// Nothing matched: restore the message to unread.
    RestoreUnread,
}

impl<E> From<&MatchResult<E>> for MessageAction {
    fn from(result: &MatchResult<E>) -> Self {
        match result.target() {
            Some(hit) => MessageAction::FollowAndDelete {
                reference_path: hit.reference_path.clone(),
                match_rate: hit.match_rate,
            },
            None => MessageAction::RestoreUnread,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::TargetMatch;
    use crate::page::BoundingBox;
    use crate::scanner::CandidateElement;

    #[test]
    fn test_found_follows_and_deletes() {
        let result = MatchResult::Found(TargetMatch {
            element: CandidateElement {
                handle: (),
                bounding_box: BoundingBox::new(32.0, 32.0),
            },
            reference_path: PathBuf::from("images/button.png"),
            match_rate: 0.97,
        });

        assert_eq!(
            MessageAction::from(&result),
            MessageAction::FollowAndDelete {
                reference_path: PathBuf::from("images/button.png"),
                match_rate: 0.97,
            }
        );
    }

    #[test]
    fn test_not_found_restores_unread() {
        let result: MatchResult<()> = MatchResult::NotFound;
        assert_eq!(MessageAction::from(&result), MessageAction::RestoreUnread);
    }
}
