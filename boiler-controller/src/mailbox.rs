//! Mailbox I/O helpers.
//!
//! The incoming/outgoing buffers themselves are the host's concern
//! (`boiler_api::Inbox`/`Outbox`); these two functions are the small
//! amount of logic the decision engine needs on top of that
//! abstraction: picking out the one message of a kind a tick expects,
//! or every message of a kind a tick can receive more than one of.

use boiler_api::{Inbox, Message};

/// Returns the sole message for which `pred` produces `Some`, or
/// `None` if zero or more than one message in the inbox match.
/// Ambiguity (more than one match) is treated the same as absence,
/// since both are transmission faults from the engine's point of
/// view.
pub fn only_match<I, T>(inbox: &I, pred: impl Fn(&Message) -> Option<T>) -> Option<T>
where
    I: Inbox + ?Sized,
{
    let mut found = None;

    for i in 0..inbox.size() {
        if let Some(v) = pred(inbox.read(i)) {
            if found.is_some() {
                return None;
            }
            found = Some(v);
        }
    }

    found
}

/// Returns every message for which `pred` produces `Some`, in inbox
/// order.
pub fn all_matches<I, T>(inbox: &I, pred: impl Fn(&Message) -> Option<T>) -> Vec<T>
where
    I: Inbox + ?Sized,
{
    (0..inbox.size()).filter_map(|i| pred(inbox.read(i))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_match_finds_the_single_match() {
        let inbox: Vec<Message> = vec![Message::Level(500.0), Message::Steam(8.0)];

        let level = only_match(&inbox, |m| match m {
            Message::Level(v) => Some(*v),
            _ => None,
        });

        assert_eq!(level, Some(500.0));
    }

    #[test]
    fn only_match_rejects_absence() {
        let inbox: Vec<Message> = vec![Message::Steam(8.0)];

        let level = only_match(&inbox, |m| match m {
            Message::Level(v) => Some(*v),
            _ => None,
        });

        assert_eq!(level, None);
    }

    #[test]
    fn only_match_rejects_duplicates() {
        let inbox: Vec<Message> = vec![Message::Level(500.0), Message::Level(501.0)];

        let level = only_match(&inbox, |m| match m {
            Message::Level(v) => Some(*v),
            _ => None,
        });

        assert_eq!(level, None);
    }

    #[test]
    fn all_matches_preserves_order() {
        let inbox: Vec<Message> = vec![
            Message::PumpState(0, true),
            Message::Steam(8.0),
            Message::PumpState(1, false),
        ];

        let states = all_matches(&inbox, |m| match m {
            Message::PumpState(i, b) => Some((*i, *b)),
            _ => None,
        });

        assert_eq!(states, vec![(0, true), (1, false)]);
    }
}
