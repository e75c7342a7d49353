//! Round resolution events.

use std::fmt;

/// The outcome tag emitted by a concluded round.
///
/// Events key the application's transition table: the pair
/// `(current round kind, event)` selects the next round. Exactly one event
/// is emitted per round resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Event {
    /// Threshold agreement was reached.
    Done,
    /// No value can reach the threshold even with all outstanding votes.
    NoMajority,
    /// The round's time budget elapsed before agreement.
    RoundTimeout,
    /// Domain-specific event defined by the application.
    Custom(&'static str),
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Done => write!(f, "done"),
            Event::NoMajority => write!(f, "no_majority"),
            Event::RoundTimeout => write!(f, "round_timeout"),
            Event::Custom(tag) => write!(f, "{}", tag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_display() {
        assert_eq!(Event::Done.to_string(), "done");
        assert_eq!(Event::NoMajority.to_string(), "no_majority");
        assert_eq!(Event::RoundTimeout.to_string(), "round_timeout");
        assert_eq!(Event::Custom("price_below_floor").to_string(), "price_below_floor");
    }
}
