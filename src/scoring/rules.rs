//! Table-tennis scoring rules: set and match completion, set tallies and serve rotation.
//!
//! Everything here is pure; the tracker feeds it local state and acts on the answers.

use std::fmt;

use serde::Serialize;
use utoipa::ToSchema;

use crate::dao::models::{Side, display_score};

/// Points a side needs to take a set (with a two point margin).
pub const POINTS_TO_WIN_SET: u32 = 11;
/// Lead required to close a set.
pub const WINNING_MARGIN: u32 = 2;
/// Once both sides reach this score the serve changes after every point.
pub const DEUCE_THRESHOLD: u32 = 10;
/// Points each server plays before handing over outside deuce.
pub const SERVES_PER_TURN: u32 = 2;
/// Match length used when none is configured.
pub const DEFAULT_BEST_OF: u8 = 5;
/// Longest match accepted.
pub const MAX_BEST_OF: u8 = 9;

/// Score of one set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct SetScore {
    /// Points of the tracked player.
    pub player: u32,
    /// Points of the opponent.
    pub opponent: u32,
}

impl SetScore {
    /// Score from both sides' points.
    pub fn new(player: u32, opponent: u32) -> Self {
        Self { player, opponent }
    }

    /// Points played so far.
    pub fn total(&self) -> u32 {
        self.player + self.opponent
    }

    /// Points of one side.
    pub fn of(&self, side: Side) -> u32 {
        match side {
            Side::Player => self.player,
            Side::Opponent => self.opponent,
        }
    }

    /// Score after `side` wins one more point.
    pub fn increment(self, side: Side) -> Self {
        match side {
            Side::Player => Self::new(self.player + 1, self.opponent),
            Side::Opponent => Self::new(self.player, self.opponent + 1),
        }
    }

    /// Score with one point taken back from `side`, or `None` when that side has none.
    pub fn decrement(self, side: Side) -> Option<Self> {
        match side {
            Side::Player => Some(Self::new(self.player.checked_sub(1)?, self.opponent)),
            Side::Opponent => Some(Self::new(self.player, self.opponent.checked_sub(1)?)),
        }
    }

    /// Side ahead on points, if any.
    pub fn leader(&self) -> Option<Side> {
        match self.player.cmp(&self.opponent) {
            std::cmp::Ordering::Greater => Some(Side::Player),
            std::cmp::Ordering::Less => Some(Side::Opponent),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Winner of the set once one side has 11+ points and a two point lead.
    pub fn winner(&self) -> Option<Side> {
        let leader = self.leader()?;
        let lead = self.of(leader) - self.of(leader.other());
        (self.of(leader) >= POINTS_TO_WIN_SET && lead >= WINNING_MARGIN).then_some(leader)
    }

    /// Whether the set has a winner.
    pub fn is_complete(&self) -> bool {
        self.winner().is_some()
    }
}

impl fmt::Display for SetScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&display_score(self.player, self.opponent))
    }
}

/// Sets won and lost by the tracked player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetTally {
    /// Sets won by the player.
    pub won: u32,
    /// Sets won by the opponent.
    pub lost: u32,
}

impl SetTally {
    /// Count closed sets by their leader. A closed set level on points counts for nobody.
    pub fn from_closed<'a>(closed: impl IntoIterator<Item = &'a SetScore>) -> Self {
        closed
            .into_iter()
            .fold(Self::default(), |mut tally, score| {
                match score.leader() {
                    Some(Side::Player) => tally.won += 1,
                    Some(Side::Opponent) => tally.lost += 1,
                    None => {}
                }
                tally
            })
    }
}

impl fmt::Display for SetTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&display_score(self.won, self.lost))
    }
}

/// Best-of-N match format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchFormat {
    best_of: u8,
}

impl Default for MatchFormat {
    fn default() -> Self {
        Self {
            best_of: DEFAULT_BEST_OF,
        }
    }
}

impl MatchFormat {
    /// Accepts odd lengths between 1 and [`MAX_BEST_OF`].
    pub fn new(best_of: u8) -> Option<Self> {
        (best_of % 2 == 1 && best_of <= MAX_BEST_OF).then_some(Self { best_of })
    }

    /// Number of sets the match is played over.
    pub fn best_of(&self) -> u8 {
        self.best_of
    }

    /// Set wins needed to take the match.
    pub fn sets_to_win(&self) -> u32 {
        u32::from(self.best_of / 2 + 1)
    }

    /// Side that has already won the match, if any.
    pub fn winner(&self, tally: SetTally) -> Option<Side> {
        if tally.won >= self.sets_to_win() {
            Some(Side::Player)
        } else if tally.lost >= self.sets_to_win() {
            Some(Side::Opponent)
        } else {
            None
        }
    }
}

/// Side serving the next rally of a set.
///
/// Service start alternates every set. Inside a set the serve changes every
/// [`SERVES_PER_TURN`] points until both sides reach [`DEUCE_THRESHOLD`], then
/// after every point.
pub fn server_for(initial_server: Side, set_number: u32, score: SetScore) -> Side {
    let set_starter = if set_number % 2 == 1 {
        initial_server
    } else {
        initial_server.other()
    };

    let handovers = if score.player >= DEUCE_THRESHOLD && score.opponent >= DEUCE_THRESHOLD {
        let deuce_points = DEUCE_THRESHOLD * 2;
        deuce_points / SERVES_PER_TURN + (score.total() - deuce_points)
    } else {
        score.total() / SERVES_PER_TURN
    };

    if handovers % 2 == 0 {
        set_starter
    } else {
        set_starter.other()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_completion_boundaries() {
        assert!(SetScore::new(11, 9).is_complete());
        assert!(!SetScore::new(11, 10).is_complete());
        assert!(SetScore::new(12, 10).is_complete());
        assert!(!SetScore::new(10, 8).is_complete());
        assert_eq!(SetScore::new(9, 11).winner(), Some(Side::Opponent));
        assert_eq!(SetScore::new(14, 16).winner(), Some(Side::Opponent));
    }

    #[test]
    fn serve_changes_every_two_points() {
        let servers = [(0, 0), (1, 0), (1, 1), (2, 1)]
            .into_iter()
            .map(|(p, o)| server_for(Side::Player, 1, SetScore::new(p, o)))
            .collect::<Vec<_>>();
        assert_eq!(
            servers,
            vec![Side::Player, Side::Player, Side::Opponent, Side::Opponent]
        );
    }

    #[test]
    fn serve_changes_every_point_at_deuce() {
        let at_deuce = server_for(Side::Player, 1, SetScore::new(10, 10));
        let advantage = server_for(Side::Player, 1, SetScore::new(11, 10));
        let back_to_deuce = server_for(Side::Player, 1, SetScore::new(11, 11));
        assert_ne!(at_deuce, advantage);
        assert_eq!(at_deuce, back_to_deuce);
    }

    #[test]
    fn service_start_alternates_between_sets() {
        let score = SetScore::default();
        assert_eq!(server_for(Side::Opponent, 1, score), Side::Opponent);
        assert_eq!(server_for(Side::Opponent, 2, score), Side::Player);
        assert_eq!(server_for(Side::Opponent, 3, score), Side::Opponent);
    }

    #[test]
    fn server_is_stable_across_calls() {
        let score = SetScore::new(7, 4);
        let first = server_for(Side::Player, 2, score);
        assert!((0..10).all(|_| server_for(Side::Player, 2, score) == first));
    }

    #[test]
    fn match_format_requires_odd_length() {
        assert!(MatchFormat::new(4).is_none());
        assert!(MatchFormat::new(11).is_none());
        assert_eq!(MatchFormat::new(5).unwrap().sets_to_win(), 3);
        assert_eq!(MatchFormat::new(1).unwrap().sets_to_win(), 1);
    }

    #[test]
    fn tally_ignores_level_sets() {
        let closed = [
            SetScore::new(11, 5),
            SetScore::new(3, 3),
            SetScore::new(8, 11),
            SetScore::new(11, 2),
        ];
        let tally = SetTally::from_closed(&closed);
        assert_eq!(tally, SetTally { won: 2, lost: 1 });
        assert_eq!(tally.to_string(), "2-1");
        assert_eq!(MatchFormat::default().winner(tally), None);
        assert_eq!(
            MatchFormat::new(3).unwrap().winner(tally),
            Some(Side::Player)
        );
    }
}
