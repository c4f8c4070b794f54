//! Types shared between the arena client and anything else that speaks the
//! arena line protocol: board geometry, movement directions, and the
//! `action,id,x,y` wire format.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Rightmost playable column. Column 0 is the leftmost.
pub const ARENA_WIDTH: i32 = 79;
/// First playable row, just below the top border.
pub const MIN_Y: i32 = 3;
/// Last playable row, just above the bottom border.
pub const MAX_Y: i32 = 32;
/// Row holding the top border line.
pub const BORDER_TOP: i32 = 2;
/// Row holding the bottom border line.
pub const BORDER_BOTTOM: i32 = 33;
/// Column holding the right border line.
pub const BORDER_RIGHT: i32 = 80;

/// Number of comma separated fields in a well-formed protocol line.
pub const LINE_FIELDS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Grid delta `(dx, dy)`; y grows downwards.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

pub fn x_in_bounds(x: i32) -> bool {
    (0..=ARENA_WIDTH).contains(&x)
}

pub fn y_in_bounds(y: i32) -> bool {
    (MIN_Y..=MAX_Y).contains(&y)
}

/// Action tag of a protocol line.
///
/// `Pos`, `Hit` and `Stab` describe fighters. The rest are rendering
/// directives that are consumed by the renderer and never echoed back to
/// the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    Pos,
    Hit,
    Stab,
    Hide,
    RefreshBoard,
    RedrawEnemy,
    RedrawMe,
    Kill,
    Win,
    Other(String),
}

impl Action {
    pub fn is_directive(&self) -> bool {
        matches!(
            self,
            Action::Hide
                | Action::RefreshBoard
                | Action::RedrawEnemy
                | Action::RedrawMe
                | Action::Kill
                | Action::Win
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            Action::Pos => "pos",
            Action::Hit => "hit",
            Action::Stab => "stab",
            Action::Hide => "hide",
            Action::RefreshBoard => "refresh_board",
            Action::RedrawEnemy => "redraw_enemy",
            Action::RedrawMe => "redraw_me",
            Action::Kill => "kill",
            Action::Win => "win",
            Action::Other(tag) => tag,
        }
    }
}

impl From<&str> for Action {
    fn from(s: &str) -> Self {
        match s {
            "pos" => Action::Pos,
            "hit" => Action::Hit,
            "stab" => Action::Stab,
            "hide" => Action::Hide,
            "refresh_board" => Action::RefreshBoard,
            "redraw_enemy" => Action::RedrawEnemy,
            "redraw_me" => Action::RedrawMe,
            "kill" => Action::Kill,
            "win" => Action::Win,
            other => Action::Other(other.to_string()),
        }
    }
}

impl FromStr for Action {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Action::from(s))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("expected 4 fields, got {found}: {line:?}")]
    MissingFields { found: usize, line: String },
}

/// One decoded protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub action: Action,
    pub id: i32,
    pub x: i32,
    pub y: i32,
}

impl Line {
    pub fn new(action: Action, id: i32, x: i32, y: i32) -> Self {
        Self { action, id, x, y }
    }

    /// Parses a raw line as read from the socket.
    ///
    /// Numeric fields that fail to parse decode as zero. Fields past the
    /// fourth are ignored.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let trimmed = raw.trim();
        let fields: Vec<&str> = trimmed.split(',').collect();

        if trimmed.is_empty() || fields.len() < LINE_FIELDS {
            return Err(ProtocolError::MissingFields {
                found: if trimmed.is_empty() { 0 } else { fields.len() },
                line: trimmed.to_string(),
            });
        }

        Ok(Self {
            action: Action::from(fields[0].trim()),
            id: parse_int(fields[1]),
            x: parse_int(fields[2]),
            y: parse_int(fields[3]),
        })
    }

    /// Line formatted for the socket, newline included.
    pub fn to_wire(&self) -> String {
        format!("{}\n", self)
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.action, self.id, self.x, self.y)
    }
}

fn parse_int(field: &str) -> i32 {
    field.trim().parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pos_line() {
        let line = Line::parse("pos,2,11,10\n").unwrap();
        assert_eq!(line, Line::new(Action::Pos, 2, 11, 10));
    }

    #[test]
    fn test_parse_trims_whole_line() {
        let line = Line::parse("  hit,4,5,6 \r\n").unwrap();
        assert_eq!(line.action, Action::Hit);
        assert_eq!((line.id, line.x, line.y), (4, 5, 6));
    }

    #[test]
    fn test_malformed_numbers_become_zero() {
        let line = Line::parse("pos,abc,,7x").unwrap();
        assert_eq!((line.id, line.x, line.y), (0, 0, 0));
    }

    #[test]
    fn test_short_line_is_protocol_error() {
        let err = Line::parse("pos,1,2").unwrap_err();
        assert_eq!(
            err,
            ProtocolError::MissingFields {
                found: 3,
                line: "pos,1,2".to_string()
            }
        );
    }

    #[test]
    fn test_empty_line_is_protocol_error() {
        assert!(matches!(
            Line::parse("\n"),
            Err(ProtocolError::MissingFields { found: 0, .. })
        ));
    }

    #[test]
    fn test_extra_fields_ignored() {
        let line = Line::parse("stab,3,1,2,junk").unwrap();
        assert_eq!(line, Line::new(Action::Stab, 3, 1, 2));
    }

    #[test]
    fn test_bootstrap_action_kept_as_other() {
        let line = Line::parse("_,7,40,15").unwrap();
        assert_eq!(line.action, Action::Other("_".to_string()));
        assert_eq!((line.id, line.x, line.y), (7, 40, 15));
    }

    #[test]
    fn test_action_from_tag() {
        assert_eq!(Action::from("redraw_enemy"), Action::RedrawEnemy);
        assert_eq!(Action::from("POS"), Action::Other("POS".to_string()));
        assert_eq!(Line::parse(" hit ,2,5,5").unwrap().action, Action::Hit);
    }

    #[test]
    fn test_format_then_parse() {
        let line = Line::new(Action::Pos, 12, 40, 20);
        assert_eq!(line.to_wire(), "pos,12,40,20\n");

        let parsed = Line::parse(&line.to_wire()).unwrap();
        assert_eq!((parsed.id, parsed.x, parsed.y), (12, 40, 20));
    }

    #[test]
    fn test_directive_classification() {
        for tag in ["hide", "refresh_board", "redraw_enemy", "redraw_me", "kill", "win"] {
            let action: Action = tag.parse().unwrap();
            assert!(action.is_directive(), "{} should be a directive", tag);
            assert_eq!(action.as_str(), tag);
        }
        for tag in ["pos", "hit", "stab", "dance"] {
            let action: Action = tag.parse().unwrap();
            assert!(!action.is_directive(), "{} should not be a directive", tag);
        }
    }

    #[test]
    fn test_bounds() {
        assert!(x_in_bounds(0));
        assert!(x_in_bounds(ARENA_WIDTH));
        assert!(!x_in_bounds(-1));
        assert!(!x_in_bounds(ARENA_WIDTH + 1));
        assert!(y_in_bounds(MIN_Y));
        assert!(y_in_bounds(MAX_Y));
        assert!(!y_in_bounds(BORDER_TOP));
        assert!(!y_in_bounds(BORDER_BOTTOM));
    }

    #[test]
    fn test_direction_delta() {
        assert_eq!(Direction::Up.delta(), (0, -1));
        assert_eq!(Direction::Down.delta(), (0, 1));
        assert_eq!(Direction::Left.delta(), (-1, 0));
        assert_eq!(Direction::Right.delta(), (1, 0));
    }
}
