//! Line-based input for the terminal review.
//!
//! Each line names one keystroke (`enter`, `shift+enter`, ...) or a review
//! command. While the edit form is open, any other line is typed into the
//! edit buffer.

use spec_assistant_core::KeyInput;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Key(KeyInput),
    /// Text typed into the open edit form.
    Text(String),
    /// Empty the open edit form.
    Clear,
    Summary,
    /// Reopen a key from the summary.
    Again(String),
    Help,
    Unknown(String),
}

fn key_name(name: &str) -> Option<KeyInput> {
    let key = match name.to_ascii_lowercase().as_str() {
        "left" => KeyInput::Left,
        "right" => KeyInput::Right,
        "enter" => KeyInput::Enter,
        "shift+enter" => KeyInput::ShiftEnter,
        "esc" | "escape" => KeyInput::Escape,
        "backspace" => KeyInput::Backspace,
        _ => return None,
    };
    Some(key)
}

pub fn parse_line(line: &str, editing: bool) -> Line {
    let trimmed = line.trim();

    if let Some(key) = key_name(trimmed) {
        return Line::Key(key);
    }

    if editing {
        if trimmed == "clear" {
            return Line::Clear;
        }
        return Line::Text(line.trim_end_matches(['\r', '\n']).to_string());
    }

    match trimmed {
        "e" | "E" | "d" | "D" => trimmed.chars().next().map_or_else(
            || Line::Unknown(trimmed.to_string()),
            |c| Line::Key(KeyInput::Char(c)),
        ),
        "summary" => Line::Summary,
        "help" | "?" => Line::Help,
        _ => match trimmed.strip_prefix("again ") {
            Some(key) if !key.trim().is_empty() => Line::Again(key.trim().to_string()),
            _ => Line::Unknown(trimmed.to_string()),
        },
    }
}

pub const HELP: &str = "\
Keys: left/right move between keys, enter accepts, e edits, d exports, esc closes.
While editing: type text, shift+enter for a new line, backspace, clear, enter saves, esc cancels.
Commands: summary, help. After summary, again <key> reopens a listed key.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names() {
        assert_eq!(parse_line("left", false), Line::Key(KeyInput::Left));
        assert_eq!(parse_line(" Enter ", false), Line::Key(KeyInput::Enter));
        assert_eq!(parse_line("shift+enter", true), Line::Key(KeyInput::ShiftEnter));
        assert_eq!(parse_line("esc", true), Line::Key(KeyInput::Escape));
        assert_eq!(parse_line("D", false), Line::Key(KeyInput::Char('D')));
    }

    #[test]
    fn test_text_only_while_editing() {
        assert_eq!(parse_line("X200", true), Line::Text("X200".into()));
        assert_eq!(parse_line("e", true), Line::Text("e".into()));
        assert_eq!(parse_line("X200", false), Line::Unknown("X200".into()));
    }

    #[test]
    fn test_text_keeps_leading_spaces() {
        assert_eq!(parse_line("  400 V\n", true), Line::Text("  400 V".into()));
    }

    #[test]
    fn test_commands() {
        assert_eq!(parse_line("summary", false), Line::Summary);
        assert_eq!(
            parse_line("again Rated Voltage", false),
            Line::Again("Rated Voltage".into())
        );
        assert_eq!(parse_line("again ", false), Line::Unknown("again".into()));
        assert_eq!(parse_line("clear", true), Line::Clear);
        assert_eq!(parse_line("?", false), Line::Help);
    }
}
