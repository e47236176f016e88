//! Keyboard surface of the review card.
//!
//! Keystrokes are applied to the session here; anything that needs the
//! outside world (closing the review UI, running the export) comes back as a
//! [`KeyEffect`] for the presentation layer to carry out.

use super::session::ReviewSession;
use super::state::{Outcome, Rejection};

/// A keystroke delivered to the review card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Left,
    Right,
    Enter,
    ShiftEnter,
    Escape,
    Backspace,
    Char(char),
}

/// What the presentation layer should do after a keystroke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyEffect {
    /// Session state may have changed; redraw the card.
    Render,
    /// The keystroke does nothing in the current state.
    Ignored,
    /// The review action was refused; the card is unchanged.
    Rejected(Rejection),
    /// Close the review UI.
    Close,
    /// Run the export.
    Export,
}

/// Apply `key` to `session`.
pub fn handle_key(session: &mut ReviewSession, key: KeyInput) -> KeyEffect {
    if session.is_editing() {
        handle_editing_key(session, key)
    } else {
        handle_card_key(session, key)
    }
}

/// Keys while the edit textarea has focus.
fn handle_editing_key(session: &mut ReviewSession, key: KeyInput) -> KeyEffect {
    match key {
        KeyInput::Enter => {
            let outcome = session.commit_edit();
            match outcome {
                Outcome::Applied => KeyEffect::Render,
                Outcome::Rejected(rejection) => KeyEffect::Rejected(rejection),
            }
        }
        KeyInput::ShiftEnter => push_to_buffer(session, '\n'),
        KeyInput::Escape => {
            session.cancel_edit();
            KeyEffect::Render
        }
        KeyInput::Backspace => match session.edit_buffer_mut().and_then(String::pop) {
            Some(_) => KeyEffect::Render,
            None => KeyEffect::Ignored,
        },
        KeyInput::Char(c) => push_to_buffer(session, c),
        // Arrow keys move the text cursor, not the card.
        KeyInput::Left | KeyInput::Right => KeyEffect::Ignored,
    }
}

/// Keys while the card is shown without the edit form.
fn handle_card_key(session: &mut ReviewSession, key: KeyInput) -> KeyEffect {
    match key {
        KeyInput::Left => moved(session.previous()),
        KeyInput::Right => moved(session.next()),
        KeyInput::Enter => {
            let pending = session
                .current_record()
                .is_some_and(|record| !record.status().is_reviewed());
            if !pending {
                return KeyEffect::Ignored;
            }
            match session.accept_current() {
                Outcome::Applied => KeyEffect::Render,
                Outcome::Rejected(rejection) => KeyEffect::Rejected(rejection),
            }
        }
        KeyInput::Char('e') | KeyInput::Char('E') => moved(session.begin_edit()),
        KeyInput::Escape if session.all_reviewed() => KeyEffect::Close,
        KeyInput::Char('d') | KeyInput::Char('D') if session.all_reviewed() => KeyEffect::Export,
        _ => KeyEffect::Ignored,
    }
}

fn push_to_buffer(session: &mut ReviewSession, c: char) -> KeyEffect {
    match session.edit_buffer_mut() {
        Some(buffer) => {
            buffer.push(c);
            KeyEffect::Render
        }
        None => KeyEffect::Ignored,
    }
}

fn moved(changed: bool) -> KeyEffect {
    if changed {
        KeyEffect::Render
    } else {
        KeyEffect::Ignored
    }
}
