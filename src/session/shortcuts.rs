//! Keyboard shortcut mapping

use crate::domain::Tool;

/// Named (non-character) keys the editor reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Named {
    Escape,
    Delete,
    Backspace,
    Enter,
}

/// A key press as delivered by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Character(char),
    Named(Named),
}

/// Modifier state at the time of the key press
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub control: bool,
    pub shift: bool,
    /// Cmd on macOS, Super elsewhere
    pub logo: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        control: false,
        shift: false,
        logo: false,
        alt: false,
    };

    pub const CTRL: Modifiers = Modifiers {
        control: true,
        ..Modifiers::NONE
    };

    pub const CTRL_SHIFT: Modifiers = Modifiers {
        control: true,
        shift: true,
        ..Modifiers::NONE
    };

    /// Platform command modifier: Ctrl or Cmd
    pub fn command(&self) -> bool {
        self.control || self.logo
    }

    pub fn shift(&self) -> bool {
        self.shift
    }

    pub fn is_empty(&self) -> bool {
        !(self.control || self.logo || self.alt)
    }
}

/// Editor action triggered by a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Undo,
    Redo,
    DeleteSelection,
    /// Clear the selection
    Cancel,
    SelectTool(Tool),
    ZoomIn,
    ZoomOut,
    ZoomToFit,
    /// Text editing: insert a character
    TypeChar(char),
    /// Text editing: remove the last character
    DeleteBackward,
    /// Text editing: leave edit mode
    FinishText,
}

/// Editor state that changes what a key means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortcutContext {
    pub tool: Tool,
    pub editing_text: bool,
}

pub fn handle_key_event(ctx: ShortcutContext, key: Key, modifiers: Modifiers) -> Option<Command> {
    let editing = ctx.editing_text;

    match key {
        // Undo/redo shortcuts
        Key::Character(c) if c.eq_ignore_ascii_case(&'z') && modifiers.command() && !modifiers.shift() => {
            Some(Command::Undo)
        }
        Key::Character(c)
            if (c.eq_ignore_ascii_case(&'y') && modifiers.command())
                || (c.eq_ignore_ascii_case(&'z') && modifiers.command() && modifiers.shift()) =>
        {
            Some(Command::Redo)
        }
        // Zoom shortcuts
        Key::Character('=' | '+') if modifiers.command() => Some(Command::ZoomIn),
        Key::Character('-') if modifiers.command() => Some(Command::ZoomOut),
        Key::Character('0') if modifiers.command() => Some(Command::ZoomToFit),
        // In-place text editing swallows plain typing
        Key::Named(Named::Escape) if editing => Some(Command::FinishText),
        Key::Named(Named::Backspace) if editing => Some(Command::DeleteBackward),
        Key::Named(Named::Enter) if editing => Some(Command::TypeChar('\n')),
        Key::Character(c) if editing && modifiers.is_empty() => Some(Command::TypeChar(c)),
        Key::Named(Named::Delete) if editing => None,
        Key::Named(Named::Escape) => Some(Command::Cancel),
        // Deleting only applies to the selection under the select tool
        Key::Named(Named::Delete | Named::Backspace) if ctx.tool == Tool::Select => {
            Some(Command::DeleteSelection)
        }
        Key::Character(c) if modifiers.is_empty() => Tool::from_shortcut(c).map(Command::SelectTool),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SELECT: ShortcutContext = ShortcutContext {
        tool: Tool::Select,
        editing_text: false,
    };

    const EDITING: ShortcutContext = ShortcutContext {
        tool: Tool::Text,
        editing_text: true,
    };

    #[test]
    fn test_undo_redo() {
        let cmd = Modifiers {
            logo: true,
            ..Modifiers::NONE
        };
        assert_eq!(handle_key_event(SELECT, Key::Character('z'), Modifiers::CTRL), Some(Command::Undo));
        assert_eq!(handle_key_event(SELECT, Key::Character('z'), cmd), Some(Command::Undo));
        assert_eq!(
            handle_key_event(SELECT, Key::Character('Z'), Modifiers::CTRL_SHIFT),
            Some(Command::Redo)
        );
        assert_eq!(handle_key_event(SELECT, Key::Character('y'), Modifiers::CTRL), Some(Command::Redo));
        // Undo still works while editing text
        assert_eq!(handle_key_event(EDITING, Key::Character('z'), Modifiers::CTRL), Some(Command::Undo));
    }

    #[test]
    fn test_tool_letters() {
        for tool in Tool::ALL {
            assert_eq!(
                handle_key_event(SELECT, Key::Character(tool.shortcut()), Modifiers::NONE),
                Some(Command::SelectTool(tool))
            );
        }
        assert_eq!(handle_key_event(SELECT, Key::Character('x'), Modifiers::NONE), None);
        assert_eq!(handle_key_event(SELECT, Key::Character('r'), Modifiers::CTRL), None);
    }

    #[test]
    fn test_delete_requires_select_tool() {
        assert_eq!(
            handle_key_event(SELECT, Key::Named(Named::Delete), Modifiers::NONE),
            Some(Command::DeleteSelection)
        );
        assert_eq!(
            handle_key_event(SELECT, Key::Named(Named::Backspace), Modifiers::NONE),
            Some(Command::DeleteSelection)
        );
        let rect = ShortcutContext {
            tool: Tool::Rect,
            editing_text: false,
        };
        assert_eq!(handle_key_event(rect, Key::Named(Named::Delete), Modifiers::NONE), None);
    }

    #[test]
    fn test_text_editing_keys() {
        assert_eq!(
            handle_key_event(EDITING, Key::Character('r'), Modifiers::NONE),
            Some(Command::TypeChar('r'))
        );
        assert_eq!(
            handle_key_event(
                EDITING,
                Key::Character('R'),
                Modifiers {
                    shift: true,
                    ..Modifiers::NONE
                }
            ),
            Some(Command::TypeChar('R'))
        );
        assert_eq!(
            handle_key_event(EDITING, Key::Named(Named::Backspace), Modifiers::NONE),
            Some(Command::DeleteBackward)
        );
        assert_eq!(
            handle_key_event(EDITING, Key::Named(Named::Enter), Modifiers::NONE),
            Some(Command::TypeChar('\n'))
        );
        assert_eq!(
            handle_key_event(EDITING, Key::Named(Named::Escape), Modifiers::NONE),
            Some(Command::FinishText)
        );
        assert_eq!(
            handle_key_event(SELECT, Key::Named(Named::Escape), Modifiers::NONE),
            Some(Command::Cancel)
        );
    }

    #[test]
    fn test_zoom_keys() {
        assert_eq!(handle_key_event(SELECT, Key::Character('='), Modifiers::CTRL), Some(Command::ZoomIn));
        assert_eq!(handle_key_event(SELECT, Key::Character('-'), Modifiers::CTRL), Some(Command::ZoomOut));
        assert_eq!(handle_key_event(SELECT, Key::Character('0'), Modifiers::CTRL), Some(Command::ZoomToFit));
    }
}
