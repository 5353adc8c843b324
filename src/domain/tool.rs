//! Editor tools

use serde::{Deserialize, Serialize};

/// The active editing tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Select,
    Rect,
    Ellipse,
    Line,
    Arrow,
    Text,
    Blur,
}

impl Tool {
    pub const ALL: [Tool; 7] = [
        Tool::Select,
        Tool::Rect,
        Tool::Ellipse,
        Tool::Line,
        Tool::Arrow,
        Tool::Text,
        Tool::Blur,
    ];

    /// Single-letter shortcut for this tool
    pub fn shortcut(self) -> char {
        match self {
            Tool::Select => 'v',
            Tool::Rect => 'r',
            Tool::Ellipse => 'o',
            Tool::Line => 'l',
            Tool::Arrow => 'a',
            Tool::Text => 't',
            Tool::Blur => 'b',
        }
    }

    /// Look up a tool by its shortcut letter (case-insensitive)
    pub fn from_shortcut(c: char) -> Option<Tool> {
        let c = c.to_ascii_lowercase();
        Tool::ALL.into_iter().find(|tool| tool.shortcut() == c)
    }

    /// Whether annotation objects accept pointer interaction under this tool
    pub fn objects_interactive(self) -> bool {
        self == Tool::Select
    }
}
