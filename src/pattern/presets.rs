use serde::{Deserialize, Serialize};

/// Fixed grammars for recurring Markdown shapes. A preset replaces caller-supplied pattern text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// `[[Target]]`, `[[Target#Heading]]`, `[[Target|alias]]`.
    Wikilinks,
    /// `#tag` and `#nested/tag`, preceded by start of line or whitespace.
    Tags,
    /// Any checklist item, open or done.
    Tasks,
    TasksOpen,
    TasksDone,
    /// ATX headings `#` through `######`.
    Headings,
    /// Fenced code blocks from the opening to the closing fence.
    CodeBlocks,
    /// A leading `---` delimited YAML block.
    Frontmatter,
}

impl Preset {
    pub const ALL: [Preset; 8] = [
        Preset::Wikilinks,
        Preset::Tags,
        Preset::Tasks,
        Preset::TasksOpen,
        Preset::TasksDone,
        Preset::Headings,
        Preset::CodeBlocks,
        Preset::Frontmatter,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Wikilinks => "wikilinks",
            Self::Tags => "tags",
            Self::Tasks => "tasks",
            Self::TasksOpen => "tasks_open",
            Self::TasksDone => "tasks_done",
            Self::Headings => "headings",
            Self::CodeBlocks => "code_blocks",
            Self::Frontmatter => "frontmatter",
        }
    }

    pub(super) const fn source(self) -> &'static str {
        match self {
            Self::Wikilinks => r"\[\[([^\[\]|#\n]+)(?:#[^\[\]|\n]*)?(?:\|[^\[\]\n]*)?\]\]",
            Self::Tags => r"(?:^|\s)(#[\p{L}\p{N}_][\p{L}\p{N}_/-]*)",
            Self::Tasks => r"^[ \t]*[-*+] \[[ xX]\] .*$",
            Self::TasksOpen => r"^[ \t]*[-*+] \[ \] .*$",
            Self::TasksDone => r"^[ \t]*[-*+] \[[xX]\] .*$",
            Self::Headings => r"^#{1,6}[ \t]+.+$",
            Self::CodeBlocks => r"(?s)^```[^\n]*\n.*?^```[ \t]*$",
            Self::Frontmatter => r"\A---[ \t]*\r?\n(?s:.*?)\r?\n---[ \t]*(?:\r?\n|\z)",
        }
    }

    /// Capture group reported as the match.
    pub(super) const fn group(self) -> usize {
        match self {
            Self::Tags => 1,
            _ => 0,
        }
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
