/// What a slash command does with the text after its name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ArgShape {
    None,
    /// Free text kept as typed.
    Text,
    /// One path, shell-quoted when it has spaces.
    Path,
    /// A 1-based number from a listing.
    Index,
    Stage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CommandName {
    Person,
    Garment,
    Generate,
    Garments,
    Pick,
    TryOn,
    Retry,
    Reset,
    Stage,
    History,
    Restore,
    Export,
    Status,
    Help,
    Quit,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub names: &'static [&'static str],
    pub name: CommandName,
    pub shape: ArgShape,
    pub usage: &'static str,
    pub summary: &'static str,
}

pub(crate) const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        names: &["person"],
        name: CommandName::Person,
        shape: ArgShape::Path,
        usage: "/person PATH",
        summary: "upload the person photo (step 1)",
    },
    CommandSpec {
        names: &["garment"],
        name: CommandName::Garment,
        shape: ArgShape::Path,
        usage: "/garment PATH",
        summary: "upload a garment image and select it",
    },
    CommandSpec {
        names: &["generate", "gen"],
        name: CommandName::Generate,
        shape: ArgShape::Text,
        usage: "/generate TEXT",
        summary: "generate a garment from a description (plain text works too)",
    },
    CommandSpec {
        names: &["garments"],
        name: CommandName::Garments,
        shape: ArgShape::None,
        usage: "/garments",
        summary: "list garment candidates, newest first",
    },
    CommandSpec {
        names: &["pick"],
        name: CommandName::Pick,
        shape: ArgShape::Index,
        usage: "/pick N",
        summary: "select candidate N from /garments",
    },
    CommandSpec {
        names: &["tryon", "confirm"],
        name: CommandName::TryOn,
        shape: ArgShape::None,
        usage: "/tryon",
        summary: "dress the person in the selected garment",
    },
    CommandSpec {
        names: &["retry"],
        name: CommandName::Retry,
        shape: ArgShape::None,
        usage: "/retry",
        summary: "back to garment selection, keeping everything",
    },
    CommandSpec {
        names: &["reset", "new"],
        name: CommandName::Reset,
        shape: ArgShape::None,
        usage: "/reset",
        summary: "start over with a new person; history is kept",
    },
    CommandSpec {
        names: &["stage"],
        name: CommandName::Stage,
        shape: ArgShape::Stage,
        usage: "/stage person|garment",
        summary: "jump to a wizard step",
    },
    CommandSpec {
        names: &["history"],
        name: CommandName::History,
        shape: ArgShape::None,
        usage: "/history",
        summary: "list try-on results, newest first",
    },
    CommandSpec {
        names: &["restore"],
        name: CommandName::Restore,
        shape: ArgShape::Index,
        usage: "/restore N",
        summary: "show result N from /history",
    },
    CommandSpec {
        names: &["export", "download"],
        name: CommandName::Export,
        shape: ArgShape::Path,
        usage: "/export [PATH]",
        summary: "save the current result (default try-on-result.png)",
    },
    CommandSpec {
        names: &["status"],
        name: CommandName::Status,
        shape: ArgShape::None,
        usage: "/status",
        summary: "show stage, selections and counts",
    },
    CommandSpec {
        names: &["help"],
        name: CommandName::Help,
        shape: ArgShape::None,
        usage: "/help",
        summary: "show this list",
    },
    CommandSpec {
        names: &["quit", "exit"],
        name: CommandName::Quit,
        shape: ArgShape::None,
        usage: "/quit",
        summary: "save the session summary and leave",
    },
];

pub(crate) fn find_command(command: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|entry| entry.names.contains(&command))
}

/// `(usage, summary)` rows for the chat help screen.
pub fn chat_help() -> impl Iterator<Item = (&'static str, &'static str)> {
    COMMANDS.iter().map(|entry| (entry.usage, entry.summary))
}
