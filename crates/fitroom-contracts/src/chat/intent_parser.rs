use std::path::PathBuf;

use super::command_registry::{find_command, ArgShape, CommandName};
use crate::wizard::WizardStage;

/// One line of chat input, parsed.
///
/// Arguments that failed to parse are `None` so the caller can print the
/// command's usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Noop,
    SelectPerson { path: Option<PathBuf> },
    UploadGarment { path: Option<PathBuf> },
    GenerateGarment { prompt: String },
    ListGarments,
    /// 0-based; typed as 1-based.
    PickGarment { index: Option<usize> },
    ConfirmGarment,
    RetryGarment,
    Reset,
    Navigate { stage: Option<WizardStage> },
    ListHistory,
    /// 0-based; typed as 1-based.
    RestoreHistory { index: Option<usize> },
    Export { path: Option<PathBuf> },
    Status,
    Help,
    Quit,
    Unknown { command: String },
}

enum Arg {
    None,
    Text(String),
    Path(Option<PathBuf>),
    Index(Option<usize>),
    Stage(Option<WizardStage>),
}

pub fn parse_intent(text: &str) -> Intent {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Intent::Noop;
    }

    let Some(tail) = trimmed.strip_prefix('/') else {
        return Intent::GenerateGarment {
            prompt: trimmed.to_string(),
        };
    };
    let command_len = tail
        .chars()
        .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        .count();
    if command_len == 0 {
        // "/ something" or "//": treat the whole line as a description.
        return Intent::GenerateGarment {
            prompt: trimmed.to_string(),
        };
    }
    let command = tail[..command_len].to_ascii_lowercase();
    let rest = tail[command_len..].trim();

    let Some(entry) = find_command(&command) else {
        return Intent::Unknown { command };
    };
    let arg = match entry.shape {
        ArgShape::None => Arg::None,
        ArgShape::Text => Arg::Text(rest.to_string()),
        ArgShape::Path => Arg::Path(parse_path(rest)),
        ArgShape::Index => Arg::Index(parse_display_index(rest)),
        ArgShape::Stage => Arg::Stage(WizardStage::parse(rest)),
    };

    match (entry.name, arg) {
        (CommandName::Person, Arg::Path(path)) => Intent::SelectPerson { path },
        (CommandName::Garment, Arg::Path(path)) => Intent::UploadGarment { path },
        (CommandName::Export, Arg::Path(path)) => Intent::Export { path },
        (CommandName::Generate, Arg::Text(prompt)) => Intent::GenerateGarment { prompt },
        (CommandName::Pick, Arg::Index(index)) => Intent::PickGarment { index },
        (CommandName::Restore, Arg::Index(index)) => Intent::RestoreHistory { index },
        (CommandName::Stage, Arg::Stage(stage)) => Intent::Navigate { stage },
        (CommandName::Garments, _) => Intent::ListGarments,
        (CommandName::TryOn, _) => Intent::ConfirmGarment,
        (CommandName::Retry, _) => Intent::RetryGarment,
        (CommandName::Reset, _) => Intent::Reset,
        (CommandName::History, _) => Intent::ListHistory,
        (CommandName::Status, _) => Intent::Status,
        (CommandName::Help, _) => Intent::Help,
        (CommandName::Quit, _) => Intent::Quit,
        (_, _) => Intent::Unknown { command },
    }
}

/// A single path; quoting keeps spaces, several bare words are rejoined.
fn parse_path(arg: &str) -> Option<PathBuf> {
    if arg.is_empty() {
        return None;
    }
    let words = shell_words::split(arg).unwrap_or_else(|_| {
        arg.split_whitespace().map(str::to_string).collect()
    });
    let joined = words
        .into_iter()
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!joined.is_empty()).then(|| PathBuf::from(joined))
}

fn parse_display_index(arg: &str) -> Option<usize> {
    arg.parse::<usize>()
        .ok()
        .and_then(|value| value.checked_sub(1))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{parse_intent, Intent};
    use crate::wizard::WizardStage;

    #[test]
    fn bare_text_is_a_garment_prompt() {
        assert_eq!(
            parse_intent("  red silk gown "),
            Intent::GenerateGarment {
                prompt: "red silk gown".to_string()
            }
        );
        assert_eq!(
            parse_intent("/generate   denim jacket, cropped"),
            Intent::GenerateGarment {
                prompt: "denim jacket, cropped".to_string()
            }
        );
    }

    #[test]
    fn generate_without_text_keeps_blank_prompt() {
        assert_eq!(
            parse_intent("/generate"),
            Intent::GenerateGarment {
                prompt: String::new()
            }
        );
    }

    #[test]
    fn blank_line_is_noop() {
        assert_eq!(parse_intent("   "), Intent::Noop);
        assert_eq!(parse_intent(""), Intent::Noop);
    }

    #[test]
    fn paths_are_shell_split() {
        assert_eq!(
            parse_intent("/person \"/tmp/my photos/me.jpg\""),
            Intent::SelectPerson {
                path: Some(PathBuf::from("/tmp/my photos/me.jpg"))
            }
        );
        assert_eq!(
            parse_intent("/garment shirt.png"),
            Intent::UploadGarment {
                path: Some(PathBuf::from("shirt.png"))
            }
        );
        assert_eq!(
            parse_intent("/person"),
            Intent::SelectPerson { path: None }
        );
    }

    #[test]
    fn export_path_is_optional() {
        assert_eq!(parse_intent("/export"), Intent::Export { path: None });
        assert_eq!(
            parse_intent("/download looks/final.png"),
            Intent::Export {
                path: Some(PathBuf::from("looks/final.png"))
            }
        );
    }

    #[test]
    fn indexes_are_one_based_on_input() {
        assert_eq!(
            parse_intent("/pick 2"),
            Intent::PickGarment { index: Some(1) }
        );
        assert_eq!(
            parse_intent("/restore 0"),
            Intent::RestoreHistory { index: None }
        );
        assert_eq!(
            parse_intent("/pick two"),
            Intent::PickGarment { index: None }
        );
    }

    #[test]
    fn stage_argument_is_parsed() {
        assert_eq!(
            parse_intent("/stage garment"),
            Intent::Navigate {
                stage: Some(WizardStage::Garment)
            }
        );
        assert_eq!(
            parse_intent("/stage attic"),
            Intent::Navigate { stage: None }
        );
    }

    #[test]
    fn aliases_and_case() {
        assert_eq!(parse_intent("/tryon"), Intent::ConfirmGarment);
        assert_eq!(parse_intent("/confirm"), Intent::ConfirmGarment);
        assert_eq!(parse_intent("/new"), Intent::Reset);
        assert_eq!(parse_intent("/exit"), Intent::Quit);
        assert_eq!(parse_intent("/RETRY"), Intent::RetryGarment);
    }

    #[test]
    fn unknown_command_keeps_its_name() {
        assert_eq!(
            parse_intent("/magic foo bar"),
            Intent::Unknown {
                command: "magic".to_string()
            }
        );
    }
}
