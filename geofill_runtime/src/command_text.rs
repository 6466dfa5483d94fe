use std::num::ParseIntError;

use thiserror::Error;

use crate::commands::{ArchiveAction, FillMode, HistoryAction, ProfileCommand, ThemeChoice};
use crate::{EmailDomainMode, FieldName, ParseFieldNameError};

#[derive(Debug, Error)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("invalid integer '{value}' for {context}: {source}")]
    InvalidInteger {
        value: String,
        context: &'static str,
        source: ParseIntError,
    },
    #[error(transparent)]
    InvalidField(#[from] ParseFieldNameError),
    #[error("invalid {context} '{value}'")]
    InvalidChoice {
        value: String,
        context: &'static str,
    },
}

pub fn parse_command_line(input: &str) -> Result<ProfileCommand, CommandParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CommandParseError::Empty);
    }

    let mut parts = trimmed.split_whitespace();
    let verb = parts
        .next()
        .map(|v| v.to_ascii_lowercase())
        .ok_or(CommandParseError::Empty)?;

    match verb.as_str() {
        "show" | "status" => Ok(ProfileCommand::Show),
        "regen" | "regenerate" | "generate" => Ok(ProfileCommand::Regenerate),
        "ai" => Ok(ProfileCommand::GenerateWithAi),
        "refresh" => {
            let field = parse_field(parts.next())?;
            Ok(ProfileCommand::RefreshField(field))
        }
        "lock" => Ok(ProfileCommand::Lock(parse_field(parts.next())?)),
        "unlock" => Ok(ProfileCommand::Unlock(parse_field(parts.next())?)),
        "toggle" => Ok(ProfileCommand::ToggleLock(parse_field(parts.next())?)),
        "set" => {
            let field = parse_field(parts.next())?;
            let value = rest(parts);
            Ok(ProfileCommand::SetField { field, value })
        }
        "country" => {
            let country = rest(parts);
            if country.is_empty() {
                return Err(CommandParseError::MissingArgument("country"));
            }
            Ok(ProfileCommand::ChangeCountry(country))
        }
        "domain" => {
            let mode_str = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("domain mode"))?;
            let mode = EmailDomainMode::from(mode_str.to_ascii_lowercase());
            let custom_domain = match mode {
                EmailDomainMode::Custom => Some(
                    parts
                        .next()
                        .ok_or(CommandParseError::MissingArgument("custom domain"))?
                        .trim_start_matches('@')
                        .to_string(),
                ),
                _ => None,
            };
            Ok(ProfileCommand::EmailDomain {
                mode,
                custom_domain,
            })
        }
        "ip" | "locate" => Ok(ProfileCommand::RefreshLocation),
        "archive" => {
            let action = parts.next().unwrap_or("list").to_ascii_lowercase();
            let action = match action.as_str() {
                "save" => {
                    let name = rest(parts);
                    if name.is_empty() {
                        return Err(CommandParseError::MissingArgument("archive name"));
                    }
                    ArchiveAction::Save { name }
                }
                "load" => ArchiveAction::Load {
                    index: parse_usize(parts.next(), "archive index")?,
                },
                "delete" | "rm" => ArchiveAction::Delete {
                    index: parse_usize(parts.next(), "archive index")?,
                },
                "list" | "ls" => ArchiveAction::List,
                other => {
                    return Err(CommandParseError::InvalidChoice {
                        value: other.to_string(),
                        context: "archive action",
                    })
                }
            };
            Ok(ProfileCommand::Archive(action))
        }
        "history" => {
            let action = parts.next().unwrap_or("list").to_ascii_lowercase();
            let action = match action.as_str() {
                "load" => HistoryAction::Load {
                    id: parse_i64(parts.next(), "history id")?,
                },
                "delete" | "rm" => HistoryAction::Delete {
                    id: parse_i64(parts.next(), "history id")?,
                },
                "clear" => HistoryAction::Clear,
                "list" | "ls" => HistoryAction::List,
                other => {
                    return Err(CommandParseError::InvalidChoice {
                        value: other.to_string(),
                        context: "history action",
                    })
                }
            };
            Ok(ProfileCommand::History(action))
        }
        "fill" => {
            let mode = parts.next().unwrap_or("smart").to_ascii_lowercase();
            let mode = match mode.as_str() {
                "smart" | "ai" | "auto" => FillMode::Smart,
                "normal" | "plain" => FillMode::Normal,
                other => {
                    return Err(CommandParseError::InvalidChoice {
                        value: other.to_string(),
                        context: "fill mode",
                    })
                }
            };
            Ok(ProfileCommand::FillForm(mode))
        }
        "test-ai" | "test_ai" => Ok(ProfileCommand::TestAi),
        "setting" => {
            let key = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("setting key"))?
                .to_string();
            let value = rest(parts);
            Ok(ProfileCommand::Setting { key, value })
        }
        "use-ai" | "use_ai" => {
            let flag = parts.next().unwrap_or("on").to_ascii_lowercase();
            let enabled = parse_switch(&flag, "use-ai switch")?;
            Ok(ProfileCommand::SetUseAi(enabled))
        }
        "theme" => {
            let choice = parts.next().unwrap_or("toggle").to_ascii_lowercase();
            let choice = match choice.as_str() {
                "light" => ThemeChoice::Light,
                "dark" => ThemeChoice::Dark,
                "toggle" => ThemeChoice::Toggle,
                other => {
                    return Err(CommandParseError::InvalidChoice {
                        value: other.to_string(),
                        context: "theme",
                    })
                }
            };
            Ok(ProfileCommand::Theme(choice))
        }
        "copy" => Ok(ProfileCommand::CopyAll),
        other => Err(CommandParseError::UnknownCommand(other.to_string())),
    }
}

fn rest<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts.collect::<Vec<_>>().join(" ")
}

fn parse_field(token: Option<&str>) -> Result<FieldName, CommandParseError> {
    let token = token.ok_or(CommandParseError::MissingArgument("field"))?;
    Ok(token.parse::<FieldName>()?)
}

fn parse_usize(token: Option<&str>, context: &'static str) -> Result<usize, CommandParseError> {
    let value = token.ok_or(CommandParseError::MissingArgument(context))?;
    value
        .parse::<usize>()
        .map_err(|source| CommandParseError::InvalidInteger {
            value: value.to_string(),
            context,
            source,
        })
}

fn parse_i64(token: Option<&str>, context: &'static str) -> Result<i64, CommandParseError> {
    let value = token.ok_or(CommandParseError::MissingArgument(context))?;
    value
        .parse::<i64>()
        .map_err(|source| CommandParseError::InvalidInteger {
            value: value.to_string(),
            context,
            source,
        })
}

/// Parse an on/off style switch.
pub fn parse_switch(token: &str, context: &'static str) -> Result<bool, CommandParseError> {
    match token.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" | "enable" => Ok(true),
        "off" | "false" | "no" | "0" | "disable" => Ok(false),
        other => Err(CommandParseError::InvalidChoice {
            value: other.to_string(),
            context,
        }),
    }
}
