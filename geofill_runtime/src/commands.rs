use crate::{EmailDomainMode, FieldName};

/// User-triggered actions understood by the profile service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileCommand {
    Show,
    /// Full regeneration; routed through the model when AI is switched on.
    Regenerate,
    /// Model-assisted regeneration regardless of the AI toggle.
    GenerateWithAi,
    RefreshField(FieldName),
    Lock(FieldName),
    Unlock(FieldName),
    ToggleLock(FieldName),
    SetField {
        field: FieldName,
        value: String,
    },
    ChangeCountry(String),
    EmailDomain {
        mode: EmailDomainMode,
        custom_domain: Option<String>,
    },
    RefreshLocation,
    Archive(ArchiveAction),
    History(HistoryAction),
    FillForm(FillMode),
    TestAi,
    Setting {
        key: String,
        value: String,
    },
    SetUseAi(bool),
    Theme(ThemeChoice),
    CopyAll,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveAction {
    Save { name: String },
    Load { index: usize },
    Delete { index: usize },
    List,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryAction {
    Load { id: i64 },
    Delete { id: i64 },
    Clear,
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMode {
    /// Model-mapped fill when AI is available, plain fill otherwise.
    Smart,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeChoice {
    Light,
    Dark,
    Toggle,
}

impl ProfileCommand {
    /// Commands that only read state and never touch the network.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            ProfileCommand::Show
                | ProfileCommand::CopyAll
                | ProfileCommand::Archive(ArchiveAction::List)
                | ProfileCommand::History(HistoryAction::List)
        )
    }
}
