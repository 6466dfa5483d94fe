use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Profile;

/// Field id to fill value, as produced by the model for smart fills.
pub type SmartFillMapping = Map<String, Value>;

/// Messages sent to the page-side collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PageMessage {
    ScanForm,
    FillForm { data: Profile },
    FillFormSmart { data: SmartFillMapping },
    InjectScripts { files: Vec<String> },
}

impl PageMessage {
    pub fn action(&self) -> &'static str {
        match self {
            PageMessage::ScanForm => "scanForm",
            PageMessage::FillForm { .. } => "fillForm",
            PageMessage::FillFormSmart { .. } => "fillFormSmart",
            PageMessage::InjectScripts { .. } => "injectScripts",
        }
    }
}

/// One visible input discovered by a form scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormField {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub name: String,
    pub label: String,
    pub required: bool,
    pub placeholder: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageContext {
    pub title: String,
    pub description: String,
    pub url: String,
    pub language: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormScanResult {
    pub fields: Vec<FormField>,
    pub page_context: PageContext,
}

impl FormScanResult {
    pub fn field(&self, id: &str) -> Option<&FormField> {
        self.fields.iter().find(|field| field.id == id)
    }
}
