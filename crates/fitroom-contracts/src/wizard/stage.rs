use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStage {
    #[default]
    Person,
    Garment,
    Result,
}

impl WizardStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Garment => "garment",
            Self::Result => "result",
        }
    }

    pub fn step(self) -> u8 {
        match self {
            Self::Person => 1,
            Self::Garment => 2,
            Self::Result => 3,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "person" | "1" => Some(Self::Person),
            "garment" | "cloth" | "clothing" | "2" => Some(Self::Garment),
            "result" | "3" => Some(Self::Result),
            _ => None,
        }
    }
}

impl fmt::Display for WizardStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
