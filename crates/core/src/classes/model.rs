//! Class selection domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Grade bands offered by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassLevel {
    #[serde(rename = "class-6")]
    Class6,
    #[serde(rename = "class-7")]
    Class7,
    #[serde(rename = "class-8")]
    Class8,
    #[serde(rename = "class-9")]
    Class9,
    #[serde(rename = "class-10")]
    Class10,
    #[serde(rename = "class-11")]
    Class11,
    #[serde(rename = "class-12")]
    Class12,
}

impl ClassLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Class6 => "class-6",
            Self::Class7 => "class-7",
            Self::Class8 => "class-8",
            Self::Class9 => "class-9",
            Self::Class10 => "class-10",
            Self::Class11 => "class-11",
            Self::Class12 => "class-12",
        }
    }
}

impl std::fmt::Display for ClassLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Locally persisted class selection. `synced` flips true only after the
/// backend acknowledged the selection; a false entry is a retry candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSelection {
    pub class_id: ClassLevel,
    pub selected_at: DateTime<Utc>,
    pub synced: bool,
}
