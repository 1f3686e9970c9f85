use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LabelError {
    #[error("unknown class index {0}")]
    UnknownClass(i64),
}

/// Malware family predicted for one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    Adware,
    Backdoor,
    Banker,
    Benign,
    Dropper,
    FileInfector,
    NoCategory,
    #[serde(rename = "PUA")]
    Pua,
    Ransomware,
    Riskware,
    #[serde(rename = "SMS")]
    Sms,
    Scareware,
    Spy,
    Trojan,
    Zeroday,
}

/// Class index order of the model output.
pub const CATEGORIES: [Category; 15] = [
    Category::Adware,
    Category::Backdoor,
    Category::Banker,
    Category::Benign,
    Category::Dropper,
    Category::FileInfector,
    Category::NoCategory,
    Category::Pua,
    Category::Ransomware,
    Category::Riskware,
    Category::Sms,
    Category::Scareware,
    Category::Spy,
    Category::Trojan,
    Category::Zeroday,
];

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Adware => "Adware",
            Category::Backdoor => "Backdoor",
            Category::Banker => "Banker",
            Category::Benign => "Benign",
            Category::Dropper => "Dropper",
            Category::FileInfector => "FileInfector",
            Category::NoCategory => "NoCategory",
            Category::Pua => "PUA",
            Category::Ransomware => "Ransomware",
            Category::Riskware => "Riskware",
            Category::Sms => "SMS",
            Category::Scareware => "Scareware",
            Category::Spy => "Spy",
            Category::Trojan => "Trojan",
            Category::Zeroday => "Zeroday",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<i64> for Category {
    type Error = LabelError;

    fn try_from(index: i64) -> Result<Self, Self::Error> {
        usize::try_from(index)
            .ok()
            .and_then(|i| CATEGORIES.get(i).copied())
            .ok_or(LabelError::UnknownClass(index))
    }
}

pub fn label_classes(indices: &[i64]) -> Result<Vec<Category>, LabelError> {
    indices.iter().map(|&i| Category::try_from(i)).collect()
}
