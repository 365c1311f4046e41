use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The languages a learner can practise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    Finnish,
    German,
    #[default]
    Japanese,
    Swedish,
    Korean,
    English,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::Finnish,
        Language::German,
        Language::Japanese,
        Language::Swedish,
        Language::Korean,
        Language::English,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Language::Finnish => "Finnish",
            Language::German => "German",
            Language::Japanese => "Japanese",
            Language::Swedish => "Swedish",
            Language::Korean => "Korean",
            Language::English => "English",
        }
    }

    /// BCP-47 tag handed to speech engines.
    pub fn locale(self) -> &'static str {
        match self {
            Language::Finnish => "fi-FI",
            Language::German => "de-DE",
            Language::Japanese => "ja-JP",
            Language::Swedish => "sv-SE",
            Language::Korean => "ko-KR",
            Language::English => "en-US",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown language: {0}")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Language::ALL
            .into_iter()
            .find(|lang| lang.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownLanguage(wanted.to_string()))
    }
}
