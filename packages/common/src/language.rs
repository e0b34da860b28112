#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Languages accepted by the judge.
///
/// The wire names (`"C"`, `"Cpp"`, `"Java"`, `"Python3"`) are part of the judge
/// contract and must not change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
pub enum Language {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "C"))]
    C,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Cpp"))]
    Cpp,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Java"))]
    Java,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Python3"))]
    Python3,
}

impl Language {
    pub const ALL: &'static [Language] = &[Self::C, Self::Cpp, Self::Java, Self::Python3];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::C => "C",
            Self::Cpp => "Cpp",
            Self::Java => "Java",
            Self::Python3 => "Python3",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an unsupported language name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported language '{0}'")]
pub struct ParseLanguageError(String);

impl FromStr for Language {
    type Err = ParseLanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "C" => Ok(Self::C),
            "Cpp" => Ok(Self::Cpp),
            "Java" => Ok(Self::Java),
            "Python3" => Ok(Self::Python3),
            _ => Err(ParseLanguageError(s.to_string())),
        }
    }
}
