#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a single test case result, and the derived status of a submission.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
pub enum ResultStatus {
    /// Dispatched, waiting for the judge.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Judging"))]
    Judging,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Accepted"))]
    Accepted,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "WrongAnswer"))]
    WrongAnswer,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "TimeLimitExceeded"))]
    TimeLimitExceeded,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "MemoryLimitExceeded"))]
    MemoryLimitExceeded,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "RuntimeError"))]
    RuntimeError,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "CompileError"))]
    CompileError,
    /// Judge-side failure, or a result code this server does not know.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "ServerError"))]
    ServerError,
}

impl ResultStatus {
    /// Translate the judge's numeric result code.
    ///
    /// Codes 2 and 3 are the judge's CPU-time and wall-time signals; both surface
    /// as `TimeLimitExceeded`.
    pub fn from_result_code(code: i64) -> Self {
        match code {
            0 => Self::Accepted,
            1 => Self::WrongAnswer,
            2 | 3 => Self::TimeLimitExceeded,
            4 => Self::MemoryLimitExceeded,
            5 => Self::RuntimeError,
            6 => Self::CompileError,
            _ => Self::ServerError,
        }
    }

    /// Returns true once the judge has reported on this test case.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Judging)
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// All possible status values.
    pub const ALL: &'static [ResultStatus] = &[
        Self::Judging,
        Self::Accepted,
        Self::WrongAnswer,
        Self::TimeLimitExceeded,
        Self::MemoryLimitExceeded,
        Self::RuntimeError,
        Self::CompileError,
        Self::ServerError,
    ];

    /// Returns the string representation (PascalCase).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Judging => "Judging",
            Self::Accepted => "Accepted",
            Self::WrongAnswer => "WrongAnswer",
            Self::TimeLimitExceeded => "TimeLimitExceeded",
            Self::MemoryLimitExceeded => "MemoryLimitExceeded",
            Self::RuntimeError => "RuntimeError",
            Self::CompileError => "CompileError",
            Self::ServerError => "ServerError",
        }
    }
}

/// Status of a whole submission, derived from its test case results.
///
/// `statuses` must be in test case order: when several cases failed, the
/// earliest failure is reported. A submission without any test case counts
/// as accepted.
pub fn aggregate<I>(statuses: I) -> ResultStatus
where
    I: IntoIterator<Item = ResultStatus>,
{
    let mut first_failure = None;
    for status in statuses {
        if status == ResultStatus::Judging {
            return ResultStatus::Judging;
        }
        if !status.is_accepted() && first_failure.is_none() {
            first_failure = Some(status);
        }
    }
    first_failure.unwrap_or(ResultStatus::Accepted)
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for ResultStatus {
    fn default() -> Self {
        Self::Judging
    }
}

/// Error when parsing an invalid status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    invalid: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid status '{}'. Valid values: {}",
            self.invalid,
            ResultStatus::ALL
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for ResultStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResultStatus::ALL
            .iter()
            .find(|status| status.as_str() == s)
            .copied()
            .ok_or_else(|| ParseStatusError {
                invalid: s.to_string(),
            })
    }
}
