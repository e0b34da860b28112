#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};

use crate::code::{Snippet, flatten};
use crate::{Language, limits};

/// How the judge decides whether output is correct.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "camelCase")]
pub enum JudgeMode {
    /// Output is compared with the expected answer.
    #[default]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "classic"))]
    Classic,
    /// Output is checked by a problem-supplied checker.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "special"))]
    Special,
}

/// Limits and mode of the problem being judged, as stored on the problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProblemLimits {
    pub problem_id: i32,
    /// Milliseconds.
    pub time_limit: u64,
    /// Mebibytes.
    pub memory_limit: u64,
    pub judge_mode: JudgeMode,
}

/// Execution request for one test case, published to the judge.
///
/// The request does not name the result row it belongs to; the transport
/// message id carries that correlation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeRequest {
    pub code: String,
    pub language: Language,
    pub problem_id: i32,
    pub testcase_id: i32,
    /// Effective time limit in milliseconds.
    pub time_limit: u64,
    /// Effective memory limit in bytes.
    pub memory_limit: u64,
    pub judge_mode: JudgeMode,
    /// Input and expected output supplied by the user instead of a stored
    /// test case. `testcase_id` is then the user's own label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_testcase: Option<UserTestcase>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTestcase {
    pub input: String,
    pub output: String,
}

impl JudgeRequest {
    /// Assemble the request for one test case, stretching the problem's
    /// limits for `language`.
    pub fn build(
        code: &[Snippet],
        language: Language,
        problem: &ProblemLimits,
        testcase_id: i32,
    ) -> Self {
        Self {
            code: flatten(code),
            language,
            problem_id: problem.problem_id,
            testcase_id,
            time_limit: limits::time_limit(language, problem.time_limit),
            memory_limit: limits::memory_limit(language, problem.memory_limit),
            judge_mode: problem.judge_mode,
            user_testcase: None,
        }
    }

    pub fn with_user_testcase(mut self, testcase: UserTestcase) -> Self {
        self.user_testcase = Some(testcase);
        self
    }
}
