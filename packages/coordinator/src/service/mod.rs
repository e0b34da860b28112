pub mod submission;
pub mod test_run;

pub use submission::{
    CreateSubmission, SubmissionDetail, SubmissionService, SubmissionSummary, UserTestcaseInput,
};
pub use test_run::RunKey;
