pub mod judge_result;

pub use judge_result::JudgeResultHandler;
