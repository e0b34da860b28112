pub mod contest;
pub mod contest_problem;
pub mod problem;
pub mod problem_testcase;
pub mod submission;
pub mod submission_result;
pub mod test_run_result;
