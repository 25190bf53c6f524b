//! Integration tests for bookdeploy

mod test_executor;
mod test_fsm;
mod test_plan;
