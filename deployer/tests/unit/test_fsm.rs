//! FSM unit tests

use bookdeploy::deploy::fsm::{RunEvent, RunFsm, RunState};

#[test]
fn test_fsm_initial_state() {
    let fsm = RunFsm::new();
    assert_eq!(fsm.state(), RunState::Pending);
    assert!(fsm.error().is_none());
    assert!(fsm.completed_steps().is_empty());
}

#[test]
fn test_fsm_success_flow() {
    let mut fsm = RunFsm::new();

    // Pending -> Running
    fsm.process(RunEvent::Start).unwrap();
    assert_eq!(fsm.state(), RunState::Running);

    fsm.process(RunEvent::StepCompleted("build".to_string())).unwrap();
    assert_eq!(fsm.state(), RunState::Running);

    // Running -> Succeeded
    fsm.process(RunEvent::Finish).unwrap();
    assert_eq!(fsm.state(), RunState::Succeeded);
}

#[test]
fn test_fsm_failure_is_terminal() {
    let mut fsm = RunFsm::new();

    fsm.process(RunEvent::Start).unwrap();
    fsm.process(RunEvent::StepFailed {
        step: "login".to_string(),
        error: "exit status 1".to_string(),
    })
    .unwrap();
    assert_eq!(fsm.state(), RunState::Failed);

    // No further steps or completion after a failure
    assert!(fsm.process(RunEvent::StepCompleted("tag".to_string())).is_err());
    assert!(fsm.process(RunEvent::Finish).is_err());
    assert!(fsm.process(RunEvent::Start).is_err());
}

#[test]
fn test_fsm_reset_clears_failure() {
    let mut fsm = RunFsm::new();

    fsm.process(RunEvent::Start).unwrap();
    fsm.process(RunEvent::StepFailed {
        step: "push".to_string(),
        error: "denied".to_string(),
    })
    .unwrap();
    fsm.process(RunEvent::Reset).unwrap();

    assert_eq!(fsm.state(), RunState::Pending);
    assert!(fsm.failed_step().is_none());
    assert!(fsm.error().is_none());
}

#[test]
fn test_fsm_invalid_transition() {
    let mut fsm = RunFsm::new();

    // Cannot finish before starting
    let result = fsm.process(RunEvent::Finish);
    assert!(result.is_err());

    // Cannot reset a run in progress
    fsm.process(RunEvent::Start).unwrap();
    assert!(fsm.process(RunEvent::Reset).is_err());
}
