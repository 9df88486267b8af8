use bundleflow_rust::demo::{branch_calls, retry_fork_pipeline, BRANCH_B_CALLS, BRANCH_C_CALLS};
use flow_adapters::create_runner;
use flow_core::{PipelineError, PipelineResult, RetryScope, RunEventKind, RunnerConfig, RunnerKind};

fn failures_of(result: &PipelineResult, step: &str) -> usize {
    result.events()
          .iter()
          .filter(|e| matches!(&e.kind, RunEventKind::BundleFailed { step_id, .. } if step_id == step))
          .count()
}

fn assert_branch_error(err: &PipelineError) {
    let message = err.user_error().map(|e| e.message.as_str());
    assert!(matches!(message, Some("exception in f_b") | Some("exception in f_c")), "{err}");
    assert!(matches!(err, PipelineError::UserCode { attempts: 4, .. }), "{err}");
}

#[test]
fn element_scope_gives_every_element_its_own_budget() {
    for kind in RunnerKind::ALL {
        let p = retry_fork_pipeline().unwrap();
        let result = create_runner(kind.name()).unwrap().run(&p).unwrap();
        let err = result.wait_until_finish().unwrap_err();
        assert_branch_error(&err);

        // primer intento del bundle + 3 reintentos de Ann + 4 de Joe
        assert_eq!(branch_calls(&p, BRANCH_B_CALLS).unwrap(), 8, "runner {kind}");
        assert_eq!(branch_calls(&p, BRANCH_C_CALLS).unwrap(), 8, "runner {kind}");
        assert_eq!(failures_of(&result, "SendToB"), 8);
        assert_eq!(failures_of(&result, "SendToC"), 8);
    }
}

#[test]
fn bundle_scope_retries_the_whole_bundle() {
    for kind in RunnerKind::ALL {
        let p = retry_fork_pipeline().unwrap();
        let config = RunnerConfig::default().with_retry_scope(RetryScope::Bundle);
        let result = create_runner(kind.name()).unwrap().with_config(config).run(&p).unwrap();
        let err = result.wait_until_finish().unwrap_err();
        assert_branch_error(&err);

        // cada intento falla en el primer elemento
        assert_eq!(branch_calls(&p, BRANCH_B_CALLS).unwrap(), 4, "runner {kind}");
        assert_eq!(branch_calls(&p, BRANCH_C_CALLS).unwrap(), 4, "runner {kind}");
        assert_eq!(failures_of(&result, "SendToB"), 4);
    }
}

#[test]
fn failed_run_reports_terminal_event_last() {
    let p = retry_fork_pipeline().unwrap();
    let result = create_runner("SequentialRunner").unwrap().run(&p).unwrap();
    assert!(result.wait_until_finish().is_err());
    let events = result.events();
    assert!(matches!(events.first().map(|e| &e.kind), Some(RunEventKind::RunStarted { .. })));
    assert!(matches!(events.last().map(|e| &e.kind), Some(RunEventKind::RunFailed { .. })));
    assert!(!events.iter().any(|e| matches!(e.kind, RunEventKind::BundleCommitted { ref step_id, .. } if step_id == "SendToB")));
}
