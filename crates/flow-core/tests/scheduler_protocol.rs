use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};

use flow_core::{BundleContext, Element, EvaluatorRegistry, Pipeline, PipelineError, RetryScope, RunEventKind, Runner,
                RunnerConfig, RunnerKind, StepSpec, Transform, TransformEvaluator, UserCodeError};
use serde_json::json;

#[derive(Debug)]
struct Source(Vec<Element>);

impl Transform for Source {
    fn kind(&self) -> &str {
        "Source"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct SourceEvaluator(Vec<Element>);

impl TransformEvaluator for SourceEvaluator {
    fn process_element(&mut self, _element: &Element, _ctx: &mut BundleContext) -> Result<(), UserCodeError> {
        Ok(())
    }

    fn finish_bundle(&mut self, ctx: &mut BundleContext) -> Result<(), UserCodeError> {
        for value in &self.0 {
            ctx.output(value.clone());
        }
        Ok(())
    }
}

/// Falla mientras el contador compartido `name` no supere `fail_times`.
#[derive(Debug)]
struct FailFirst {
    name: &'static str,
    fail_times: usize,
}

impl Transform for FailFirst {
    fn kind(&self) -> &str {
        "FailFirst"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct FailFirstEvaluator {
    name: &'static str,
    fail_times: usize,
}

impl TransformEvaluator for FailFirstEvaluator {
    fn process_element(&mut self, element: &Element, ctx: &mut BundleContext) -> Result<(), UserCodeError> {
        let calls = ctx.shared().acquire(self.name, || AtomicUsize::new(0))?;
        if calls.fetch_add(1, Ordering::SeqCst) < self.fail_times {
            return Err(UserCodeError::new("transient"));
        }
        ctx.output(element.clone());
        Ok(())
    }
}

fn registry() -> EvaluatorRegistry {
    let mut registry = EvaluatorRegistry::new();
    registry.register("Source", |spec: &StepSpec| {
                let source = spec.transform_as::<Source>()
                                 .ok_or_else(|| PipelineError::Internal("not a Source".to_string()))?;
                Ok(Box::new(SourceEvaluator(source.0.clone())) as Box<dyn TransformEvaluator>)
            })
            .register("FailFirst", |spec: &StepSpec| {
                let t = spec.transform_as::<FailFirst>()
                            .ok_or_else(|| PipelineError::Internal("not a FailFirst".to_string()))?;
                Ok(Box::new(FailFirstEvaluator { name: t.name,
                                                 fail_times: t.fail_times }) as Box<dyn TransformEvaluator>)
            });
    registry
}

fn count(events: &[flow_core::RunEvent], code: &str) -> usize {
    events.iter().filter(|e| e.kind.code() == code).count()
}

#[test]
fn transient_failures_are_retried_and_committed_once() {
    for kind in RunnerKind::ALL {
        let mut p = Pipeline::new();
        p.apply("Src", Source(vec![json!(1), json!(2), json!(3)]), &[]).unwrap();
        p.apply("Flaky", FailFirst { name: "flaky", fail_times: 2 }, &["Src"]).unwrap();
        let runner = Runner::new(kind, registry());
        let result = runner.run(&p).unwrap();
        result.wait_until_finish().unwrap();

        let events = result.events();
        assert_eq!(events.first().map(|e| e.kind.code()), Some("I"));
        assert_eq!(events.last().map(|e| e.kind.code()), Some("F"));
        assert_eq!(count(&events, "X"), 2, "{kind}: two failed attempts");
        assert_eq!(count(&events, "D"), 2, "{kind}: both steps completed");
        let committed_flaky = events.iter()
                                    .filter(|e| matches!(&e.kind, RunEventKind::BundleCommitted { step_id, .. } if step_id == "Flaky"))
                                    .count();
        assert!(committed_flaky >= 1);
    }
}

#[test]
fn exhausted_bundle_scope_counts_whole_bundle_attempts() {
    let mut p = Pipeline::new();
    p.apply("Src", Source(vec![json!("Ann"), json!("Joe")]), &[]).unwrap();
    p.apply("Broken", FailFirst { name: "broken", fail_times: usize::MAX }, &["Src"]).unwrap();
    let config = RunnerConfig::default().with_max_attempts(3).with_retry_scope(RetryScope::Bundle);
    let result = Runner::new(RunnerKind::Sequential, registry()).with_config(config).run(&p).unwrap();
    let err = result.wait_until_finish().unwrap_err();
    match &err {
        PipelineError::UserCode { step_id, attempts, source } => {
            assert_eq!(step_id, "Broken");
            assert_eq!(*attempts, 3);
            assert_eq!(source.message, "transient");
        }
        other => panic!("unexpected error {other:?}"),
    }
    let events = result.events();
    assert_eq!(count(&events, "X"), 3);
    assert_eq!(count(&events, "R"), 2);
    assert_eq!(events.last().map(|e| e.kind.code()), Some("E"));
}

#[test]
fn unknown_transform_aborts_without_retry() {
    let mut p = Pipeline::new();
    p.apply("Src", Source(vec![json!(1)]), &[]).unwrap();
    p.apply("Mystery", FailFirst { name: "m", fail_times: 0 }, &["Src"]).unwrap();
    let mut only_source = EvaluatorRegistry::new();
    only_source.register("Source", |_spec: &StepSpec| Ok(Box::new(SourceEvaluator(vec![json!(1)])) as Box<dyn TransformEvaluator>));
    let result = Runner::new(RunnerKind::Direct, only_source).run(&p).unwrap();
    assert_eq!(result.wait_until_finish().unwrap_err(), PipelineError::UnknownTransform("FailFirst".to_string()));
    assert_eq!(count(&result.events(), "A"), 1);
}
