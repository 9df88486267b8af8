use bundleflow_rust::demo::{metrics_pipeline, METRICS_NAMESPACE, METRICS_STEP};
use flow_adapters::testing::{collected, collected_sorted, Collect};
use flow_adapters::{create_runner, Count, Create, Impulse, ParDo};
use flow_core::{MetricResult, MetricsFilter, Pipeline, PipelineError, PipelineState, RunnerKind};
use serde_json::json;

fn by_name<'a, T>(results: &'a [MetricResult<T>], name: &str) -> &'a MetricResult<T> {
    results.iter()
           .find(|r| r.key.metric.name == name && r.key.metric.namespace == METRICS_NAMESPACE)
           .unwrap_or_else(|| panic!("metric '{name}' not reported"))
}

#[test]
fn committed_and_attempted_metrics_agree_without_failures() {
    for kind in RunnerKind::ALL {
        let p = metrics_pipeline().unwrap();
        let result = create_runner(kind.name()).unwrap().run(&p).unwrap();
        assert_eq!(result.wait_until_finish().unwrap(), PipelineState::Succeeded);
        assert_eq!(collected_sorted(&result, "Out").unwrap(),
                   vec![json!(1), json!(2), json!(3), json!(4), json!(5)]);

        let metrics = result.metrics().query(&MetricsFilter::new().with_step(METRICS_STEP)).unwrap();

        for (name, expected) in [("elements", 5), ("bundles", 1), ("finished_bundles", 1)] {
            let counter = by_name(&metrics.counters, name);
            assert_eq!(counter.committed, expected, "{name} on {kind}");
            assert_eq!(counter.attempted, expected, "{name} on {kind}");
            assert_eq!(counter.key.step, METRICS_STEP);
        }

        let dist = by_name(&metrics.distributions, "element_dist");
        assert_eq!((dist.committed.sum, dist.committed.count, dist.committed.min, dist.committed.max), (15, 5, 1, 5));
        assert_eq!(dist.committed, dist.attempted);
        assert_eq!(dist.committed.mean(), Some(3.0));

        let gauge = by_name(&metrics.gauges, "latest_element");
        assert_eq!(gauge.committed.value, 5);
        assert_eq!(gauge.attempted.value, 5);

        let set = by_name(&metrics.string_sets, "element_str_set");
        assert_eq!(set.committed.len(), 4);
        assert!(set.committed.contains("0"));
        assert_eq!(set.committed, set.attempted);

        let trie = by_name(&metrics.bounded_tries, "element_bounded_trie");
        assert_eq!(trie.committed.size(), 4);
        assert!(trie.committed.contains(&["a", "b", "3"]));
        assert_eq!(trie.attempted.size(), 4);
    }
}

#[test]
fn step_filter_excludes_other_steps() {
    let p = metrics_pipeline().unwrap();
    let result = create_runner("DirectRunner").unwrap().run(&p).unwrap();
    result.wait_until_finish().unwrap();
    assert!(result.metrics().query(&MetricsFilter::new().with_step("Out")).unwrap().is_empty());
    assert!(result.metrics().query(&MetricsFilter::new().with_step("D")).unwrap().is_empty());
    let by_namespace = result.metrics().query(&MetricsFilter::new().with_namespace(METRICS_NAMESPACE)).unwrap();
    assert_eq!(by_namespace.counters.len(), 3);
}

#[test]
fn create_runner_accepts_known_names_only() {
    for name in ["DirectRunner", "BundleBasedDirectRunner", "TestDirectRunner", "SequentialRunner"] {
        assert_eq!(create_runner(name).unwrap().kind().name(), name);
    }
    assert_eq!(create_runner("direct").unwrap().kind(), RunnerKind::Direct);
    assert!(matches!(create_runner("FooRunner"), Err(PipelineError::UnknownRunner(_))));
}

#[test]
fn impulse_feeds_a_flat_map() {
    let mut p = Pipeline::new();
    p.apply("Impulse", Impulse, &[]).unwrap();
    p.apply("Split", ParDo::flat_map(|_| Ok(vec![json!("a"), json!("b")])), &["Impulse"]).unwrap();
    p.apply("Out", Collect, &["Split"]).unwrap();
    let result = create_runner("TestDirectRunner").unwrap().run(&p).unwrap();
    // TestDirectRunner ya esperó dentro de run
    assert_eq!(result.state(), PipelineState::Succeeded);
    assert_eq!(collected_sorted(&result, "Out").unwrap(), vec![json!("a"), json!("b")]);
}

#[test]
fn count_of_a_single_empty_list_is_one() {
    let mut p = Pipeline::new();
    p.apply("Create", Create::of(vec![json!([])]), &[]).unwrap();
    p.apply("Count", Count::globally(), &["Create"]).unwrap();
    p.apply("Out", Collect, &["Count"]).unwrap();
    let result = create_runner("DirectRunner").unwrap().run(&p).unwrap();
    result.wait_until_finish().unwrap();
    assert_eq!(collected(&result, "Out").unwrap(), vec![json!(1)]);
}
