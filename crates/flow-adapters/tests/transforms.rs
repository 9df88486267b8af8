use flow_adapters::testing::{collected, collected_sorted, Collect};
use flow_adapters::{create_runner, Count, Create, Flatten, GroupByKey, Impulse, ParDo};
use flow_core::{Pipeline, RunnerConfig, RunnerKind, UserCodeError};
use serde_json::json;

#[test]
fn group_by_key_groups_committed_values_for_every_runner() {
    for kind in RunnerKind::ALL {
        let mut p = Pipeline::new();
        p.apply("Create", Create::of(vec![json!(["a", 1]), json!(["b", 2]), json!(["a", 3]), json!(["a", 1])]), &[])
         .unwrap();
        p.apply("Group", GroupByKey, &["Create"]).unwrap();
        p.apply("Out", Collect, &["Group"]).unwrap();

        // bundles de un elemento: varios commits concurrentes sobre la misma key
        let runner = create_runner(kind.name()).unwrap()
                                               .with_config(RunnerConfig::default().with_max_bundle_size(1));
        let result = runner.run(&p).unwrap();
        result.wait_until_finish().unwrap();

        let mut groups = collected_sorted(&result, "Out").unwrap();
        for group in groups.iter_mut() {
            if let Some(values) = group[1].as_array_mut() {
                values.sort_by_key(|v| v.as_i64());
            }
        }
        assert_eq!(groups, vec![json!(["a", [1, 1, 3]]), json!(["b", [2]])], "runner {kind}");
        assert_eq!(result.committed_keys("Group").unwrap().len(), 2);
    }
}

#[test]
fn malformed_pairs_fail_the_run() {
    let mut p = Pipeline::new();
    p.apply("Create", Create::of(vec![json!("not a pair")]), &[]).unwrap();
    p.apply("Group", GroupByKey, &["Create"]).unwrap();
    let result = create_runner("SequentialRunner").unwrap().run(&p).unwrap();
    let err = result.wait_until_finish().unwrap_err();
    assert!(err.to_string().contains("GroupByKey expects [key, value] pairs"), "{err}");
}

#[test]
fn flatten_and_count_merge_branches() {
    let mut p = Pipeline::new();
    p.apply("Left", Create::of(1..=3), &[]).unwrap();
    p.apply("Right", Create::of(10..=11), &[]).unwrap();
    p.apply("Both", Flatten, &["Left", "Right"]).unwrap();
    p.apply("Count", Count::globally(), &["Both"]).unwrap();
    p.apply("All", Collect, &["Both"]).unwrap();
    p.apply("Total", Collect, &["Count"]).unwrap();

    let result = create_runner("DirectRunner").unwrap().run(&p).unwrap();
    result.wait_until_finish().unwrap();
    assert_eq!(collected(&result, "Total").unwrap(), vec![json!(5)]);
    assert_eq!(collected_sorted(&result, "All").unwrap(),
               vec![json!(1), json!(10), json!(11), json!(2), json!(3)]);
}

#[test]
fn count_of_empty_input_is_zero() {
    let mut p = Pipeline::new();
    p.apply("Nothing", Create::of(Vec::<i64>::new()), &[]).unwrap();
    p.apply("Count", Count::globally(), &["Nothing"]).unwrap();
    p.apply("Total", Collect, &["Count"]).unwrap();
    let result = create_runner("TestDirectRunner").unwrap().run(&p).unwrap();
    assert_eq!(collected(&result, "Total").unwrap(), vec![json!(0)]);
}

#[test]
fn impulse_feeds_flat_map() {
    let mut p = Pipeline::new();
    p.apply("Impulse", Impulse, &[]).unwrap();
    p.apply("Explode",
            ParDo::flat_map(|e| {
                if e != &json!("") {
                    return Err(UserCodeError::new("impulse must emit an empty element"));
                }
                Ok(vec![json!("x"), json!("y")])
            }),
            &["Impulse"])
     .unwrap();
    p.apply("Upper",
            ParDo::map(|e| Ok(json!(e.as_str().unwrap_or_default().to_uppercase()))),
            &["Explode"])
     .unwrap();
    p.apply("Out", Collect, &["Upper"]).unwrap();
    let result = create_runner("SequentialRunner").unwrap().run(&p).unwrap();
    result.wait_until_finish().unwrap();
    assert_eq!(collected(&result, "Out").unwrap(), vec![json!("X"), json!("Y")]);
}
