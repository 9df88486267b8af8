use bundleflow_rust::demo::{branch_calls, metrics_pipeline, retry_fork_pipeline, BRANCH_B_CALLS, BRANCH_C_CALLS,
                            METRICS_STEP};
use bundleflow_rust::AppError;
use flow_adapters::create_runner;
use flow_core::{MetricsFilter, Runner, RunnerConfig};

/// Demo de métricas: committed y attempted del step "Do".
fn run_metrics_demo(runner: &Runner) -> Result<(), AppError> {
    let pipeline = metrics_pipeline()?;
    let result = runner.run(&pipeline)?;
    let state = result.wait_until_finish()?;
    println!("[metrics] run {} en {} -> {:?}", result.run_id(), result.runner(), state);

    let query = result.metrics().query(&MetricsFilter::new().with_step(METRICS_STEP))?;
    println!("{}", serde_json::to_string_pretty(&query)?);
    Ok(())
}

/// Demo de reintentos: dos ramas que fallan siempre.
fn run_retry_demo(runner: &Runner) -> Result<(), AppError> {
    let pipeline = retry_fork_pipeline()?;
    let result = runner.run(&pipeline)?;
    match result.wait_until_finish() {
        Ok(state) => println!("[retry] estado inesperado: {state:?}"),
        Err(err) => println!("[retry] run falló como se esperaba: {err}"),
    }
    println!("[retry] intentos SendToB={} SendToC={}",
             branch_calls(&pipeline, BRANCH_B_CALLS)?,
             branch_calls(&pipeline, BRANCH_C_CALLS)?);
    for event in result.events() {
        println!("  #{:<3} {:<2} {}", event.seq, event.kind.code(), event.kind.step_id().unwrap_or("-"));
    }
    Ok(())
}

fn main() -> Result<(), AppError> {
    let mut args = std::env::args().skip(1);
    let runner_name = args.next().unwrap_or_else(|| "DirectRunner".to_string());
    let demo = args.next().unwrap_or_else(|| "all".to_string());

    let config = RunnerConfig::from_env()?;
    let runner = create_runner(&runner_name)?.with_config(config);
    println!("Runner: {} ({:?})", runner.kind(), runner.strategy());

    match demo.as_str() {
        "metrics" => run_metrics_demo(&runner),
        "retry" => run_retry_demo(&runner),
        "all" => {
            run_metrics_demo(&runner)?;
            run_retry_demo(&runner)
        }
        other => Err(AppError::Config(format!("demo desconocida '{other}' (metrics | retry | all)"))),
    }
}
