//! Command handlers for the Cadence CLI

use std::sync::Arc;
use std::time::Duration;

use cadence_core::{FetchError, RetainPolicy, TimerService, TokioTimerService};
use cadence_harness::{MockSource, Scripted};
use cadence_runtime::{
    AsyncResource, CallOutcome, Debounced, FetchSnapshot, FetchState, IntervalRunner, Throttled,
};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::error::Result;
use crate::report::{Recorder, Report};
use crate::scenario::{parse_steps, InputStep, RequestStep};

/// Command dispatcher for handling CLI commands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a CLI command
    pub async fn execute(cli: Cli, config: AppConfig) -> Result<()> {
        let json = cli.json || config.output.json;
        let report = match cli.command {
            Commands::Debounce {
                initial,
                delay_ms,
                inputs,
            } => Self::handle_debounce_command(&config, initial, delay_ms, &inputs).await?,
            Commands::Throttle { delay_ms, calls } => {
                Self::handle_throttle_command(&config, delay_ms, &calls).await?
            }
            Commands::Interval {
                period_ms,
                run_ms,
                swap_at_ms,
            } => Self::handle_interval_command(&config, period_ms, run_ms, swap_at_ms).await?,
            Commands::Fetch {
                requests,
                fail,
                refetch_after_ms,
                keep_previous,
            } => {
                Self::handle_fetch_command(&config, &requests, &fail, refetch_after_ms, keep_previous)
                    .await?
            }
            Commands::Config => {
                print!("{}", config.to_toml()?);
                return Ok(());
            }
        };

        print!("{}", report.render(json)?);
        Ok(())
    }

    fn timer_service() -> Result<Arc<dyn TimerService>> {
        Ok(Arc::new(TokioTimerService::new()?))
    }

    fn settle_margin(config: &AppConfig) -> Duration {
        Duration::from_millis(config.output.settle_margin_ms)
    }

    /// Handle the debounce scenario
    async fn handle_debounce_command(
        config: &AppConfig,
        initial: String,
        delay_ms: Option<u64>,
        inputs: &[String],
    ) -> Result<Report> {
        let steps: Vec<InputStep> = parse_steps(inputs)?;
        let delay = delay_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| config.cadence.pacing.debounce_delay());
        info!("Running debounce scenario with {:?} quiet period", delay);

        let timer = Self::timer_service()?;
        let recorder = Recorder::new(Arc::clone(&timer));
        let debounced = Debounced::new(initial.clone(), delay, timer);
        recorder.record("published", initial);

        let mut published = debounced.subscribe();
        let watcher = {
            let recorder = recorder.clone();
            tokio::spawn(async move {
                while published.changed().await.is_ok() {
                    let value = published.borrow_and_update().clone();
                    recorder.record("published", value);
                }
            })
        };

        for step in steps {
            sleep(step.gap).await;
            let shown = debounced.observe(step.value.clone());
            recorder.record("input", format!("{} (showing {})", step.value, shown));
        }
        sleep(delay + Self::settle_margin(config)).await;

        let current = debounced.current();
        drop(debounced);
        if let Err(e) = watcher.await {
            warn!("Report watcher task ended abnormally: {}", e);
        }

        Ok(recorder.finish("debounce").with_summary("final", current))
    }

    /// Handle the throttle scenario
    async fn handle_throttle_command(
        config: &AppConfig,
        delay_ms: Option<u64>,
        calls: &[String],
    ) -> Result<Report> {
        let steps: Vec<InputStep> = parse_steps(calls)?;
        let delay = delay_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| config.cadence.pacing.throttle_delay());
        info!("Running throttle scenario with {:?} cooldown", delay);

        let timer = Self::timer_service()?;
        let recorder = Recorder::new(Arc::clone(&timer));
        let throttled = {
            let recorder = recorder.clone();
            Throttled::new(
                move |arg: String| recorder.record("invoked", arg),
                delay,
                timer,
            )
        };

        for step in steps {
            sleep(step.gap).await;
            let outcome = match throttled.call(step.value.clone()) {
                CallOutcome::Invoked => "invoked now".to_string(),
                CallOutcome::Scheduled { after } => format!("trailing in {:?}", after),
                CallOutcome::Coalesced => "coalesced".to_string(),
                CallOutcome::Ignored => "ignored".to_string(),
            };
            recorder.record("call", format!("{} ({})", step.value, outcome));
        }
        sleep(delay + Self::settle_margin(config)).await;

        let invocations = throttled.invocations();
        Ok(recorder
            .finish("throttle")
            .with_summary("invocations", invocations))
    }

    /// Handle the interval scenario
    async fn handle_interval_command(
        config: &AppConfig,
        period_ms: Option<u64>,
        run_ms: u64,
        swap_at_ms: Option<u64>,
    ) -> Result<Report> {
        let period = match period_ms {
            Some(ms) => Some(Duration::from_millis(ms)),
            None => config.cadence.interval.period(),
        };
        info!("Running interval scenario with period {:?}", period);

        let timer = Self::timer_service()?;
        let recorder = Recorder::new(Arc::clone(&timer));
        let tick = |label: &'static str| {
            let recorder = recorder.clone();
            move || recorder.record("tick", label)
        };

        let runner = IntervalRunner::new(tick("first"), period, timer)?;
        let run = Duration::from_millis(run_ms);

        match swap_at_ms.map(Duration::from_millis) {
            Some(swap_at) if swap_at < run => {
                sleep(swap_at).await;
                runner.observe(tick("second"), period)?;
                recorder.record("swap", "callback replaced");
                sleep(run - swap_at).await;
            }
            _ => sleep(run).await,
        }

        let fired = runner.fire_count();
        runner.detach();
        Ok(recorder.finish("interval").with_summary("fired", fired))
    }

    /// Handle the fetch scenario
    async fn handle_fetch_command(
        config: &AppConfig,
        requests: &[String],
        fail: &[String],
        refetch_after_ms: Option<u64>,
        keep_previous: bool,
    ) -> Result<Report> {
        let steps: Vec<RequestStep> = parse_steps(requests)?;
        let mut fetch_config = config.cadence.fetch.clone();
        if keep_previous {
            fetch_config.retain = RetainPolicy::KeepPrevious;
        }
        info!("Running fetch scenario with {:?} retention", fetch_config.retain);

        let source = MockSource::new();
        for step in &steps {
            let outcome = if fail.contains(&step.resource) {
                Scripted::err(
                    FetchError::transport(format!("{} unreachable", step.resource)),
                    step.latency_ms,
                )
            } else {
                Scripted::ok(format!("payload of {}", step.resource), step.latency_ms)
            };
            source.push(step.resource.clone(), outcome);
        }
        let source = Arc::new(source);

        let timer = Self::timer_service()?;
        let recorder = Recorder::new(timer);
        let resource = AsyncResource::new(Arc::clone(&source), fetch_config)?;

        let mut snapshots = resource.subscribe();
        let watcher = {
            let recorder = recorder.clone();
            tokio::spawn(async move {
                while snapshots.changed().await.is_ok() {
                    let snapshot = snapshots.borrow_and_update().clone();
                    recorder.record("state", describe(&snapshot));
                    if snapshot.detached {
                        break;
                    }
                }
            })
        };

        for step in steps {
            sleep(step.gap).await;
            debug!("Observing {}", step.resource);
            resource.observe(step.resource);
        }

        if let Some(after) = refetch_after_ms {
            sleep(Duration::from_millis(after)).await;
            let epoch = resource.refetch()?;
            recorder.record("refetch", epoch.to_string());
        }

        let settled = resource.settled().await;
        sleep(Self::settle_margin(config)).await;
        resource.detach();
        if let Err(e) = watcher.await {
            warn!("Report watcher task ended abnormally: {}", e);
        }

        Ok(recorder
            .finish("fetch")
            .with_summary("final", describe(&settled))
            .with_summary("requests", source.started()))
    }
}

fn describe(snapshot: &FetchSnapshot<String>) -> String {
    let state = match &snapshot.state {
        FetchState::Idle => "idle".to_string(),
        FetchState::Loading { stale: Some(stale) } => format!("loading (showing {})", stale),
        FetchState::Loading { stale: None } => "loading".to_string(),
        FetchState::Succeeded(data) => format!("succeeded: {}", data),
        FetchState::Failed(error) => format!("failed: {}", error),
    };
    if snapshot.detached {
        format!("{} [{}, detached]", state, snapshot.epoch)
    } else {
        format!("{} [{}]", state, snapshot.epoch)
    }
}
