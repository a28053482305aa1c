use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::HarnessConfig;
use crate::error::{RpcClientError, SpawnError};
use crate::rpc::RpcClient;
use crate::supervisor::{await_ready, kill_all, ManagedProcess};

/// One scripted call through the proxy plus a shape check on its result.
pub struct Scenario {
    pub name: &'static str,
    pub method: &'static str,
    pub params: Vec<Value>,
    pub check: fn(&Value) -> std::result::Result<(), String>,
}

#[derive(Debug)]
pub struct ScenarioOutcome {
    pub name: String,
    pub method: String,
    pub outcome: std::result::Result<Value, String>,
}

#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<ScenarioOutcome>,
    pub cleanup_failures: Vec<String>,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(|o| o.outcome.is_ok())
    }
}

/// The scripted scenario set: one positive-path call per stub dispatch arm.
pub fn default_scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "hello is forwarded and echoed",
            method: "hello",
            params: vec![json!("China")],
            check: |result| {
                let text = result.to_string();
                if text.contains("China") {
                    Ok(())
                } else {
                    Err(format!("result {} does not echo the argument", text))
                }
            },
        },
        Scenario {
            name: "random result stays in range",
            method: "random",
            params: vec![json!("123")],
            check: |result| {
                let drawn = match result {
                    Value::String(s) => s
                        .trim()
                        .parse::<i64>()
                        .map_err(|e| format!("result {} is not an integer: {}", result, e))?,
                    Value::Number(n) => n
                        .as_i64()
                        .ok_or_else(|| format!("result {} is not an integer", result))?,
                    other => return Err(format!("result {} is not an integer", other)),
                };
                if (0..=10000).contains(&drawn) {
                    Ok(())
                } else {
                    Err(format!("{} outside 0..=10000", drawn))
                }
            },
        },
    ]
}

/// Run the whole harness: fleet up, proxy up, scenarios through the proxy,
/// teardown in reverse order on every exit path. Scenario failures land in
/// the report; only a process that cannot be started (or a config that
/// cannot be used) aborts the run, and only after best-effort cleanup of
/// whatever did start.
pub async fn run(config: &HarnessConfig) -> Result<RunReport> {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    tracing::info!("harness run {} starting", run_id);

    // Fail on an unusable proxy URL before anything is spawned.
    let proxy_probe_addr = config.proxy_probe_addr()?;

    let mut cleanup_failures = Vec::new();
    let mut fleet: Vec<ManagedProcess> = Vec::new();

    let outcomes = match start_fleet(config, &mut fleet).await {
        Ok(()) => match start_proxy(config, &proxy_probe_addr).await {
            Ok(mut proxy) => {
                let outcomes = run_scenarios(config, default_scenarios()).await;
                if let Err(e) = proxy.kill() {
                    let failure = format!("{}: {}", proxy.label(), e);
                    tracing::warn!("cleanup failure: {}", failure);
                    cleanup_failures.push(failure);
                }
                Ok(outcomes)
            }
            Err(e) => Err(anyhow::Error::new(e).context("failed to start proxy under test")),
        },
        Err(e) => Err(anyhow::Error::new(e).context("failed to start stub fleet")),
    };

    // Fleet teardown happens whatever the stages above did.
    if let Err(e) = kill_all(&mut fleet) {
        tracing::warn!("cleanup failure: {}", e);
        cleanup_failures.extend(e.failures);
    }

    let outcomes = outcomes?;
    tracing::info!("harness run {} done", run_id);

    Ok(RunReport {
        run_id,
        started_at,
        outcomes,
        cleanup_failures,
    })
}

/// Spawn the whole fleet first, then probe each port, so backends come up in
/// parallel. Partially-started fleets stay in `fleet` for the caller's
/// teardown sweep.
async fn start_fleet(
    config: &HarnessConfig,
    fleet: &mut Vec<ManagedProcess>,
) -> std::result::Result<(), SpawnError> {
    let ready_timeout = Duration::from_secs(config.ready_timeout_secs);

    for (index, port) in config.fleet_ports().into_iter().enumerate() {
        let label = format!("stub-backend-{}", index);
        let process = ManagedProcess::spawn(&label, &config.stub_bin, &[port.to_string()])?;
        fleet.push(process);
        tracing::info!("created stub rpc server at port {}", port);
    }

    for (port, process) in config.fleet_ports().into_iter().zip(fleet.iter()) {
        let addr = format!("127.0.0.1:{}", port);
        await_ready(process.label(), &addr, ready_timeout).await?;
    }

    Ok(())
}

async fn start_proxy(
    config: &HarnessConfig,
    probe_addr: &str,
) -> std::result::Result<ManagedProcess, SpawnError> {
    let ready_timeout = Duration::from_secs(config.ready_timeout_secs);
    let mut proxy = ManagedProcess::spawn(
        "proxy-under-test",
        &config.proxy_bin,
        &[config.proxy_config.clone()],
    )?;

    if let Err(e) = await_ready(proxy.label(), probe_addr, ready_timeout).await {
        if let Err(kill_err) = proxy.kill() {
            tracing::warn!("failed to kill unready proxy: {}", kill_err);
        }
        return Err(e);
    }

    Ok(proxy)
}

/// Issue the scenario calls one at a time. Transport and rpc failures are
/// recorded per scenario and never abort the sequence.
async fn run_scenarios(config: &HarnessConfig, scenarios: Vec<Scenario>) -> Vec<ScenarioOutcome> {
    let client = RpcClient::new(
        config.proxy_url.clone(),
        Duration::from_secs(config.call_timeout_secs),
    );

    let mut outcomes = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        let outcome = match client.call(scenario.method, scenario.params.clone()).await {
            Ok(result) => match (scenario.check)(&result) {
                Ok(()) => {
                    tracing::info!("scenario '{}' passed: {}", scenario.name, result);
                    Ok(result)
                }
                Err(reason) => Err(format!("unexpected result: {}", reason)),
            },
            Err(e @ RpcClientError::Transport { .. }) => Err(format!("transport failure: {}", e)),
            Err(e @ RpcClientError::Rpc { .. }) => Err(format!("rpc failure: {}", e)),
        };

        if let Err(reason) = &outcome {
            tracing::warn!("scenario '{}' failed: {}", scenario.name, reason);
        }

        outcomes.push(ScenarioOutcome {
            name: scenario.name.to_string(),
            method: scenario.method.to_string(),
            outcome,
        });
    }

    outcomes
}
