use std::env;
use std::net::TcpStream;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use relaycheck::config::HarnessConfig;
use relaycheck::orchestrator;

/// Find the stub backend binary (debug or release), building it if needed.
fn find_stub_binary() -> PathBuf {
    let debug_path = PathBuf::from(format!(
        "./target/debug/stub_rpc_server{}",
        env::consts::EXE_SUFFIX
    ));
    let release_path = PathBuf::from(format!(
        "./target/release/stub_rpc_server{}",
        env::consts::EXE_SUFFIX
    ));

    if release_path.exists() {
        release_path
    } else if debug_path.exists() {
        debug_path
    } else {
        let output = Command::new("cargo")
            .args(["build", "--bin", "stub_rpc_server"])
            .output()
            .expect("Failed to run cargo build for stub_rpc_server");

        if !output.status.success() {
            panic!(
                "Failed to build stub_rpc_server binary: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }

        if debug_path.exists() {
            debug_path
        } else {
            panic!("stub_rpc_server binary not found after build attempt");
        }
    }
}

fn test_config(fleet_base_port: u16, proxy_port: u16) -> HarnessConfig {
    HarnessConfig {
        fleet_size: 3,
        fleet_base_port,
        proxy_url: format!("http://127.0.0.1:{}", proxy_port),
        proxy_bin: "definitely-not-a-real-binary-xyz".to_string(),
        proxy_config: "./sample.yml".to_string(),
        stub_bin: find_stub_binary().display().to_string(),
        ready_timeout_secs: 10,
        call_timeout_secs: 5,
    }
}

fn assert_fleet_ports_closed(config: &HarnessConfig) {
    // The kill path reaps each child, so the ports are released by the time
    // run() returns; the small grace sleep covers kernel-side socket close.
    std::thread::sleep(Duration::from_millis(200));
    for port in config.fleet_ports() {
        let addr = format!("127.0.0.1:{}", port);
        assert!(
            TcpStream::connect_timeout(
                &addr.parse().unwrap(),
                Duration::from_millis(500),
            )
            .is_err(),
            "stub backend at {} still accepting connections after teardown",
            addr
        );
    }
}

#[tokio::test]
async fn test_end_to_end_run_with_stub_standing_in_for_proxy() {
    // A stub backend speaks the same wire protocol as the proxy under test,
    // so one more stub instance can stand in for it: the harness hands it
    // the "config file" argument, which the stub reads as its port.
    let proxy_port = 47250u16;
    let mut config = test_config(47221, proxy_port);
    config.proxy_bin = config.stub_bin.clone();
    config.proxy_config = proxy_port.to_string();

    let report = orchestrator::run(&config).await.expect("run should complete");

    assert_eq!(report.outcomes.len(), 2);
    for outcome in &report.outcomes {
        assert!(
            outcome.outcome.is_ok(),
            "scenario '{}' failed: {:?}",
            outcome.name,
            outcome.outcome
        );
    }
    assert!(report.passed());
    assert!(report.cleanup_failures.is_empty());

    assert_fleet_ports_closed(&config);

    // Both envelopes came back non-error with the expected shapes.
    let hello = &report.outcomes[0];
    assert!(hello.outcome.as_ref().unwrap().to_string().contains("China"));
    let random = &report.outcomes[1];
    let drawn: i64 = random
        .outcome
        .as_ref()
        .unwrap()
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((0..=10000).contains(&drawn));
}

#[tokio::test]
async fn test_run_tears_down_fleet_when_proxy_cannot_spawn() {
    let config = test_config(47321, 47350);

    let err = orchestrator::run(&config).await.unwrap_err();
    assert!(err.to_string().contains("proxy"));

    assert_fleet_ports_closed(&config);
}

#[tokio::test]
#[cfg(not(target_os = "windows"))]
async fn test_run_tears_down_fleet_when_proxy_never_becomes_ready() {
    // `sleep` accepts the config-file argument and then never listens, so
    // the readiness probe has to give up.
    let mut config = test_config(47421, 47450);
    config.proxy_bin = "sleep".to_string();
    config.proxy_config = "30".to_string();
    config.ready_timeout_secs = 1;

    let err = orchestrator::run(&config).await.unwrap_err();
    assert!(err.to_string().contains("proxy"));

    assert_fleet_ports_closed(&config);
}

#[test]
fn test_default_scenarios_cover_both_dispatch_arms() {
    let scenarios = orchestrator::default_scenarios();

    assert_eq!(scenarios.len(), 2);
    assert_eq!(scenarios[0].method, "hello");
    assert_eq!(scenarios[1].method, "random");

    // The checks themselves reject wrong shapes.
    assert!((scenarios[0].check)(&serde_json::json!("hello world [\"China\"]")).is_ok());
    assert!((scenarios[0].check)(&serde_json::json!("hello world")).is_err());
    assert!((scenarios[1].check)(&serde_json::json!("7777")).is_ok());
    assert!((scenarios[1].check)(&serde_json::json!("10001")).is_err());
    assert!((scenarios[1].check)(&serde_json::json!("not a number")).is_err());
}
