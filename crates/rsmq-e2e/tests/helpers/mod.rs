#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Command, Output};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rsmq_core::{Rsmq, RsmqConfig};

const REDIS_URL_VAR: &str = "RSMQ_TEST_REDIS_URL";

static NEXT_NS: AtomicUsize = AtomicUsize::new(0);

/// A Redis server reachable at `RSMQ_TEST_REDIS_URL`, scoped to a namespace
/// no other test uses. Every queue in the namespace is deleted on drop.
pub struct TestRedis {
    config: RsmqConfig,
    rsmq: Rsmq,
}

impl TestRedis {
    /// Connect to the configured server. Panics when none is configured,
    /// so run these tests with `--ignored` only where Redis is available.
    pub fn connect() -> Self {
        let url = std::env::var(REDIS_URL_VAR).unwrap_or_else(|_| {
            panic!("{REDIS_URL_VAR} must point at a Redis server to run the e2e tests")
        });

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .subsec_nanos();
        let mut config = RsmqConfig::default();
        config.redis.url = url;
        config.ns = format!(
            "rsmq-e2e-{}-{}-{nanos}",
            std::process::id(),
            NEXT_NS.fetch_add(1, Ordering::SeqCst)
        );
        let rsmq = Rsmq::from_config(&config).expect("valid redis url");
        Self { config, rsmq }
    }

    pub fn rsmq(&self) -> &Rsmq {
        &self.rsmq
    }

    pub fn url(&self) -> &str {
        &self.config.redis.url
    }

    pub fn ns(&self) -> &str {
        &self.config.ns
    }

    /// Run the `rsmq` CLI against this server and namespace.
    pub fn cli_run(&self, args: &[&str]) -> CliOutput {
        let binary = workspace_binary("rsmq");
        assert!(
            binary.exists(),
            "rsmq CLI binary not found at {binary:?}. Run `cargo build` first."
        );

        let output: Output = Command::new(&binary)
            .arg("--url")
            .arg(self.url())
            .arg("--ns")
            .arg(self.ns())
            .args(args)
            .output()
            .expect("run rsmq CLI");

        CliOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        }
    }
}

impl Drop for TestRedis {
    fn drop(&mut self) {
        if let Ok(queues) = self.rsmq.list_queues() {
            for name in queues {
                let _ = self.rsmq.delete_queue(&name);
            }
        }
    }
}

/// Output from a CLI invocation.
pub struct CliOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

/// Resolve a binary path from the workspace target directory.
fn workspace_binary(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.pop(); // crates/
    path.pop(); // workspace root
    path.push("target");
    path.push("debug");
    path.push(name);
    path
}
