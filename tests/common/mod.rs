//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::net::Ipv4Addr;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use gateway_proxy::blockchain::{BlockchainError, BlockchainResult, StakingRegistry};
use gateway_proxy::controller::Controller;
use gateway_proxy::render::{ConfigRenderer, LiveConfig};
use gateway_proxy::supervisor::ProcessSupervisor;
use gateway_proxy::topology::{ChainStateReader, HostResolver};
use tempfile::TempDir;

/// One szabo.
pub const UNIT: u64 = 1_000_000_000_000;

pub const FALLBACK: &str = "127.0.0.1:6000";

pub const TEMPLATE: &str = "events {}\nhttp {\n  upstream backend {\n$STAKERS  }\n}\n";

/// Stand-in for nginx.
///
/// `-t -c <file>` fails when the file contains BROKEN. Serving mode logs to
/// `proxy.log` beside the script, logs `reload` on HUP, exits 0 on TERM/INT,
/// and exits with the code in `exit_code` once that file appears.
const FAKE_PROXY: &str = r#"#!/bin/sh
dir=$(dirname "$0")
if [ "$1" = "-t" ]; then
    if grep -q BROKEN "$3"; then
        echo "test failed $3" >> "$dir/proxy.log"
        exit 1
    fi
    echo "test ok $3" >> "$dir/proxy.log"
    exit 0
fi
trap 'echo reload >> "$dir/proxy.log"' HUP
trap 'echo stop >> "$dir/proxy.log"; exit 0' TERM INT
echo "start $*" >> "$dir/proxy.log"
while true; do
    if [ -f "$dir/exit_code" ]; then
        exit "$(cat "$dir/exit_code")"
    fi
    sleep 0.05
done
"#;

/// In-memory registry whose members can be changed while a controller runs.
///
/// Every fetch starts with `block_number`, which can be made slow or made to
/// never return.
#[derive(Clone, Default)]
pub struct MemoryRegistry {
    members: Arc<Mutex<Vec<(Address, String)>>>,
    stakes: Arc<Mutex<HashMap<Address, U256>>>,
    block: Arc<Mutex<u64>>,
    hung: Arc<AtomicBool>,
    delay: Arc<Mutex<Option<Duration>>>,
    fetches: Arc<AtomicUsize>,
}

impl MemoryRegistry {
    /// Block every later fetch forever.
    pub fn hang(&self) {
        self.hung.store(true, Ordering::SeqCst);
    }

    /// Stall every later fetch for `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Fetches started so far, hung ones included.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` fetches have started.
    pub async fn wait_fetches(&self, n: usize) -> bool {
        for _ in 0..500 {
            if self.fetch_count() >= n {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    pub fn set(&self, members: &[(u8, &str, u64)]) {
        let mut list = self.members.lock().unwrap();
        let mut stakes = self.stakes.lock().unwrap();
        list.clear();
        stakes.clear();
        for (last_byte, url, units) in members {
            let address = Address::with_last_byte(*last_byte);
            list.push((address, url.to_string()));
            stakes.insert(address, U256::from(UNIT) * U256::from(*units));
        }
    }

    fn member(&self, staker: Address) -> BlockchainResult<(Address, String)> {
        self.members
            .lock()
            .unwrap()
            .iter()
            .find(|(a, _)| *a == staker)
            .cloned()
            .ok_or_else(|| BlockchainError::Rpc("unknown staker".into()))
    }
}

impl StakingRegistry for MemoryRegistry {
    async fn block_number(&self) -> BlockchainResult<u64> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.hung.load(Ordering::SeqCst) {
            return std::future::pending().await;
        }
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut block = self.block.lock().unwrap();
        *block += 1;
        Ok(*block)
    }

    async fn staker_role(&self, _block: u64) -> BlockchainResult<B256> {
        Ok(B256::with_last_byte(1))
    }

    async fn member_count(&self, _block: u64, _role: B256) -> BlockchainResult<U256> {
        Ok(U256::from(self.members.lock().unwrap().len()))
    }

    async fn member_at(&self, _block: u64, _role: B256, index: u64) -> BlockchainResult<Address> {
        self.members
            .lock()
            .unwrap()
            .get(index as usize)
            .map(|(a, _)| *a)
            .ok_or_else(|| BlockchainError::Rpc("index out of range".into()))
    }

    async fn upstream_url(&self, _block: u64, staker: Address) -> BlockchainResult<String> {
        Ok(self.member(staker)?.1)
    }

    async fn staked_amount(&self, _block: u64, staker: Address) -> BlockchainResult<U256> {
        self.stakes
            .lock()
            .unwrap()
            .get(&staker)
            .copied()
            .ok_or_else(|| BlockchainError::Rpc("unknown staker".into()))
    }
}

/// Resolves a fixed set of hostnames.
#[derive(Clone, Default)]
pub struct StaticResolver(HashMap<String, Ipv4Addr>);

impl StaticResolver {
    pub fn with(mut self, host: &str, ip: [u8; 4]) -> Self {
        self.0.insert(host.to_string(), Ipv4Addr::from(ip));
        self
    }
}

impl HostResolver for StaticResolver {
    async fn resolve_ipv4(&self, host: &str) -> io::Result<Ipv4Addr> {
        self.0
            .get(host)
            .copied()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "NXDOMAIN"))
    }
}

/// Scratch directory holding the template, fake proxy, and live config.
pub struct Harness {
    pub dir: TempDir,
    pub registry: MemoryRegistry,
    pub resolver: StaticResolver,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let proxy = dir.path().join("fake-proxy");
        std::fs::write(&proxy, FAKE_PROXY).unwrap();
        std::fs::set_permissions(&proxy, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::write(dir.path().join("nginx.conf.tmpl"), TEMPLATE).unwrap();

        let resolver = StaticResolver::default()
            .with("a.example", [1, 2, 3, 4])
            .with("b.example", [5, 6, 7, 8])
            .with("c.example", [9, 9, 9, 9]);

        Self {
            dir,
            registry: MemoryRegistry::default(),
            resolver,
        }
    }

    pub fn template_path(&self) -> PathBuf {
        self.dir.path().join("nginx.conf.tmpl")
    }

    pub fn live_path(&self) -> PathBuf {
        self.dir.path().join("proxy.conf")
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.path().join("proxy.log")
    }

    pub fn write_template(&self, text: &str) {
        std::fs::write(self.template_path(), text).unwrap();
    }

    /// Make the fake proxy exit on its own with `code`.
    pub fn crash_proxy(&self, code: i32) {
        std::fs::write(self.dir.path().join("exit_code"), code.to_string()).unwrap();
    }

    pub fn controller(&self, poll_interval: Duration) -> Controller<MemoryRegistry, StaticResolver> {
        let reader = ChainStateReader::new(
            self.registry.clone(),
            self.resolver.clone(),
            U256::from(UNIT),
            Duration::from_secs(1),
        );
        let proxy = self.dir.path().join("fake-proxy");
        Controller::new(
            reader,
            ConfigRenderer::new(FALLBACK),
            ProcessSupervisor::new(proxy.to_string_lossy().into_owned(), Vec::new()),
            LiveConfig::new(self.live_path()),
            self.template_path(),
            poll_interval,
        )
    }

    /// Wait until the fake proxy has installed its signal traps.
    pub async fn wait_ready(&self) {
        assert!(wait_for(&self.log_path(), "start ").await, "proxy never started");
    }

    /// Wait until `n` reloads were logged by the fake proxy.
    pub async fn wait_reloads(&self, n: usize) -> bool {
        for _ in 0..100 {
            if count_lines(&self.log_path(), "reload") >= n {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        false
    }
}

/// Poll `path` until it contains `needle`.
pub async fn wait_for(path: &Path, needle: &str) -> bool {
    for _ in 0..100 {
        if let Ok(text) = std::fs::read_to_string(path) {
            if text.contains(needle) {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

pub fn count_lines(path: &Path, line: &str) -> usize {
    std::fs::read_to_string(path)
        .map(|text| text.lines().filter(|l| *l == line).count())
        .unwrap_or(0)
}
