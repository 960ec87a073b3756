// Scripted transport and fixtures shared by the unit tests.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use routerscope_api::{Error, ExecOutput, Transport};

use crate::model::{MetricsSnapshot, SystemHealthSample, ThroughputSample};

pub(crate) const NET_DEV: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:   48380     496    0    0    0     0          0         0    48380     496    0    0    0     0       0          0
  eth0: 1000000 2419811    0   12    0     0          0      1042 500000 1180243    0    0    0     0       0          0
br-lan: 2000000   12040    0    0    0     0          0         0 3000000   71209    0    0    0     0       0          0
";

pub(crate) const STATIONS: &str = "\
Interface wlan0
\tchannel 36 (5180 MHz), width: 80 MHz, center1: 5210 MHz
Station aa:bb:cc:dd:ee:ff (on wlan0)
\tsignal:  \t-52 [-55, -54] dBm
\ttx bitrate:\t866.7 MBit/s VHT-MCS 9 80MHz short GI VHT-NSS 2
";

pub(crate) const LEASES: &str = "\
1718042000 AA:BB:CC:DD:EE:FF 192.168.1.50 laptop 01:aa:bb:cc:dd:ee:ff
0 11:22:33:44:55:66 192.168.1.60 nas *
";

pub(crate) const ARP_HEADER: &str =
    "IP address       HW type     Flags       HW address            Mask     Device\n";

pub(crate) const ARP: &str = "\
IP address       HW type     Flags       HW address            Mask     Device
192.168.1.50     0x1         0x2         aa:bb:cc:dd:ee:ff     *        br-lan
192.168.1.60     0x1         0x2         11:22:33:44:55:66     *        br-lan
";

pub(crate) const MEMINFO: &str = "MemTotal: 1000 kB\nMemAvailable: 400 kB\n";
pub(crate) const LOADAVG: &str = "0.50 0.40 0.30 1/90 1234\n";

/// What the fake answers for commands matching a pattern.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Output(ExecOutput),
    /// Never completes; the caller's timeout has to fire.
    Hang,
}

impl Reply {
    pub(crate) fn ok(stdout: &str) -> Self {
        Self::Output(ExecOutput::ok(stdout))
    }

    pub(crate) fn exit(status: i32, stderr: &str) -> Self {
        Self::Output(ExecOutput {
            status: Some(status),
            stdout: String::new(),
            stderr: stderr.into(),
        })
    }
}

#[derive(Debug, Default)]
struct FakeState {
    /// First matching pattern wins; newer entries go first.
    replies: Vec<(String, Reply)>,
    connected: bool,
    down: bool,
    drop_next: u32,
    reconnects: u32,
    closes: u32,
    calls: Vec<String>,
    in_flight: usize,
    max_in_flight: usize,
}

/// In-memory [`Transport`]. Clones share state, so a test keeps one
/// handle for scripting while the executor owns another.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeTransport {
    state: Arc<Mutex<FakeState>>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn connected() -> Self {
        let fake = Self::new();
        fake.lock().connected = true;
        fake
    }

    /// A reachable router answering every polled command sensibly.
    pub(crate) fn healthy_router() -> Self {
        let fake = Self::connected();
        fake.reply("/proc/net/dev", Reply::ok(NET_DEV));
        fake.reply("station dump", Reply::ok(STATIONS));
        fake.reply("dhcp.leases", Reply::ok(LEASES));
        fake.reply("/proc/net/arp", Reply::ok(ARP));
        fake.reply("/proc/meminfo", Reply::ok(MEMINFO));
        fake.reply("/proc/loadavg", Reply::ok(LOADAVG));
        fake.reply("thermal_zone0", Reply::ok("51000\n"));
        fake.reply("ping", Reply::ok("64 bytes from 8.8.8.8: seq=0 ttl=117 time=12.5 ms\n"));
        fake
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub(crate) fn reply(&self, pattern: &str, reply: Reply) {
        self.lock().replies.insert(0, (pattern.to_owned(), reply));
    }

    /// While down, every exec and (re)connect fails at the channel level.
    pub(crate) fn set_down(&self, down: bool) {
        self.lock().down = down;
    }

    /// Fail the next `n` execs with a channel error.
    pub(crate) fn drop_next(&self, n: u32) {
        self.lock().drop_next = n;
    }

    pub(crate) fn reconnects(&self) -> u32 {
        self.lock().reconnects
    }

    pub(crate) fn closes(&self) -> u32 {
        self.lock().closes
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.lock().max_in_flight
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.lock().connected
    }
}

struct InFlight(Arc<Mutex<FakeState>>);

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Ok(mut state) = self.0.lock() {
            state.in_flight -= 1;
        }
    }
}

fn unreachable_error() -> Error {
    Error::ConnectionFailed {
        host: "fake-router".into(),
        reason: "No route to host".into(),
    }
}

impl Transport for FakeTransport {
    async fn connect(&mut self) -> Result<(), Error> {
        let mut state = self.lock();
        if state.down {
            return Err(unreachable_error());
        }
        state.connected = true;
        Ok(())
    }

    async fn exec(&mut self, command: &str) -> Result<ExecOutput, Error> {
        let reply = {
            let mut state = self.lock();
            state.calls.push(command.to_owned());
            if !state.connected {
                return Err(Error::NotConnected);
            }
            if state.down || state.drop_next > 0 {
                state.drop_next = state.drop_next.saturating_sub(1);
                state.connected = false;
                return Err(Error::Channel {
                    stderr: "Broken pipe".into(),
                });
            }
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            state
                .replies
                .iter()
                .find(|(pattern, _)| command.contains(pattern.as_str()))
                .map_or_else(|| Reply::ok(""), |(_, reply)| reply.clone())
        };
        let _guard = InFlight(Arc::clone(&self.state));

        tokio::task::yield_now().await;
        match reply {
            Reply::Output(output) => Ok(output),
            Reply::Hang => std::future::pending().await,
        }
    }

    async fn reconnect(&mut self) -> Result<(), Error> {
        let mut state = self.lock();
        state.reconnects += 1;
        if state.down {
            return Err(unreachable_error());
        }
        state.connected = true;
        Ok(())
    }

    async fn close(&mut self) {
        let mut state = self.lock();
        state.connected = false;
        state.closes += 1;
    }

    fn peer(&self) -> &str {
        "fake-router:22"
    }
}

pub(crate) fn snapshot_fixture(sequence: u64) -> MetricsSnapshot {
    MetricsSnapshot {
        sequence,
        timestamp: Utc::now(),
        stale: false,
        wan_interface: "eth0".into(),
        throughput: Some(ThroughputSample {
            download_mbps: 1.0,
            upload_mbps: 0.5,
            total_mbps: 1.5,
            elapsed_secs: 10.0,
        }),
        wan_counters: None,
        lan_counters: None,
        link: None,
        clients: Some(Vec::new()),
        health: SystemHealthSample::default(),
        latency_ms: None,
        connections: None,
        service_summary: None,
        omitted: Vec::new(),
        collection_ms: 12,
    }
}
