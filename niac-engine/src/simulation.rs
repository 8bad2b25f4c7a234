//! The top-level orchestrator: wires the capture handle (C1), the device
//! index (C2), the packet bus (C3), every protocol responder (C4-C11),
//! the error-injection controller (C12), statistics (C13), and the live
//! reconciler (C14) into one running simulation, and implements the
//! documented startup/shutdown lifecycle (`spec.md` §5).

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use niac_capture::{CaptureHandle, RecvOutcome};
use niac_config::SimConfig;
use niac_dhcp::DhcpServer;
use niac_dns::DnsServer;
use niac_replay::{PlaybackConfig, ReplayController};
use niac_snmp::{MibStore, SnmpAgent, SystemMibConfig};
use niac_types::{Device, Error, MibValue, Oid, ThresholdMetric};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use crate::bus::{ClassifiedFrame, HandlerKind, PacketBus};
use crate::discovery::{self, NeighborTable};
use crate::index::DeviceIndex;
use crate::inject::InjectionTable;
use crate::stats::{self, Stats, StatsSnapshot};
use crate::topology;
use crate::wire::{self, build_ethernet_frame, build_ipv4_packet, build_udp_datagram, EthernetFrame, Ipv4Packet, UdpDatagram};
use crate::{arp, icmp, reconcile};

/// Loads a file referenced from config (a device's `walk_file`); injected
/// so tests can substitute an in-memory source instead of touching disk.
pub type WalkFileLoader = Arc<dyn Fn(&str) -> Result<String, Error> + Send + Sync>;

struct Protocols {
    dhcp: AsyncMutex<HashMap<String, DhcpServer>>,
    dns: HashMap<String, DnsServer>,
    snmp: HashMap<String, SnmpAgent>,
}

fn build_protocols(devices: &[Device], loader: &WalkFileLoader, injection: &InjectionTable) -> Result<Protocols, Error> {
    let mut dhcp = HashMap::new();
    let mut dns = HashMap::new();
    let mut snmp = HashMap::new();

    for device in devices {
        if let Some(cfg) = &device.dhcp {
            let server_id = device.primary_ip().ok_or_else(|| {
                Error::config_invalid(format!("devices.{}.ip", device.name), "at least one IPv4 address", "none", Some("add `ip` or `ips` to the device"))
            })?;
            dhcp.insert(device.name.clone(), DhcpServer::new(cfg.clone(), server_id));
        }
        if let Some(cfg) = &device.dns {
            dns.insert(device.name.clone(), DnsServer::new(cfg.clone()));
        }
        if let Some(cfg) = &device.snmp_agent {
            let walk_entries = match &cfg.walk_file {
                Some(path) => niac_snmp::parse_walk_file(&loader(path)?)?,
                None => Vec::new(),
            };
            let system = SystemMibConfig {
                sys_descr: format!("niac simulated {}", device.name),
                sys_object_id: Oid::parse("1.3.6.1.4.1.8072.3.2.10").unwrap_or(Oid(vec![1, 3, 6, 1, 4, 1, 8072, 3, 2, 10])),
                sys_contact: cfg.sys_contact.clone(),
                sys_name: device.name.clone(),
                sys_location: cfg.sys_location.clone(),
                sys_services: 78,
            };
            let mib = MibStore::new(system, walk_entries);
            let bias_injection = injection.clone();
            let bias_device = device.name.clone();
            let bias: niac_snmp::BiasFn = Arc::new(move |oid: &Oid, value: MibValue| {
                if let MibValue::Counter32(base) = value {
                    if let Some((kind, if_index)) = crate::inject::classify_interface_counter(oid) {
                        let iface = format!("if{if_index}");
                        let biased = bias_injection.biased_counter(&bias_device, &iface, kind, base as u64);
                        return MibValue::Counter32(biased.min(u32::MAX as u64) as u32);
                    }
                }
                value
            });
            let agent = SnmpAgent::new(cfg.community.clone(), cfg.writable_oids.clone(), mib).with_bias(bias);
            snmp.insert(device.name.clone(), agent);
        }
    }

    Ok(Protocols { dhcp: AsyncMutex::new(dhcp), dns, snmp })
}

/// Tracks last-fired time per periodic-transmitter key so one 1Hz ticker
/// can gate many devices, each with its own configured interval.
#[derive(Default)]
struct DueTracker {
    last_sent: std::sync::Mutex<HashMap<String, Instant>>,
}

impl DueTracker {
    fn due(&self, key: &str, interval: Duration, now: Instant) -> bool {
        let mut map = self.last_sent.lock().unwrap();
        match map.get(key) {
            Some(last) if now.duration_since(*last) < interval => false,
            _ => {
                map.insert(key.to_string(), now);
                true
            }
        }
    }
}

/// A running simulation: every long-lived worker plus the shared state
/// they coordinate through. Constructed by [`Simulation::start`], torn
/// down by [`Simulation::stop`].
pub struct Simulation {
    pub index: DeviceIndex,
    pub bus: Arc<PacketBus>,
    pub stats: Arc<Stats>,
    pub injection: InjectionTable,
    pub neighbors: NeighborTable,
    pub replay: Arc<ReplayController>,
    protocols: Arc<Protocols>,
    capture: Arc<AsyncMutex<Box<dyn CaptureHandle>>>,
    store: Arc<niac_store::Store>,
    id: String,
    started_at: chrono::DateTime<Utc>,
    interface: String,
    config_name: String,
    shutdown: Arc<AtomicBool>,
    workers: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl Simulation {
    /// Builds the index and protocol servers from a loaded configuration
    /// and takes ownership of an open capture handle. Does not spawn any
    /// workers yet; call [`Simulation::start`] for that.
    pub fn build(
        run_id: String,
        config: &SimConfig,
        interface: String,
        config_name: String,
        capture: Box<dyn CaptureHandle>,
        store: Arc<niac_store::Store>,
        walk_loader: WalkFileLoader,
    ) -> Result<Arc<Self>, Error> {
        let index = DeviceIndex::new();
        index.rebuild(config.devices.clone())?;
        let injection = InjectionTable::new();
        let protocols = build_protocols(&config.devices, &walk_loader, &injection)?;
        let (bus, receivers) = PacketBus::new(crate::bus::DEFAULT_QUEUE_BUFFER_SIZE);

        let sim = Arc::new(Simulation {
            index,
            bus: Arc::new(bus),
            stats: Arc::new(Stats::new()),
            injection,
            neighbors: NeighborTable::new(),
            replay: Arc::new(ReplayController::new()),
            protocols: Arc::new(protocols),
            capture: Arc::new(AsyncMutex::new(capture)),
            store,
            id: run_id,
            started_at: Utc::now(),
            interface,
            config_name,
            shutdown: Arc::new(AtomicBool::new(false)),
            workers: std::sync::Mutex::new(Vec::new()),
        });

        sim.spawn_handler_workers(receivers);
        Ok(sim)
    }

    /// Spawns the capture reader, one worker per handler queue, and the
    /// periodic transmitters (LLDP/CDP/EDP/FDP/STP/traffic), the cold-start
    /// and threshold trap transmitter, and the gratuitous ARP burst and
    /// stats rollup. Mirrors the "one dedicated worker per periodic
    /// transmitter" scheduling model.
    pub fn start(self: &Arc<Self>) {
        self.spawn_gratuitous_arp();
        self.spawn_capture_reader();
        self.spawn_discovery_transmitter();
        self.spawn_stp_transmitter();
        self.spawn_trap_transmitter();
        self.spawn_traffic_transmitter();
        self.spawn_stats_rollup();
    }

    /// Fires each opted-in device's gratuitous ARP announcements once, at
    /// simulation startup (`spec.md` §4.4).
    fn spawn_gratuitous_arp(self: &Arc<Self>) {
        let sim = self.clone();
        let handle = tokio::spawn(async move {
            let snapshot = sim.index.snapshot();
            for frame in arp::gratuitous_announcements(&snapshot) {
                sim.transmit(frame).await;
            }
        });
        self.workers.lock().unwrap().push(handle);
    }

    fn spawn_capture_reader(self: &Arc<Self>) {
        let sim = self.clone();
        let handle = tokio::spawn(async move {
            loop {
                if sim.shutdown.load(Ordering::SeqCst) {
                    return;
                }
                let outcome = {
                    let mut capture = sim.capture.lock().await;
                    capture.recv()
                };
                match outcome {
                    Ok(RecvOutcome::Frame(frame)) => {
                        sim.stats.record_packet_received();
                        sim.bus.dispatch(frame);
                    }
                    Ok(RecvOutcome::Idle) => tokio::time::sleep(Duration::from_millis(5)).await,
                    Ok(RecvOutcome::Eof) => return,
                    Err(err) => {
                        sim.stats.record_error();
                        tracing::warn!(error = %err, "capture read error, retrying");
                        tokio::time::sleep(Duration::from_millis(50)).await;
                    }
                }
            }
        });
        self.workers.lock().unwrap().push(handle);
    }

    fn spawn_handler_workers(self: &Arc<Self>, receivers: HashMap<HandlerKind, tokio::sync::mpsc::Receiver<ClassifiedFrame>>) {
        for (kind, mut rx) in receivers {
            let sim = self.clone();
            let handle = tokio::spawn(async move {
                sim.stats.worker_started();
                while let Some(classified) = rx.recv().await {
                    if sim.shutdown.load(Ordering::SeqCst) {
                        break;
                    }
                    sim.handle_classified(kind, classified).await;
                }
                sim.stats.worker_stopped();
            });
            self.workers.lock().unwrap().push(handle);
        }
    }

    async fn handle_classified(&self, kind: HandlerKind, classified: ClassifiedFrame) {
        let snapshot = self.index.snapshot();
        let reply = match kind {
            HandlerKind::Arp => {
                self.stats.record_arp_request();
                let reply = arp::handle(&classified.frame.bytes, &snapshot);
                if reply.is_some() {
                    self.stats.record_arp_reply();
                }
                reply
            }
            HandlerKind::Icmpv4 => {
                self.stats.record_icmp_request();
                let reply = icmp::handle_echo_request(&classified.frame.bytes, &snapshot);
                if reply.is_some() {
                    self.stats.record_icmp_reply();
                }
                reply
            }
            HandlerKind::Icmpv6 => icmp::handle_neighbor_solicitation(&classified.frame.bytes, &snapshot),
            HandlerKind::Dhcp => {
                self.stats.record_dhcp_request();
                self.handle_dhcp(&classified.frame.bytes, &snapshot).await
            }
            HandlerKind::Dns => {
                self.stats.record_dns_query();
                self.handle_dns(&classified.frame.bytes, &snapshot)
            }
            HandlerKind::Snmp => self.handle_snmp(&classified.frame.bytes, &snapshot),
            HandlerKind::Lldp | HandlerKind::Cdp | HandlerKind::Edp | HandlerKind::Fdp => {
                self.handle_discovery(kind, &classified.frame.bytes, &snapshot);
                None
            }
            HandlerKind::Stp | HandlerKind::Other => None,
        };

        if let Some(bytes) = reply {
            self.transmit(bytes).await;
        }
    }

    /// DHCP requests are broadcast; every configured DHCP server gets a
    /// chance to answer, first responder wins. Real deployments rely on
    /// the requester being on a matching broadcast domain; this simulator
    /// has one shared wire, so trying every server is the direct analog.
    async fn handle_dhcp(&self, bytes: &[u8], snapshot: &crate::index::DeviceIndexSnapshot) -> Option<Vec<u8>> {
        let eth = EthernetFrame::parse(bytes)?;
        let ip = Ipv4Packet::parse(eth.payload)?;
        let udp = UdpDatagram::parse(ip.payload)?;

        let mut servers = self.protocols.dhcp.lock().await;
        let now = std::time::SystemTime::now();
        for (device_name, server) in servers.iter_mut() {
            if let Some(reply) = server.handle(udp.payload, now) {
                let device = snapshot.by_name(device_name)?;
                let reply_udp = build_udp_datagram(67, 68, &reply);
                let reply_ip = build_ipv4_packet(ip.dst, Ipv4Addr::BROADCAST, wire::PROTO_UDP, device.icmp.ttl, &reply_udp);
                return Some(build_ethernet_frame(niac_types::MacAddr::BROADCAST, device.mac, wire::ETHERTYPE_IPV4, &reply_ip));
            }
        }
        None
    }

    fn handle_dns(&self, bytes: &[u8], snapshot: &crate::index::DeviceIndexSnapshot) -> Option<Vec<u8>> {
        let eth = EthernetFrame::parse(bytes)?;
        let ip = Ipv4Packet::parse(eth.payload)?;
        let udp = UdpDatagram::parse(ip.payload)?;
        let device = snapshot.by_ipv4(&ip.dst)?;
        let server = self.protocols.dns.get(&device.name)?;
        let reply = server.handle(udp.payload)?;
        let reply_udp = build_udp_datagram(53, udp.src_port, &reply);
        let reply_ip = build_ipv4_packet(ip.dst, ip.src, wire::PROTO_UDP, device.icmp.ttl, &reply_udp);
        Some(build_ethernet_frame(eth.src, device.mac, wire::ETHERTYPE_IPV4, &reply_ip))
    }

    fn handle_snmp(&self, bytes: &[u8], snapshot: &crate::index::DeviceIndexSnapshot) -> Option<Vec<u8>> {
        let eth = EthernetFrame::parse(bytes)?;
        let ip = Ipv4Packet::parse(eth.payload)?;
        let udp = UdpDatagram::parse(ip.payload)?;
        let device = snapshot.by_ipv4(&ip.dst)?;
        let agent = self.protocols.snmp.get(&device.name)?;
        let reply = agent.handle(udp.payload)?;
        let reply_udp = build_udp_datagram(161, udp.src_port, &reply);
        let reply_ip = build_ipv4_packet(ip.dst, ip.src, wire::PROTO_UDP, device.icmp.ttl, &reply_udp);
        Some(build_ethernet_frame(eth.src, device.mac, wire::ETHERTYPE_IPV4, &reply_ip))
    }

    fn handle_discovery(&self, kind: HandlerKind, bytes: &[u8], snapshot: &crate::index::DeviceIndexSnapshot) {
        let protocol = match kind {
            HandlerKind::Lldp => niac_types::DiscoveryProtocol::Lldp,
            HandlerKind::Cdp => niac_types::DiscoveryProtocol::Cdp,
            HandlerKind::Edp => niac_types::DiscoveryProtocol::Edp,
            HandlerKind::Fdp => niac_types::DiscoveryProtocol::Fdp,
            _ => return,
        };
        let Some(eth) = EthernetFrame::parse(bytes) else { return };
        let Some(local_device) = snapshot.by_mac(&eth.dst).or_else(|| snapshot.devices().first()) else { return };
        discovery::receive(&self.neighbors, &local_device.name, "unknown", protocol, bytes);
    }

    async fn transmit(&self, bytes: Vec<u8>) {
        let mut capture = self.capture.lock().await;
        if let Err(err) = capture.send(&bytes) {
            self.stats.record_error();
            tracing::warn!(error = %err, "failed to transmit synthesized frame");
        } else {
            self.stats.record_packet_sent();
        }
    }

    fn spawn_discovery_transmitter(self: &Arc<Self>) {
        let sim = self.clone();
        let tracker = Arc::new(DueTracker::default());
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            loop {
                interval.tick().await;
                if sim.shutdown.load(Ordering::SeqCst) {
                    return;
                }
                let snapshot = sim.index.snapshot();
                let now = Instant::now();
                for device in snapshot.devices() {
                    for (config, label) in [
                        (&device.lldp, "lldp"),
                        (&device.cdp, "cdp"),
                        (&device.edp, "edp"),
                        (&device.fdp, "fdp"),
                    ] {
                        let Some(config) = config else { continue };
                        let key = format!("{}:{}", device.name, label);
                        if tracker.due(&key, Duration::from_secs(config.interval_secs), now) {
                            for (_, frame) in discovery::announcements_for_device(device) {
                                sim.transmit(frame).await;
                            }
                        }
                    }
                }
            }
        });
        self.workers.lock().unwrap().push(handle);
    }

    fn spawn_stp_transmitter(self: &Arc<Self>) {
        let sim = self.clone();
        let tracker = Arc::new(DueTracker::default());
        let hello = Duration::from_secs(topology::HELLO_TIME_SECS as u64);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            loop {
                interval.tick().await;
                if sim.shutdown.load(Ordering::SeqCst) {
                    return;
                }
                let snapshot = sim.index.snapshot();
                let now = Instant::now();
                for device in snapshot.devices() {
                    let Some(stp) = &device.stp else { continue };
                    if tracker.due(&device.name, hello, now) {
                        sim.transmit(topology::build_config_bpdu(device, stp)).await;
                    }
                }
            }
        });
        self.workers.lock().unwrap().push(handle);
    }

    /// Emits a cold-start trap per SNMP-enabled device at startup, then
    /// polls each device's configured threshold policies once a second,
    /// debounced so only a state transition emits a trap (`spec.md` §4.8).
    fn spawn_trap_transmitter(self: &Arc<Self>) {
        let sim = self.clone();
        let handle = tokio::spawn(async move {
            let snapshot = sim.index.snapshot();
            for device in snapshot.devices() {
                if let Some(agent) = sim.protocols.snmp.get(&device.name) {
                    let trap = niac_snmp::cold_start(&agent.community_str(), agent.uptime_ticks());
                    sim.transmit(Self::build_trap_datagram(device, &trap)).await;
                }
            }

            let mut interval = tokio::time::interval(Duration::from_secs(1));
            let mut last_check: HashMap<(String, ThresholdMetric), Instant> = HashMap::new();
            let mut debouncers: HashMap<String, niac_snmp::ThresholdDebouncer> = HashMap::new();
            loop {
                interval.tick().await;
                if sim.shutdown.load(Ordering::SeqCst) {
                    return;
                }
                let snapshot = sim.index.snapshot();
                let now = Instant::now();
                for device in snapshot.devices() {
                    let Some(cfg) = &device.snmp_agent else { continue };
                    if cfg.traps.is_empty() {
                        continue;
                    }
                    let Some(agent) = sim.protocols.snmp.get(&device.name) else { continue };
                    let debouncer = debouncers.entry(device.name.clone()).or_default();
                    for policy in &cfg.traps {
                        let key = (device.name.clone(), policy.metric);
                        let due = match last_check.get(&key) {
                            Some(last) if now.duration_since(*last) < Duration::from_secs(policy.interval_secs) => false,
                            _ => true,
                        };
                        if !due {
                            continue;
                        }
                        last_check.insert(key, now);
                        let value = sim.synthesize_threshold_metric(&device.name, policy.metric);
                        if debouncer.observe(policy, value).is_some() {
                            let trap = niac_snmp::threshold_crossed(&agent.community_str(), agent.uptime_ticks(), policy.metric, value);
                            sim.transmit(Self::build_trap_datagram(device, &trap)).await;
                        }
                    }
                }
            }
        });
        self.workers.lock().unwrap().push(handle);
    }

    /// A baseline reading for a threshold metric, biased by the
    /// error-injection controller the same way interface counters are
    /// (`spec.md` §4.12), so an operator can drive a trap by raising the
    /// injected rate for `system`/the metric's `ErrorKind`.
    fn synthesize_threshold_metric(&self, device_name: &str, metric: ThresholdMetric) -> f64 {
        let baseline = match metric {
            ThresholdMetric::Cpu | ThresholdMetric::Memory | ThresholdMetric::Disk => 5.0,
            ThresholdMetric::InterfaceErrors => 0.0,
        };
        self.injection.biased_percent(device_name, "system", crate::inject::error_kind_for_metric(metric), baseline)
    }

    /// Traps have no configured manager address in this simulator, so they
    /// go out the same way a DHCP reply with no known client does: a
    /// broadcast from the device's own identity.
    fn build_trap_datagram(device: &Device, payload: &[u8]) -> Vec<u8> {
        let src_ip = device.primary_ip().unwrap_or(Ipv4Addr::UNSPECIFIED);
        let udp = build_udp_datagram(161, 162, payload);
        let ip = build_ipv4_packet(src_ip, Ipv4Addr::BROADCAST, wire::PROTO_UDP, device.icmp.ttl, &udp);
        build_ethernet_frame(niac_types::MacAddr::BROADCAST, device.mac, wire::ETHERTYPE_IPV4, &ip)
    }

    /// Low-rate synthetic background traffic (`spec.md` §3's `traffic`
    /// block): a harmless self-addressed UDP probe per opted-in device, on
    /// its own configured interval.
    fn spawn_traffic_transmitter(self: &Arc<Self>) {
        let sim = self.clone();
        let tracker = Arc::new(DueTracker::default());
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            loop {
                interval.tick().await;
                if sim.shutdown.load(Ordering::SeqCst) {
                    return;
                }
                let snapshot = sim.index.snapshot();
                let now = Instant::now();
                for device in snapshot.devices() {
                    let Some(cfg) = &device.traffic else { continue };
                    if !cfg.enabled {
                        continue;
                    }
                    let Some(ip) = device.primary_ip() else { continue };
                    if tracker.due(&device.name, Duration::from_secs(cfg.interval_secs), now) {
                        let payload = b"niac-traffic-probe";
                        let udp = build_udp_datagram(9, 9, payload);
                        let ip_pkt = build_ipv4_packet(ip, ip, wire::PROTO_UDP, device.icmp.ttl, &udp);
                        let frame = build_ethernet_frame(device.mac, device.mac, wire::ETHERTYPE_IPV4, &ip_pkt);
                        sim.transmit(frame).await;
                    }
                }
            }
        });
        self.workers.lock().unwrap().push(handle);
    }

    /// Logs a stats rollup every ten seconds, the periodic summary
    /// referenced alongside the running counters (see `stats` module).
    fn spawn_stats_rollup(self: &Arc<Self>) {
        let sim = self.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(10));
            interval.tick().await;
            loop {
                interval.tick().await;
                if sim.shutdown.load(Ordering::SeqCst) {
                    return;
                }
                let snapshot = sim.stats_snapshot();
                tracing::info!(
                    packets_received = snapshot.packets_received,
                    packets_sent = snapshot.packets_sent,
                    errors = snapshot.errors,
                    active_workers = snapshot.active_workers,
                    "stats rollup",
                );
            }
        });
        self.workers.lock().unwrap().push(handle);
    }

    /// Applies a proposed configuration via the reconciler (C14) while
    /// every worker keeps running against the swapped-in index.
    pub fn reconcile(&self, proposed: Vec<Device>) -> Result<reconcile::ReconcilePlan, Error> {
        let current: Vec<Device> = self.index.snapshot().devices().iter().map(|d| (**d).clone()).collect();
        reconcile::apply(&self.index, &current, proposed)
    }

    pub fn stats_snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot(&self.bus)
    }

    pub fn topology_snapshot(&self) -> topology::TopologySnapshot {
        topology::build_topology(&self.index.snapshot())
    }

    pub async fn start_replay(&self, playback: PlaybackConfig) -> Result<(), Error> {
        let sim_capture = self.capture.clone();
        let stats = self.stats.clone();
        self.replay
            .start(playback, move |bytes| {
                let capture = sim_capture.clone();
                let stats = stats.clone();
                let bytes = bytes.to_vec();
                if let Ok(mut guard) = capture.try_lock() {
                    if guard.send(&bytes).is_ok() {
                        stats.record_packet_sent();
                    }
                }
            })
            .await
    }

    pub fn stop_replay(&self) {
        self.replay.stop();
    }

    /// The documented shutdown sequence: stop transmitters, drain the bus,
    /// close the capture handle, flush statistics, persist the run
    /// record. HTTP shutdown is the control plane's responsibility.
    pub async fn stop(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.replay.stop();

        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.workers.lock().unwrap());
        for handle in handles {
            handle.abort();
        }

        {
            let mut capture = self.capture.lock().await;
            capture.close();
        }

        let snapshot = self.stats_snapshot();
        let record = stats::build_run_record(self.id.clone(), self.started_at, self.interface.clone(), self.config_name.clone(), self.index.snapshot().len(), &snapshot);
        stats::persist_run_record(&self.store, &record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use niac_capture::FakeCapture;
    use niac_config::SimConfig;
    use niac_types::{DeviceKind, IcmpConfig, MacAddr};

    fn test_config() -> SimConfig {
        let device = Device {
            name: "r1".into(),
            kind: DeviceKind::Router,
            mac: MacAddr::new([1, 2, 3, 4, 5, 6]),
            ips: vec![Ipv4Addr::new(192, 168, 1, 1)],
            ipv6s: vec![],
            vlan: None,
            interfaces: vec![],
            icmp: IcmpConfig::default(),
            snmp_agent: None,
            lldp: None,
            cdp: None,
            edp: None,
            fdp: None,
            dhcp: None,
            dns: None,
            stp: None,
            traffic: None,
            port_channels: vec![],
            trunk_ports: vec![],
            gratuitous_arp: false,
        };
        SimConfig { devices: vec![device], include_path: None, capture_playback: vec![], discovery_protocols: Default::default() }
    }

    #[tokio::test]
    async fn build_indexes_devices_and_has_no_running_workers_to_stop() {
        let loader: WalkFileLoader = Arc::new(|_: &str| Ok(String::new()));
        let sim = Simulation::build(
            "run-1".into(),
            &test_config(),
            "eth0".into(),
            "default".into(),
            Box::new(FakeCapture::new()),
            Arc::new(niac_store::Store::disabled()),
            loader,
        )
        .unwrap();
        assert_eq!(sim.index.snapshot().len(), 1);
        sim.stop().await;
    }

    #[tokio::test]
    async fn arp_request_injected_into_capture_yields_a_reply() {
        let loader: WalkFileLoader = Arc::new(|_: &str| Ok(String::new()));
        let mut capture = FakeCapture::new();
        let request = wire::build_ethernet_frame(
            MacAddr::BROADCAST,
            MacAddr::new([0xaa; 6]),
            wire::ETHERTYPE_ARP,
            &build_arp_request(MacAddr::new([0xaa; 6]), Ipv4Addr::new(192, 168, 1, 100), Ipv4Addr::new(192, 168, 1, 1)),
        );
        capture.inject(request);
        let sim = Simulation::build("run-2".into(), &test_config(), "eth0".into(), "default".into(), Box::new(capture), Arc::new(niac_store::Store::disabled()), loader).unwrap();

        sim.start();
        tokio::time::sleep(Duration::from_millis(200)).await;
        sim.stop().await;
    }

    fn build_arp_request(sender_mac: MacAddr, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Vec<u8> {
        let mut pkt = Vec::with_capacity(28);
        pkt.extend_from_slice(&1u16.to_be_bytes());
        pkt.extend_from_slice(&0x0800u16.to_be_bytes());
        pkt.push(6);
        pkt.push(4);
        pkt.extend_from_slice(&1u16.to_be_bytes());
        pkt.extend_from_slice(&sender_mac.octets());
        pkt.extend_from_slice(&sender_ip.octets());
        pkt.extend_from_slice(&MacAddr::ZERO.octets());
        pkt.extend_from_slice(&target_ip.octets());
        pkt
    }
}
