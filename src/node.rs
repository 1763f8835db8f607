//! # Node
//!
//! One end of the link: owns the store, the radio link, the console and the
//! task table, and runs the due tasks on every tick.
//!
//! Task failures are logged and never stop the node.

use std::io::Write;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::{Config, Role, ScheduleConfig};
use crate::console::{Console, ConsoleAction};
use crate::error::Result;
use crate::link::{RadioLink, Received, Transceiver};
use crate::packet::encoder::calib_pages;
use crate::packet::protocol::Packet;
use crate::scheduler::Scheduler;
use crate::sensors::SensorSource;
use crate::telemetry::logger::TelemetryLogger;
use crate::telemetry::present::render_class;
use crate::telemetry::store::TelemetryStore;

/// Printed when a ping arrives over the radio
pub const PING_REPLY: &str = "radio link OK\n";

/// Task priority groups, run in this order within a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Update = 0,
    Send = 1,
    Persist = 2,
    Poll = 3,
}

/// Periodic node tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    UpdateImu,
    UpdateGps,
    UpdatePower,
    UpdatePhotoresistor,
    SendImu,
    SendGps,
    SendPhotoresistor,
    SendPower,
    RequestCalibration,
    WriteLog,
    PollRadio,
    PollConsole,
}

impl Task {
    pub fn stage(self) -> Stage {
        match self {
            Task::UpdateImu | Task::UpdateGps | Task::UpdatePower | Task::UpdatePhotoresistor => {
                Stage::Update
            }
            Task::SendImu
            | Task::SendGps
            | Task::SendPhotoresistor
            | Task::SendPower
            | Task::RequestCalibration => Stage::Send,
            Task::WriteLog => Stage::Persist,
            Task::PollRadio | Task::PollConsole => Stage::Poll,
        }
    }
}

/// Task table for a role
pub fn build_schedule(role: Role, schedule: &ScheduleConfig, logging: bool) -> Scheduler<Task> {
    let mut scheduler = Scheduler::new();
    let mut add = |task: Task, interval_ms: u32| scheduler.add(task, task.stage() as u8, interval_ms);

    match role {
        Role::Flight => {
            add(Task::UpdateImu, schedule.imu_update_ms);
            add(Task::UpdateGps, schedule.gps_update_ms);
            add(Task::UpdatePower, schedule.power_update_ms);
            add(Task::UpdatePhotoresistor, schedule.photoresistor_update_ms);
            add(Task::SendImu, schedule.imu_send_ms);
            add(Task::SendGps, schedule.gps_send_ms);
            add(Task::SendPhotoresistor, schedule.photoresistor_send_ms);
            add(Task::SendPower, schedule.power_send_ms);
        }
        Role::Ground => {
            add(Task::RequestCalibration, schedule.calib_request_interval_ms);
        }
    }

    if logging {
        add(Task::WriteLog, schedule.log_interval_ms);
    }
    add(Task::PollRadio, schedule.radio_poll_ms);
    add(Task::PollConsole, schedule.console_poll_ms);

    scheduler
}

/// One end of the telemetry link
pub struct Node<T, S> {
    role: Role,
    store: TelemetryStore,
    link: RadioLink<T>,
    scheduler: Scheduler<Task>,
    console: Console,
    sensors: S,
    logger: Option<TelemetryLogger>,
    print_on_receive: bool,
    commands: mpsc::Receiver<String>,
    out: Box<dyn Write + Send>,
}

impl<T, S> std::fmt::Debug for Node<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("role", &self.role)
            .field("link", &self.link)
            .field("logger", &self.logger)
            .finish_non_exhaustive()
    }
}

impl<T: Transceiver, S: SensorSource> Node<T, S> {
    /// Assemble a node
    ///
    /// `commands` carries console lines; `out` receives console and
    /// presentation output.
    pub fn new(
        config: &Config,
        link: RadioLink<T>,
        sensors: S,
        commands: mpsc::Receiver<String>,
        out: Box<dyn Write + Send>,
    ) -> Self {
        let logger = config
            .telemetry
            .enabled
            .then(|| TelemetryLogger::new(&config.telemetry));

        Self {
            role: config.node.role,
            store: TelemetryStore::new(),
            link,
            scheduler: build_schedule(config.node.role, &config.schedule, logger.is_some()),
            console: Console::new(config.node.output, config.node.role),
            sensors,
            logger,
            print_on_receive: config.node.print_on_receive,
            commands,
            out,
        }
    }

    pub fn store(&self) -> &TelemetryStore {
        &self.store
    }

    pub fn scheduler(&self) -> &Scheduler<Task> {
        &self.scheduler
    }

    /// Role-specific start-up; the flight side loads its calibration table
    pub fn start(&mut self) {
        if self.role != Role::Flight {
            return;
        }

        match self.sensors.read_calibration() {
            Some(ranges) => {
                for page in calib_pages(&ranges) {
                    self.store.apply(&Packet::CalibPage(page));
                }
                info!("Loaded photoresistor calibration");
            }
            None => warn!("No photoresistor calibration available"),
        }
    }

    /// Run every task due at `now`
    pub async fn step(&mut self, now: u32) {
        for task in self.scheduler.tick(now) {
            if let Err(e) = self.run(task, now).await {
                warn!("Task {:?} failed: {}", task, e);
            }
        }
    }

    async fn run(&mut self, task: Task, now: u32) -> Result<()> {
        match task {
            Task::UpdateImu => {
                if let Some(imu) = self.sensors.read_imu(now) {
                    self.store.apply(&Packet::Imu(imu));
                }
            }
            Task::UpdateGps => {
                if let Some(gps) = self.sensors.read_gps(now) {
                    self.store.apply(&Packet::Gps(gps));
                }
            }
            Task::UpdatePower => {
                if let Some(power) = self.sensors.read_power(now) {
                    self.store.apply(&Packet::Power(power));
                }
            }
            Task::UpdatePhotoresistor => {
                if let Some(pht) = self.sensors.read_photoresistors(now) {
                    self.store.apply(&Packet::Photoresistor(pht));
                }
            }
            Task::SendImu => {
                self.link.send(&Packet::Imu(*self.store.imu())).await?;
            }
            Task::SendGps => {
                self.link.send(&Packet::Gps(*self.store.gps())).await?;
            }
            Task::SendPhotoresistor => {
                self.link
                    .send(&Packet::Photoresistor(*self.store.photoresistor()))
                    .await?;
            }
            Task::SendPower => {
                self.link.send(&Packet::Power(*self.store.power())).await?;
            }
            Task::RequestCalibration => {
                if !self.store.calibration().is_complete() {
                    debug!("Requesting photoresistor calibration");
                    self.link.send(&Packet::CalibRequest).await?;
                }
            }
            Task::WriteLog => {
                if let Some(logger) = self.logger.as_mut() {
                    logger.append(&self.store, now)?;
                }
            }
            Task::PollRadio => {
                if let Some(received) = self.link.poll_inbound(&mut self.store).await? {
                    self.on_received(received).await?;
                }
            }
            Task::PollConsole => {
                while let Ok(line) = self.commands.try_recv() {
                    self.on_console_line(&line).await?;
                }
            }
        }
        Ok(())
    }

    async fn on_received(&mut self, received: Received) -> Result<()> {
        match received.packet {
            Packet::Ping => {
                info!("Ping received");
                self.print(PING_REPLY)?;
            }
            Packet::CalibRequest => self.send_calibration().await?,
            _ => {
                if let (true, Some(class)) = (self.print_on_receive, received.class) {
                    let text = render_class(&self.store, class, self.console.mode());
                    self.print(&text)?;
                }
            }
        }
        Ok(())
    }

    /// Answer a calibration request with all three pages
    async fn send_calibration(&mut self) -> Result<()> {
        let calibration = *self.store.calibration();
        if self.role != Role::Flight || !calibration.is_complete() {
            debug!("Ignoring calibration request, no table to send");
            return Ok(());
        }

        for page in calib_pages(&calibration.ranges) {
            self.link.send(&Packet::CalibPage(page)).await?;
        }
        debug!("Sent photoresistor calibration");
        Ok(())
    }

    async fn on_console_line(&mut self, line: &str) -> Result<()> {
        let reply = self.console.handle_line(line, &self.store);
        self.print(&reply.output)?;

        match reply.action {
            ConsoleAction::None => {}
            ConsoleAction::SendPing => {
                self.link.send(&Packet::Ping).await?;
            }
            ConsoleAction::RequestCalibration => {
                self.link.send(&Packet::CalibRequest).await?;
            }
        }
        Ok(())
    }

    fn print(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.out.write_all(text.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::transceiver::mocks::MockTransceiver;
    use crate::packet::decoder::decode;
    use crate::packet::encoder::encode;
    use crate::packet::protocol::*;
    use crate::sensors::{MockSensorSource, SimulatedSensors};
    use crate::telemetry::present::OutputMode;
    use std::sync::{Arc, Mutex};

    /// Console output captured for assertions
    #[derive(Clone, Default)]
    struct SharedOutput(Arc<Mutex<Vec<u8>>>);

    impl SharedOutput {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedOutput {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct Harness<S> {
        node: Node<MockTransceiver, S>,
        radio: MockTransceiver,
        output: SharedOutput,
        commands: mpsc::Sender<String>,
    }

    fn test_config(role: Role) -> Config {
        let mut config = Config::default();
        config.node.role = role;
        config.node.output = OutputMode::Machine;
        config.telemetry.enabled = false;
        config
    }

    /// Only the radio and console polls run, so every write comes from the test
    fn poll_only_config(role: Role) -> Config {
        let mut config = test_config(role);
        config.schedule = ScheduleConfig {
            gps_update_ms: 0,
            imu_update_ms: 0,
            power_update_ms: 0,
            photoresistor_update_ms: 0,
            gps_send_ms: 0,
            imu_send_ms: 0,
            photoresistor_send_ms: 0,
            power_send_ms: 0,
            calib_request_interval_ms: 0,
            log_interval_ms: 0,
            ..config.schedule
        };
        config
    }

    async fn harness<S: SensorSource>(config: &Config, sensors: S) -> Harness<S> {
        let radio = MockTransceiver::new();
        let link = RadioLink::new(radio.clone(), &config.radio).await.unwrap();
        let output = SharedOutput::default();
        let (commands, rx) = mpsc::channel(8);
        let node = Node::new(config, link, sensors, rx, Box::new(output.clone()));

        Harness {
            node,
            radio,
            output,
            commands,
        }
    }

    fn sent_packets(radio: &MockTransceiver) -> Vec<Packet> {
        radio
            .written()
            .iter()
            .map(|frame| decode(frame).unwrap())
            .collect()
    }

    #[test]
    fn test_stage_order() {
        assert!(Stage::Update < Stage::Send);
        assert!(Stage::Send < Stage::Persist);
        assert!(Stage::Persist < Stage::Poll);
        assert_eq!(Task::RequestCalibration.stage(), Stage::Send);
        assert_eq!(Task::PollConsole.stage(), Stage::Poll);
    }

    #[test]
    fn test_schedule_is_stage_ordered() {
        let scheduler = build_schedule(Role::Flight, &ScheduleConfig::default(), true);
        let stages: Vec<Stage> = scheduler.tasks().iter().map(|t| t.kind.stage()).collect();

        let mut sorted = stages.clone();
        sorted.sort();
        assert_eq!(stages, sorted);
        assert!(scheduler.tasks().iter().any(|t| t.kind == Task::WriteLog));
    }

    #[test]
    fn test_ground_schedule_has_no_sensor_tasks() {
        let scheduler = build_schedule(Role::Ground, &ScheduleConfig::default(), false);
        let kinds: Vec<Task> = scheduler.tasks().iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![Task::RequestCalibration, Task::PollRadio, Task::PollConsole]);
    }

    #[tokio::test]
    async fn test_flight_updates_before_sending() {
        let config = test_config(Role::Flight);
        let mut h = harness(&config, SimulatedSensors::new()).await;
        h.node.start();

        h.node.step(1000).await;

        let packets = sent_packets(&h.radio);
        let kinds: Vec<PacketKind> = packets.iter().map(|p| p.kind()).collect();
        assert_eq!(
            kinds,
            vec![PacketKind::Imu, PacketKind::Gps, PacketKind::Photoresistor, PacketKind::Power]
        );

        // sends carry the readings taken earlier in the same tick
        match packets[0] {
            Packet::Imu(imu) => assert_eq!(imu.timestamp, 1000),
            other => panic!("Expected IMU packet, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_first_step_runs_every_task() {
        let config = test_config(Role::Flight);
        let mut h = harness(&config, SimulatedSensors::new()).await;
        h.node.start();

        h.node.step(0).await;
        assert_eq!(sent_packets(&h.radio).len(), 4);

        h.node.step(10).await;
        assert_eq!(sent_packets(&h.radio).len(), 4);
    }

    #[tokio::test]
    async fn test_missing_reading_keeps_previous_value() {
        let mut sensors = MockSensorSource::new();
        sensors.expect_read_calibration().returning(|| None);
        let mut readings = 0;
        sensors.expect_read_imu().returning(move |now| {
            readings += 1;
            (readings == 1).then(|| ImuRecord {
                temperature: 30.0,
                timestamp: now,
                ..Default::default()
            })
        });
        sensors.expect_read_gps().returning(|_| None);
        sensors.expect_read_power().returning(|_| None);
        sensors.expect_read_photoresistors().returning(|_| None);

        let config = test_config(Role::Flight);
        let mut h = harness(&config, sensors).await;
        h.node.start();

        h.node.step(1000).await;
        h.node.step(2000).await;

        assert_eq!(h.node.store().imu().temperature, 30.0);
        assert_eq!(h.node.store().imu().timestamp, 1000);
    }

    #[tokio::test]
    async fn test_flight_answers_calibration_request() {
        let config = test_config(Role::Flight);
        let mut h = harness(&config, SimulatedSensors::new()).await;
        h.node.start();

        h.radio.deliver(encode(&Packet::CalibRequest));
        h.node.step(10).await;

        let pages: Vec<u8> = sent_packets(&h.radio)
            .into_iter()
            .filter_map(|p| match p {
                Packet::CalibPage(page) => Some(page.page()),
                _ => None,
            })
            .collect();
        assert_eq!(pages, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_ground_requests_calibration_until_complete() {
        let config = test_config(Role::Ground);
        let mut h = harness(&config, SimulatedSensors::new()).await;
        h.node.start();

        h.node.step(1000).await;
        assert_eq!(sent_packets(&h.radio), vec![Packet::CalibRequest]);

        for (i, page) in calib_pages(&[ChannelRange::new(0.0, 5.0); 8]).into_iter().enumerate() {
            h.radio.deliver(encode(&Packet::CalibPage(page)));
            h.node.step(1010 + 10 * i as u32).await;
        }
        assert!(h.node.store().calibration().is_complete());

        h.node.step(2100).await;
        assert_eq!(sent_packets(&h.radio).len(), 1);
    }

    #[tokio::test]
    async fn test_ground_ignores_calibration_request() {
        let config = poll_only_config(Role::Ground);
        let mut h = harness(&config, SimulatedSensors::new()).await;

        h.radio.deliver(encode(&Packet::CalibRequest));
        h.node.step(10).await;

        assert!(h.radio.written().is_empty());
    }

    #[tokio::test]
    async fn test_received_telemetry_is_printed() {
        let config = test_config(Role::Ground);
        let mut h = harness(&config, SimulatedSensors::new()).await;

        h.radio.deliver(encode(&Packet::Power(PowerRecord {
            detection_count: 42,
            ..Default::default()
        })));
        h.node.step(10).await;

        assert_eq!(h.node.store().power().detection_count, 42);
        assert!(h.output.text().starts_with("0;42;"));
    }

    #[tokio::test]
    async fn test_print_on_receive_disabled() {
        let mut config = test_config(Role::Ground);
        config.node.print_on_receive = false;
        let mut h = harness(&config, SimulatedSensors::new()).await;

        h.radio.deliver(encode(&Packet::Power(PowerRecord::default())));
        h.node.step(10).await;

        assert!(h.output.text().is_empty());
    }

    #[tokio::test]
    async fn test_ping_is_reported() {
        let config = poll_only_config(Role::Flight);
        let mut h = harness(&config, SimulatedSensors::new()).await;

        h.radio.deliver(encode(&Packet::Ping));
        h.node.step(10).await;

        assert_eq!(h.output.text(), PING_REPLY);
    }

    #[tokio::test]
    async fn test_console_request_reads_store() {
        let config = test_config(Role::Ground);
        let mut h = harness(&config, SimulatedSensors::new()).await;

        h.radio.deliver(encode(&Packet::Imu(ImuRecord {
            temperature: 20.0,
            ..Default::default()
        })));
        h.node.step(10).await;
        h.output.0.lock().unwrap().clear();

        h.commands.send("K31".to_string()).await.unwrap();
        h.commands.send("nonsense".to_string()).await.unwrap();
        h.node.step(20).await;

        let text = h.output.text();
        assert!(text.starts_with("K31\n1;"));
        assert!(text.ends_with("OK\ninvalid command\n"));
    }

    #[tokio::test]
    async fn test_console_ping_goes_out_over_radio() {
        let config = poll_only_config(Role::Flight);
        let mut h = harness(&config, SimulatedSensors::new()).await;

        h.commands.send("K1".to_string()).await.unwrap();
        h.node.step(10).await;

        assert_eq!(sent_packets(&h.radio), vec![Packet::Ping]);
        assert_eq!(h.output.text(), "K1\nOK\n");
    }

    #[tokio::test]
    async fn test_send_failure_does_not_stop_the_node() {
        let config = test_config(Role::Flight);
        let mut h = harness(&config, SimulatedSensors::new()).await;
        h.radio.set_write_error(std::io::ErrorKind::BrokenPipe);

        h.node.step(1000).await;

        assert_eq!(h.node.store().imu().timestamp, 1000);
        assert!(h.radio.is_listening());
    }

    #[tokio::test]
    async fn test_log_rows_written() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = test_config(Role::Flight);
        config.telemetry.enabled = true;
        config.telemetry.log_dir = dir.path().to_string_lossy().into_owned();
        let mut h = harness(&config, SimulatedSensors::new()).await;

        h.node.step(1000).await;
        h.node.step(2000).await;

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        let path = files[0].as_ref().unwrap().path();
        let contents = std::fs::read_to_string(path).unwrap();
        assert_eq!(contents.lines().count(), 3);
    }
}
