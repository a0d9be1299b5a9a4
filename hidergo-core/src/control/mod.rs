//! Control protocol handling
//!
//! Interprets reassembled control messages against the configuration
//! registry and sends responses back as chunked reports. Messages are
//! processed strictly one at a time by a single task.

use embassy_sync::blocking_mutex::raw::RawMutex;
use hidergo_hal::{ConfigStore, ReportTx};
use hidergo_protocol::messages::{CMD_CONNECT, CMD_GET_CONFIG};
use hidergo_protocol::{
    Command, GetConfigRequest, GetConfigResponse, Message, ProtocolError, ReportAssembler,
    ReportChunks, SetConfig,
};

use crate::config::{ConfigError, ConfigKey, ConfigRegistry, MAX_FIELD_SIZE};

/// Errors from handling a control message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlError {
    /// Malformed or unsupported message
    Protocol(ProtocolError),
    /// Registry rejected the request
    Config(ConfigError),
    /// Sending a response report failed, remaining reports dropped
    Transport,
}

impl From<ProtocolError> for ControlError {
    fn from(e: ProtocolError) -> Self {
        ControlError::Protocol(e)
    }
}

impl From<ConfigError> for ControlError {
    fn from(e: ConfigError) -> Self {
        ControlError::Config(e)
    }
}

/// Executes control commands against a registry
pub struct ControlDispatcher<'r, 'a, M: RawMutex, S: ConfigStore, const N: usize> {
    registry: &'r ConfigRegistry<'a, M, S, N>,
}

impl<'r, 'a, M: RawMutex, S: ConfigStore, const N: usize> ControlDispatcher<'r, 'a, M, S, N> {
    pub fn new(registry: &'r ConfigRegistry<'a, M, S, N>) -> Self {
        Self { registry }
    }

    /// Handle one complete message
    pub async fn dispatch<T: ReportTx>(
        &self,
        message: &Message,
        tx: &mut T,
    ) -> Result<(), ControlError> {
        match Command::from_u8(message.cmd) {
            Some(Command::Connect) => {
                trace!("Control: connect");
                send_message(CMD_CONNECT, &[], tx).await
            }
            Some(Command::SetConfig) => self.set_config(&message.payload).await,
            Some(Command::GetConfig) => self.get_config(&message.payload, tx).await,
            Some(Command::Invalid) | None => {
                warn!("Control: unsupported command {=u8:#04x}", message.cmd);
                Err(ProtocolError::UnsupportedCommand.into())
            }
        }
    }

    async fn set_config(&self, payload: &[u8]) -> Result<(), ControlError> {
        let msg = SetConfig::decode(payload)?;
        let key = ConfigKey(msg.key);

        let field = self.registry.get(key).ok_or_else(|| {
            error!("Control: field {=u16:#06x} not found", msg.key);
            ConfigError::NotFound
        })?;

        if msg.size as usize != field.size() {
            error!(
                "Control: field {=u16:#06x} size {} received, {} defined",
                msg.key,
                msg.size,
                field.size()
            );
            return Err(ConfigError::SizeMismatch.into());
        }

        self.registry.set(key, msg.data).await?;

        let saved = if field.is_saveable() && msg.save {
            self.registry.write(key).await
        } else {
            Ok(())
        };

        self.registry.notify(key).await?;
        debug!("Control: field {=u16:#06x} updated", msg.key);

        saved.map_err(ControlError::from)
    }

    async fn get_config<T: ReportTx>(&self, payload: &[u8], tx: &mut T) -> Result<(), ControlError> {
        let req = GetConfigRequest::decode(payload)?;
        let key = ConfigKey(req.key);

        let field = self.registry.get(key).ok_or(ConfigError::NotFound)?;
        if field.size() > req.max_size as usize {
            warn!(
                "Control: field {=u16:#06x} is {} bytes, host accepts {}",
                req.key,
                field.size(),
                req.max_size
            );
            return Err(ConfigError::SizeMismatch.into());
        }

        let mut data = [0u8; MAX_FIELD_SIZE];
        let len = self.registry.copy_to(key, &mut data).await?;

        let response = GetConfigResponse {
            key: req.key,
            data: &data[..len],
        }
        .encode()?;

        send_message(CMD_GET_CONFIG, &response, tx).await
    }
}

/// Send one logical message as a sequence of reports
///
/// Stops at the first failed send; reports already sent are not retried.
pub async fn send_message<T: ReportTx>(
    cmd: u8,
    payload: &[u8],
    tx: &mut T,
) -> Result<(), ControlError> {
    let chunks = ReportChunks::new(cmd, payload)?;
    let _total = chunks.report_count();

    for (_index, report) in chunks.enumerate() {
        if tx.send_report(&report).await.is_err() {
            warn!("Control: send aborted at report {}/{}", _index + 1, _total);
            return Err(ControlError::Transport);
        }
    }
    Ok(())
}

/// Reassembles inbound reports and dispatches complete messages
pub struct ControlService<'r, 'a, M: RawMutex, S: ConfigStore, const N: usize> {
    assembler: ReportAssembler,
    dispatcher: ControlDispatcher<'r, 'a, M, S, N>,
}

impl<'r, 'a, M: RawMutex, S: ConfigStore, const N: usize> ControlService<'r, 'a, M, S, N> {
    pub fn new(registry: &'r ConfigRegistry<'a, M, S, N>) -> Self {
        Self {
            assembler: ReportAssembler::new(),
            dispatcher: ControlDispatcher::new(registry),
        }
    }

    /// Feed one inbound transport piece
    ///
    /// Returns `Ok(true)` when the piece completed a message and it was
    /// handled, `Ok(false)` while a message is still being assembled.
    pub async fn process<T: ReportTx>(
        &mut self,
        piece: &[u8],
        tx: &mut T,
    ) -> Result<bool, ControlError> {
        let Some(message) = self.assembler.feed(piece)? else {
            return Ok(false);
        };
        self.dispatcher.dispatch(&message, tx).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::registry::tests::{MockStore, TestRegistry};
    use crate::config::ConfigObserver;
    use embassy_futures::block_on;
    use hidergo_protocol::messages::CMD_SET_CONFIG;
    use hidergo_protocol::{Header, HEADER_SIZE, REPORT_SIZE};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::vec::Vec as StdVec;

    #[derive(Default)]
    struct MockTx {
        reports: StdVec<[u8; REPORT_SIZE]>,
        fail_at: Option<usize>,
    }

    impl ReportTx for MockTx {
        type Error = ();

        async fn send_report(&mut self, report: &[u8]) -> Result<(), ()> {
            if self.fail_at == Some(self.reports.len()) {
                return Err(());
            }
            let mut buf = [0u8; REPORT_SIZE];
            buf.copy_from_slice(report);
            self.reports.push(buf);
            Ok(())
        }
    }

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl ConfigObserver for Counter {
        fn on_update(&self, _key: ConfigKey, _data: &[u8]) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    const SLEEP: ConfigKey = ConfigKey::SLEEP_TIMEOUT;
    const DATETIME: ConfigKey = ConfigKey::DATETIME;

    fn set_message(key: ConfigKey, save: bool, data: &[u8]) -> Message {
        let payload = SetConfig {
            key: key.0,
            size: data.len() as u16,
            save,
            data,
        }
        .encode()
        .unwrap();
        Message {
            cmd: CMD_SET_CONFIG,
            payload,
        }
    }

    fn get_message(key: ConfigKey, max_size: u16) -> Message {
        let mut payload = heapless::Vec::new();
        payload
            .extend_from_slice(&GetConfigRequest { key: key.0, max_size }.encode())
            .unwrap();
        Message {
            cmd: CMD_GET_CONFIG,
            payload,
        }
    }

    #[test]
    fn test_set_saveable_persists_and_notifies() {
        let counter = Counter::default();
        block_on(async {
            let mut reg = TestRegistry::new(MockStore::default());
            reg.bind(SLEEP, &[0, 0], true, Some(&counter)).await.unwrap();

            let dispatcher = ControlDispatcher::new(&reg);
            let mut tx = MockTx::default();
            dispatcher
                .dispatch(&set_message(SLEEP, true, &[0x2C, 0x01]), &mut tx)
                .await
                .unwrap();

            assert_eq!(reg.load::<u16>(SLEEP).await, Ok(300));
            assert!(tx.reports.is_empty());
            assert_eq!(reg.into_store().records[&SLEEP.0], std::vec![0x2C, 0x01]);
        });
        assert_eq!(counter.0.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_set_without_save_flag_stays_in_ram() {
        block_on(async {
            let mut reg = TestRegistry::new(MockStore::default());
            reg.bind(SLEEP, &[0, 0], true, None).await.unwrap();

            let dispatcher = ControlDispatcher::new(&reg);
            dispatcher
                .dispatch(&set_message(SLEEP, false, &[1, 0]), &mut MockTx::default())
                .await
                .unwrap();

            assert_eq!(reg.load::<u16>(SLEEP).await, Ok(1));
            assert!(reg.into_store().writes.is_empty());
        });
    }

    #[test]
    fn test_set_transient_ignores_save_flag() {
        let counter = Counter::default();
        block_on(async {
            let mut reg = TestRegistry::new(MockStore::default());
            reg.bind(DATETIME, &[0; 8], false, Some(&counter))
                .await
                .unwrap();

            let dispatcher = ControlDispatcher::new(&reg);
            dispatcher
                .dispatch(&set_message(DATETIME, true, &[7; 8]), &mut MockTx::default())
                .await
                .unwrap();

            assert!(reg.into_store().writes.is_empty());
        });
        assert_eq!(counter.0.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_set_size_mismatch_leaves_field() {
        let counter = Counter::default();
        block_on(async {
            let mut reg = TestRegistry::new(MockStore::default());
            reg.bind(SLEEP, &[5, 0], true, Some(&counter)).await.unwrap();

            let dispatcher = ControlDispatcher::new(&reg);
            let result = dispatcher
                .dispatch(&set_message(SLEEP, true, &[1, 2, 3]), &mut MockTx::default())
                .await;

            assert_eq!(result, Err(ControlError::Config(ConfigError::SizeMismatch)));
            assert_eq!(reg.load::<u16>(SLEEP).await, Ok(5));
            assert!(reg.into_store().writes.is_empty());
        });
        assert_eq!(counter.0.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_set_write_failure_still_notifies() {
        let counter = Counter::default();
        block_on(async {
            let mut store = MockStore::default();
            store.fail_writes = true;
            let mut reg = TestRegistry::new(store);
            reg.bind(SLEEP, &[0, 0], true, Some(&counter)).await.unwrap();

            let dispatcher = ControlDispatcher::new(&reg);
            let result = dispatcher
                .dispatch(&set_message(SLEEP, true, &[9, 0]), &mut MockTx::default())
                .await;

            assert!(matches!(
                result,
                Err(ControlError::Config(ConfigError::Storage(_)))
            ));
            // RAM value applied even though flash failed
            assert_eq!(reg.load::<u16>(SLEEP).await, Ok(9));
        });
        assert_eq!(counter.0.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_set_unknown_key() {
        block_on(async {
            let reg = TestRegistry::new(MockStore::default());
            let dispatcher = ControlDispatcher::new(&reg);
            let result = dispatcher
                .dispatch(&set_message(SLEEP, false, &[0, 0]), &mut MockTx::default())
                .await;
            assert_eq!(result, Err(ControlError::Config(ConfigError::NotFound)));
        });
    }

    #[test]
    fn test_get_sends_chunked_response() {
        block_on(async {
            let value: StdVec<u8> = (0..60u8).collect();
            let mut reg = TestRegistry::new(MockStore::default());
            reg.bind(ConfigKey::TRACKPAD_REGISTERS, &value, false, None)
                .await
                .unwrap();

            let dispatcher = ControlDispatcher::new(&reg);
            let mut tx = MockTx::default();
            dispatcher
                .dispatch(&get_message(ConfigKey::TRACKPAD_REGISTERS, 128), &mut tx)
                .await
                .unwrap();

            // 4-byte response header + 60 data bytes = 64 bytes, 3 reports
            assert_eq!(tx.reports.len(), 3);
            let sizes: StdVec<(u8, u16)> = tx
                .reports
                .iter()
                .map(|r| {
                    let h = Header::decode(r).unwrap();
                    (h.chunk_size, h.chunk_offset)
                })
                .collect();
            assert_eq!(sizes, std::vec![(24, 0), (24, 24), (16, 48)]);

            let mut assembler = ReportAssembler::new();
            let mut message = None;
            for report in &tx.reports {
                message = assembler.feed(report).unwrap().or(message);
            }
            let message = message.unwrap();
            assert_eq!(message.cmd, CMD_GET_CONFIG);

            let response = GetConfigResponse::decode(&message.payload).unwrap();
            assert_eq!(response.key, ConfigKey::TRACKPAD_REGISTERS.0);
            assert_eq!(response.data, &value[..]);
        });
    }

    #[test]
    fn test_get_larger_than_host_buffer() {
        block_on(async {
            let mut reg = TestRegistry::new(MockStore::default());
            reg.bind(SLEEP, &[0, 0], false, None).await.unwrap();

            let dispatcher = ControlDispatcher::new(&reg);
            let mut tx = MockTx::default();
            let result = dispatcher.dispatch(&get_message(SLEEP, 1), &mut tx).await;

            assert_eq!(result, Err(ControlError::Config(ConfigError::SizeMismatch)));
            assert!(tx.reports.is_empty());
        });
    }

    #[test]
    fn test_get_aborts_on_send_failure() {
        block_on(async {
            let mut reg = TestRegistry::new(MockStore::default());
            reg.bind(ConfigKey::DEVICE_INFO, &[0xAB; 115], false, None)
                .await
                .unwrap();

            let dispatcher = ControlDispatcher::new(&reg);
            let mut tx = MockTx {
                fail_at: Some(2),
                ..Default::default()
            };
            let result = dispatcher
                .dispatch(&get_message(ConfigKey::DEVICE_INFO, 115), &mut tx)
                .await;

            assert_eq!(result, Err(ControlError::Transport));
            assert_eq!(tx.reports.len(), 2);
        });
    }

    #[test]
    fn test_connect_acknowledged() {
        block_on(async {
            let reg = TestRegistry::new(MockStore::default());
            let dispatcher = ControlDispatcher::new(&reg);
            let mut tx = MockTx::default();
            let message = Message {
                cmd: CMD_CONNECT,
                payload: heapless::Vec::new(),
            };
            dispatcher.dispatch(&message, &mut tx).await.unwrap();

            assert_eq!(tx.reports.len(), 1);
            let header = Header::decode(&tx.reports[0]).unwrap();
            assert_eq!((header.cmd, header.size, header.chunk_size), (CMD_CONNECT, 0, 0));
        });
    }

    #[test]
    fn test_unsupported_command() {
        block_on(async {
            let reg = TestRegistry::new(MockStore::default());
            let dispatcher = ControlDispatcher::new(&reg);
            let mut tx = MockTx::default();

            for cmd in [0x00, 0x33] {
                let message = Message {
                    cmd,
                    payload: heapless::Vec::new(),
                };
                assert_eq!(
                    dispatcher.dispatch(&message, &mut tx).await,
                    Err(ControlError::Protocol(ProtocolError::UnsupportedCommand))
                );
            }
            assert!(tx.reports.is_empty());
        });
    }

    #[test]
    fn test_service_reassembles_and_dispatches() {
        block_on(async {
            let mut reg = TestRegistry::new(MockStore::default());
            reg.bind(ConfigKey::TRACKPAD_REGISTERS, &[0u8; 40], true, None)
                .await
                .unwrap();

            let value = [0x5Au8; 40];
            let payload = set_message(ConfigKey::TRACKPAD_REGISTERS, true, &value).payload;
            let reports: StdVec<[u8; REPORT_SIZE]> =
                ReportChunks::new(CMD_SET_CONFIG, &payload).unwrap().collect();
            assert_eq!(reports.len(), 2);

            let mut service = ControlService::new(&reg);
            let mut tx = MockTx::default();
            assert_eq!(service.process(&reports[0], &mut tx).await, Ok(false));
            assert_eq!(service.process(&reports[1], &mut tx).await, Ok(true));

            let mut out = [0u8; 40];
            reg.copy_to(ConfigKey::TRACKPAD_REGISTERS, &mut out)
                .await
                .unwrap();
            assert_eq!(out, value);
        });
    }

    #[test]
    fn test_service_reports_bad_report() {
        block_on(async {
            let reg = TestRegistry::new(MockStore::default());
            let mut service = ControlService::new(&reg);
            let mut tx = MockTx::default();

            let mut report = [0u8; REPORT_SIZE];
            report[0] = 0x01;
            assert_eq!(
                service.process(&report, &mut tx).await,
                Err(ControlError::Protocol(ProtocolError::BadReportId))
            );
            assert_eq!(
                service.process(&report[..HEADER_SIZE - 1], &mut tx).await,
                Err(ControlError::Protocol(ProtocolError::Truncated))
            );
        });
    }
}
