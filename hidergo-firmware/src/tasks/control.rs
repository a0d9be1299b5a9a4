//! Control protocol task
//!
//! Owns the report reassembler: receives control reports from the HID
//! endpoint, applies complete messages to the registry and queues the
//! responses. One message is handled at a time.

use core::convert::Infallible;

use defmt::*;
use hidergo_core::ControlService;
use hidergo_hal::ReportTx;
use hidergo_protocol::REPORT_SIZE;

use crate::channels::{ACTIVITY, HID_RX, HID_TX};
use crate::config::Registry;

/// Queues outbound reports on `HID_TX`
struct HidSender;

impl ReportTx for HidSender {
    type Error = Infallible;

    async fn send_report(&mut self, report: &[u8]) -> Result<(), Infallible> {
        let mut out = [0u8; REPORT_SIZE];
        let len = report.len().min(REPORT_SIZE);
        out[..len].copy_from_slice(&report[..len]);
        HID_TX.send(out).await;
        Ok(())
    }
}

/// Control task - dispatches SET/GET/CONNECT messages
#[embassy_executor::task]
pub async fn control_task(registry: &'static Registry) {
    info!("Control task started");

    let mut service = ControlService::new(registry);
    let mut tx = HidSender;

    loop {
        let report = HID_RX.receive().await;
        match service.process(&report, &mut tx).await {
            Ok(true) => {
                trace!("Control message handled");
                ACTIVITY.signal(());
            }
            Ok(false) => {}
            Err(e) => warn!("Control message dropped: {}", e),
        }
    }
}
