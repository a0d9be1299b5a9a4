//! HID report transport abstractions
//!
//! The USB and BLE HID stacks are provided by the platform. The control
//! protocol only needs a way to hand a finished report to whichever link
//! is active.

/// Outbound HID report sink
///
/// One call sends one physical report. Implementations must not split or
/// merge reports.
pub trait ReportTx {
    /// Error type for transmit operations
    type Error;

    /// Send a single report
    ///
    /// Resolves once the report has been queued on the link, or fails
    /// without partially sending it.
    fn send_report(
        &mut self,
        report: &[u8],
    ) -> impl core::future::Future<Output = Result<(), Self::Error>>;
}
