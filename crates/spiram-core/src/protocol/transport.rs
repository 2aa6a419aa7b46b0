//! Command transport
//!
//! Every transaction the core issues goes through [`execute`], which refuses
//! malformed framing before the controller sees it.

use crate::bus::BusTransaction;
use crate::controller::BusController;
use crate::error::Result;

/// Validate and issue one transaction
///
/// Blocks until the controller reports completion or the backend's poll
/// budget runs out. Nothing is retried.
pub fn execute<B: BusController + ?Sized>(
    bus: &mut B,
    txn: &mut BusTransaction<'_>,
) -> Result<()> {
    txn.validate()?;
    log::trace!(
        "{:?} {:#04x} {}-{}-{} addr={:?} len={} dummy={} dqs={}",
        txn.kind(),
        txn.instruction,
        txn.instruction_lines.lines(),
        txn.address_lines.lines(),
        txn.data_lines.map_or(0, |l| l.lines()),
        txn.address,
        txn.data_len(),
        txn.dummy_cycles,
        txn.data_strobe
    );
    bus.execute(txn)
}
