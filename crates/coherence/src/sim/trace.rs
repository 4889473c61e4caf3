//! Memory-operation traces.
//!
//! A trace is a JSON array of records:
//!
//! ```json
//! [{"tile": 0, "op": "write", "address": 4096, "value": 7},
//!  {"tile": 1, "op": "read", "address": 4096}]
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::{PhysAddr, SimError, TileId};

use super::system::System;

/// Operation performed by one trace record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceOp {
    /// Load one byte.
    Read,
    /// Store one byte.
    Write,
    /// Voluntarily drop the line.
    Evict,
}

/// One memory operation issued by one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Issuing tile.
    pub tile: u32,
    /// Operation.
    pub op: TraceOp,
    /// Byte address.
    pub address: u64,
    /// Byte stored by a write; ignored otherwise.
    #[serde(default)]
    pub value: u8,
}

impl TraceRecord {
    /// Parses a JSON trace.
    pub fn parse(text: &str) -> Result<Vec<Self>, SimError> {
        serde_json::from_str(text).map_err(|e| SimError::Trace(e.to_string()))
    }

    /// Reads and parses a JSON trace file.
    pub fn load(path: impl AsRef<Path>) -> Result<Vec<Self>, SimError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| SimError::Trace(format!("{}: {e}", path.display())))?;
        Self::parse(&text)
    }
}

impl System {
    /// Replays `records` in order, checking invariants after each one.
    ///
    /// Returns the bytes observed by the read operations, in trace order.
    pub fn replay(&mut self, records: &[TraceRecord]) -> Result<Vec<u8>, SimError> {
        let mut observed = Vec::new();
        for (index, record) in records.iter().enumerate() {
            let tile = TileId::new(record.tile);
            let address = PhysAddr::new(record.address);
            match record.op {
                TraceOp::Read => observed.push(self.read(tile, address)?),
                TraceOp::Write => self.write(tile, address, record.value)?,
                TraceOp::Evict => {
                    let _ = self.evict(tile, address)?;
                    let _ = self.run_until_idle()?;
                }
            }
            self.check_invariants()?;
            debug!(index, tile = %tile, address = %address, op = ?record.op, "replayed");
        }
        Ok(observed)
    }
}
