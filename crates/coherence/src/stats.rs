//! Coherence statistics collection and reporting.
//!
//! This module tracks what the directory controllers did during a run. It provides:
//! 1. **Requests:** Exclusive and shared requests admitted, and directory accesses.
//! 2. **Coherence traffic:** Invalidations, broadcasts, flushes, and writebacks issued.
//! 3. **Directory capacity:** Evictions, back-invalidations, and sharer-capacity fallbacks.
//! 4. **Backing store:** DRAM reads, writes, and queueing delay.

use std::fmt;
use std::ops::AddAssign;

use serde::Serialize;

use crate::dram::DramStats;

/// Counters of one directory controller, or the sum over several.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryStats {
    /// `EX_REQ` messages admitted.
    pub ex_reqs: u64,
    /// `SH_REQ` messages admitted.
    pub sh_reqs: u64,
    /// Directory-cache lookups.
    pub directory_accesses: u64,
    /// Lookups that paid the limitless software-trap penalty.
    pub software_trap_accesses: u64,

    /// Entries reclaimed to make room for another address.
    pub evictions: u64,
    /// Evictions whose victim still had sharers that had to be invalidated.
    pub back_invalidations: u64,
    /// Requests that found every way of their set busy and had to wait.
    pub slot_waits: u64,
    /// Shared requests refused a sharer pointer (limited, no broadcast).
    pub sharer_capacity_fallbacks: u64,
    /// Lines that left every cache through voluntary evictions.
    pub voluntary_evictions: u64,

    /// Unicast `INV_REQ` messages sent.
    pub inv_reqs_sent: u64,
    /// Invalidations sent as a broadcast.
    pub broadcasts: u64,
    /// `FLUSH_REQ` messages sent.
    pub flush_reqs_sent: u64,
    /// `WB_REQ` messages sent.
    pub wb_reqs_sent: u64,

    /// Backing-store fetches.
    pub dram_reads: u64,
    /// Backing-store stores.
    pub dram_writes: u64,
    /// Queueing delay charged by the backing store.
    pub total_queue_delay: u64,
    /// Latest cycle reached by any controller.
    pub cycles: u64,
}

impl DirectoryStats {
    /// Copies the backing-store counters into these stats.
    pub const fn record_dram(&mut self, dram: &DramStats) {
        self.dram_reads = dram.reads;
        self.dram_writes = dram.writes;
        self.total_queue_delay = dram.total_queue_delay;
    }

    /// Total requests admitted.
    pub const fn requests(&self) -> u64 {
        self.ex_reqs + self.sh_reqs
    }

    /// Prints the statistics to stdout.
    pub fn print(&self) {
        println!("{self}");
    }
}

impl AddAssign for DirectoryStats {
    fn add_assign(&mut self, rhs: Self) {
        self.ex_reqs += rhs.ex_reqs;
        self.sh_reqs += rhs.sh_reqs;
        self.directory_accesses += rhs.directory_accesses;
        self.software_trap_accesses += rhs.software_trap_accesses;
        self.evictions += rhs.evictions;
        self.back_invalidations += rhs.back_invalidations;
        self.slot_waits += rhs.slot_waits;
        self.sharer_capacity_fallbacks += rhs.sharer_capacity_fallbacks;
        self.voluntary_evictions += rhs.voluntary_evictions;
        self.inv_reqs_sent += rhs.inv_reqs_sent;
        self.broadcasts += rhs.broadcasts;
        self.flush_reqs_sent += rhs.flush_reqs_sent;
        self.wb_reqs_sent += rhs.wb_reqs_sent;
        self.dram_reads += rhs.dram_reads;
        self.dram_writes += rhs.dram_writes;
        self.total_queue_delay += rhs.total_queue_delay;
        self.cycles = self.cycles.max(rhs.cycles);
    }
}

impl fmt::Display for DirectoryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "==========================================================")?;
        writeln!(f, "DIRECTORY COHERENCE STATISTICS")?;
        writeln!(f, "==========================================================")?;
        writeln!(f, "sim_cycles               {}", self.cycles)?;
        writeln!(f, "requests.ex              {}", self.ex_reqs)?;
        writeln!(f, "requests.sh              {}", self.sh_reqs)?;
        writeln!(f, "directory.accesses       {}", self.directory_accesses)?;
        writeln!(f, "directory.sw_traps       {}", self.software_trap_accesses)?;
        writeln!(f, "----------------------------------------------------------")?;
        writeln!(f, "CAPACITY")?;
        writeln!(f, "  evictions              {}", self.evictions)?;
        writeln!(f, "  back_invalidations     {}", self.back_invalidations)?;
        writeln!(f, "  slot_waits             {}", self.slot_waits)?;
        writeln!(f, "  sharer_fallbacks       {}", self.sharer_capacity_fallbacks)?;
        writeln!(f, "  voluntary_evictions    {}", self.voluntary_evictions)?;
        writeln!(f, "----------------------------------------------------------")?;
        writeln!(f, "TRAFFIC")?;
        writeln!(f, "  inv_reqs               {}", self.inv_reqs_sent)?;
        writeln!(f, "  broadcasts             {}", self.broadcasts)?;
        writeln!(f, "  flush_reqs             {}", self.flush_reqs_sent)?;
        writeln!(f, "  wb_reqs                {}", self.wb_reqs_sent)?;
        writeln!(f, "----------------------------------------------------------")?;
        writeln!(f, "DRAM")?;
        writeln!(f, "  reads                  {}", self.dram_reads)?;
        writeln!(f, "  writes                 {}", self.dram_writes)?;
        write!(f, "  queue_delay            {}", self.total_queue_delay)
    }
}
