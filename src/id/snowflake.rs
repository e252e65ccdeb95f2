//! Snowflake identifiers.
//!
//! Layout, most significant first:
//! - 1 bit: reserved, always 0
//! - 41 bits: milliseconds since the generator's epoch
//! - 5 bits: datacenter id
//! - 5 bits: worker id
//! - 12 bits: per-millisecond sequence

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tracing::warn;

use crate::error::{Result, TesseraError};

const SEQUENCE_BITS: u32 = 12;
const WORKER_BITS: u32 = 5;
const DATACENTER_BITS: u32 = 5;
const TIMESTAMP_BITS: u32 = 41;

const WORKER_SHIFT: u32 = SEQUENCE_BITS;
const DATACENTER_SHIFT: u32 = SEQUENCE_BITS + WORKER_BITS;
const TIMESTAMP_SHIFT: u32 = SEQUENCE_BITS + WORKER_BITS + DATACENTER_BITS;

/// Largest sequence value within one millisecond.
pub const MAX_SEQUENCE: u16 = (1 << SEQUENCE_BITS) - 1;
/// Largest datacenter or worker id.
pub const MAX_NODE_PART: u8 = (1 << WORKER_BITS) - 1;
const MAX_DELTA: i64 = (1 << TIMESTAMP_BITS) - 1;

/// Millisecond time source.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }
}

impl<F> Clock for F
where
    F: Fn() -> i64 + Send + Sync,
{
    fn now_millis(&self) -> i64 {
        self()
    }
}

/// Datacenter and worker pair packed into the id's node bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeId {
    datacenter: u8,
    worker: u8,
}

impl NodeId {
    /// Validates both components against their 5-bit range.
    pub fn new(datacenter: u8, worker: u8) -> Result<Self> {
        if datacenter > MAX_NODE_PART || worker > MAX_NODE_PART {
            return Err(TesseraError::Config(format!(
                "snowflake node ids must be <= {MAX_NODE_PART} (datacenter={datacenter}, worker={worker})"
            )));
        }
        Ok(Self { datacenter, worker })
    }

    /// Datacenter component.
    pub fn datacenter(&self) -> u8 {
        self.datacenter
    }

    /// Worker component.
    pub fn worker(&self) -> u8 {
        self.worker
    }

    fn bits(self) -> i64 {
        (i64::from(self.datacenter) << DATACENTER_SHIFT) | (i64::from(self.worker) << WORKER_SHIFT)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.datacenter, self.worker)
    }
}

#[derive(Debug)]
struct SequenceState {
    last_timestamp: i64,
    sequence: u16,
}

/// Lock-coordinated snowflake generator.
///
/// All callers share one `(last_timestamp, sequence)` pair; reading the
/// clock, advancing the sequence and waiting out an exhausted millisecond
/// happen under a single lock acquisition.
pub struct SnowflakeGenerator {
    epoch: i64,
    node: NodeId,
    clock: Arc<dyn Clock>,
    state: Mutex<SequenceState>,
}

impl fmt::Debug for SnowflakeGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowflakeGenerator")
            .field("epoch", &self.epoch)
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

impl SnowflakeGenerator {
    /// Generator reading the wall clock.
    pub fn new(epoch: i64, node: NodeId) -> Self {
        Self::with_clock(epoch, node, Arc::new(SystemClock))
    }

    /// Generator reading the supplied clock.
    pub fn with_clock(epoch: i64, node: NodeId, clock: Arc<dyn Clock>) -> Self {
        Self {
            epoch,
            node,
            clock,
            state: Mutex::new(SequenceState {
                last_timestamp: -1,
                sequence: 0,
            }),
        }
    }

    /// Epoch in milliseconds since the Unix epoch.
    pub fn epoch(&self) -> i64 {
        self.epoch
    }

    /// Node bits stamped into every id.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Produces the next id.
    ///
    /// Fails with [`TesseraError::ClockRegression`] if the clock reads earlier
    /// than the last issued timestamp, and with [`TesseraError::Config`] if
    /// the clock is outside the epoch's 41-bit window.
    pub fn next_id(&self) -> Result<i64> {
        let mut state = self.state.lock();
        let mut now = self.clock.now_millis();

        if now < state.last_timestamp {
            warn!(
                last = state.last_timestamp,
                now, "clock moved backwards; refusing to issue snowflake id"
            );
            return Err(TesseraError::ClockRegression {
                last: state.last_timestamp,
                now,
            });
        }

        if now == state.last_timestamp {
            state.sequence = (state.sequence + 1) & MAX_SEQUENCE;
            if state.sequence == 0 {
                now = self.wait_next_millis(state.last_timestamp)?;
            }
        } else {
            state.sequence = 0;
        }

        let delta = now - self.epoch;
        if !(0..=MAX_DELTA).contains(&delta) {
            return Err(TesseraError::Config(format!(
                "clock {now} is outside the 41-bit window of epoch {}",
                self.epoch
            )));
        }
        state.last_timestamp = now;

        Ok((delta << TIMESTAMP_SHIFT) | self.node.bits() | i64::from(state.sequence))
    }

    fn wait_next_millis(&self, last_timestamp: i64) -> Result<i64> {
        loop {
            let now = self.clock.now_millis();
            if now > last_timestamp {
                return Ok(now);
            }
            if now < last_timestamp {
                return Err(TesseraError::ClockRegression {
                    last: last_timestamp,
                    now,
                });
            }
            std::hint::spin_loop();
        }
    }

    /// Unix timestamp in milliseconds encoded in `id`.
    pub fn extract_timestamp(&self, id: i64) -> i64 {
        (id >> TIMESTAMP_SHIFT) + self.epoch
    }

    /// Node bits encoded in `id`.
    pub fn extract_node(id: i64) -> NodeId {
        let mask = i64::from(MAX_NODE_PART);
        NodeId {
            datacenter: ((id >> DATACENTER_SHIFT) & mask) as u8,
            worker: ((id >> WORKER_SHIFT) & mask) as u8,
        }
    }

    /// Sequence encoded in `id`.
    pub fn extract_sequence(id: i64) -> u16 {
        (id & i64::from(MAX_SEQUENCE)) as u16
    }
}
