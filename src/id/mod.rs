#![forbid(unsafe_code)]

//! Primary-key generation.
//!
//! A record type's strategy is fixed when its descriptor is built. Snowflake
//! generators are shared per epoch so types using the same epoch draw from a
//! single sequence.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use xxhash_rust::xxh64::xxh64;

use crate::config::SnowflakeConfig;
use crate::model::schema::{IdStrategyDecl, IdStrategyKind};
use crate::model::{ModelDescriptor, Value};
use crate::error::Result;

pub mod hex;
pub mod snowflake;

pub use hex::random_hex_id;
pub use snowflake::{Clock, NodeId, SnowflakeGenerator, SystemClock};

/// Default snowflake epoch: 2021-01-01T00:00:00+08:00.
pub const DEFAULT_EPOCH: i64 = 1_609_430_400_000;

/// Resolved key strategy of a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdStrategy {
    /// Snowflake ids counted from `begin_time_millis`.
    Snowflake {
        /// Epoch in milliseconds since the Unix epoch.
        begin_time_millis: i64,
    },
    /// Random 32-character hex identifiers.
    RandomHex,
    /// Storage assigns the key on insert.
    None,
}

/// Generator bound to a record type.
#[derive(Clone)]
pub enum IdGenerator {
    /// Shared snowflake generator.
    Snowflake(Arc<SnowflakeGenerator>),
    /// Random hex identifiers.
    RandomHex,
}

impl IdGenerator {
    /// Strategy this generator implements.
    pub fn strategy(&self) -> IdStrategy {
        match self {
            IdGenerator::Snowflake(gen) => IdStrategy::Snowflake {
                begin_time_millis: gen.epoch(),
            },
            IdGenerator::RandomHex => IdStrategy::RandomHex,
        }
    }

    /// Generates a key for `model`, stringifying numeric keys for text key fields.
    pub fn generate(&self, model: &ModelDescriptor) -> Result<Value> {
        let textual = model
            .id_field()
            .is_some_and(|field| field.field_type.is_textual());
        match self {
            IdGenerator::Snowflake(gen) => {
                let id = gen.next_id()?;
                Ok(if textual {
                    Value::Text(id.to_string())
                } else {
                    Value::Int(id)
                })
            }
            IdGenerator::RandomHex => Ok(Value::Text(random_hex_id())),
        }
    }
}

impl PartialEq for IdGenerator {
    fn eq(&self, other: &Self) -> bool {
        self.strategy() == other.strategy()
    }
}

impl fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdGenerator::Snowflake(gen) => f.debug_tuple("Snowflake").field(gen).finish(),
            IdGenerator::RandomHex => f.write_str("RandomHex"),
        }
    }
}

/// Resolves key strategies and hands out generators.
pub struct IdGenerators {
    epoch_override: Option<i64>,
    default_epoch: i64,
    node: NodeId,
    clock: Arc<dyn Clock>,
    snowflakes: Mutex<HashMap<i64, Arc<SnowflakeGenerator>>>,
}

impl IdGenerators {
    /// Generators reading the wall clock.
    pub fn new(config: &SnowflakeConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Generators reading `clock`.
    pub fn with_clock(config: &SnowflakeConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let node = resolve_node(config)?;
        debug!(%node, default_epoch = config.default_epoch, "snowflake node resolved");
        Ok(Self {
            epoch_override: config.epoch_override,
            default_epoch: config.default_epoch,
            node,
            clock,
            snowflakes: Mutex::new(HashMap::new()),
        })
    }

    /// Node bits stamped into snowflake ids.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Resolves the strategy for a key field's annotation.
    ///
    /// Precedence for snowflake epochs: configured override, then the
    /// annotation's epoch, then the configured default.
    pub fn resolve(&self, decl: Option<&IdStrategyDecl>) -> IdStrategy {
        let declared = match decl {
            Some(decl) => match decl.kind {
                IdStrategyKind::Auto => return IdStrategy::None,
                IdStrategyKind::Uuid => return IdStrategy::RandomHex,
                IdStrategyKind::Snowflake => decl.begin_time,
            },
            None => None,
        };
        let positive = |epoch: &i64| *epoch > 0;
        let begin_time = self
            .epoch_override
            .filter(positive)
            .or(declared.filter(positive))
            .unwrap_or(self.default_epoch);
        IdStrategy::Snowflake {
            begin_time_millis: begin_time,
        }
    }

    /// Generator for `strategy`; `None` for storage-assigned keys.
    pub fn generator(&self, strategy: IdStrategy) -> Option<IdGenerator> {
        match strategy {
            IdStrategy::None => None,
            IdStrategy::RandomHex => Some(IdGenerator::RandomHex),
            IdStrategy::Snowflake { begin_time_millis } => {
                let mut snowflakes = self.snowflakes.lock();
                let gen = snowflakes.entry(begin_time_millis).or_insert_with(|| {
                    debug!(epoch = begin_time_millis, "creating snowflake generator");
                    Arc::new(SnowflakeGenerator::with_clock(
                        begin_time_millis,
                        self.node,
                        Arc::clone(&self.clock),
                    ))
                });
                Some(IdGenerator::Snowflake(Arc::clone(gen)))
            }
        }
    }
}

fn resolve_node(config: &SnowflakeConfig) -> Result<NodeId> {
    let datacenter = config.datacenter_id.unwrap_or_else(|| {
        std::env::var("HOSTNAME")
            .or_else(|_| std::env::var("COMPUTERNAME"))
            .map(|host| (xxh64(host.as_bytes(), 0) & 0x1f) as u8)
            .unwrap_or(0)
    });
    let worker = config
        .worker_id
        .unwrap_or_else(|| (std::process::id() & 0x1f) as u8);
    NodeId::new(datacenter, worker)
}
