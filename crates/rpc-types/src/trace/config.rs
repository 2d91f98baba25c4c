//! Configuration of a trace request.
//!
//! A request selects its diagnostic targets as a JSON array of tags, e.g.
//! `["vmTrace", "trace"]`. Unknown tags are ignored.

use crate::CallRequest;
use serde::{de::Deserializer, ser::SerializeSeq, Deserialize, Serialize, Serializer};
use std::collections::HashSet;

/// Different Trace diagnostic targets.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TraceType {
    /// Default trace
    Trace,
    /// Provides a full trace of the VM's state throughout the execution of the transaction,
    /// including for any subcalls.
    VmTrace,
    /// Provides information detailing all altered portions of the Ethereum state made due to the
    /// execution of the transaction.
    StateDiff,
}

impl TraceType {
    const fn tag(&self) -> &'static str {
        match self {
            TraceType::Trace => "trace",
            TraceType::VmTrace => "vmTrace",
            TraceType::StateDiff => "stateDiff",
        }
    }
}

/// Which tracers to install for a single execution.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TraceConfig {
    /// Record a per-opcode VM trace.
    pub vm_trace: bool,
    /// Record the call trace.
    pub trace: bool,
    /// Record the state diff.
    pub state_diff: bool,
}

impl TraceConfig {
    /// Config with only the call trace enabled, used by `trace_block` and
    /// `trace_transaction`.
    pub const fn trace_only() -> Self {
        Self { vm_trace: false, trace: true, state_diff: false }
    }

    /// Returns true if no tracer is enabled.
    pub const fn is_empty(&self) -> bool {
        !(self.vm_trace || self.trace || self.state_diff)
    }
}

impl Serialize for TraceConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let count = self.vm_trace as usize + self.trace as usize + self.state_diff as usize;
        let mut seq = serializer.serialize_seq(Some(count))?;
        if self.vm_trace {
            seq.serialize_element(TraceType::VmTrace.tag())?;
        }
        if self.trace {
            seq.serialize_element(TraceType::Trace.tag())?;
        }
        if self.state_diff {
            seq.serialize_element(TraceType::StateDiff.tag())?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for TraceConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let tags = Vec::<String>::deserialize(deserializer)?;
        let mut config = TraceConfig::default();
        for tag in &tags {
            match tag.as_str() {
                "vmTrace" => config.vm_trace = true,
                "trace" => config.trace = true,
                "stateDiff" => config.state_diff = true,
                // unknown tags are ignored
                _ => {}
            }
        }
        Ok(config)
    }
}

impl FromIterator<TraceType> for TraceConfig {
    fn from_iter<I: IntoIterator<Item = TraceType>>(iter: I) -> Self {
        let mut config = TraceConfig::default();
        for trace_type in iter {
            match trace_type {
                TraceType::Trace => config.trace = true,
                TraceType::VmTrace => config.vm_trace = true,
                TraceType::StateDiff => config.state_diff = true,
            }
        }
        config
    }
}

impl From<TraceConfig> for HashSet<TraceType> {
    fn from(config: TraceConfig) -> Self {
        let mut set = HashSet::new();
        if config.vm_trace {
            set.insert(TraceType::VmTrace);
        }
        if config.trace {
            set.insert(TraceType::Trace);
        }
        if config.state_diff {
            set.insert(TraceType::StateDiff);
        }
        set
    }
}

/// A call bundled with the trace targets requested for it, as accepted by
/// `trace_callMany`: a two-element array `[call, config]`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceCall(pub CallRequest, pub TraceConfig);
