//! Keyword tables for the babel control protocol.
//!
//! Each table maps a protocol keyword to its code and must be sorted by the
//! byte-wise order of the keyword, as lookups use binary search.

use serde::{Serialize, Serializer};
use std::fmt;

/// Kind of change announced by an event line (first token).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EventType {
    #[default]
    Unknown,
    Flush,
    Add,
    Change,
}

/// Topology entity an event line describes (second token).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ObjectType {
    #[default]
    Unknown,
    Interface,
    Neighbour,
    XRoute,
    Route,
}

/// Parameter keywords that may follow the object identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Param {
    Up,
    Ipv4,
    Ipv6,
    Address,
    If,
    Reach,
    Ureach,
    Rxcost,
    Txcost,
    Cost,
    Prefix,
    From,
    Metric,
    Installed,
    Id,
    Refmetric,
    Via,
}

const EVENT_KEYWORDS: [(&str, EventType); 3] = [
    ("add", EventType::Add),
    ("change", EventType::Change),
    ("flush", EventType::Flush),
];

const OBJECT_KEYWORDS: [(&str, ObjectType); 4] = [
    ("interface", ObjectType::Interface),
    ("neighbour", ObjectType::Neighbour),
    ("route", ObjectType::Route),
    ("xroute", ObjectType::XRoute),
];

const PARAM_KEYWORDS: [(&str, Param); Param::COUNT] = [
    ("address", Param::Address),
    ("cost", Param::Cost),
    ("from", Param::From),
    ("id", Param::Id),
    ("if", Param::If),
    ("installed", Param::Installed),
    ("ipv4", Param::Ipv4),
    ("ipv6", Param::Ipv6),
    ("metric", Param::Metric),
    ("prefix", Param::Prefix),
    ("reach", Param::Reach),
    ("refmetric", Param::Refmetric),
    ("rxcost", Param::Rxcost),
    ("txcost", Param::Txcost),
    ("up", Param::Up),
    ("ureach", Param::Ureach),
    ("via", Param::Via),
];

/// Looks up `keyword` in a sorted table.
///
/// Comparison is exact and case-sensitive.
pub fn lookup<T: Copy>(table: &[(&'static str, T)], keyword: &str) -> Option<T> {
    table
        .binary_search_by(|(entry, _)| entry.as_bytes().cmp(keyword.as_bytes()))
        .ok()
        .map(|index| table[index].1)
}

impl EventType {
    /// Classifies an event verb; anything not in the table is `Unknown`.
    pub fn from_keyword(keyword: &str) -> Self {
        lookup(&EVENT_KEYWORDS, keyword).unwrap_or(EventType::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Unknown => "<unknown>",
            EventType::Flush => "flush",
            EventType::Add => "add",
            EventType::Change => "change",
        }
    }
}

impl ObjectType {
    /// Classifies an object type; anything not in the table is `Unknown`.
    pub fn from_keyword(keyword: &str) -> Self {
        lookup(&OBJECT_KEYWORDS, keyword).unwrap_or(ObjectType::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Unknown => "<unknown>",
            ObjectType::Interface => "interface",
            ObjectType::Neighbour => "neighbour",
            ObjectType::XRoute => "xroute",
            ObjectType::Route => "route",
        }
    }
}

impl Param {
    /// Number of parameter slots in an event.
    pub const COUNT: usize = 17;

    /// All parameters, in slot order.
    pub const ALL: [Param; Param::COUNT] = [
        Param::Up,
        Param::Ipv4,
        Param::Ipv6,
        Param::Address,
        Param::If,
        Param::Reach,
        Param::Ureach,
        Param::Rxcost,
        Param::Txcost,
        Param::Cost,
        Param::Prefix,
        Param::From,
        Param::Metric,
        Param::Installed,
        Param::Id,
        Param::Refmetric,
        Param::Via,
    ];

    /// Classifies a parameter keyword. Returns `None` for unknown keywords.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        lookup(&PARAM_KEYWORDS, keyword)
    }

    /// Slot index of this parameter in an event's parameter array.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Param::Up => "up",
            Param::Ipv4 => "ipv4",
            Param::Ipv6 => "ipv6",
            Param::Address => "address",
            Param::If => "if",
            Param::Reach => "reach",
            Param::Ureach => "ureach",
            Param::Rxcost => "rxcost",
            Param::Txcost => "txcost",
            Param::Cost => "cost",
            Param::Prefix => "prefix",
            Param::From => "from",
            Param::Metric => "metric",
            Param::Installed => "installed",
            Param::Id => "id",
            Param::Refmetric => "refmetric",
            Param::Via => "via",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Serialized as the wire keyword; unknown variants as "unknown".
impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            EventType::Unknown => serializer.serialize_str("unknown"),
            other => serializer.serialize_str(other.as_str()),
        }
    }
}

impl Serialize for ObjectType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ObjectType::Unknown => serializer.serialize_str("unknown"),
            other => serializer.serialize_str(other.as_str()),
        }
    }
}

impl Serialize for Param {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
