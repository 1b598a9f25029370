//! Decoded event records.

use crate::keyword::{EventType, ObjectType, Param};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// One decoded event line.
///
/// All strings borrow from the line they were decoded from, so an `Event`
/// cannot outlive the next read on the connection that produced it. Use
/// [`Event::to_owned_event`] to keep one around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Event<'a> {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub object_type: ObjectType,
    pub object: &'a str,
    #[serde(serialize_with = "serialize_params")]
    pub params: [Option<&'a str>; Param::COUNT],
}

impl<'a> Event<'a> {
    /// Returns the value of a parameter, if the line carried it.
    pub fn param(&self, param: Param) -> Option<&'a str> {
        self.params[param.index()]
    }

    /// Stores a parameter value, replacing any previous one.
    pub fn set_param(&mut self, param: Param, value: &'a str) {
        self.params[param.index()] = Some(value);
    }

    /// Iterates over the parameters present on the line, in slot order.
    pub fn params(&self) -> impl Iterator<Item = (Param, &'a str)> + '_ {
        Param::ALL
            .iter()
            .filter_map(move |&param| self.param(param).map(|value| (param, value)))
    }

    /// Copies the event out of the line buffer.
    pub fn to_owned_event(&self) -> OwnedEvent {
        OwnedEvent {
            event_type: self.event_type,
            object_type: self.object_type,
            object: self.object.to_string(),
            params: self
                .params()
                .map(|(param, value)| (param, value.to_string()))
                .collect(),
        }
    }
}

impl fmt::Display for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} '{}'",
            self.event_type, self.object_type, self.object
        )?;
        for (param, value) in self.params() {
            write!(f, "\n\t{} '{}'", param, value)?;
        }
        Ok(())
    }
}

fn serialize_params<S: Serializer>(
    params: &[Option<&str>; Param::COUNT],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let present = params.iter().filter(|value| value.is_some()).count();
    let mut map = serializer.serialize_map(Some(present))?;
    for (param, value) in Param::ALL.iter().zip(params.iter()) {
        if let Some(value) = value {
            map.serialize_entry(param.as_str(), value)?;
        }
    }
    map.end()
}

/// An event that owns its strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnedEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub object_type: ObjectType,
    pub object: String,
    pub params: BTreeMap<Param, String>,
}

impl OwnedEvent {
    /// Returns the value of a parameter, if present.
    pub fn param(&self, param: Param) -> Option<&str> {
        self.params.get(&param).map(String::as_str)
    }
}

impl fmt::Display for OwnedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} '{}'",
            self.event_type, self.object_type, self.object
        )?;
        for (param, value) in &self.params {
            write!(f, "\n\t{} '{}'", param, value)?;
        }
        Ok(())
    }
}
