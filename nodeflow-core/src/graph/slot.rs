//! Slots
//!
//! Typed connection points on a node. Inputs accept at most one link, outputs
//! fan out to any number of links.
//!
//! Type tags are strings. Three tags are special:
//!
//! - `*` (or an empty string) is the wildcard and matches anything.
//! - `EVENT` marks an output that only fires and never holds a value.
//! - `ACTION` marks an input that receives fired events.
//!
//! A named tag may list alternatives separated by commas (`"number,string"`);
//! two named tags are compatible when they share at least one alternative,
//! compared case-insensitively.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::link::LinkId;

/// The declared type of a slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SlotType {
    /// Wildcard, compatible with every other tag.
    Any,
    /// Event output: fires, never stores a value.
    Event,
    /// Action input: receives events.
    Action,
    /// A named data type.
    Named(String),
}

impl SlotType {
    /// Build a named tag.
    pub fn named(name: impl Into<String>) -> Self {
        SlotType::from(name.into())
    }

    /// Whether a link from an output of type `self` into an input of type
    /// `target` is allowed.
    pub fn connects_to(&self, target: &SlotType) -> bool {
        match (self, target) {
            (SlotType::Any, _) | (_, SlotType::Any) => true,
            (SlotType::Event, SlotType::Action) => true,
            (SlotType::Event, SlotType::Event) | (SlotType::Action, SlotType::Action) => true,
            (SlotType::Named(a), SlotType::Named(b)) => {
                a.split(',').any(|x| b.split(',').any(|y| x.trim().eq_ignore_ascii_case(y.trim())))
            }
            _ => false,
        }
    }

    pub fn is_event(&self) -> bool {
        matches!(self, SlotType::Event)
    }

    pub fn is_action(&self) -> bool {
        matches!(self, SlotType::Action)
    }
}

impl From<String> for SlotType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "" | "*" => SlotType::Any,
            "EVENT" => SlotType::Event,
            "ACTION" => SlotType::Action,
            _ => SlotType::Named(tag),
        }
    }
}

impl From<&str> for SlotType {
    fn from(tag: &str) -> Self {
        SlotType::from(tag.to_string())
    }
}

impl From<SlotType> for String {
    fn from(ty: SlotType) -> Self {
        match ty {
            SlotType::Any => "*".to_string(),
            SlotType::Event => "EVENT".to_string(),
            SlotType::Action => "ACTION".to_string(),
            SlotType::Named(name) => name,
        }
    }
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotType::Any => f.write_str("*"),
            SlotType::Event => f.write_str("EVENT"),
            SlotType::Action => f.write_str("ACTION"),
            SlotType::Named(name) => f.write_str(name),
        }
    }
}

/// Which side of a node a slot lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotDirection {
    Input,
    Output,
}

impl fmt::Display for SlotDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotDirection::Input => f.write_str("input"),
            SlotDirection::Output => f.write_str("output"),
        }
    }
}

/// Addresses a slot either by position or by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SlotRef {
    Index(usize),
    Name(String),
}

impl From<usize> for SlotRef {
    fn from(index: usize) -> Self {
        SlotRef::Index(index)
    }
}

impl From<&str> for SlotRef {
    fn from(name: &str) -> Self {
        SlotRef::Name(name.to_string())
    }
}

impl From<String> for SlotRef {
    fn from(name: String) -> Self {
        SlotRef::Name(name)
    }
}

impl fmt::Display for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotRef::Index(index) => write!(f, "#{}", index),
            SlotRef::Name(name) => write!(f, "'{}'", name),
        }
    }
}

/// Name and type of a slot, as declared by a node type or persisted in a
/// document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub slot_type: SlotType,
}

impl SlotDescriptor {
    pub fn new(name: impl Into<String>, slot_type: impl Into<SlotType>) -> Self {
        Self {
            name: name.into(),
            slot_type: slot_type.into(),
        }
    }
}

/// An input slot. Holds at most one incoming link.
#[derive(Debug, Clone)]
pub struct InputSlot {
    pub name: String,
    pub slot_type: SlotType,
    pub link: Option<LinkId>,
}

impl InputSlot {
    pub fn new(descriptor: SlotDescriptor) -> Self {
        Self {
            name: descriptor.name,
            slot_type: descriptor.slot_type,
            link: None,
        }
    }

    pub fn descriptor(&self) -> SlotDescriptor {
        SlotDescriptor::new(self.name.clone(), self.slot_type.clone())
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }
}

/// An output slot. Fans out to any number of links, kept in the order they
/// were connected.
#[derive(Debug, Clone)]
pub struct OutputSlot {
    pub name: String,
    pub slot_type: SlotType,
    pub links: SmallVec<[LinkId; 4]>,
}

impl OutputSlot {
    pub fn new(descriptor: SlotDescriptor) -> Self {
        Self {
            name: descriptor.name,
            slot_type: descriptor.slot_type,
            links: SmallVec::new(),
        }
    }

    pub fn descriptor(&self) -> SlotDescriptor {
        SlotDescriptor::new(self.name.clone(), self.slot_type.clone())
    }

    pub fn remove_link(&mut self, link: LinkId) {
        self.links.retain(|id| *id != link);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matches_everything() {
        assert!(SlotType::Any.connects_to(&SlotType::named("number")));
        assert!(SlotType::named("number").connects_to(&SlotType::Any));
        assert!(SlotType::Event.connects_to(&SlotType::Any));
    }

    #[test]
    fn event_pairs_with_action() {
        assert!(SlotType::Event.connects_to(&SlotType::Action));
        assert!(!SlotType::Event.connects_to(&SlotType::named("number")));
        assert!(!SlotType::named("number").connects_to(&SlotType::Action));
    }

    #[test]
    fn named_tags_compare_alternatives() {
        let multi = SlotType::named("number,string");
        assert!(multi.connects_to(&SlotType::named("String")));
        assert!(!multi.connects_to(&SlotType::named("texture")));
    }

    #[test]
    fn tags_round_trip_through_strings() {
        for tag in ["*", "EVENT", "ACTION", "vec3"] {
            let ty = SlotType::from(tag);
            assert_eq!(String::from(ty), tag);
        }
        assert_eq!(SlotType::from(""), SlotType::Any);
    }

    #[test]
    fn output_keeps_connection_order() {
        let mut out = OutputSlot::new(SlotDescriptor::new("out", "number"));
        out.links.push(LinkId::from(4));
        out.links.push(LinkId::from(2));
        out.links.push(LinkId::from(7));
        out.remove_link(LinkId::from(2));
        assert_eq!(out.links.as_slice(), &[LinkId::from(4), LinkId::from(7)]);
    }
}
