//! # Program Module
//!
//! A program is what the user authors: an ordered list of instructions and a set of named location
//! groups. Both are stored as JSON and are always read and replaced wholesale.
//!
//! Instructions are kept in their raw `{"type": ..., "params": {...}}` form so that a script
//! containing an entry this software doesn't understand (or one that was only half edited) can
//! still be loaded, stored and served back untouched. [`Instruction::parse`] turns one entry into
//! a typed [`Step`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Point3;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};
use std::convert::TryFrom;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of user units (centimeters) in a meter.
pub const CM_PER_M: f64 = 100.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// All data making up a program.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramData {
    #[serde(default)]
    pub groups: Vec<Group>,

    /// Instructions in stored order. Execution order is the reverse of this.
    #[serde(default)]
    pub instructions: Vec<Instruction>,
}

/// A single, raw, instruction entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// The instruction type, for instance `"go_box"`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Type specific parameters.
    #[serde(default)]
    pub params: Value,
}

/// A named group of boxes with a fixed drop-off location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Ids of the boxes belonging to this group.
    ///
    /// Entries which aren't box ids (the UI stores `null` for ids it failed to parse) are dropped
    /// on load.
    #[serde(default, deserialize_with = "lenient_box_ids")]
    pub boxes: Vec<u32>,

    /// Location associated with the group, in user units (centimeters, world frame).
    ///
    /// A location with a missing or non-numeric component loads as `None`.
    #[serde(default, deserialize_with = "lenient_location")]
    pub location: Option<Location>,
}

/// A position in the world frame given in user units.
///
/// Units: centimeters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Deserialize)]
struct WaitParams {
    time: Number,
}

#[derive(Deserialize)]
struct BoxParams {
    box_id: u32,
}

#[derive(Deserialize)]
struct GroupParams {
    group_id: String,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A parsed instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Wait { time: Number },
    Grip,
    Ungrip,
    Initial,
    GoBox { box_id: u32 },
    GoGroupBox { group_id: String },
    GoNearestBox,
    GoPos(Location),
    GoGroupLocation { group_id: String },
}

/// Reasons an instruction cannot be parsed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MalformedInstruction {
    #[error("Unknown instruction type \"{0}\"")]
    UnknownType(String),

    #[error("Instruction \"{kind}\" has invalid parameters: {reason}")]
    InvalidParams { kind: String, reason: String },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Instruction {
    /// Create a new instruction from its type and JSON parameters.
    pub fn new(kind: &str, params: Value) -> Self {
        Self {
            kind: kind.to_string(),
            params,
        }
    }

    /// Parse this instruction into a [`Step`].
    ///
    /// Parameters which aren't needed by the instruction type are ignored.
    pub fn parse(&self) -> Result<Step, MalformedInstruction> {
        match self.kind.as_str() {
            "wait" => self
                .params_as::<WaitParams>()
                .map(|p| Step::Wait { time: p.time }),
            "grip" => Ok(Step::Grip),
            "ungrip" => Ok(Step::Ungrip),
            "initial" => Ok(Step::Initial),
            "go_box" => self
                .params_as::<BoxParams>()
                .map(|p| Step::GoBox { box_id: p.box_id }),
            "go_group_box" => self
                .params_as::<GroupParams>()
                .map(|p| Step::GoGroupBox {
                    group_id: p.group_id,
                }),
            "go_nearest_box" => Ok(Step::GoNearestBox),
            "go_pos" => self.params_as::<Location>().map(Step::GoPos),
            "go_group_location" => self
                .params_as::<GroupParams>()
                .map(|p| Step::GoGroupLocation {
                    group_id: p.group_id,
                }),
            other => Err(MalformedInstruction::UnknownType(other.to_string())),
        }
    }

    fn params_as<P: DeserializeOwned>(&self) -> Result<P, MalformedInstruction> {
        P::deserialize(&self.params).map_err(|e| MalformedInstruction::InvalidParams {
            kind: self.kind.clone(),
            reason: e.to_string(),
        })
    }
}

impl Location {
    /// Convert into a point in meters.
    pub fn to_point_m(&self) -> Point3<f64> {
        Point3::new(self.x, self.y, self.z) / CM_PER_M
    }
}

impl ProgramData {
    /// Find a group by its id.
    pub fn find_group(&self, id: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// Append a new group, returning the stored group.
    ///
    /// Groups without an id are given the id `"{n}"`, where `n` is the number of groups after
    /// insertion.
    pub fn add_group(&mut self, mut group: Group) -> Group {
        if group.id.is_empty() {
            group.id = (self.groups.len() + 1).to_string();
        }

        self.groups.push(group.clone());
        group
    }

    /// Replace the group with the given id, returning the stored group or `None` if no group has
    /// that id.
    pub fn update_group(&mut self, id: &str, mut group: Group) -> Option<Group> {
        let slot = self.groups.iter_mut().find(|g| g.id == id)?;

        group.id = id.to_string();
        *slot = group.clone();
        Some(group)
    }

    /// Remove every group with the given id, returning the number removed.
    pub fn delete_group(&mut self, id: &str) -> usize {
        let len = self.groups.len();
        self.groups.retain(|g| g.id != id);
        len - self.groups.len()
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn lenient_box_ids<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(values) => values
            .iter()
            .filter_map(Value::as_u64)
            .filter_map(|id| u32::try_from(id).ok())
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_location<'de, D>(deserializer: D) -> Result<Option<Location>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(Location::deserialize(&value).ok())
}
