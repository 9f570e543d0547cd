//! # Servo Command Queue
//!
//! The command queue is the only artefact handed to the transport layer which drives the arm's
//! servos. Each command is serialised as a JSON array whose first element names the command:
//!
//! | command              | wire format              |
//! |----------------------|--------------------------|
//! | `Move(angles)`       | `["move", a0, a1, ...]`  |
//! | `Wait(time)`         | `["wait", time]`         |
//! | `Grip(true/false)`   | `["grip", 1]`/`["grip", 0]` |
//! | `Initial`            | `["initial"]`            |

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{
    de::{self, SeqAccess, Visitor},
    ser::SerializeSeq,
    Deserialize, Deserializer, Serialize, Serializer,
};
use serde_json::Number;
use std::fmt;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Actuator level angles for each servo of the arm, in degrees.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServoAngles(pub Vec<f64>);

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A single command in the servo queue.
#[derive(Debug, Clone, PartialEq)]
pub enum ServoCommand {
    /// Drive every servo to the given angle.
    Move(ServoAngles),

    /// Hold the current position. The time is forwarded exactly as authored in the instruction
    /// script, integers stay integers.
    Wait(Number),

    /// Close (`true`) or open (`false`) the gripper.
    Grip(bool),

    /// Return the arm to its home configuration.
    Initial,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ServoCommand {
    const TAGS: &'static [&'static str] = &["move", "wait", "grip", "initial"];

    /// The name of the command on the wire
    pub fn tag(&self) -> &'static str {
        match self {
            ServoCommand::Move(_) => "move",
            ServoCommand::Wait(_) => "wait",
            ServoCommand::Grip(_) => "grip",
            ServoCommand::Initial => "initial",
        }
    }
}

impl Serialize for ServoCommand {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            ServoCommand::Move(angles) => {
                let mut seq = serializer.serialize_seq(Some(1 + angles.0.len()))?;
                seq.serialize_element(self.tag())?;
                for a in angles.0.iter() {
                    seq.serialize_element(a)?;
                }
                seq.end()
            }
            ServoCommand::Wait(time) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(self.tag())?;
                seq.serialize_element(time)?;
                seq.end()
            }
            ServoCommand::Grip(closed) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(self.tag())?;
                seq.serialize_element(&(*closed as u8))?;
                seq.end()
            }
            ServoCommand::Initial => {
                let mut seq = serializer.serialize_seq(Some(1))?;
                seq.serialize_element(self.tag())?;
                seq.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for ServoCommand {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(ServoCommandVisitor)
    }
}

struct ServoCommandVisitor;

impl<'de> Visitor<'de> for ServoCommandVisitor {
    type Value = ServoCommand;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a servo command array such as [\"move\", 90.0, 45.0]")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let tag: String = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;

        match tag.as_str() {
            "move" => {
                let mut angles = Vec::new();
                while let Some(a) = seq.next_element::<f64>()? {
                    angles.push(a);
                }
                Ok(ServoCommand::Move(ServoAngles(angles)))
            }
            "wait" => {
                let time = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                Ok(ServoCommand::Wait(time))
            }
            "grip" => {
                let closed: u8 = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                Ok(ServoCommand::Grip(closed != 0))
            }
            "initial" => Ok(ServoCommand::Initial),
            other => Err(de::Error::unknown_variant(other, ServoCommand::TAGS)),
        }
    }
}
