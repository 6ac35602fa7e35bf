// Protocol messages between clients and the relay.
//
// Two enums define the full vocabulary:
// - `ClientMessage`: sent by fields and controllers to the relay.
// - `ServerMessage`: sent by the relay to fields and controllers.
//
// Both are internally tagged with a snake_case `type` key so a frame reads
// like `{"type":"win","field_id":0,"side":1}`. The tag names are the event
// names fields and controllers already speak.
//
// The relay never interprets game semantics beyond these messages: `side` is
// an opaque paddle index, `direction` a raw signed number the relay averages.
//
// Ids and sides in client messages are `Option`s: a value that cannot name a
// slot decodes as `None` instead of failing the whole frame (see
// `types::lenient_slot`), so the relay answers it the same way it answers an
// unknown id.

use serde::{Deserialize, Serialize};

use crate::types::{ControllerId, FieldId, GameType, Side, lenient_side, lenient_slot};

/// Messages sent by a field or controller to the relay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Identify this connection as a new field.
    NewField,
    /// Field closes registration and starts the game. The requested side
    /// count is clamped while decoding; a missing value means `Single`.
    Start {
        #[serde(default)]
        game_type: GameType,
    },
    /// Identify this connection as a controller joining `field_id`.
    NewController {
        #[serde(default, deserialize_with = "lenient_slot")]
        field_id: Option<FieldId>,
    },
    /// Field reports the winning side of a round.
    Win {
        #[serde(default, deserialize_with = "lenient_slot")]
        field_id: Option<FieldId>,
        #[serde(default, deserialize_with = "lenient_side")]
        side: Option<Side>,
    },
    /// Controller reports its current raw input.
    Direction {
        #[serde(default, deserialize_with = "lenient_slot")]
        field_id: Option<FieldId>,
        #[serde(default, deserialize_with = "lenient_slot")]
        controller_id: Option<ControllerId>,
        #[serde(default, deserialize_with = "lenient_side")]
        side: Option<Side>,
        direction: f64,
    },
}

/// Messages sent by the relay to a field or controller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Field registration accepted.
    FieldRegistered { field_id: FieldId },
    /// Controller registration accepted.
    ControllerRegistered { controller_id: ControllerId },
    /// A controller joined this field.
    ControllerConnected,
    /// A controller left this field.
    ControllerDisconnected,
    /// Protocol error or teardown notice.
    Error(ErrorNotice),
    /// Game started; this controller plays for `side`.
    Start { side: Side },
    /// Round finished; `won` tells whether this controller's side won.
    RoundEnd { won: bool },
    /// Game over, the receiver is (or hosts) the last controller standing.
    Winner,
    /// Consensus input for one side, in {-1, 0, 1}.
    Direction { side: Side, direction: i8 },
}

/// Machine-readable error code carried by `ServerMessage::Error`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    FieldNotExists,
    FieldClosedForRegistration,
    FieldDisconnected,
}

impl ErrorCode {
    /// Human-readable text shown by clients.
    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::FieldNotExists => "Field does not exist",
            ErrorCode::FieldClosedForRegistration => "Field closed for registration",
            ErrorCode::FieldDisconnected => "Field disconnected",
        }
    }
}

/// Payload of `ServerMessage::Error`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorNotice {
    pub error: String,
    pub code: ErrorCode,
}

impl From<ErrorCode> for ErrorNotice {
    fn from(code: ErrorCode) -> Self {
        Self {
            error: code.description().into(),
            code,
        }
    }
}

impl ServerMessage {
    /// Shorthand for an `Error` message with the canonical text for `code`.
    pub fn error(code: ErrorCode) -> Self {
        ServerMessage::Error(code.into())
    }
}
