// Core ID and value types for the Remote Pong protocol.
//
// Fields and controllers are addressed by slot indices assigned by the relay
// (see `remote_pong_relay::registry`). A `ControllerId` is only meaningful
// together with the `FieldId` that owns it. `Side` identifies a paddle/team
// and is always in `0..game_type`.
//
// Clients are browsers and phones, so the ids and game type they send are
// decoded leniently: a value that cannot name anything still decodes, and the
// relay's normal lookups reject or ignore it.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Relay-assigned field slot index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(pub u32);

/// Controller slot index, scoped to its owning field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControllerId(pub u32);

/// Paddle/team index a controller plays for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Side(pub u32);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FieldId {
    fn from(slot: u32) -> Self {
        FieldId(slot)
    }
}

impl From<u32> for ControllerId {
    fn from(slot: u32) -> Self {
        ControllerId(slot)
    }
}

/// A JSON number that is a whole value in `u32` range.
fn whole_u32(value: &Value) -> Option<u32> {
    let Value::Number(n) = value else {
        return None;
    };
    if let Some(n) = n.as_u64() {
        return u32::try_from(n).ok();
    }
    n.as_f64()
        .filter(|f| f.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(f))
        .map(|f| f as u32)
}

/// Decode a client-supplied slot id. Whole numbers and numeric strings name
/// a slot; anything else (negative, too large, fractional, other JSON)
/// decodes as `None`.
pub(crate) fn lenient_slot<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<u32>,
{
    let value = Value::deserialize(deserializer)?;
    let slot = match &value {
        Value::String(s) => s.trim().parse::<u32>().ok(),
        other => whole_u32(other),
    };
    Ok(slot.map(T::from))
}

/// Decode a client-supplied side. Only whole numbers count; a side that is
/// not one decodes as `None` and matches no controller.
pub(crate) fn lenient_side<'de, D>(deserializer: D) -> Result<Option<Side>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(whole_u32(&value).map(Side))
}

/// Number of distinct sides in a game. Fields send the raw value with
/// `start`; anything other than 2 falls back to `Single`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GameType {
    #[default]
    Single,
    Versus,
}

impl GameType {
    /// Clamp a raw `start` argument to a supported game type. Missing,
    /// `null`, strings and any number other than 2 mean `Single`.
    pub fn from_value(raw: &Value) -> Self {
        match whole_u32(raw) {
            Some(2) => GameType::Versus,
            _ => GameType::Single,
        }
    }

    /// How many sides exist in this game type.
    pub fn side_count(self) -> u32 {
        match self {
            GameType::Single => 1,
            GameType::Versus => 2,
        }
    }

    /// Side for the `index`-th live controller (round-robin).
    pub fn side_for(self, index: u32) -> Side {
        Side(index % self.side_count())
    }
}

impl Serialize for GameType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.side_count())
    }
}

impl<'de> Deserialize<'de> for GameType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(|raw| GameType::from_value(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn game_type_clamps_unknown_values_to_single() {
        assert_eq!(GameType::from_value(&json!(1)), GameType::Single);
        assert_eq!(GameType::from_value(&json!(2)), GameType::Versus);
        assert_eq!(GameType::from_value(&json!(2.0)), GameType::Versus);
        assert_eq!(GameType::from_value(&json!(0)), GameType::Single);
        assert_eq!(GameType::from_value(&json!(3)), GameType::Single);
        assert_eq!(GameType::from_value(&json!(-2)), GameType::Single);
        assert_eq!(GameType::from_value(&json!(2.5)), GameType::Single);
        assert_eq!(GameType::from_value(&json!("2")), GameType::Single);
        assert_eq!(GameType::from_value(&Value::Null), GameType::Single);
    }

    #[test]
    fn game_type_is_sent_as_its_side_count() {
        assert_eq!(serde_json::to_value(GameType::Versus).unwrap(), json!(2));
        assert_eq!(serde_json::to_value(GameType::Single).unwrap(), json!(1));
    }

    #[derive(Debug, Deserialize)]
    struct Ids {
        #[serde(default, deserialize_with = "lenient_slot")]
        field_id: Option<FieldId>,
        #[serde(default, deserialize_with = "lenient_side")]
        side: Option<Side>,
    }

    fn ids(raw: Value) -> (Option<FieldId>, Option<Side>) {
        let ids: Ids = serde_json::from_value(raw).unwrap();
        (ids.field_id, ids.side)
    }

    #[test]
    fn slot_ids_accept_whole_numbers_and_numeric_strings() {
        assert_eq!(ids(json!({"field_id": 3})).0, Some(FieldId(3)));
        assert_eq!(ids(json!({"field_id": 3.0})).0, Some(FieldId(3)));
        assert_eq!(ids(json!({"field_id": "3"})).0, Some(FieldId(3)));
        assert_eq!(ids(json!({"field_id": u32::MAX})).0, Some(FieldId(u32::MAX)));
    }

    #[test]
    fn unusable_slot_ids_decode_as_none() {
        for raw in [
            json!(-1),
            json!(1u64 << 40),
            json!(1.5),
            json!("abc"),
            json!(null),
            json!([0]),
            json!({"id": 0}),
        ] {
            assert_eq!(ids(json!({"field_id": raw})).0, None, "field_id {raw}");
        }
        assert_eq!(ids(json!({})).0, None);
    }

    #[test]
    fn sides_must_be_numbers() {
        assert_eq!(ids(json!({"side": 1})).1, Some(Side(1)));
        assert_eq!(ids(json!({"side": "1"})).1, None);
        assert_eq!(ids(json!({"side": -1})).1, None);
    }

    #[test]
    fn sides_are_assigned_round_robin() {
        let sides: Vec<Side> = (0..4).map(|i| GameType::Versus.side_for(i)).collect();
        assert_eq!(sides, vec![Side(0), Side(1), Side(0), Side(1)]);

        let sides: Vec<Side> = (0..3).map(|i| GameType::Single.side_for(i)).collect();
        assert_eq!(sides, vec![Side(0); 3]);
    }

    #[test]
    fn ids_serialize_as_bare_integers() {
        assert_eq!(serde_json::to_string(&FieldId(7)).unwrap(), "7");
        assert_eq!(serde_json::to_string(&Side(1)).unwrap(), "1");
        let id: ControllerId = serde_json::from_str("12").unwrap();
        assert_eq!(id, ControllerId(12));
    }
}
