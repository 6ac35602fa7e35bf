// remote_pong_protocol — wire protocol between the Remote Pong relay and its
// clients.
//
// A "field" is the browser page that renders the game and runs the physics;
// "controllers" are phones acting as paddles. Both talk to the relay
// (`remote_pong_relay`) over TCP using the types in this crate. The crate has
// no dependency on the relay itself, so client tooling can use it alone.
//
// Module overview:
// - `types.rs`:    ID newtypes (`FieldId`, `ControllerId`, `Side`) and
//                  `GameType` with its clamping/round-robin rules.
// - `message.rs`:  `ClientMessage` / `ServerMessage` enums plus the error
//                  notice payload (`ErrorCode`, `ErrorNotice`).
// - `framing.rs`:  Length-delimited framing over any `Read`/`Write` stream:
//                  4-byte big-endian length prefix, then JSON payload.
//
// JSON everywhere: the messages are tiny and the field runs in a browser, so
// readability beats compactness.

pub mod framing;
pub mod message;
pub mod types;

pub use framing::{MAX_MESSAGE_SIZE, read_message, write_message};
pub use message::{ClientMessage, ErrorCode, ErrorNotice, ServerMessage};
pub use types::{ControllerId, FieldId, GameType, Side};

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn to_json(msg: &ServerMessage) -> serde_json::Value {
        serde_json::to_value(msg).unwrap()
    }

    #[test]
    fn client_messages_use_event_names_as_tags() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"new_field"}"#).unwrap();
        assert_eq!(msg, ClientMessage::NewField);

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"new_controller","field_id":3}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::NewController {
                field_id: Some(FieldId(3))
            }
        );

        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"direction","field_id":0,"controller_id":2,"side":1,"direction":-1}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::Direction {
                field_id: Some(FieldId(0)),
                controller_id: Some(ControllerId(2)),
                side: Some(Side(1)),
                direction: -1.0,
            }
        );
    }

    fn decode(raw: &str) -> ClientMessage {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn start_clamps_any_game_type() {
        let single = ClientMessage::Start {
            game_type: GameType::Single,
        };
        assert_eq!(decode(r#"{"type":"start","game_type":7}"#), single);
        assert_eq!(decode(r#"{"type":"start"}"#), single);
        assert_eq!(decode(r#"{"type":"start","game_type":null}"#), single);
        assert_eq!(decode(r#"{"type":"start","game_type":"2"}"#), single);
        assert_eq!(decode(r#"{"type":"start","game_type":1.5}"#), single);
        assert_eq!(
            decode(r#"{"type":"start","game_type":2}"#),
            ClientMessage::Start {
                game_type: GameType::Versus
            }
        );
    }

    #[test]
    fn unusable_ids_still_decode() {
        assert_eq!(
            decode(r#"{"type":"new_controller","field_id":-1}"#),
            ClientMessage::NewController { field_id: None }
        );
        assert_eq!(
            decode(r#"{"type":"new_controller"}"#),
            ClientMessage::NewController { field_id: None }
        );
        assert_eq!(
            decode(r#"{"type":"new_controller","field_id":"4"}"#),
            ClientMessage::NewController {
                field_id: Some(FieldId(4))
            }
        );
        assert_eq!(
            decode(
                r#"{"type":"direction","field_id":0,"controller_id":1099511627776,"side":"x","direction":1}"#
            ),
            ClientMessage::Direction {
                field_id: Some(FieldId(0)),
                controller_id: None,
                side: None,
                direction: 1.0,
            }
        );
    }

    #[test]
    fn client_messages_encode_ids_as_integers() {
        let msg = ClientMessage::Win {
            field_id: Some(FieldId(2)),
            side: Some(Side(1)),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            serde_json::json!({"type": "win", "field_id": 2, "side": 1})
        );
        assert_eq!(
            serde_json::to_value(ClientMessage::Start {
                game_type: GameType::Versus
            })
            .unwrap(),
            serde_json::json!({"type": "start", "game_type": 2})
        );
    }

    #[test]
    fn unknown_tag_fails_to_decode() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"teleport"}"#).is_err());
    }

    #[test]
    fn error_notice_shape() {
        assert_eq!(
            to_json(&ServerMessage::error(ErrorCode::FieldClosedForRegistration)),
            serde_json::json!({
                "type": "error",
                "error": "Field closed for registration",
                "code": "field_closed_for_registration",
            })
        );
        assert_eq!(
            to_json(&ServerMessage::error(ErrorCode::FieldNotExists))["code"],
            "field_not_exists"
        );
        assert_eq!(
            to_json(&ServerMessage::error(ErrorCode::FieldDisconnected))["code"],
            "field_disconnected"
        );
    }

    #[test]
    fn server_message_shapes() {
        assert_eq!(
            to_json(&ServerMessage::FieldRegistered {
                field_id: FieldId(4)
            }),
            serde_json::json!({"type": "field_registered", "field_id": 4})
        );
        assert_eq!(
            to_json(&ServerMessage::RoundEnd { won: true }),
            serde_json::json!({"type": "round_end", "won": true})
        );
        assert_eq!(
            to_json(&ServerMessage::Direction {
                side: Side(1),
                direction: -1
            }),
            serde_json::json!({"type": "direction", "side": 1, "direction": -1})
        );
        assert_eq!(
            to_json(&ServerMessage::Winner),
            serde_json::json!({"type": "winner"})
        );
    }

    #[test]
    fn framed_message_survives_the_wire() {
        let msg = ServerMessage::Start { side: Side(1) };
        let mut wire = Vec::new();
        write_message(&mut wire, &serde_json::to_vec(&msg).unwrap()).unwrap();

        let mut cursor = Cursor::new(&wire);
        let bytes = read_message(&mut cursor).unwrap();
        let recovered: ServerMessage = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(recovered, msg);
    }
}
