//! Wire message types and JSON encoding.
//!
//! Every frame payload is one JSON object whose `type` field names the
//! message. [`ClientMessage`] covers what clients send; [`ServerMessage`]
//! covers what the server sends back. Decoding is schema-driven: unknown
//! `type` values, missing required fields, unknown block action strings and
//! out-of-range block types all fail with [`MessageError::Json`].

use std::collections::BTreeMap;
use std::fmt;

use blockyard_voxel::{BlockType, VoxelPos};
use rustc_hash::FxHashMap;
use serde::de::{self, DeserializeOwned, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Client -> server
// ---------------------------------------------------------------------------

/// Messages a client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Claim a display name and enter the world.
    Join { username: String },
    /// Replace the buffered movement input.
    Input {
        #[serde(default)]
        input: InputState,
    },
    /// Break or place a block.
    BlockAction { action: BlockAction, pos: VoxelPos },
    /// Write an arbitrary block type.
    BlockUpdate(BlockUpdate),
}

/// Snapshot of a client's controls. Missing fields default to idle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InputState {
    /// Key code to pressed state, e.g. `"KeyW": true`.
    pub keys: BTreeMap<String, bool>,
    pub mouse_movement: MouseMovement,
    pub jump: bool,
}

impl InputState {
    /// Iterate `(key code, pressed)` pairs.
    pub fn key_states(&self) -> impl Iterator<Item = (&str, bool)> + '_ {
        self.keys.iter().map(|(code, pressed)| (code.as_str(), *pressed))
    }
}

/// Mouse delta since the client's previous input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MouseMovement {
    pub x: f32,
    pub y: f32,
}

/// The two block actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockAction {
    Break,
    Place,
}

impl BlockAction {
    /// Block written by this action.
    pub fn result_block(self) -> BlockType {
        match self {
            BlockAction::Break => BlockType::Air,
            BlockAction::Place => BlockType::Stone,
        }
    }
}

/// A single block change, sent in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockUpdate {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    #[serde(rename = "blockType")]
    pub block_type: BlockType,
}

impl BlockUpdate {
    pub fn new(pos: VoxelPos, block_type: BlockType) -> Self {
        Self {
            x: pos.x,
            y: pos.y,
            z: pos.z,
            block_type,
        }
    }

    pub fn pos(&self) -> VoxelPos {
        VoxelPos::new(self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Server -> client
// ---------------------------------------------------------------------------

/// Messages the server sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Join accepted. Always follows the initial `world`.
    Welcome,
    /// Request rejected; the connection is closed afterwards.
    Error { message: String },
    /// Every non-air block in the world.
    World { blocks: WorldBlocks },
    /// Pose of every joined player, keyed by username.
    Positions { positions: BTreeMap<String, PlayerPose> },
    PlayerJoined { username: String },
    PlayerLeft { username: String },
    BlockUpdate(BlockUpdate),
}

/// World contents keyed on the wire by `"x,y,z"` strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldBlocks(pub FxHashMap<VoxelPos, BlockType>);

impl Serialize for WorldBlocks {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(pos, block)| (pos.to_string(), block)))
    }
}

impl<'de> Deserialize<'de> for WorldBlocks {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BlocksVisitor;

        impl<'de> Visitor<'de> for BlocksVisitor {
            type Value = WorldBlocks;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of \"x,y,z\" keys to block type ids")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut blocks = FxHashMap::default();
                while let Some((key, block)) = map.next_entry::<String, BlockType>()? {
                    let pos = key.parse::<VoxelPos>().map_err(de::Error::custom)?;
                    blocks.insert(pos, block);
                }
                Ok(WorldBlocks(blocks))
            }
        }

        deserializer.deserialize_map(BlocksVisitor)
    }
}

/// Position and look direction of one player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerPose {
    pub pos: Position,
    pub rot: Rotation,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// `x` is pitch, `y` is yaw, both radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub x: f32,
    pub y: f32,
}

// ---------------------------------------------------------------------------
// Errors and encoding
// ---------------------------------------------------------------------------

/// Errors that can occur while encoding or decoding a message.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("empty payload")]
    EmptyPayload,

    #[error("invalid message: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode a message as a JSON payload.
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, MessageError> {
    Ok(serde_json::to_vec(msg)?)
}

/// Decode a JSON payload.
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, MessageError> {
    if payload.is_empty() {
        return Err(MessageError::EmptyPayload);
    }
    Ok(serde_json::from_slice(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(value: serde_json::Value) -> Result<ClientMessage, MessageError> {
        decode(value.to_string().as_bytes())
    }

    #[test]
    fn test_join_decodes() {
        let msg = client(json!({"type": "join", "username": "alice"})).unwrap();
        assert_eq!(msg, ClientMessage::Join { username: "alice".into() });
    }

    #[test]
    fn test_input_decodes_camel_case_fields() {
        let msg = client(json!({
            "type": "input",
            "input": {
                "keys": {"KeyW": true, "KeyA": false},
                "mouseMovement": {"x": 12.5, "y": -3.0},
                "jump": true
            }
        }))
        .unwrap();

        let ClientMessage::Input { input } = msg else {
            panic!("expected input, got {msg:?}");
        };
        assert_eq!(input.keys.get("KeyW"), Some(&true));
        assert_eq!(input.keys.get("KeyA"), Some(&false));
        assert_eq!(input.mouse_movement, MouseMovement { x: 12.5, y: -3.0 });
        assert!(input.jump);
    }

    #[test]
    fn test_input_missing_fields_default() {
        let msg = client(json!({"type": "input"})).unwrap();
        assert_eq!(msg, ClientMessage::Input { input: InputState::default() });

        let msg = client(json!({"type": "input", "input": {"jump": true}})).unwrap();
        let ClientMessage::Input { input } = msg else {
            panic!("expected input");
        };
        assert!(input.keys.is_empty());
        assert_eq!(input.mouse_movement, MouseMovement::default());
        assert!(input.jump);
    }

    #[test]
    fn test_block_action_decodes() {
        let msg = client(json!({"type": "blockAction", "action": "break", "pos": {"x": 5, "y": 10, "z": 5}}))
            .unwrap();
        assert_eq!(
            msg,
            ClientMessage::BlockAction {
                action: BlockAction::Break,
                pos: VoxelPos::new(5, 10, 5),
            }
        );
        assert_eq!(BlockAction::Place.result_block(), BlockType::Stone);
        assert_eq!(BlockAction::Break.result_block(), BlockType::Air);
    }

    #[test]
    fn test_malformed_client_messages_rejected() {
        assert!(client(json!({"type": "blockAction", "action": "explode", "pos": {"x": 0, "y": 0, "z": 0}})).is_err());
        assert!(client(json!({"type": "blockUpdate", "x": 0, "y": 0, "z": 0, "blockType": 42})).is_err());
        assert!(client(json!({"type": "teleport"})).is_err());
        assert!(client(json!({"username": "no type"})).is_err());
        assert!(decode::<ClientMessage>(b"not json").is_err());
        assert!(matches!(decode::<ClientMessage>(b""), Err(MessageError::EmptyPayload)));
    }

    #[test]
    fn test_block_update_wire_shape() {
        let msg = ServerMessage::BlockUpdate(BlockUpdate::new(VoxelPos::new(1, 2, 3), BlockType::Air));
        let value: serde_json::Value = serde_json::from_slice(&encode(&msg).unwrap()).unwrap();
        assert_eq!(value, json!({"type": "blockUpdate", "x": 1, "y": 2, "z": 3, "blockType": 0}));

        let back = client(value).unwrap();
        assert_eq!(
            back,
            ClientMessage::BlockUpdate(BlockUpdate::new(VoxelPos::new(1, 2, 3), BlockType::Air))
        );
    }

    #[test]
    fn test_server_message_shapes() {
        let welcome: serde_json::Value = serde_json::from_slice(&encode(&ServerMessage::Welcome).unwrap()).unwrap();
        assert_eq!(welcome, json!({"type": "welcome"}));

        let error = ServerMessage::Error { message: "taken".into() };
        let value: serde_json::Value = serde_json::from_slice(&encode(&error).unwrap()).unwrap();
        assert_eq!(value, json!({"type": "error", "message": "taken"}));

        let joined = ServerMessage::PlayerJoined { username: "bob".into() };
        let value: serde_json::Value = serde_json::from_slice(&encode(&joined).unwrap()).unwrap();
        assert_eq!(value, json!({"type": "playerJoined", "username": "bob"}));
    }

    #[test]
    fn test_world_keys_are_coordinate_strings() {
        let mut blocks = FxHashMap::default();
        blocks.insert(VoxelPos::new(-1, 20, 3), BlockType::Grass);
        let msg = ServerMessage::World { blocks: WorldBlocks(blocks) };

        let value: serde_json::Value = serde_json::from_slice(&encode(&msg).unwrap()).unwrap();
        assert_eq!(value, json!({"type": "world", "blocks": {"-1,20,3": 1}}));

        let back: ServerMessage = decode(value.to_string().as_bytes()).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_world_rejects_bad_key() {
        let bad = json!({"type": "world", "blocks": {"1,2": 3}});
        assert!(decode::<ServerMessage>(bad.to_string().as_bytes()).is_err());
    }

    #[test]
    fn test_positions_shape() {
        let mut positions = BTreeMap::new();
        positions.insert(
            "alice".to_string(),
            PlayerPose {
                pos: Position { x: 0.0, y: 40.0, z: 0.0 },
                rot: Rotation { x: 0.25, y: -1.0 },
            },
        );
        let value: serde_json::Value =
            serde_json::from_slice(&encode(&ServerMessage::Positions { positions }).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "positions",
                "positions": {
                    "alice": {"pos": {"x": 0.0, "y": 40.0, "z": 0.0}, "rot": {"x": 0.25, "y": -1.0}}
                }
            })
        );
    }
}
