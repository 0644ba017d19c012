//! Room management REST types.
//!
//! The shell performs the HTTP calls; these are the request/response
//! shapes for `POST /api/rooms` and `GET /api/rooms/{id}`.

use serde::{Deserialize, Serialize};

/// Response to `POST /api/rooms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoomResponse {
    /// Identifier of the freshly created room.
    pub room_id: String,
}

/// Response to `GET /api/rooms/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomExistsResponse {
    /// Whether the room currently exists.
    pub exists: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_room_response_decodes() {
        let response: CreateRoomResponse =
            serde_json::from_str(r#"{"room_id":"r-42"}"#).unwrap();
        assert_eq!(response.room_id, "r-42");
    }

    #[test]
    fn room_exists_response_decodes() {
        let response: RoomExistsResponse = serde_json::from_str(r#"{"exists":false}"#).unwrap();
        assert!(!response.exists);
    }
}
