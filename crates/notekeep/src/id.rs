//! Note identifiers.
//!
//! Ids are UUID v7: a 48-bit millisecond timestamp followed by random bits,
//! so they sort roughly by creation time and collide with negligible
//! probability.

use uuid::Uuid;

pub fn generate_id() -> String {
    Uuid::now_v7().to_string()
}
