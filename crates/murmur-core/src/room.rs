//! Room names.

use rand::distr::Alphanumeric;
use rand::Rng as _;

/// A room identifier.
pub type RoomName = String;

/// Length of names produced by [`random_room_name`].
pub const RANDOM_ROOM_NAME_LENGTH: usize = 16;

/// Generate a random room name of [`RANDOM_ROOM_NAME_LENGTH`] characters
/// drawn from `[a-zA-Z0-9]`.
///
/// Uses the thread-local CSPRNG. Collisions with existing rooms are not
/// checked.
#[must_use]
pub fn random_room_name() -> RoomName {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_ROOM_NAME_LENGTH)
        .map(char::from)
        .collect()
}
