use rand::Rng;
use rollcall_protocol::RoundId;

/// Generates a random 128-bit round id, hex-encoded.
///
/// Collisions are not checked. Two rounds of the same classroom only
/// need to be told apart in the attendance store.
pub fn generate_round_id() -> RoundId {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    RoundId::new(bytes.iter().map(|b| format!("{b:02x}")).collect::<String>())
}
