//! Room id generation, display-name allocation, and color allocation.
//! Nothing here touches a `Room` or the registry; it's pure leaf-level
//! utility that the rest of the crate calls into.

use rand::Rng;

const ROOM_ID_LEN: usize = 6;
const ROOM_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A fixed pool of display names handed out round-robin to joiners who
/// didn't supply one. Falls back to `"User N"` once exhausted.
pub const NAME_POOL: &[&str] = &[
    "Swift Fox", "Calm River", "Bright Spark", "Quiet Owl", "Bold Tiger",
    "Gentle Wave", "Clever Crow", "Happy Otter", "Lucky Wolf", "Steady Bear",
    "Keen Hawk", "Wild Deer",
];

/// A fixed 12-color palette. Colors are handed out by a process-global
/// round-robin counter (see `ColorAllocator`), so they are not uniqued
/// within a room: two members of the same room can share a color if other
/// rooms have consumed intermediate colors in between. Accepted quirk, not
/// a bug to fix here.
pub const COLOR_PALETTE: &[&str] = &[
    "#e6194b", "#3cb44b", "#ffe119", "#4363d8", "#f58231", "#911eb4",
    "#46f0f0", "#f032e6", "#bcf60c", "#fabebe", "#008080", "#e6beff",
];

/// Generates a fresh 6-character uppercase alphanumeric room id. Collisions
/// against an already-populated registry are handled by the caller retrying
/// with a new id (see `registry::Registry::create`).
pub fn generate_room_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ROOM_ID_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..ROOM_ID_ALPHABET.len());
            ROOM_ID_ALPHABET[idx] as char
        })
        .collect()
}

/// `true` iff `s` is a syntactically valid room id: exactly 6 characters,
/// each in `[A-Z0-9]`. Callers are expected to uppercase first (room ids
/// are case-insensitive on the wire).
pub fn is_valid_room_id(s: &str) -> bool {
    s.len() == ROOM_ID_LEN && s.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Picks a display name for the `existing_count`-th joiner of a room
/// (0-indexed), falling back to `"User N"` past the pool's size.
pub fn allocate_name(existing_count: usize) -> String {
    match NAME_POOL.get(existing_count) {
        Some(name) => name.to_string(),
        None => format!("User {}", existing_count + 1),
    }
}

/// Process-global round-robin color allocator. One instance lives in
/// managed Rocket state and is shared by every room.
#[derive(Debug, Default)]
pub struct ColorAllocator {
    next: std::sync::atomic::AtomicUsize,
}

impl ColorAllocator {
    pub fn new() -> Self {
        Self {
            next: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn next_color(&self) -> &'static str {
        let idx = self.next.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        COLOR_PALETTE[idx % COLOR_PALETTE.len()]
    }
}
