/// size of the sliding window in bytes
pub const WINDOW_SIZE: usize = 64;

/// permutation values for byte values 0x00..=0x3f. the remaining entries of
/// the 256-entry table are zero. the full table is wire format: it determines
/// chunk boundaries, and through them every node, tree, and commit digest.
const TABLE_SEED: [u32; 64] = [
    0x458be752, 0xc10748cc, 0xfbbcdbb8, 0x6ded5b68,
    0xb10a82b5, 0x20d75648, 0xdfc5665f, 0xa8428801,
    0x7ebf5191, 0x841135c7, 0x65cc53b3, 0x280a597c,
    0x16f60255, 0xc78cbc3e, 0x294415f5, 0xb938d494,
    0xec85c4e6, 0xb7d33edc, 0xe549b544, 0xfdeda5aa,
    0x882bf287, 0x3116571e, 0xa6fc8d2d, 0x1b5f3f3c,
    0x2e7d4e29, 0x49e95d76, 0x540d0a26, 0xf87b1a02,
    0x84b4a028, 0xd7f89c1e, 0xf309cbe0, 0x600a2f4f,
    0x5f33e848, 0xb149a5d5, 0x1e39e8bd, 0x2a1fc67a,
    0x934d46e4, 0x8f902f30, 0xfc4b0223, 0xfb6d4314,
    0x5f6b9b30, 0x6f2d9c6c, 0x58597e40, 0x3cbbb848,
    0x7c3b5360, 0x3f0ab26c, 0x9ea521c8, 0x1c1b0d14,
    0x3e9de0c0, 0x289d8f1c, 0x0c01f56c, 0x61bd8e3c,
    0xd6e2e980, 0x9c098894, 0x9e0e2534, 0x049dc09c,
    0x64a0dc24, 0xb07c0440, 0x8e5b0a50, 0xf05c1e10,
    0x4c449e3c, 0x5c8c6c30, 0x88507800, 0x08b09a40,
];

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < TABLE_SEED.len() {
        table[i] = TABLE_SEED[i];
        i += 1;
    }
    table
}

static TABLE: [u32; 256] = build_table();

/// 32-bit left rotation with the shift taken modulo the word size
fn rotl(val: u32, n: u32) -> u32 {
    val.rotate_left(n % 32)
}

/// streaming rolling hash over a fixed 64-byte sliding window, used for
/// content-defined chunking.
///
/// on each roll the byte entering the window and the byte leaving it update
/// the hash so that the result equals a fresh hash of the window contents:
/// the ejected byte's contribution cancels exactly after 64 rolls.
///
/// boundary detection is sticky: a roll that satisfies
/// `hash % target_size == 0` past the minimum size sets a flag that
/// `is_boundary` reports until the next `reset`, so callers can feed whole
/// records and only finalize boundaries between them.
pub struct Buzhash {
    target_size: u32,
    min_size: u32,
    max_size: u32,

    hash: u32,
    window: [u8; WINDOW_SIZE],
    pos: usize,
    count: usize,
    boundary_hit: bool,
}

impl Buzhash {
    /// create a hasher with the given boundary parameters (all in bytes)
    pub fn new(target_size: u32, min_size: u32, max_size: u32) -> Self {
        Self {
            target_size,
            min_size,
            max_size,
            hash: 0,
            window: [0u8; WINDOW_SIZE],
            pos: 0,
            count: 0,
            boundary_hit: false,
        }
    }

    /// reset all rolling state
    pub fn reset(&mut self) {
        self.hash = 0;
        self.window = [0u8; WINDOW_SIZE];
        self.pos = 0;
        self.count = 0;
        self.boundary_hit = false;
    }

    /// feed one byte and return the updated hash value
    pub fn roll(&mut self, byte: u8) -> u32 {
        let out = self.window[self.pos];
        self.window[self.pos] = byte;
        self.pos = (self.pos + 1) % WINDOW_SIZE;

        self.hash = rotl(self.hash, 1)
            ^ rotl(TABLE[out as usize], WINDOW_SIZE as u32)
            ^ TABLE[byte as usize];

        self.count += 1;

        // boundaries only count once past the minimum size
        if self.count >= self.min_size as usize && self.hash % self.target_size == 0 {
            self.boundary_hit = true;
        }

        self.hash
    }

    /// should the current position be a chunk boundary
    pub fn is_boundary(&self) -> bool {
        if self.count < self.min_size as usize {
            return false;
        }
        if self.count >= self.max_size as usize {
            return true;
        }
        self.boundary_hit
    }

    /// bytes fed since the last reset
    pub fn count(&self) -> usize {
        self.count
    }
}
