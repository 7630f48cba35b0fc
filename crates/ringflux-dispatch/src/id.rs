use rand::Rng;

/// An 18-ASCII-digit correlation identifier of the form `DDDD-DDDDDDDD-DDDD`.
///
/// Generated by [`EventId::generate`] for each [`enqueue_and_wait`] call so a
/// waiter can recognise its own response on the callbacks stream. Not
/// cryptographically strong: uniqueness only needs to hold within the
/// timeout window of one wait, not across trust boundaries. If identifiers
/// are ever handed to an untrusted party, swap `rand::thread_rng()` below
/// for a CSPRNG.
///
/// [`enqueue_and_wait`]: crate::Reactor::enqueue_and_wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId([u8; 18]);

const SEGMENT_LENS: [usize; 3] = [4, 8, 4];

impl EventId {
    /// The all-zero-digit identifier `0000-00000000-0000`, used as the
    /// default for events that were never assigned a waiter-generated id.
    pub const EMPTY: EventId = EventId(*b"0000-00000000-0000");

    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; 18];
        let mut pos = 0;
        for (seg_idx, &len) in SEGMENT_LENS.iter().enumerate() {
            if seg_idx > 0 {
                bytes[pos] = b'-';
                pos += 1;
            }
            for _ in 0..len {
                bytes[pos] = b'0' + rng.gen_range(0..10);
                pos += 1;
            }
        }
        debug_assert_eq!(pos, 18);
        EventId(bytes)
    }

    pub fn as_str(&self) -> &str {
        // SAFETY: every byte is either an ASCII digit or '-'.
        std::str::from_utf8(&self.0).expect("EventId is always ASCII")
    }

    pub fn as_bytes(&self) -> &[u8; 18] {
        &self.0
    }

    /// Parses the text-encoded form. Returns [`EventId::EMPTY`] if `s` is
    /// not a well-formed `DDDD-DDDDDDDD-DDDD` identifier, per the spec's
    /// "invalid encodings MUST yield an empty identifier" rule.
    pub fn parse(s: &str) -> Self {
        let bytes = s.as_bytes();
        if bytes.len() != 18 {
            return EventId::EMPTY;
        }
        let mut out = [0u8; 18];
        let mut pos = 0;
        for (seg_idx, &len) in SEGMENT_LENS.iter().enumerate() {
            if seg_idx > 0 {
                if bytes[pos] != b'-' {
                    return EventId::EMPTY;
                }
                out[pos] = b'-';
                pos += 1;
            }
            for _ in 0..len {
                let b = bytes[pos];
                if !b.is_ascii_digit() {
                    return EventId::EMPTY;
                }
                out[pos] = b;
                pos += 1;
            }
        }
        EventId(out)
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for EventId {
    fn default() -> Self {
        EventId::EMPTY
    }
}
