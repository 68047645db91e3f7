//! Member identifiers within the affiliate network.

use core::{fmt, str::FromStr};

/// A participant in the affiliate network, identified by a 20-byte address.
///
/// Addresses compare byte-wise. Textual forms are case-insensitive and
/// normalize to a canonical lowercase `0x…` rendering on ingestion.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId([u8; 20]);

impl MemberId {
    /// The sentinel "no member" value, denoting an unfilled tree slot.
    pub const EMPTY: MemberId = MemberId([0; 20]);

    /// Create a member id from its raw bytes.
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        MemberId(bytes)
    }

    /// The raw address bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Whether this is the [`MemberId::EMPTY`] sentinel.
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemberId({self})")
    }
}

/// Failure to parse a textual member id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MemberIdError {
    /// The input was not 40 hex characters after any `0x` prefix.
    #[error("member id must be 40 hex characters, got {0}")]
    Length(usize),
    /// The input contained non-hex characters.
    #[error("member id contains non-hex characters")]
    Encoding,
}

impl FromStr for MemberId {
    type Err = MemberIdError;

    fn from_str(s: &str) -> Result<Self, MemberIdError> {
        let s = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if s.len() != 40 {
            return Err(MemberIdError::Length(s.len()));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| MemberIdError::Encoding)?;
        Ok(MemberId(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        let lower: MemberId = "0xdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef"
            .parse()
            .unwrap();
        let upper: MemberId = "0xDEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEF"
            .parse()
            .unwrap();
        let bare: MemberId = "DeadBeefDeadBeefDeadBeefDeadBeefDeadBeef".parse().unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower, bare);
    }

    #[test]
    fn display_is_canonical_lowercase() {
        let id: MemberId = "0xDEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEF"
            .parse()
            .unwrap();
        assert_eq!(id.to_string(), "0xdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef");
    }

    #[test]
    fn empty_sentinel_is_all_zero() {
        assert!(MemberId::EMPTY.is_empty());
        assert_eq!(MemberId::from_bytes([0; 20]), MemberId::EMPTY);
        assert!(!MemberId::from_bytes([1; 20]).is_empty());
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            "0x1234".parse::<MemberId>(),
            Err(MemberIdError::Length(4)),
        );
        assert_eq!(
            "zzadbeefdeadbeefdeadbeefdeadbeefdeadbeef".parse::<MemberId>(),
            Err(MemberIdError::Encoding),
        );
    }
}
