use sha2::{Digest, Sha256};

/// Fingerprint of a post's (text, caption) pair as last successfully
/// relayed. Compared by equality to classify an edit as a no-op.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentSignature([u8; 32]);

impl ContentSignature {
    /// Deterministic, total fingerprint over the two fields.
    ///
    /// Each field is framed with a presence tag and a length prefix, so
    /// `("A", "B|C")` and `("A|B", "C")` hash differently — a naive joined
    /// string would not distinguish them.
    pub fn of(text: Option<&str>, caption: Option<&str>) -> Self {
        let mut hasher = Sha256::new();
        for field in [text, caption] {
            match field {
                Some(s) => {
                    hasher.update([1u8]);
                    hasher.update((s.len() as u64).to_le_bytes());
                    hasher.update(s.as_bytes());
                }
                None => hasher.update([0u8]),
            }
        }
        Self(hasher.finalize().into())
    }
}

impl std::fmt::Debug for ContentSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ContentSignature(")?;
        for b in &self.0[..4] {
            write!(f, "{b:02x}")?;
        }
        write!(f, "..)")
    }
}
