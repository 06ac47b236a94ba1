//! Signed-message construction.
//!
//! Every detached signature in the vault signs a message built here: a
//! context label followed by length-prefixed parts. A signature made for one
//! purpose can therefore never be replayed as another.

/// What a signature attests to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attestation {
    /// An identity accepting a share key (signs the key fingerprint)
    Acceptance,
    /// An inviter vouching that a share key was sent to a named invitee
    InviterAcceptance,
    /// A legacy vault signing key vouching for the vault key
    VaultKey,
    /// A legacy vault signing key vouching for an item key and its author
    ItemKey,
    /// An author signing item content ciphertext
    ItemContent,
    /// A member or vault key signing encrypted vault metadata
    VaultMetadata,
}

impl Attestation {
    pub const fn label(&self) -> &'static [u8] {
        match self {
            Attestation::Acceptance => b"sealvault:acceptance",
            Attestation::InviterAcceptance => b"sealvault:inviter-acceptance",
            Attestation::VaultKey => b"sealvault:vault-key",
            Attestation::ItemKey => b"sealvault:item-key-signature",
            Attestation::ItemContent => b"sealvault:item-content-signature",
            Attestation::VaultMetadata => b"sealvault:vault-metadata-signature",
        }
    }

    /// Build the byte string that gets signed
    pub fn message(&self, parts: &[&[u8]]) -> Vec<u8> {
        let label = self.label();
        let len = label.len() + parts.iter().map(|p| p.len() + 8).sum::<usize>();
        let mut out = Vec::with_capacity(len);
        out.extend_from_slice(label);
        for part in parts {
            out.extend_from_slice(&(part.len() as u64).to_be_bytes());
            out.extend_from_slice(part);
        }
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parts_are_unambiguous() {
        let a = Attestation::ItemKey.message(&[b"ab", b"c"]);
        let b = Attestation::ItemKey.message(&[b"a", b"bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_contexts_are_separated() {
        let a = Attestation::Acceptance.message(&[b"fp"]);
        let b = Attestation::VaultKey.message(&[b"fp"]);
        assert_ne!(a, b);
    }
}
