//! Provisioning backends.
//!
//! Only the dry-run backend ships with the engine. It resolves every
//! descriptor locally so a stack can be planned without cloud access.

pub mod dry_run;

use std::fmt::Write as _;

use mbdeploy_common::types::ResourceRef;
use sha2::{Digest, Sha256};

pub use dry_run::DryRunBackend;

/// Returns the first `len` hex characters of the SHA-256 digest of a
/// resource reference, optionally salted.
///
/// Identical inputs always produce identical identifiers.
#[must_use]
pub fn digest(reference: &ResourceRef, salt: &str, len: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(reference.to_string().as_bytes());
    hasher.update(salt.as_bytes());
    let hash = hasher.finalize();

    let mut hex = String::with_capacity(hash.len() * 2);
    for byte in hash {
        let _ = write!(hex, "{byte:02x}");
    }
    hex.truncate(len);
    hex
}
