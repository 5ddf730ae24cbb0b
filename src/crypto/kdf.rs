use anyhow::Context;
use argon2::{Algorithm, Argon2, Params, Version};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::KEY_LEN;

/// Symmetric key for sealing messages. Wiped on drop.
pub type MessageKey = Zeroizing<[u8; KEY_LEN]>;

/// Derives the message key from a passphrase.
///
/// The key is the raw SHA-256 digest of the UTF-8 passphrase: no salt and no
/// work factor, so anyone typing the same passphrase gets the same key and
/// nothing key-related is ever stored next to a message.
pub fn derive(passphrase: &str) -> MessageKey {
    Zeroizing::new(Sha256::digest(passphrase.as_bytes()).into())
}

/// Argon2id cost parameters used to hash login passwords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    mem_cost_kib: u32,
    time_cost: u32,
    parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            mem_cost_kib: 64 * 1024, // 64 MiB
            time_cost: 3,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    pub fn new(mem_cost_kib: u32, time_cost: u32, parallelism: u32) -> anyhow::Result<Self> {
        let params = Self {
            mem_cost_kib,
            time_cost,
            parallelism,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn mem_cost_kib(&self) -> u32 {
        self.mem_cost_kib
    }

    pub fn time_cost(&self) -> u32 {
        self.time_cost
    }

    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.mem_cost_kib < 8 {
            anyhow::bail!("argon2 memory cost too low");
        }
        if self.time_cost < 1 {
            anyhow::bail!("argon2 time cost must be >= 1");
        }
        if self.parallelism < 1 {
            anyhow::bail!("argon2 parallelism must be >= 1");
        }
        if self.mem_cost_kib < 8 * self.parallelism {
            anyhow::bail!("argon2 memory cost must be at least 8 * parallelism");
        }
        Ok(())
    }

    pub(crate) fn hasher(&self) -> anyhow::Result<Argon2<'static>> {
        self.validate().context("invalid Argon2 parameters")?;

        let params = Params::new(self.mem_cost_kib, self.time_cost, self.parallelism, None)
            .map_err(|e| anyhow::anyhow!("failed to construct Argon2 params: {e}"))?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}
