use crate::error::AesResult;
use crate::key::KeyRef;

/// AES block size in bytes. Every engine in the mode layer works in these
/// units.
pub const BLOCK_SIZE: usize = 16;

/// One AES block.
pub type Block = [u8; BLOCK_SIZE];

/// The all-zero block. CMAC subkey-derivation input and the implicit
/// CMAC/CBC-MAC IV.
pub const ZERO_BLOCK: Block = [0u8; BLOCK_SIZE];

/**
    Single-block AES-128 primitive supplied by a backend.

    Implementations wrap either a hardware secure element, where the key
    never leaves the device, or the software fallback in
    [`soft`](crate::soft). Mode engines call through this trait once per
    block; a backend failure propagates to the caller verbatim and the
    engine never retries.
*/
pub trait BlockCipher {
    /// Encrypt one block with the key at `key`.
    fn encrypt_block(&self, key: KeyRef, input: &Block) -> AesResult<Block>;

    /// Decrypt one block with the key at `key`.
    fn decrypt_block(&self, key: KeyRef, input: &Block) -> AesResult<Block>;
}
