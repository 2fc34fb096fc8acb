/*!
    AES-128 CBC-MAC over a block-cipher backend.

    Plain CBC with a zero IV and no ciphertext output; the final chaining
    value is the MAC. Only safe for fixed-length or length-prefixed
    messages, which is why the CCM engine is its main consumer.
*/

use zeroize::Zeroize;

use hwaes_core::{AesError, AesResult, BLOCK_SIZE, Block, BlockCipher, KeyRef, ZERO_BLOCK};

use crate::cbc::{AesCbc, Padding};

#[derive(Debug)]
pub struct AesCbcMac {
    cbc: AesCbc,
    pending: Block,
    pending_len: usize,
}

impl AesCbcMac {
    pub fn new(key: KeyRef) -> Self {
        AesCbcMac {
            cbc: AesCbc::new(key, &ZERO_BLOCK, Padding::None),
            pending: [0; BLOCK_SIZE],
            pending_len: 0,
        }
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending_len
    }

    /// Feed message bytes, running every completed block through the chain.
    pub fn update<C: BlockCipher>(&mut self, cipher: &C, data: &[u8]) -> AesResult<()> {
        let mut rest = data;

        if self.pending_len > 0 {
            let take = (BLOCK_SIZE - self.pending_len).min(rest.len());
            self.pending[self.pending_len..self.pending_len + take]
                .copy_from_slice(&rest[..take]);
            self.pending_len += take;
            rest = &rest[take..];
            if self.pending_len < BLOCK_SIZE {
                return Ok(());
            }
            let pending = self.pending;
            self.cbc.encrypt_block(cipher, &pending)?;
            self.pending_len = 0;
        }

        let mut chunks = rest.chunks_exact(BLOCK_SIZE);
        for chunk in &mut chunks {
            let mut block = [0u8; BLOCK_SIZE];
            block.copy_from_slice(chunk);
            self.cbc.encrypt_block(cipher, &block)?;
        }

        let tail = chunks.remainder();
        if !tail.is_empty() {
            self.pending[..tail.len()].copy_from_slice(tail);
            self.pending_len = tail.len();
        }
        Ok(())
    }

    /**
        Emit the MAC (the leftmost `mac.len()` bytes of the final chaining
        value) and wipe the context. The total fed length must be an exact
        multiple of the block size; a trailing partial block is never
        silently padded.
    */
    pub fn finish(&mut self, mac: &mut [u8]) -> AesResult<()> {
        if mac.len() > BLOCK_SIZE {
            return Err(AesError::InvalidArgument(
                "requested mac length exceeds the block size",
            ));
        }
        if self.pending_len != 0 {
            return Err(AesError::ProtocolViolation(
                "message length is not a multiple of the block size",
            ));
        }
        mac.copy_from_slice(&self.cbc.chain()[..mac.len()]);
        self.pending.zeroize();
        self.cbc.reset();
        Ok(())
    }
}
