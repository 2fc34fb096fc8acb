/*!
    AES-128 CMAC (NIST SP 800-38B) over a block-cipher backend.
*/

use zeroize::Zeroize;

use hwaes_core::{AesError, AesResult, BLOCK_SIZE, Block, BlockCipher, KeyRef, ZERO_BLOCK};

use crate::cbc::{AesCbc, Padding};

/**
    Streaming CMAC context.

    Runs a CBC chain with a zero IV underneath, but keeps its own one-block
    lookahead buffer: the final block is tweaked with a derived subkey, so a
    block is only pushed into the chain once later input proves it is not
    the last one. `pending_len` may reach 16, meaning a complete block held
    as maybe-last.
*/
pub struct AesCmac {
    cbc: AesCbc,
    pending: Block,
    pending_len: usize,
}

impl AesCmac {
    pub fn new(key: KeyRef) -> Self {
        AesCmac {
            cbc: AesCbc::new(key, &ZERO_BLOCK, Padding::None),
            pending: [0; BLOCK_SIZE],
            pending_len: 0,
        }
    }

    /// Feed message bytes. Accepts any length, including empty slices.
    pub fn update<C: BlockCipher>(&mut self, cipher: &C, data: &[u8]) -> AesResult<()> {
        let take = (BLOCK_SIZE - self.pending_len).min(data.len());
        self.pending[self.pending_len..self.pending_len + take].copy_from_slice(&data[..take]);

        if self.pending_len + data.len() <= BLOCK_SIZE {
            // Might be the final block; hold it for the finish.
            self.pending_len += data.len();
            return Ok(());
        }

        let pending = self.pending;
        self.cbc.encrypt_block(cipher, &pending)?;

        let mut rest = &data[take..];
        while rest.len() > BLOCK_SIZE {
            let mut block = [0u8; BLOCK_SIZE];
            block.copy_from_slice(&rest[..BLOCK_SIZE]);
            self.cbc.encrypt_block(cipher, &block)?;
            rest = &rest[BLOCK_SIZE..];
        }

        self.pending[..rest.len()].copy_from_slice(rest);
        self.pending_len = rest.len();
        Ok(())
    }

    /**
        Compute the MAC and wipe the context. `mac` receives the leftmost
        `mac.len()` bytes of the full tag; lengths above the block size are
        rejected.
    */
    pub fn finish<C: BlockCipher>(&mut self, cipher: &C, mac: &mut [u8]) -> AesResult<()> {
        if mac.len() > BLOCK_SIZE {
            return Err(AesError::InvalidArgument(
                "requested mac length exceeds the block size",
            ));
        }

        let l = cipher.encrypt_block(self.cbc.key(), &ZERO_BLOCK)?;
        let mut subkey = dbl(&l);

        if self.pending_len != BLOCK_SIZE {
            // Partial (or empty) final block: second subkey and 10* padding.
            subkey = dbl(&subkey);
            self.pending[self.pending_len] = 0x80;
            self.pending[self.pending_len + 1..].fill(0);
        }

        for (byte, k) in self.pending.iter_mut().zip(subkey.iter()) {
            *byte ^= k;
        }

        let pending = self.pending;
        let full = self.cbc.encrypt_block(cipher, &pending)?;
        mac.copy_from_slice(&full[..mac.len()]);

        self.pending.zeroize();
        self.pending_len = 0;
        self.cbc.reset();
        Ok(())
    }
}

/**
    Double a value in GF(2^128): left shift by one bit, folding the dropped
    high bit back in with the reduction constant 0x87.
*/
fn dbl(block: &Block) -> Block {
    let mut out = [0u8; BLOCK_SIZE];
    let mut carry = 0u8;
    for i in (0..BLOCK_SIZE).rev() {
        out[i] = (block[i] << 1) | carry;
        carry = block[i] >> 7;
    }
    if carry == 1 {
        out[BLOCK_SIZE - 1] ^= 0x87;
    }
    out
}
