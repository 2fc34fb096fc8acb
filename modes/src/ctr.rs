/*!
    AES-128 CTR mode with an explicit counter-field width.
*/

use hwaes_core::{AesError, AesResult, BLOCK_SIZE, Block, BlockCipher, KeyRef};

/**
    CTR context over a [`BlockCipher`] backend.

    The counter block is split into a high-order nonce part and a low-order
    big-endian counter field of `counter_width` bytes. Increments are
    confined to the counter field: overflow wraps the field to zero and
    never carries into the nonce bytes. The width is validated when the
    first block is processed, not at construction, matching the legacy
    secure-element SDK.
*/
#[derive(Debug)]
pub struct AesCtr {
    key: KeyRef,
    counter: Block,
    counter_width: usize,
}

impl AesCtr {
    pub fn new(key: KeyRef, counter_width: usize, counter_block: &Block) -> Self {
        AesCtr {
            key,
            counter: *counter_block,
            counter_width,
        }
    }

    pub fn key(&self) -> KeyRef {
        self.key
    }

    /// Current counter block (nonce and counter field).
    pub fn counter_block(&self) -> &Block {
        &self.counter
    }

    /**
        Encrypt one block: XOR the input with the encrypted counter block,
        then advance the counter.
    */
    pub fn encrypt_block<C: BlockCipher>(
        &mut self,
        cipher: &C,
        input: &Block,
    ) -> AesResult<Block> {
        let keystream = self.next_keystream(cipher)?;
        let mut out = [0u8; BLOCK_SIZE];
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = input[i] ^ keystream[i];
        }
        Ok(out)
    }

    /// Decryption is the same keystream XOR as encryption.
    pub fn decrypt_block<C: BlockCipher>(
        &mut self,
        cipher: &C,
        input: &Block,
    ) -> AesResult<Block> {
        self.encrypt_block(cipher, input)
    }

    /**
        Advance the counter field by one. The carry stays inside the low
        `counter_width` bytes; overflow of the whole field wraps it to zero
        without touching the nonce bytes.
    */
    pub fn increment(&mut self) -> AesResult<()> {
        self.check_width()?;
        for i in (BLOCK_SIZE - self.counter_width..BLOCK_SIZE).rev() {
            self.counter[i] = self.counter[i].wrapping_add(1);
            if self.counter[i] != 0 {
                break;
            }
        }
        Ok(())
    }

    /// Encrypt the current counter block and advance the counter.
    pub(crate) fn next_keystream<C: BlockCipher>(&mut self, cipher: &C) -> AesResult<Block> {
        self.check_width()?;
        let keystream = cipher.encrypt_block(self.key, &self.counter)?;
        self.increment()?;
        Ok(keystream)
    }

    fn check_width(&self) -> AesResult<()> {
        if self.counter_width > BLOCK_SIZE {
            return Err(AesError::InvalidArgument(
                "counter width exceeds the block size",
            ));
        }
        Ok(())
    }
}
