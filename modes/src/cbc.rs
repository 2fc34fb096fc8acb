/*!
    AES-128 CBC mode with a streaming update/finish lifecycle.
*/

use zeroize::Zeroize;

use hwaes_core::{AesError, AesResult, BLOCK_SIZE, Block, BlockCipher, KeyRef};

use crate::pkcs7;

/**
    Trailing-block policy for a CBC stream.
*/
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    /// PKCS#7: the final block is padded with 1..=16 bytes, each holding
    /// the pad length. A block-aligned stream still gains one full block.
    #[default]
    Pkcs7,
    /// No padding. The total stream length must be a multiple of the block
    /// size; a trailing partial block fails the finish.
    None,
    /// Zero-fill a trailing partial block. The receiver has no way to
    /// recover the true length; kept for bit compatibility with the legacy
    /// secure-element SDK. New callers should prefer `Pkcs7` or `None`.
    LegacyZero,
}

/**
    CBC context over a [`BlockCipher`] backend.

    Buffers up to one block of input between `update` calls so callers can
    feed data in arbitrary slices. Decryption additionally holds back the
    last complete block so `decrypt_finish` can strip padding from it.
    After `finish` (or any error) the context must be re-created; the
    chaining state is wiped on finish.
*/
#[derive(Debug)]
pub struct AesCbc {
    key: KeyRef,
    chain: Block,
    pending: Block,
    pending_len: usize,
    padding: Padding,
}

impl AesCbc {
    pub fn new(key: KeyRef, iv: &Block, padding: Padding) -> Self {
        AesCbc {
            key,
            chain: *iv,
            pending: [0; BLOCK_SIZE],
            pending_len: 0,
            padding,
        }
    }

    pub fn key(&self) -> KeyRef {
        self.key
    }

    /// Current chaining value. For the MAC engines this is the running MAC.
    pub(crate) fn chain(&self) -> &Block {
        &self.chain
    }

    pub(crate) fn reset(&mut self) {
        self.chain.zeroize();
        self.pending.zeroize();
        self.pending_len = 0;
    }

    /**
        Encrypt a single block: XOR with the chaining value, encrypt, adopt
        the ciphertext as the next chaining value.
    */
    pub fn encrypt_block<C: BlockCipher>(
        &mut self,
        cipher: &C,
        plaintext: &Block,
    ) -> AesResult<Block> {
        let mut input = [0u8; BLOCK_SIZE];
        for (i, byte) in input.iter_mut().enumerate() {
            *byte = plaintext[i] ^ self.chain[i];
        }
        let ciphertext = cipher.encrypt_block(self.key, &input)?;
        self.chain = ciphertext;
        Ok(ciphertext)
    }

    /**
        Decrypt a single block: decrypt, XOR with the chaining value, adopt
        the ciphertext as the next chaining value.
    */
    pub fn decrypt_block<C: BlockCipher>(
        &mut self,
        cipher: &C,
        ciphertext: &Block,
    ) -> AesResult<Block> {
        let output = cipher.decrypt_block(self.key, ciphertext)?;
        let mut plaintext = [0u8; BLOCK_SIZE];
        for (i, byte) in plaintext.iter_mut().enumerate() {
            *byte = output[i] ^ self.chain[i];
        }
        self.chain = *ciphertext;
        Ok(plaintext)
    }

    /**
        Feed plaintext, writing any completed ciphertext blocks to
        `ciphertext` and returning the number of bytes written. Up to 15
        bytes are buffered until the next call or the finish.
    */
    pub fn encrypt_update<C: BlockCipher>(
        &mut self,
        cipher: &C,
        plaintext: &[u8],
        ciphertext: &mut [u8],
    ) -> AesResult<usize> {
        let needed = (self.pending_len + plaintext.len()) / BLOCK_SIZE * BLOCK_SIZE;
        if ciphertext.len() < needed {
            return Err(AesError::BufferTooSmall {
                needed,
                got: ciphertext.len(),
            });
        }

        let mut written = 0;
        let mut rest = plaintext;

        // Top up a previously buffered partial block first.
        if self.pending_len > 0 {
            let take = (BLOCK_SIZE - self.pending_len).min(rest.len());
            self.pending[self.pending_len..self.pending_len + take]
                .copy_from_slice(&rest[..take]);
            self.pending_len += take;
            rest = &rest[take..];
            if self.pending_len < BLOCK_SIZE {
                return Ok(written);
            }
            let pending = self.pending;
            let out = self.encrypt_block(cipher, &pending)?;
            ciphertext[written..written + BLOCK_SIZE].copy_from_slice(&out);
            written += BLOCK_SIZE;
            self.pending_len = 0;
        }

        let mut chunks = rest.chunks_exact(BLOCK_SIZE);
        for chunk in &mut chunks {
            let mut block = [0u8; BLOCK_SIZE];
            block.copy_from_slice(chunk);
            let out = self.encrypt_block(cipher, &block)?;
            ciphertext[written..written + BLOCK_SIZE].copy_from_slice(&out);
            written += BLOCK_SIZE;
        }

        let tail = chunks.remainder();
        self.pending[..tail.len()].copy_from_slice(tail);
        self.pending_len = tail.len();

        Ok(written)
    }

    /**
        Close the encryption stream, emitting the final (padded) block when
        the padding policy calls for one. Returns the number of bytes
        written and wipes the chaining state.
    */
    pub fn encrypt_finish<C: BlockCipher>(
        &mut self,
        cipher: &C,
        ciphertext: &mut [u8],
    ) -> AesResult<usize> {
        let result = self.encrypt_finish_inner(cipher, ciphertext);
        self.reset();
        result
    }

    fn encrypt_finish_inner<C: BlockCipher>(
        &mut self,
        cipher: &C,
        ciphertext: &mut [u8],
    ) -> AesResult<usize> {
        let emit = match self.padding {
            Padding::Pkcs7 => {
                pkcs7::pad_block(&mut self.pending, self.pending_len);
                true
            }
            Padding::None => {
                if self.pending_len != 0 {
                    return Err(AesError::ProtocolViolation(
                        "plaintext length is not a multiple of the block size",
                    ));
                }
                false
            }
            Padding::LegacyZero => {
                if self.pending_len == 0 {
                    false
                } else {
                    self.pending[self.pending_len..].fill(0);
                    true
                }
            }
        };

        if !emit {
            return Ok(0);
        }
        if ciphertext.len() < BLOCK_SIZE {
            return Err(AesError::BufferTooSmall {
                needed: BLOCK_SIZE,
                got: ciphertext.len(),
            });
        }
        let pending = self.pending;
        let out = self.encrypt_block(cipher, &pending)?;
        ciphertext[..BLOCK_SIZE].copy_from_slice(&out);
        Ok(BLOCK_SIZE)
    }

    /**
        Feed ciphertext, writing recovered plaintext blocks to `plaintext`
        and returning the number of bytes written. The last complete block
        is always held back so `decrypt_finish` can strip padding from it.
    */
    pub fn decrypt_update<C: BlockCipher>(
        &mut self,
        cipher: &C,
        ciphertext: &[u8],
        plaintext: &mut [u8],
    ) -> AesResult<usize> {
        let needed = (self.pending_len + ciphertext.len()) / BLOCK_SIZE * BLOCK_SIZE;
        if plaintext.len() < needed {
            return Err(AesError::BufferTooSmall {
                needed,
                got: plaintext.len(),
            });
        }

        let mut written = 0;
        let mut rest = ciphertext;

        if self.pending_len > 0 && self.pending_len < BLOCK_SIZE {
            let take = (BLOCK_SIZE - self.pending_len).min(rest.len());
            self.pending[self.pending_len..self.pending_len + take]
                .copy_from_slice(&rest[..take]);
            self.pending_len += take;
            rest = &rest[take..];
        }

        // The buffered block may be the final one; only release it once
        // more input proves it is not.
        if self.pending_len == BLOCK_SIZE && !rest.is_empty() {
            let pending = self.pending;
            let out = self.decrypt_block(cipher, &pending)?;
            plaintext[written..written + BLOCK_SIZE].copy_from_slice(&out);
            written += BLOCK_SIZE;
            self.pending_len = 0;
        }

        // Process whole blocks directly, keeping the trailing 1..=16 bytes
        // buffered for the finish.
        while rest.len() > BLOCK_SIZE {
            let mut block = [0u8; BLOCK_SIZE];
            block.copy_from_slice(&rest[..BLOCK_SIZE]);
            let out = self.decrypt_block(cipher, &block)?;
            plaintext[written..written + BLOCK_SIZE].copy_from_slice(&out);
            written += BLOCK_SIZE;
            rest = &rest[BLOCK_SIZE..];
        }

        if !rest.is_empty() {
            self.pending[..rest.len()].copy_from_slice(rest);
            self.pending_len = rest.len();
        }

        Ok(written)
    }

    /**
        Close the decryption stream. Decrypts the held-back final block,
        strips padding according to the policy, and returns the number of
        plaintext bytes written. A total ciphertext length that is not a
        multiple of the block size is a protocol violation.
    */
    pub fn decrypt_finish<C: BlockCipher>(
        &mut self,
        cipher: &C,
        plaintext: &mut [u8],
    ) -> AesResult<usize> {
        let result = self.decrypt_finish_inner(cipher, plaintext);
        self.reset();
        result
    }

    fn decrypt_finish_inner<C: BlockCipher>(
        &mut self,
        cipher: &C,
        plaintext: &mut [u8],
    ) -> AesResult<usize> {
        if self.pending_len == 0 {
            return Ok(0);
        }
        if self.pending_len != BLOCK_SIZE {
            return Err(AesError::ProtocolViolation(
                "ciphertext length is not a multiple of the block size",
            ));
        }
        if plaintext.len() < BLOCK_SIZE {
            return Err(AesError::BufferTooSmall {
                needed: BLOCK_SIZE,
                got: plaintext.len(),
            });
        }
        let pending = self.pending;
        let out = self.decrypt_block(cipher, &pending)?;
        let kept = match self.padding {
            Padding::Pkcs7 => pkcs7::unpadded_len(&out)?,
            Padding::None | Padding::LegacyZero => BLOCK_SIZE,
        };
        plaintext[..kept].copy_from_slice(&out[..kept]);
        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use hwaes_core::soft::SoftAes;

    // NIST SP 800-38A F.2.1, AES-128 CBC.
    const KEY: [u8; 16] = hex!("2b7e151628aed2a6abf7158809cf4f3c");
    const IV: Block = hex!("000102030405060708090a0b0c0d0e0f");
    const PLAINTEXT: [u8; 64] = hex!(
        "6bc1bee22e409f96e93d7e117393172a"
        "ae2d8a571e03ac9c9eb76fac45af8e51"
        "30c81c46a35ce411e5fbc1191a0a52ef"
        "f69f2445df4f9b17ad2b417be66c3710"
    );
    const CIPHERTEXT: [u8; 64] = hex!(
        "7649abac8119b246cee98e9b12e9197d"
        "5086cb9b507219ee95db113a917678b2"
        "73bed6b8e3c1743b7116e69e22229516"
        "3ff1caa1681fac09120eca307586e1a7"
    );

    fn backend() -> (SoftAes, KeyRef) {
        let key = KeyRef::new(0, 0);
        let mut soft = SoftAes::new();
        soft.load_key(key, KEY);
        (soft, key)
    }

    fn encrypt_split(
        soft: &SoftAes,
        key: KeyRef,
        padding: Padding,
        data: &[u8],
        splits: &[usize],
    ) -> Vec<u8> {
        let mut ctx = AesCbc::new(key, &IV, padding);
        let mut out = vec![0u8; data.len() + BLOCK_SIZE];
        let mut written = 0;
        let mut rest = data;
        for &len in splits {
            let (head, tail) = rest.split_at(len.min(rest.len()));
            written += ctx
                .encrypt_update(soft, head, &mut out[written..])
                .unwrap();
            rest = tail;
        }
        written += ctx
            .encrypt_update(soft, rest, &mut out[written..])
            .unwrap();
        written += ctx.encrypt_finish(soft, &mut out[written..]).unwrap();
        out.truncate(written);
        out
    }

    #[test]
    fn encrypt_nist_vector() {
        let (soft, key) = backend();
        let ct = encrypt_split(&soft, key, Padding::None, &PLAINTEXT, &[]);
        assert_eq!(ct, CIPHERTEXT);
    }

    #[test]
    fn decrypt_nist_vector() {
        let (soft, key) = backend();
        let mut ctx = AesCbc::new(key, &IV, Padding::None);
        let mut pt = vec![0u8; 64];
        let mut written = ctx.decrypt_update(&soft, &CIPHERTEXT, &mut pt).unwrap();
        written += ctx.decrypt_finish(&soft, &mut pt[written..]).unwrap();
        assert_eq!(written, 64);
        assert_eq!(pt, PLAINTEXT);
    }

    #[test]
    fn split_updates_match_one_shot() {
        let (soft, key) = backend();
        let one_shot = encrypt_split(&soft, key, Padding::None, &PLAINTEXT, &[]);
        for splits in [
            &[1usize, 1, 1][..],
            &[15, 1, 16][..],
            &[16, 16][..],
            &[17, 30][..],
            &[5, 0, 11, 32][..],
        ] {
            assert_eq!(
                encrypt_split(&soft, key, Padding::None, &PLAINTEXT, splits),
                one_shot
            );
        }
    }

    #[test]
    fn pkcs7_round_trip_all_lengths() {
        let (soft, key) = backend();
        for len in [0usize, 1, 15, 16, 17, 31, 32, 33] {
            let data: Vec<u8> = (0..len as u8).collect();
            let ct = encrypt_split(&soft, key, Padding::Pkcs7, &data, &[7]);
            assert_eq!(ct.len(), (len / BLOCK_SIZE + 1) * BLOCK_SIZE);

            let mut ctx = AesCbc::new(key, &IV, Padding::Pkcs7);
            let mut pt = vec![0u8; ct.len()];
            let mut written = ctx.decrypt_update(&soft, &ct, &mut pt).unwrap();
            written += ctx.decrypt_finish(&soft, &mut pt[written..]).unwrap();
            pt.truncate(written);
            assert_eq!(pt, data);
        }
    }

    #[test]
    fn strict_mode_rejects_partial_finish() {
        let (soft, key) = backend();
        let mut ctx = AesCbc::new(key, &IV, Padding::None);
        let mut out = vec![0u8; 32];
        ctx.encrypt_update(&soft, &PLAINTEXT[..20], &mut out).unwrap();
        let err = ctx.encrypt_finish(&soft, &mut out).unwrap_err();
        assert!(matches!(err, AesError::ProtocolViolation(_)));
    }

    #[test]
    fn strict_mode_rejects_unaligned_ciphertext() {
        let (soft, key) = backend();
        let mut ctx = AesCbc::new(key, &IV, Padding::None);
        let mut pt = vec![0u8; 32];
        let written = ctx
            .decrypt_update(&soft, &CIPHERTEXT[..21], &mut pt)
            .unwrap();
        let err = ctx.decrypt_finish(&soft, &mut pt[written..]).unwrap_err();
        assert!(matches!(err, AesError::ProtocolViolation(_)));
    }

    #[test]
    fn legacy_zero_pads_trailing_block() {
        let (soft, key) = backend();
        let mut padded = PLAINTEXT[..20].to_vec();
        padded.resize(32, 0);
        let expected = encrypt_split(&soft, key, Padding::None, &padded, &[]);
        let ct = encrypt_split(&soft, key, Padding::LegacyZero, &PLAINTEXT[..20], &[]);
        assert_eq!(ct, expected);

        // Aligned input emits nothing extra.
        let ct = encrypt_split(&soft, key, Padding::LegacyZero, &PLAINTEXT[..32], &[]);
        assert_eq!(ct.len(), 32);
    }

    #[test]
    fn corrupt_padding_is_rejected() {
        let (soft, key) = backend();
        let mut ct = encrypt_split(&soft, key, Padding::Pkcs7, &PLAINTEXT[..20], &[]);
        let last = ct.len() - 1;
        ct[last] ^= 0x01;

        let mut ctx = AesCbc::new(key, &IV, Padding::Pkcs7);
        let mut pt = vec![0u8; ct.len()];
        let written = ctx.decrypt_update(&soft, &ct, &mut pt).unwrap();
        assert!(ctx.decrypt_finish(&soft, &mut pt[written..]).is_err());
    }

    #[test]
    fn update_reports_needed_output_size() {
        let (soft, key) = backend();
        let mut ctx = AesCbc::new(key, &IV, Padding::None);
        let mut small = [0u8; 16];
        let err = ctx
            .encrypt_update(&soft, &PLAINTEXT[..48], &mut small)
            .unwrap_err();
        assert_eq!(
            err,
            AesError::BufferTooSmall {
                needed: 48,
                got: 16
            }
        );
    }

    #[test]
    fn missing_key_propagates_backend_error() {
        let (soft, _) = backend();
        let mut ctx = AesCbc::new(KeyRef::new(7, 0), &IV, Padding::None);
        let mut out = [0u8; 16];
        let err = ctx
            .encrypt_update(&soft, &PLAINTEXT[..16], &mut out)
            .unwrap_err();
        assert!(matches!(err, AesError::Backend(_)));
    }

    #[test]
    fn single_block_primitives_chain() {
        let (soft, key) = backend();
        let mut ctx = AesCbc::new(key, &IV, Padding::None);
        let mut ct = Vec::new();
        for chunk in PLAINTEXT.chunks_exact(BLOCK_SIZE) {
            let mut block = [0u8; BLOCK_SIZE];
            block.copy_from_slice(chunk);
            ct.extend_from_slice(&ctx.encrypt_block(&soft, &block).unwrap());
        }
        assert_eq!(ct, CIPHERTEXT);

        let mut ctx = AesCbc::new(key, &IV, Padding::None);
        let mut pt = Vec::new();
        for chunk in CIPHERTEXT.chunks_exact(BLOCK_SIZE) {
            let mut block = [0u8; BLOCK_SIZE];
            block.copy_from_slice(chunk);
            pt.extend_from_slice(&ctx.decrypt_block(&soft, &block).unwrap());
        }
        assert_eq!(pt, PLAINTEXT);
    }
}
