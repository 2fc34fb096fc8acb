/*!
    AES-128 CCM (RFC 3610) composed from the CBC-MAC and CTR engines.

    One shared key drives both halves: a CBC-MAC over the B0 header block,
    the length-prefixed AAD and the plaintext, and a CTR keystream whose
    counter block 0 is reserved for masking the tag. Decryption reports an
    authentication failure through the returned `bool`, never through an
    error, and always runs to completion so callers cannot distinguish
    where a forgery was detected.
*/

use zeroize::Zeroize;

use hwaes_core::{AesError, AesResult, BLOCK_SIZE, Block, BlockCipher, KeyRef, ZERO_BLOCK};

use crate::cbcmac::AesCbcMac;
use crate::ctr::AesCtr;

const TAG_SIZES: [usize; 7] = [4, 6, 8, 10, 12, 14, 16];
const MIN_IV_SIZE: usize = 7;
const MAX_IV_SIZE: usize = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Aad,
    AadDone,
    Encrypt,
    Decrypt,
    Done,
}

/**
    CCM context.

    AAD and payload sizes are declared at construction (CCM authenticates
    the payload length inside the B0 block, so it must be known up front)
    and enforced incrementally. The AAD phase ends at the first payload
    call, which also fixes the direction; encrypt and decrypt calls cannot
    be mixed within one context.
*/
#[derive(Debug)]
pub struct AesCcm {
    mac: AesCbcMac,
    ctr: AesCtr,
    counter0: Block,
    keystream: Block,
    tag_size: usize,
    aad_size: usize,
    text_size: usize,
    aad_consumed: usize,
    text_consumed: usize,
    state: State,
}

impl AesCcm {
    /**
        Start a CCM operation.

        `iv` is the nonce, 7..=13 bytes; its length fixes the width
        `L = 15 - iv.len()` of the payload-length field, so shorter nonces
        allow longer payloads. `tag_size` must be an even value in 4..=16.
        `text_size` must fit in `L` bytes.
    */
    pub fn new<C: BlockCipher>(
        cipher: &C,
        key: KeyRef,
        iv: &[u8],
        aad_size: usize,
        text_size: usize,
        tag_size: usize,
    ) -> AesResult<Self> {
        if !TAG_SIZES.contains(&tag_size) {
            return Err(AesError::InvalidArgument(
                "tag size must be an even value in 4..=16",
            ));
        }
        if iv.len() < MIN_IV_SIZE || iv.len() > MAX_IV_SIZE {
            return Err(AesError::InvalidArgument("nonce length must be in 7..=13"));
        }

        // Width of the payload-length field, which is also the CTR width.
        let length_field = BLOCK_SIZE - 1 - iv.len();
        if (text_size as u128) >> (8 * length_field as u32) != 0 {
            return Err(AesError::InvalidArgument(
                "payload length does not fit the nonce's length field",
            ));
        }

        // B0 block per RFC 3610 section 2.2: flags, nonce, payload length.
        let mut b0 = [0u8; BLOCK_SIZE];
        b0[0] = ((aad_size > 0) as u8) << 6
            | (((tag_size - 2) / 2) as u8) << 3
            | (length_field - 1) as u8;
        b0[1..=iv.len()].copy_from_slice(iv);
        let mut remaining = text_size;
        for i in 0..length_field {
            b0[BLOCK_SIZE - 1 - i] = (remaining & 0xFF) as u8;
            remaining >>= 8;
        }

        let mut mac = AesCbcMac::new(key);
        mac.update(cipher, &b0)?;

        // AAD length prefix: 2, 6 or 10 bytes depending on magnitude.
        if aad_size > 0 {
            let mut prefix = [0u8; 10];
            let prefix_len = if aad_size < 0xFF00 {
                prefix[0] = (aad_size >> 8) as u8;
                prefix[1] = aad_size as u8;
                2
            } else if aad_size <= u32::MAX as usize {
                prefix[0] = 0xFF;
                prefix[1] = 0xFE;
                prefix[2..6].copy_from_slice(&(aad_size as u32).to_be_bytes());
                6
            } else {
                prefix[0] = 0xFF;
                prefix[1] = 0xFF;
                prefix[2..10].copy_from_slice(&(aad_size as u64).to_be_bytes());
                10
            };
            mac.update(cipher, &prefix[..prefix_len])?;
        }

        // Counter block: flags carry only the length-field width. The
        // counter starts at zero; block 0 is reserved for the tag mask, so
        // the payload keystream starts at counter value 1.
        let mut counter0 = [0u8; BLOCK_SIZE];
        counter0[0] = (length_field - 1) as u8;
        counter0[1..=iv.len()].copy_from_slice(iv);

        let mut ctr = AesCtr::new(key, length_field, &counter0);
        ctr.increment()?;

        Ok(AesCcm {
            mac,
            ctr,
            counter0,
            keystream: [0u8; BLOCK_SIZE],
            tag_size,
            aad_size,
            text_size,
            aad_consumed: 0,
            text_consumed: 0,
            state: State::Aad,
        })
    }

    /// Stream additional authenticated data. Must complete before the
    /// first payload call.
    pub fn aad_update<C: BlockCipher>(&mut self, cipher: &C, aad: &[u8]) -> AesResult<()> {
        if self.state != State::Aad {
            return Err(AesError::ProtocolViolation(
                "aad supplied after payload processing started",
            ));
        }
        if self.aad_consumed + aad.len() > self.aad_size {
            return Err(AesError::ProtocolViolation(
                "more aad bytes than declared at init",
            ));
        }
        self.mac.update(cipher, aad)?;
        self.aad_consumed += aad.len();
        Ok(())
    }

    /**
        Close the AAD phase: checks the declared byte budget and zero-pads
        the trailing authentication block. The first payload call invokes
        this implicitly.
    */
    pub fn aad_finish<C: BlockCipher>(&mut self, cipher: &C) -> AesResult<()> {
        if self.state != State::Aad {
            return Err(AesError::ProtocolViolation("aad phase already closed"));
        }
        if self.aad_consumed != self.aad_size {
            return Err(AesError::ProtocolViolation(
                "fewer aad bytes than declared at init",
            ));
        }
        self.pad_mac_block(cipher)?;
        self.state = State::AadDone;
        Ok(())
    }

    /**
        Encrypt payload bytes, returning the number of ciphertext bytes
        written (always `plaintext.len()`). The plaintext is authenticated.
    */
    pub fn encrypt_update<C: BlockCipher>(
        &mut self,
        cipher: &C,
        plaintext: &[u8],
        ciphertext: &mut [u8],
    ) -> AesResult<usize> {
        self.enter_text_state(cipher, State::Encrypt)?;
        self.check_text_budget(plaintext.len())?;
        if ciphertext.len() < plaintext.len() {
            return Err(AesError::BufferTooSmall {
                needed: plaintext.len(),
                got: ciphertext.len(),
            });
        }
        self.mac.update(cipher, plaintext)?;
        for (i, &byte) in plaintext.iter().enumerate() {
            ciphertext[i] = byte ^ self.keystream_byte(cipher)?;
        }
        Ok(plaintext.len())
    }

    /**
        Decrypt payload bytes, returning the number of plaintext bytes
        written (always `ciphertext.len()`). The recovered plaintext, not
        the ciphertext, is what gets authenticated.
    */
    pub fn decrypt_update<C: BlockCipher>(
        &mut self,
        cipher: &C,
        ciphertext: &[u8],
        plaintext: &mut [u8],
    ) -> AesResult<usize> {
        self.enter_text_state(cipher, State::Decrypt)?;
        self.check_text_budget(ciphertext.len())?;
        if plaintext.len() < ciphertext.len() {
            return Err(AesError::BufferTooSmall {
                needed: ciphertext.len(),
                got: plaintext.len(),
            });
        }
        for (i, &byte) in ciphertext.iter().enumerate() {
            plaintext[i] = byte ^ self.keystream_byte(cipher)?;
        }
        self.mac.update(cipher, &plaintext[..ciphertext.len()])?;
        Ok(ciphertext.len())
    }

    /**
        Close an encryption stream, writing exactly `tag_size` bytes of
        authentication tag.
    */
    pub fn encrypt_finish<C: BlockCipher>(&mut self, cipher: &C, tag: &mut [u8]) -> AesResult<()> {
        if tag.len() != self.tag_size {
            return Err(AesError::InvalidArgument(
                "tag slice length must equal the declared tag size",
            ));
        }
        self.enter_text_state(cipher, State::Encrypt)?;
        let full = self.derive_tag(cipher)?;
        tag.copy_from_slice(&full[..self.tag_size]);
        self.state = State::Done;
        self.keystream.zeroize();
        Ok(())
    }

    /**
        Close a decryption stream, comparing against the received tag in
        constant time. A mismatch reports `false`; plaintext already handed
        out must then be discarded by the caller.
    */
    pub fn decrypt_finish<C: BlockCipher>(
        &mut self,
        cipher: &C,
        expected_tag: &[u8],
    ) -> AesResult<bool> {
        if expected_tag.len() != self.tag_size {
            return Err(AesError::InvalidArgument(
                "tag slice length must equal the declared tag size",
            ));
        }
        self.enter_text_state(cipher, State::Decrypt)?;
        let full = self.derive_tag(cipher)?;
        let verified = ct_eq(&full[..self.tag_size], expected_tag);
        self.state = State::Done;
        self.keystream.zeroize();
        Ok(verified)
    }

    fn enter_text_state<C: BlockCipher>(&mut self, cipher: &C, target: State) -> AesResult<()> {
        match self.state {
            State::Aad => {
                self.aad_finish(cipher)?;
                self.state = target;
            }
            State::AadDone => self.state = target,
            State::Done => {
                return Err(AesError::ProtocolViolation("context already finished"));
            }
            current => {
                if current != target {
                    return Err(AesError::ProtocolViolation(
                        "encrypt and decrypt calls cannot be mixed",
                    ));
                }
            }
        }
        Ok(())
    }

    fn check_text_budget(&self, len: usize) -> AesResult<()> {
        if self.text_consumed + len > self.text_size {
            return Err(AesError::ProtocolViolation(
                "more payload bytes than declared at init",
            ));
        }
        Ok(())
    }

    /// Zero-pad the CBC-MAC up to a block boundary.
    fn pad_mac_block<C: BlockCipher>(&mut self, cipher: &C) -> AesResult<()> {
        let rem = self.mac.pending_len();
        if rem != 0 {
            self.mac.update(cipher, &ZERO_BLOCK[rem..])?;
        }
        Ok(())
    }

    fn keystream_byte<C: BlockCipher>(&mut self, cipher: &C) -> AesResult<u8> {
        let offset = self.text_consumed % BLOCK_SIZE;
        if offset == 0 {
            self.keystream = self.ctr.next_keystream(cipher)?;
        }
        self.text_consumed += 1;
        Ok(self.keystream[offset])
    }

    fn derive_tag<C: BlockCipher>(&mut self, cipher: &C) -> AesResult<Block> {
        if self.text_consumed != self.text_size {
            return Err(AesError::ProtocolViolation(
                "fewer payload bytes than declared at init",
            ));
        }
        self.pad_mac_block(cipher)?;
        let mut tag = [0u8; BLOCK_SIZE];
        self.mac.finish(&mut tag)?;
        // Mask with the keystream of the reserved counter-zero block.
        let mask = cipher.encrypt_block(self.ctr.key(), &self.counter0)?;
        for (byte, m) in tag.iter_mut().zip(mask.iter()) {
            *byte ^= m;
        }
        Ok(tag)
    }
}

/// Constant-time equality for equal-length slices.
fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    debug_assert_eq!(a.len(), b.len());
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
