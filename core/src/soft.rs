/*!
    Software AES-128 fallback backend over the RustCrypto `aes` crate.
*/

use std::collections::BTreeMap;

use aes::{
    Aes128,
    cipher::{BlockDecrypt, BlockEncrypt, KeyInit},
};
use zeroize::Zeroize;

use crate::cipher::{Block, BlockCipher};
use crate::error::{AesError, AesResult};
use crate::key::KeyRef;

/**
    Software block-cipher backend.

    Holds raw key bytes in process memory, addressed by the same opaque
    [`KeyRef`] scheme the hardware backends use, so the mode engines run
    byte-for-byte identically over either. Meant for development, tests and
    parts without an AES-capable secure element. Key bytes are wiped on
    drop.
*/
#[derive(Default)]
pub struct SoftAes {
    keys: BTreeMap<KeyRef, [u8; 16]>,
}

impl SoftAes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load (or replace) the key bytes at a reference.
    pub fn load_key(&mut self, key: KeyRef, bytes: [u8; 16]) {
        self.keys.insert(key, bytes);
    }

    fn cipher(&self, key: KeyRef) -> AesResult<Aes128> {
        let bytes = self
            .keys
            .get(&key)
            .ok_or_else(|| AesError::Backend(format!("no key loaded at {key}")))?;
        Ok(Aes128::new(bytes.into()))
    }
}

impl BlockCipher for SoftAes {
    fn encrypt_block(&self, key: KeyRef, input: &Block) -> AesResult<Block> {
        let cipher = self.cipher(key)?;
        let mut block = *aes::cipher::generic_array::GenericArray::from_slice(input);
        cipher.encrypt_block(&mut block);
        Ok(block.into())
    }

    fn decrypt_block(&self, key: KeyRef, input: &Block) -> AesResult<Block> {
        let cipher = self.cipher(key)?;
        let mut block = *aes::cipher::generic_array::GenericArray::from_slice(input);
        cipher.decrypt_block(&mut block);
        Ok(block.into())
    }
}

impl Drop for SoftAes {
    fn drop(&mut self) {
        for bytes in self.keys.values_mut() {
            bytes.zeroize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    // NIST SP 800-38A F.1.1, AES-128 ECB.
    const KEY: [u8; 16] = hex!("2b7e151628aed2a6abf7158809cf4f3c");
    const PLAINTEXT: Block = hex!("6bc1bee22e409f96e93d7e117393172a");
    const CIPHERTEXT: Block = hex!("3ad77bb40d7a3660a89ecaf32466ef97");

    #[test]
    fn encrypt_block_nist_vector() {
        let key = KeyRef::new(0, 0);
        let mut soft = SoftAes::new();
        soft.load_key(key, KEY);

        let out = soft.encrypt_block(key, &PLAINTEXT).unwrap();
        assert_eq!(out, CIPHERTEXT);
    }

    #[test]
    fn decrypt_block_inverts_encrypt() {
        let key = KeyRef::new(2, 1);
        let mut soft = SoftAes::new();
        soft.load_key(key, KEY);

        let back = soft.decrypt_block(key, &CIPHERTEXT).unwrap();
        assert_eq!(back, PLAINTEXT);
    }

    #[test]
    fn missing_key_is_backend_error() {
        let soft = SoftAes::new();
        let err = soft
            .encrypt_block(KeyRef::new(9, 0), &PLAINTEXT)
            .unwrap_err();
        assert!(matches!(err, AesError::Backend(_)));
    }

    #[test]
    fn keys_are_independent() {
        let first = KeyRef::new(0, 0);
        let second = KeyRef::new(0, 1);
        let mut soft = SoftAes::new();
        soft.load_key(first, KEY);
        soft.load_key(second, [0x42; 16]);

        let a = soft.encrypt_block(first, &PLAINTEXT).unwrap();
        let b = soft.encrypt_block(second, &PLAINTEXT).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, CIPHERTEXT);
    }
}
