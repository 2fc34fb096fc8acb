/*!
    Collaborator contracts for the AES-128 mode layer.

    This crate defines the single-block cipher interface the mode engines in
    `hwaes-modes` are built on, the opaque key handle scheme, and the shared
    error taxonomy. A software fallback backend over the RustCrypto `aes`
    crate lives in [`soft`] behind the default-on `soft` feature.
*/

mod cipher;
mod error;
mod key;

#[cfg(feature = "soft")]
pub mod soft;

pub use self::cipher::{BLOCK_SIZE, Block, BlockCipher, ZERO_BLOCK};
pub use self::error::{AesError, AesResult};
pub use self::key::KeyRef;
