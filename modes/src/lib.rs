/*!
    Streaming AES-128 block-cipher modes over an opaque single-block backend.

    The engines here turn the one-block [`BlockCipher`] primitive into the
    standard streaming constructions: CBC with optional PKCS#7 padding,
    CMAC (NIST SP 800-38B), CTR with an explicit counter width, strict
    CBC-MAC, and CCM (RFC 3610). Contexts are caller-owned values with
    explicit init/update/finish lifecycles. Key material never passes
    through this crate, only [`KeyRef`] handles; the backend may keep the
    key inside a secure element.
*/

mod cbc;
mod cbcmac;
mod ccm;
mod cmac;
mod ctr;

pub mod pkcs7;

// Re-export the collaborator contracts so callers need only this crate.
pub use hwaes_core::{AesError, AesResult, BLOCK_SIZE, Block, BlockCipher, KeyRef, ZERO_BLOCK};

pub use self::cbc::{AesCbc, Padding};
pub use self::cbcmac::AesCbcMac;
pub use self::ccm::AesCcm;
pub use self::cmac::AesCmac;
pub use self::ctr::AesCtr;
