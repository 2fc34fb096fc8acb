/*!
    PKCS#7 padding codec for block encryption.
*/

use hwaes_core::{AesError, AesResult, BLOCK_SIZE, Block};

/**
    Apply PKCS#7 padding, returning a copy rounded up to a whole number of
    blocks. Appends 1..=`block_size` bytes, each holding the pad length;
    a block-aligned input still gains one full block of padding.
*/
pub fn pad(data: &[u8], block_size: usize) -> Vec<u8> {
    let pad = block_size - (data.len() % block_size);
    let mut out = Vec::with_capacity(data.len() + pad);
    out.extend_from_slice(data);
    out.resize(data.len() + pad, pad as u8);
    out
}

/**
    Strip PKCS#7 padding. The last byte gives the pad length, which must be
    in 1..=`block_size` with every pad byte matching it; anything else is a
    protocol violation, as is an empty or non-block-aligned input.
*/
pub fn unpad(data: &[u8], block_size: usize) -> AesResult<Vec<u8>> {
    if block_size == 0 || data.is_empty() || !data.len().is_multiple_of(block_size) {
        return Err(AesError::ProtocolViolation(
            "padded data is not block aligned",
        ));
    }
    let pad = data[data.len() - 1] as usize;
    if pad == 0 || pad > block_size {
        return Err(AesError::ProtocolViolation("invalid padding length"));
    }
    if data[data.len() - pad..].iter().any(|&b| b as usize != pad) {
        return Err(AesError::ProtocolViolation("inconsistent padding bytes"));
    }
    Ok(data[..data.len() - pad].to_vec())
}

/// Pad a block in place whose first `used` bytes (0..=15) are payload.
pub(crate) fn pad_block(block: &mut Block, used: usize) {
    let pad = (BLOCK_SIZE - used) as u8;
    for byte in block[used..].iter_mut() {
        *byte = pad;
    }
}

/// Payload length left in a decrypted final block after validating its
/// padding.
pub(crate) fn unpadded_len(block: &Block) -> AesResult<usize> {
    let pad = block[BLOCK_SIZE - 1] as usize;
    if pad == 0 || pad > BLOCK_SIZE {
        return Err(AesError::ProtocolViolation("invalid padding length"));
    }
    if block[BLOCK_SIZE - pad..].iter().any(|&b| b as usize != pad) {
        return Err(AesError::ProtocolViolation("inconsistent padding bytes"));
    }
    Ok(BLOCK_SIZE - pad)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_all_lengths() {
        for len in 0..=31 {
            let data: Vec<u8> = (0..len as u8).collect();
            let padded = pad(&data, BLOCK_SIZE);
            assert!(padded.len().is_multiple_of(BLOCK_SIZE));
            assert!(padded.len() > data.len());
            assert_eq!(unpad(&padded, BLOCK_SIZE).unwrap(), data);
        }
    }

    #[test]
    fn aligned_input_gains_full_block() {
        let data = [7u8; 32];
        let padded = pad(&data, BLOCK_SIZE);
        assert_eq!(padded.len(), 48);
        assert!(padded[32..].iter().all(|&b| b == 16));
    }

    #[test]
    fn unpad_rejects_bad_length_byte() {
        let mut padded = pad(b"hello", BLOCK_SIZE);
        *padded.last_mut().unwrap() = 0;
        assert!(matches!(
            unpad(&padded, BLOCK_SIZE),
            Err(AesError::ProtocolViolation(_))
        ));

        let mut padded = pad(b"hello", BLOCK_SIZE);
        *padded.last_mut().unwrap() = 17;
        assert!(unpad(&padded, BLOCK_SIZE).is_err());
    }

    #[test]
    fn unpad_rejects_inconsistent_bytes() {
        let mut padded = pad(b"hello", BLOCK_SIZE);
        padded[8] ^= 0x01;
        assert!(unpad(&padded, BLOCK_SIZE).is_err());
    }

    #[test]
    fn unpad_rejects_unaligned_input() {
        assert!(unpad(&[1, 2, 3], BLOCK_SIZE).is_err());
        assert!(unpad(&[], BLOCK_SIZE).is_err());
    }

    #[test]
    fn block_helpers_match_slice_codec() {
        for used in 0..BLOCK_SIZE {
            let mut block = [0xAAu8; BLOCK_SIZE];
            pad_block(&mut block, used);
            assert_eq!(unpadded_len(&block).unwrap(), used);
            assert_eq!(&block[..used], &[0xAA; BLOCK_SIZE][..used]);
        }
    }
}
