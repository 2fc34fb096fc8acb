use core::fmt;

/**
    Opaque reference to an AES-128 key held by a block-cipher backend.

    A key location is a slot (a hardware key slot, or a TempKey-style scratch
    area) plus the index of the 16-byte sub-block within that slot holding
    the actual key, for devices whose slots are wider than one AES key.
    The reference never carries key material and stays fixed for the
    lifetime of any mode context built on it.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyRef {
    slot: u16,
    block: u8,
}

impl KeyRef {
    pub const fn new(slot: u16, block: u8) -> Self {
        KeyRef { slot, block }
    }

    pub const fn slot(self) -> u16 {
        self.slot
    }

    pub const fn block(self) -> u8 {
        self.block
    }
}

impl fmt::Display for KeyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {} block {}", self.slot, self.block)
    }
}
