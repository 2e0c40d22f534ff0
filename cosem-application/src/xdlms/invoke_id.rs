use cosem_core::error::{DlmsError, DlmsResult};

/// One-byte invoke-id-and-priority field
///
/// The invoke id correlates a response with its request; it is copied back
/// by the server. `confirmed` marks a confirmed service. High priority is a
/// negotiable feature; servers without priority management treat it as
/// normal priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvokeIdAndPriority {
    invoke_id: u8,
    pub confirmed: bool,
    pub high_priority: bool,
}

impl InvokeIdAndPriority {
    pub const LENGTH: usize = 1;

    pub fn new(invoke_id: u8, confirmed: bool, high_priority: bool) -> DlmsResult<Self> {
        if invoke_id > 15 {
            return Err(DlmsError::InvalidData(format!(
                "invoke id must be between 0 and 15, got {}",
                invoke_id
            )));
        }
        Ok(Self {
            invoke_id,
            confirmed,
            high_priority,
        })
    }

    /// A confirmed, normal-priority request
    pub fn confirmed(invoke_id: u8) -> DlmsResult<Self> {
        Self::new(invoke_id, true, false)
    }

    pub fn invoke_id(&self) -> u8 {
        self.invoke_id
    }

    pub fn to_byte(&self) -> u8 {
        let mut out = self.invoke_id;
        if self.confirmed {
            out |= 0b0100_0000;
        }
        if self.high_priority {
            out |= 0b1000_0000;
        }
        out
    }

    pub fn from_byte(value: u8) -> DlmsResult<Self> {
        Self::new(
            value & 0b0000_1111,
            value & 0b0100_0000 != 0,
            value & 0b1000_0000 != 0,
        )
    }
}

/// Four-byte long invoke-id-and-priority
///
/// The first byte carries the flags at bits 7..4; the remaining three bytes
/// are a big-endian 24-bit invoke id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongInvokeIdAndPriority {
    invoke_id: u32,
    pub prioritized: bool,
    pub confirmed: bool,
    pub break_on_error: bool,
    pub self_descriptive: bool,
}

impl LongInvokeIdAndPriority {
    pub const LENGTH: usize = 4;
    const MAX_INVOKE_ID: u32 = 0x00FF_FFFF;

    pub fn new(
        invoke_id: u32,
        prioritized: bool,
        confirmed: bool,
        break_on_error: bool,
        self_descriptive: bool,
    ) -> DlmsResult<Self> {
        if invoke_id > Self::MAX_INVOKE_ID {
            return Err(DlmsError::InvalidData(format!(
                "long invoke id does not fit in 24 bits: {}",
                invoke_id
            )));
        }
        Ok(Self {
            invoke_id,
            prioritized,
            confirmed,
            break_on_error,
            self_descriptive,
        })
    }

    pub fn invoke_id(&self) -> u32 {
        self.invoke_id
    }

    pub fn to_bytes(&self) -> [u8; Self::LENGTH] {
        let mut status = 0u8;
        if self.prioritized {
            status |= 0b1000_0000;
        }
        if self.confirmed {
            status |= 0b0100_0000;
        }
        if self.break_on_error {
            status |= 0b0010_0000;
        }
        if self.self_descriptive {
            status |= 0b0001_0000;
        }
        [
            status,
            (self.invoke_id >> 16) as u8,
            (self.invoke_id >> 8) as u8,
            self.invoke_id as u8,
        ]
    }

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        if data.len() != Self::LENGTH {
            return Err(DlmsError::LengthMismatch {
                declared: Self::LENGTH,
                actual: data.len(),
            });
        }
        let invoke_id =
            (u32::from(data[1]) << 16) | (u32::from(data[2]) << 8) | u32::from(data[3]);
        Self::new(
            invoke_id,
            data[0] & 0b1000_0000 != 0,
            data[0] & 0b0100_0000 != 0,
            data[0] & 0b0010_0000 != 0,
            data[0] & 0b0001_0000 != 0,
        )
    }
}
