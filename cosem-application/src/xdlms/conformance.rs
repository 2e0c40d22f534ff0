use cosem_core::error::{DlmsError, DlmsResult};

/// Negotiated service capabilities of an association
///
/// Sent as the proposed conformance in the AARQ and returned negotiated in
/// the AARE. Encoded as a bit-string of 24 bits prefixed by an unused-bits
/// octet that is always zero. Only LN referencing capabilities are modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Conformance {
    pub general_protection: bool,
    pub general_block_transfer: bool,
    pub delta_value_encoding: bool,
    pub attribute_0_supported_with_set: bool,
    pub priority_management_supported: bool,
    pub attribute_0_supported_with_get: bool,
    pub block_transfer_with_get_or_read: bool,
    pub block_transfer_with_set_or_write: bool,
    pub block_transfer_with_action: bool,
    pub multiple_references: bool,
    pub data_notification: bool,
    pub access: bool,
    pub get: bool,
    pub set: bool,
    pub selective_access: bool,
    pub event_notification: bool,
    pub action: bool,
}

/// Bit positions within the 24-bit block, bit 0 being the LSB
mod bit {
    pub const GENERAL_PROTECTION: u32 = 22;
    pub const GENERAL_BLOCK_TRANSFER: u32 = 21;
    pub const DELTA_VALUE_ENCODING: u32 = 17;
    pub const ATTRIBUTE_0_WITH_SET: u32 = 15;
    pub const PRIORITY_MANAGEMENT: u32 = 14;
    pub const ATTRIBUTE_0_WITH_GET: u32 = 13;
    pub const BLOCK_TRANSFER_GET_OR_READ: u32 = 12;
    pub const BLOCK_TRANSFER_SET_OR_WRITE: u32 = 11;
    pub const BLOCK_TRANSFER_ACTION: u32 = 10;
    pub const MULTIPLE_REFERENCES: u32 = 9;
    pub const DATA_NOTIFICATION: u32 = 7;
    pub const ACCESS: u32 = 6;
    pub const GET: u32 = 4;
    pub const SET: u32 = 3;
    pub const SELECTIVE_ACCESS: u32 = 2;
    pub const EVENT_NOTIFICATION: u32 = 1;
    pub const ACTION: u32 = 0;
}

impl Conformance {
    pub const LENGTH: usize = 4;

    /// The capability set a plain LN client proposes
    pub fn default_client() -> Self {
        Self {
            get: true,
            set: true,
            action: true,
            selective_access: true,
            block_transfer_with_get_or_read: true,
            multiple_references: true,
            ..Self::default()
        }
    }

    fn to_bits(self) -> u32 {
        let mut out = 0u32;
        let mut set = |flag: bool, position: u32| {
            if flag {
                out |= 1 << position;
            }
        };
        set(self.general_protection, bit::GENERAL_PROTECTION);
        set(self.general_block_transfer, bit::GENERAL_BLOCK_TRANSFER);
        set(self.delta_value_encoding, bit::DELTA_VALUE_ENCODING);
        set(self.attribute_0_supported_with_set, bit::ATTRIBUTE_0_WITH_SET);
        set(self.priority_management_supported, bit::PRIORITY_MANAGEMENT);
        set(self.attribute_0_supported_with_get, bit::ATTRIBUTE_0_WITH_GET);
        set(
            self.block_transfer_with_get_or_read,
            bit::BLOCK_TRANSFER_GET_OR_READ,
        );
        set(
            self.block_transfer_with_set_or_write,
            bit::BLOCK_TRANSFER_SET_OR_WRITE,
        );
        set(self.block_transfer_with_action, bit::BLOCK_TRANSFER_ACTION);
        set(self.multiple_references, bit::MULTIPLE_REFERENCES);
        set(self.data_notification, bit::DATA_NOTIFICATION);
        set(self.access, bit::ACCESS);
        set(self.get, bit::GET);
        set(self.set, bit::SET);
        set(self.selective_access, bit::SELECTIVE_ACCESS);
        set(self.event_notification, bit::EVENT_NOTIFICATION);
        set(self.action, bit::ACTION);
        out
    }

    fn from_bits(bits: u32) -> Self {
        let is_set = |position: u32| bits & (1 << position) != 0;
        Self {
            general_protection: is_set(bit::GENERAL_PROTECTION),
            general_block_transfer: is_set(bit::GENERAL_BLOCK_TRANSFER),
            delta_value_encoding: is_set(bit::DELTA_VALUE_ENCODING),
            attribute_0_supported_with_set: is_set(bit::ATTRIBUTE_0_WITH_SET),
            priority_management_supported: is_set(bit::PRIORITY_MANAGEMENT),
            attribute_0_supported_with_get: is_set(bit::ATTRIBUTE_0_WITH_GET),
            block_transfer_with_get_or_read: is_set(bit::BLOCK_TRANSFER_GET_OR_READ),
            block_transfer_with_set_or_write: is_set(bit::BLOCK_TRANSFER_SET_OR_WRITE),
            block_transfer_with_action: is_set(bit::BLOCK_TRANSFER_ACTION),
            multiple_references: is_set(bit::MULTIPLE_REFERENCES),
            data_notification: is_set(bit::DATA_NOTIFICATION),
            access: is_set(bit::ACCESS),
            get: is_set(bit::GET),
            set: is_set(bit::SET),
            selective_access: is_set(bit::SELECTIVE_ACCESS),
            event_notification: is_set(bit::EVENT_NOTIFICATION),
            action: is_set(bit::ACTION),
        }
    }

    /// Encode as unused-bits octet plus three big-endian block bytes
    pub fn to_bytes(&self) -> [u8; Self::LENGTH] {
        let bits = self.to_bits();
        [0x00, (bits >> 16) as u8, (bits >> 8) as u8, bits as u8]
    }

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        if data.len() < Self::LENGTH {
            return Err(DlmsError::insufficient(Self::LENGTH, data.len()));
        }
        let bits =
            (u32::from(data[1]) << 16) | (u32::from(data[2]) << 8) | u32::from(data[3]);
        Ok(Self::from_bits(bits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unused_bits_octet_is_zero() {
        let conformance = Conformance::default_client();
        assert_eq!(conformance.to_bytes()[0], 0x00);
    }

    #[test]
    fn test_every_flag_round_trips_at_its_position() {
        let flag_setters: &[(fn(&mut Conformance), u32)] = &[
            (|c| c.action = true, 0),
            (|c| c.event_notification = true, 1),
            (|c| c.selective_access = true, 2),
            (|c| c.set = true, 3),
            (|c| c.get = true, 4),
            (|c| c.access = true, 6),
            (|c| c.data_notification = true, 7),
            (|c| c.multiple_references = true, 9),
            (|c| c.block_transfer_with_action = true, 10),
            (|c| c.block_transfer_with_set_or_write = true, 11),
            (|c| c.block_transfer_with_get_or_read = true, 12),
            (|c| c.attribute_0_supported_with_get = true, 13),
            (|c| c.priority_management_supported = true, 14),
            (|c| c.attribute_0_supported_with_set = true, 15),
            (|c| c.delta_value_encoding = true, 17),
            (|c| c.general_block_transfer = true, 21),
            (|c| c.general_protection = true, 22),
        ];

        for (set_flag, position) in flag_setters {
            let mut conformance = Conformance::default();
            set_flag(&mut conformance);
            let bytes = conformance.to_bytes();
            let bits = (u32::from(bytes[1]) << 16)
                | (u32::from(bytes[2]) << 8)
                | u32::from(bytes[3]);
            assert_eq!(bits, 1 << position, "flag at bit {}", position);
            assert_eq!(Conformance::from_bytes(&bytes).unwrap(), conformance);
        }
    }

    #[test]
    fn test_default_client_round_trip() {
        let conformance = Conformance::default_client();
        let parsed = Conformance::from_bytes(&conformance.to_bytes()).unwrap();
        assert_eq!(conformance, parsed);
    }
}
