//! COSEM object addressing
//!
//! Attribute and method descriptors plus the selective-access descriptors
//! used by GET and SET.

pub mod selective_access;

use cosem_core::error::{DlmsError, DlmsResult};
use cosem_core::obis_code::ObisCode;

use crate::enums::CosemInterface;

pub use selective_access::{
    CaptureObject, EntryDescriptor, RangeDescriptor, SelectiveAccessDescriptor,
};

/// COSEM attribute descriptor
///
/// `(interface-class: u16 BE, instance: OBIS, attribute-id: u8)`, nine bytes
/// on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CosemAttributeDescriptor {
    pub interface: CosemInterface,
    pub instance: ObisCode,
    pub attribute: u8,
}

impl CosemAttributeDescriptor {
    pub const LENGTH: usize = 9;

    pub fn new(interface: CosemInterface, instance: ObisCode, attribute: u8) -> Self {
        Self {
            interface,
            instance,
            attribute,
        }
    }

    pub fn from_bytes(source: &[u8]) -> DlmsResult<Self> {
        let (interface, instance, id) = descriptor_from_bytes(source)?;
        Ok(Self {
            interface,
            instance,
            attribute: id,
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::LENGTH] {
        descriptor_to_bytes(self.interface, &self.instance, self.attribute)
    }
}

/// COSEM method descriptor; structurally identical to the attribute
/// descriptor with a method id in the last octet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CosemMethodDescriptor {
    pub interface: CosemInterface,
    pub instance: ObisCode,
    pub method: u8,
}

impl CosemMethodDescriptor {
    pub const LENGTH: usize = 9;

    pub fn new(interface: CosemInterface, instance: ObisCode, method: u8) -> Self {
        Self {
            interface,
            instance,
            method,
        }
    }

    pub fn from_bytes(source: &[u8]) -> DlmsResult<Self> {
        let (interface, instance, id) = descriptor_from_bytes(source)?;
        Ok(Self {
            interface,
            instance,
            method: id,
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::LENGTH] {
        descriptor_to_bytes(self.interface, &self.instance, self.method)
    }
}

fn descriptor_from_bytes(source: &[u8]) -> DlmsResult<(CosemInterface, ObisCode, u8)> {
    if source.len() != CosemAttributeDescriptor::LENGTH {
        return Err(DlmsError::LengthMismatch {
            declared: CosemAttributeDescriptor::LENGTH,
            actual: source.len(),
        });
    }
    let interface = CosemInterface::from_u16(u16::from_be_bytes([source[0], source[1]]))?;
    let instance = ObisCode::from_bytes(&source[2..8])?;
    Ok((interface, instance, source[8]))
}

fn descriptor_to_bytes(
    interface: CosemInterface,
    instance: &ObisCode,
    id: u8,
) -> [u8; CosemAttributeDescriptor::LENGTH] {
    let mut out = [0u8; CosemAttributeDescriptor::LENGTH];
    out[..2].copy_from_slice(&interface.to_u16().to_be_bytes());
    out[2..8].copy_from_slice(instance.as_bytes());
    out[8] = id;
    out
}
