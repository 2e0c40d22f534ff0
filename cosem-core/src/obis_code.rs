use crate::error::{DlmsError, DlmsResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// OBIS (Object Identification System) code for identifying COSEM objects
///
/// OBIS codes are 6-byte identifiers used in DLMS/COSEM to uniquely identify
/// objects in a logical device. String form is `A-B:C.D.E.F`; a five-part
/// string defaults F to 255.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObisCode {
    bytes: [u8; 6],
}

impl ObisCode {
    /// Create a new OBIS code from individual components
    pub fn new(a: u8, b: u8, c: u8, d: u8, e: u8, f: u8) -> Self {
        Self {
            bytes: [a, b, c, d, e, f],
        }
    }

    /// Parse an OBIS code from string format
    ///
    /// Accepts five or six numeric components with any of `.`, `-` or `:` as
    /// separators, e.g. `"1-0:1.8.0.255"` or `"1.0.1.8.0"`. When only five
    /// components are given, F defaults to 255.
    pub fn from_string(s: &str) -> DlmsResult<Self> {
        let parts: Vec<&str> = s.split(['.', '-', ':']).collect();

        let values = match parts.len() {
            5 | 6 => {
                let mut values = Vec::with_capacity(6);
                for part in &parts {
                    let value: u16 = part.trim().parse().map_err(|_| {
                        DlmsError::InvalidData(format!("Invalid OBIS component: {:?}", part))
                    })?;
                    if value > 255 {
                        return Err(DlmsError::InvalidData(format!(
                            "OBIS component must be between 0 and 255, got {}",
                            value
                        )));
                    }
                    values.push(value as u8);
                }
                if values.len() == 5 {
                    values.push(255);
                }
                values
            }
            _ => {
                return Err(DlmsError::InvalidData(format!(
                    "{:?} is not a parsable OBIS string",
                    s
                )))
            }
        };

        let mut bytes = [0u8; 6];
        bytes.copy_from_slice(&values);
        Ok(Self { bytes })
    }

    /// Parse an OBIS code from exactly six bytes
    pub fn from_bytes(source: &[u8]) -> DlmsResult<Self> {
        if source.len() != 6 {
            return Err(DlmsError::insufficient(6, source.len()));
        }
        let mut bytes = [0u8; 6];
        bytes.copy_from_slice(source);
        Ok(Self { bytes })
    }

    /// Get the OBIS code as a byte array reference
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.bytes
    }

    /// Get the OBIS code as a copied byte array
    pub fn to_bytes(&self) -> [u8; 6] {
        self.bytes
    }

    pub fn a(&self) -> u8 {
        self.bytes[0]
    }

    pub fn b(&self) -> u8 {
        self.bytes[1]
    }

    pub fn c(&self) -> u8 {
        self.bytes[2]
    }

    pub fn d(&self) -> u8 {
        self.bytes[3]
    }

    pub fn e(&self) -> u8 {
        self.bytes[4]
    }

    pub fn f(&self) -> u8 {
        self.bytes[5]
    }
}

impl fmt::Display for ObisCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}:{}.{}.{}.{}",
            self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3], self.bytes[4], self.bytes[5]
        )
    }
}

impl FromStr for ObisCode {
    type Err = DlmsError;

    fn from_str(s: &str) -> DlmsResult<Self> {
        Self::from_string(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obis_code_new() {
        let code = ObisCode::new(1, 0, 1, 8, 0, 255);
        assert_eq!(code.a(), 1);
        assert_eq!(code.f(), 255);
    }

    #[test]
    fn test_separators_are_interchangeable() {
        let dashed = ObisCode::from_string("1-0:1.8.0.255").unwrap();
        let dotted = ObisCode::from_string("1.0.1.8.0.255").unwrap();
        let from_bytes = ObisCode::from_bytes(&[1, 0, 1, 8, 0, 255]).unwrap();
        assert_eq!(dashed, dotted);
        assert_eq!(dotted, from_bytes);
    }

    #[test]
    fn test_five_part_defaults_f() {
        let code = ObisCode::from_string("1.0.1.8.0").unwrap();
        assert_eq!(code.f(), 255);
    }

    #[test]
    fn test_out_of_range_component_rejected() {
        assert!(ObisCode::from_string("1.0.1.8.0.256").is_err());
        assert!(ObisCode::from_string("1.0.1.8").is_err());
        assert!(ObisCode::from_string("1.0.x.8.0.255").is_err());
    }

    #[test]
    fn test_round_trip_bytes() {
        let code = ObisCode::new(0, 0, 96, 1, 0, 255);
        let decoded = ObisCode::from_bytes(code.as_bytes()).unwrap();
        assert_eq!(code, decoded);
    }

    #[test]
    fn test_display() {
        let code = ObisCode::new(1, 0, 1, 8, 0, 255);
        assert_eq!(code.to_string(), "1-0:1.8.0.255");
    }
}
