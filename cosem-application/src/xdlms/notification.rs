//! DataNotification APDU
//!
//! Unsolicited push from the meter, tag 0x0F. Event notifications share
//! the tag and layout, so a single type owns it.

use cosem_asn1::axdr::AxdrDecoder;
use cosem_core::datatypes::{CosemDateTime, DataObject};
use cosem_core::error::{DlmsError, DlmsResult};

use super::invoke_id::LongInvokeIdAndPriority;

#[derive(Debug, Clone, PartialEq)]
pub struct DataNotification {
    pub long_invoke_id_and_priority: LongInvokeIdAndPriority,
    pub date_time: Option<CosemDateTime>,
    pub body: Vec<u8>,
}

impl DataNotification {
    pub const TAG: u8 = 0x0F;

    pub fn new(
        long_invoke_id_and_priority: LongInvokeIdAndPriority,
        date_time: Option<CosemDateTime>,
        body: Vec<u8>,
    ) -> Self {
        Self {
            long_invoke_id_and_priority,
            date_time,
            body,
        }
    }

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        if data.len() < 6 {
            return Err(DlmsError::insufficient(6, data.len()));
        }
        if data[0] != Self::TAG {
            return Err(DlmsError::UnexpectedTag {
                got: data[0],
                expected: Self::TAG,
            });
        }

        let long_invoke_id_and_priority = LongInvokeIdAndPriority::from_bytes(&data[1..5])?;
        let has_date_time = data[5] != 0;
        let mut rest = &data[6..];

        let date_time = if has_date_time {
            if rest.len() < CosemDateTime::LENGTH {
                return Err(DlmsError::insufficient(CosemDateTime::LENGTH, rest.len()));
            }
            let value = CosemDateTime::from_bytes(&rest[..CosemDateTime::LENGTH])?;
            rest = &rest[CosemDateTime::LENGTH..];
            Some(value)
        } else {
            None
        };

        Ok(Self {
            long_invoke_id_and_priority,
            date_time,
            body: rest.to_vec(),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![Self::TAG];
        out.extend_from_slice(&self.long_invoke_id_and_priority.to_bytes());
        match &self.date_time {
            Some(date_time) => {
                out.push(0x01);
                out.extend_from_slice(&date_time.to_bytes());
            }
            None => out.push(0x00),
        }
        out.extend_from_slice(&self.body);
        out
    }

    /// Decode the notification body as one self-describing data value
    pub fn decode_body(&self) -> DlmsResult<DataObject> {
        AxdrDecoder::new(&self.body).decode_data_object()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosem_core::datatypes::{CosemDate, CosemTime};

    fn long_invoke() -> LongInvokeIdAndPriority {
        LongInvokeIdAndPriority::new(0x0042, false, true, false, false).unwrap()
    }

    #[test]
    fn test_round_trip_without_datetime() {
        let notification = DataNotification::new(
            long_invoke(),
            None,
            DataObject::LongUnsigned(1500).to_bytes(),
        );
        let bytes = notification.to_bytes();
        assert_eq!(bytes[0], 0x0F);
        assert_eq!(bytes[5], 0x00);
        assert_eq!(DataNotification::from_bytes(&bytes).unwrap(), notification);
    }

    #[test]
    fn test_round_trip_with_datetime() {
        let stamp = CosemDateTime::new(CosemDate::new(2024, 2, 29), CosemTime::new(12, 30, 0));
        let notification = DataNotification::new(
            long_invoke(),
            Some(stamp),
            DataObject::Structure(vec![
                DataObject::DoubleLongUnsigned(123456),
                DataObject::Unsigned(30),
            ])
            .to_bytes(),
        );
        let parsed = DataNotification::from_bytes(&notification.to_bytes()).unwrap();
        assert_eq!(parsed, notification);
        assert_eq!(parsed.date_time.unwrap().date.day_of_month, 29);
    }

    #[test]
    fn test_decode_body() {
        let notification = DataNotification::new(
            long_invoke(),
            None,
            DataObject::DoubleLongUnsigned(7).to_bytes(),
        );
        assert_eq!(
            notification.decode_body().unwrap(),
            DataObject::DoubleLongUnsigned(7)
        );
    }
}
