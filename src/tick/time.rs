use std::fmt;

use crate::common::codec::ByteReader;
use crate::common::error::Result;

pub const TICK_TIME_SIZE: usize = 8;

/// Wall-clock stamp carried by votes and tick headers. Year is offset
/// from 2000.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TickTime {
    pub millisecond: u16,
    pub second: u8,
    pub minute: u8,
    pub hour: u8,
    pub day: u8,
    pub month: u8,
    pub year: u8,
}

impl TickTime {
    pub fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        Ok(TickTime {
            millisecond: reader.u16()?,
            second: reader.u8()?,
            minute: reader.u8()?,
            hour: reader.u8()?,
            day: reader.u8()?,
            month: reader.u8()?,
            year: reader.u8()?,
        })
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.millisecond.to_le_bytes());
        out.extend_from_slice(&[
            self.second,
            self.minute,
            self.hour,
            self.day,
            self.month,
            self.year,
        ]);
    }
}

impl fmt::Display for TickTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "20{:02}-{:02}-{:02} {:02}:{:02}:{:02}.{:03}",
            self.year, self.month, self.day, self.hour, self.minute, self.second, self.millisecond
        )
    }
}
