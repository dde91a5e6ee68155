//! Zone status (AirTouch 5, control-status id `0x21`).

use bytes::{BufMut, BytesMut};

use crate::codec::MessageCodec;
use crate::encoding::{
    bit, decode_set_point, decode_temperature, encode_set_point, encode_temperature, flag, take,
};
use crate::error::DecodeError;
use crate::header::{ControlStatusSubHeader, RepeatLayout};

pub const MESSAGE_ID: u8 = 0x21;

const RECORD_SIZE: usize = 8;
const INVALID_SET_POINT: u8 = 0xFF;
const INVALID_TEMPERATURE: u16 = 0x07FF;
/// Readings above this are sensor faults.
const MAXIMUM_TEMPERATURE: f64 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZonePowerState {
    Off,
    On,
    Turbo,
}

impl TryFrom<u8> for ZonePowerState {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ZonePowerState::Off),
            1 => Ok(ZonePowerState::On),
            3 => Ok(ZonePowerState::Turbo),
            _ => Err(DecodeError::InvalidEnumValue {
                field: "zone power state",
                value,
            }),
        }
    }
}

impl From<ZonePowerState> for u8 {
    fn from(value: ZonePowerState) -> Self {
        match value {
            ZonePowerState::Off => 0,
            ZonePowerState::On => 1,
            ZonePowerState::Turbo => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneControlMethod {
    Damper,
    Temperature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorBatteryStatus {
    Normal,
    Low,
}

/// State of one zone as reported by the console.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneStatusData {
    /// Zone number, 0..=63.
    pub zone_number: u8,
    pub zone_power_state: ZonePowerState,
    pub control_method: ZoneControlMethod,
    /// Damper opening, 0..=100.
    pub damper_percentage: u8,
    /// Set point in °C.
    pub set_point: Option<f64>,
    pub has_sensor: bool,
    /// Measured temperature in °C.
    pub temperature: Option<f64>,
    pub spill_active: bool,
    pub sensor_battery_status: SensorBatteryStatus,
}

impl ZoneStatusData {
    fn encode(&self, dst: &mut BytesMut) {
        dst.put_u8((u8::from(self.zone_power_state) << 6) | (self.zone_number & 0x3F));
        dst.put_u8(
            flag(self.control_method == ZoneControlMethod::Temperature, 7)
                | (self.damper_percentage & 0x7F),
        );
        dst.put_u8(self.set_point.map_or(INVALID_SET_POINT, encode_set_point));
        dst.put_u8(flag(self.has_sensor, 7));
        dst.put_u16(self.temperature.map_or(INVALID_TEMPERATURE, encode_temperature));
        dst.put_u8(
            flag(self.spill_active, 1)
                | flag(self.sensor_battery_status == SensorBatteryStatus::Low, 0),
        );
        dst.put_u8(0);
    }

    fn decode(record: &[u8]) -> Result<Self, DecodeError> {
        let zone_power_state = ZonePowerState::try_from(record[0] >> 6)?;
        let has_sensor = bit(record[3], 7);
        let raw_temperature = u16::from_be_bytes([record[4], record[5]]);
        let temperature = if has_sensor && raw_temperature != INVALID_TEMPERATURE {
            Some(decode_temperature(raw_temperature)).filter(|t| *t <= MAXIMUM_TEMPERATURE)
        } else {
            None
        };

        Ok(Self {
            zone_number: record[0] & 0x3F,
            zone_power_state,
            control_method: if bit(record[1], 7) {
                ZoneControlMethod::Temperature
            } else {
                ZoneControlMethod::Damper
            },
            damper_percentage: record[1] & 0x7F,
            set_point: (record[2] != INVALID_SET_POINT).then(|| decode_set_point(record[2])),
            has_sensor,
            temperature,
            spill_active: bit(record[6], 1),
            sensor_battery_status: if bit(record[6], 0) {
                SensorBatteryStatus::Low
            } else {
                SensorBatteryStatus::Normal
            },
        })
    }
}

/// Zone status request or report.
///
/// A report listing no zones is indistinguishable on the wire from a request.
#[derive(Debug, Clone, PartialEq)]
pub enum ZoneStatus {
    Request,
    Report(Vec<ZoneStatusData>),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ZoneStatusCodec;

impl MessageCodec<ControlStatusSubHeader> for ZoneStatusCodec {
    type Message = ZoneStatus;

    fn layout(&self, message: &ZoneStatus) -> RepeatLayout {
        match message {
            ZoneStatus::Request => RepeatLayout::EMPTY,
            ZoneStatus::Report(zones) => RepeatLayout::records(RECORD_SIZE, zones.len()),
        }
    }

    fn encode(&self, _header: &ControlStatusSubHeader, message: &ZoneStatus, dst: &mut BytesMut) {
        if let ZoneStatus::Report(zones) = message {
            for zone in zones {
                zone.encode(dst);
            }
        }
    }

    fn decode(
        &self,
        buf: &mut &[u8],
        header: &ControlStatusSubHeader,
    ) -> Result<ZoneStatus, DecodeError> {
        let layout = header.layout;
        take(buf, layout.non_repeat_length)?;
        if layout.is_empty() {
            return Ok(ZoneStatus::Request);
        }
        if layout.repeat_length != RECORD_SIZE {
            return Err(DecodeError::RecordSize {
                message_id: u16::from(MESSAGE_ID),
                expected: RECORD_SIZE,
                actual: layout.repeat_length,
            });
        }

        let mut zones = Vec::with_capacity(layout.repeat_count);
        for _ in 0..layout.repeat_count {
            zones.push(ZoneStatusData::decode(take(buf, RECORD_SIZE)?)?);
        }
        Ok(ZoneStatus::Report(zones))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::SubHeader;

    fn header(layout: RepeatLayout) -> ControlStatusSubHeader {
        ControlStatusSubHeader::for_message(u16::from(MESSAGE_ID), layout).unwrap()
    }

    fn zone(zone_number: u8) -> ZoneStatusData {
        ZoneStatusData {
            zone_number,
            zone_power_state: ZonePowerState::On,
            control_method: ZoneControlMethod::Temperature,
            damper_percentage: 45,
            set_point: Some(22.0),
            has_sensor: true,
            temperature: Some(23.5),
            spill_active: false,
            sensor_battery_status: SensorBatteryStatus::Normal,
        }
    }

    fn encode(message: &ZoneStatus) -> (ControlStatusSubHeader, BytesMut) {
        let codec = ZoneStatusCodec;
        let header = header(codec.layout(message));
        let mut buf = BytesMut::new();
        codec.encode(&header, message, &mut buf);
        assert_eq!(buf.len(), codec.size(message));
        (header, buf)
    }

    #[test]
    fn record_bit_layout() {
        let mut data = zone(5);
        data.spill_active = true;
        data.sensor_battery_status = SensorBatteryStatus::Low;
        let (_, buf) = encode(&ZoneStatus::Report(vec![data]));
        assert_eq!(
            &buf[..],
            &[0x45, 0x80 | 45, 120, 0x80, 0x02, 0xDF, 0b11, 0x00]
        );
    }

    #[test]
    fn two_zone_report_round_trips() {
        let mut second = zone(1);
        second.zone_power_state = ZonePowerState::Turbo;
        second.control_method = ZoneControlMethod::Damper;
        second.set_point = None;
        second.has_sensor = false;
        second.temperature = None;
        let message = ZoneStatus::Report(vec![zone(0), second]);

        let (header, buf) = encode(&message);
        assert_eq!(header.layout, RepeatLayout::records(8, 2));

        let mut cursor = &buf[..];
        let decoded = ZoneStatusCodec.decode(&mut cursor, &header).unwrap();
        assert_eq!(decoded, message);
        assert!(cursor.is_empty());
    }

    #[test]
    fn empty_layout_is_request() {
        let mut cursor: &[u8] = &[];
        let decoded = ZoneStatusCodec
            .decode(&mut cursor, &header(RepeatLayout::EMPTY))
            .unwrap();
        assert_eq!(decoded, ZoneStatus::Request);
        assert_eq!(ZoneStatusCodec.size(&ZoneStatus::Request), 0);
    }

    #[test]
    fn wrong_record_size_is_rejected() {
        let body = [0u8; 12];
        let mut cursor = &body[..];
        let err = ZoneStatusCodec
            .decode(&mut cursor, &header(RepeatLayout::records(6, 2)))
            .unwrap_err();
        assert_eq!(
            err,
            DecodeError::RecordSize {
                message_id: 0x21,
                expected: 8,
                actual: 6
            }
        );
    }

    #[test]
    fn power_state_two_is_invalid() {
        let record = [0x80, 0x00, 0xFF, 0x00, 0x07, 0xFF, 0x00, 0x00];
        let mut cursor = &record[..];
        let err = ZoneStatusCodec
            .decode(&mut cursor, &header(RepeatLayout::records(8, 1)))
            .unwrap_err();
        assert_eq!(
            err,
            DecodeError::InvalidEnumValue {
                field: "zone power state",
                value: 2
            }
        );
    }

    #[test]
    fn sentinels_and_sensor_flag_suppress_readings() {
        // Set point sentinel, sensor present but temperature sentinel.
        let sentinel = [0x01, 0x00, 0xFF, 0x80, 0x07, 0xFF, 0x00, 0x00];
        // Valid temperature but no sensor.
        let no_sensor = [0x02, 0x00, 0x78, 0x00, 0x02, 0xD0, 0x00, 0x00];
        // Sensor present, reading above the plausible maximum (200.0 °C).
        let too_hot = [0x03, 0x00, 0x78, 0x80, 0x09, 0xC4, 0x00, 0x00];
        let body = [sentinel, no_sensor, too_hot].concat();

        let mut cursor = &body[..];
        let ZoneStatus::Report(zones) = ZoneStatusCodec
            .decode(&mut cursor, &header(RepeatLayout::records(8, 3)))
            .unwrap()
        else {
            panic!("expected report");
        };

        assert_eq!(zones[0].set_point, None);
        assert_eq!(zones[0].temperature, None);
        assert!(zones[0].has_sensor);
        assert_eq!(zones[1].set_point, Some(22.0));
        assert_eq!(zones[1].temperature, None);
        assert_eq!(zones[2].temperature, None);
    }

    #[test]
    fn lowest_set_point_encodes_as_zero() {
        let mut data = zone(0);
        data.set_point = Some(10.0);
        let message = ZoneStatus::Report(vec![data]);
        let (header, buf) = encode(&message);
        assert_eq!(buf[2], 0);

        let mut cursor = &buf[..];
        assert_eq!(ZoneStatusCodec.decode(&mut cursor, &header).unwrap(), message);
    }

    #[test]
    fn non_repeat_prefix_is_skipped() {
        let mut body = vec![0xAA, 0xBB];
        body.extend_from_slice(&[0x00, 0x00, 0x78, 0x00, 0x07, 0xFF, 0x00, 0x00]);
        let layout = RepeatLayout {
            non_repeat_length: 2,
            repeat_length: 8,
            repeat_count: 1,
        };
        let mut cursor = &body[..];
        let decoded = ZoneStatusCodec.decode(&mut cursor, &header(layout)).unwrap();
        assert!(matches!(decoded, ZoneStatus::Report(ref z) if z.len() == 1));
        assert!(cursor.is_empty());
    }
}
