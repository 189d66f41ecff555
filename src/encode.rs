//! Outbound frame builders (spec §4.3): the Rudder command encoder, the
//! hardware emergency-stop frame, and the generic J1939 send path.

use crate::arbitration::encode_id;
use crate::error::{CanControllerError, Result};

/// A frame ready to hand to the CAN Bus Adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanFrame {
    pub arbitration_id: u32,
    pub is_extended_id: bool,
    pub data: Vec<u8>,
}

const RUDDER_PGN: u32 = 127245;

/// Build a PGN 127245 Rudder command frame.
///
/// `angle_order` and `position` are radians; both are clamped to the 16-bit
/// signed range after scaling by the field's 0.0001 rad resolution and
/// rounded to the nearest raw count. Byte 1's upper 5 bits are reserved and
/// filled with 0s; bytes 6-7 (the second reserved field) are filled 0xFF per
/// spec §4.3.
pub fn encode_rudder(instance: u8, direction_order: u8, angle_order: f64, position: f64, source: u8) -> Result<CanFrame> {
    if direction_order > 0b111 {
        return Err(CanControllerError::Encode {
            pgn: RUDDER_PGN,
            reason: format!("direction_order {direction_order} exceeds 3-bit range"),
        });
    }

    let angle_raw = scale_to_i16(angle_order, 0.0001, RUDDER_PGN, "angle_order")?;
    let position_raw = scale_to_i16(position, 0.0001, RUDDER_PGN, "position")?;

    let mut data = [0u8; 8];
    data[0] = instance;
    data[1] = direction_order & 0b111;
    data[2] = (angle_raw as u16 & 0xFF) as u8;
    data[3] = ((angle_raw as u16 >> 8) & 0xFF) as u8;
    data[4] = (position_raw as u16 & 0xFF) as u8;
    data[5] = ((position_raw as u16 >> 8) & 0xFF) as u8;
    data[6] = 0xFF;
    data[7] = 0xFF;

    Ok(CanFrame {
        arbitration_id: encode_id(6, RUDDER_PGN, source),
        is_extended_id: true,
        data: data.to_vec(),
    })
}

fn scale_to_i16(value: f64, resolution: f64, pgn: u32, field: &str) -> Result<i16> {
    let raw = (value / resolution).round();
    if raw < i16::MIN as f64 || raw > i16::MAX as f64 {
        return Err(CanControllerError::Encode {
            pgn,
            reason: format!("{field} value {value} out of encodable range"),
        });
    }
    Ok(raw as i16)
}

/// The hardware emergency-stop frame: a fixed, non-extended id with an all-
/// 0xFF payload, matching the original node's `_send_emergency_stop_can`.
pub fn emergency_stop_frame() -> CanFrame {
    CanFrame {
        arbitration_id: 0x1FF,
        is_extended_id: false,
        data: vec![0xFF; 8],
    }
}

/// Build a generic outbound J1939 frame from a priority/PGN/source and raw
/// payload. Payloads longer than 8 bytes are truncated with a warning
/// (single-frame sends only; fast-packet segmentation is out of scope).
pub fn encode_j1939(priority: u8, pgn: u32, source: u8, payload: &[u8]) -> CanFrame {
    let data = if payload.len() > 8 {
        tracing::warn!(pgn, len = payload.len(), "truncating outbound J1939 payload to 8 bytes");
        payload[..8].to_vec()
    } else {
        payload.to_vec()
    };

    CanFrame {
        arbitration_id: encode_id(priority, pgn, source),
        is_extended_id: true,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_frame;
    use crate::field::FieldValue;
    use chrono::Utc;

    #[test]
    fn rudder_round_trips_through_decoder() {
        let frame = encode_rudder(3, 1, 0.1047, -0.0524, 0x91).unwrap();
        assert_eq!(frame.data[6], 0xFF);
        assert_eq!(frame.data[7], 0xFF);

        let msg = decode_frame(frame.arbitration_id, &frame.data, Utc::now());
        assert_eq!(msg.pgn, 127245);
        assert_eq!(msg.source, 0x91);

        let instance = msg.fields.iter().find(|f| f.id == "instance").unwrap();
        assert_eq!(instance.value, FieldValue::Int(3));

        let angle = msg.fields.iter().find(|f| f.id == "angle_order").unwrap();
        match angle.value {
            FieldValue::Float(v) => assert!((v - 0.1047).abs() < 1e-9),
            _ => panic!("expected float"),
        }
    }

    #[test]
    fn rudder_rejects_out_of_range_angle() {
        let result = encode_rudder(0, 0, 1000.0, 0.0, 0x91);
        assert!(result.is_err());
    }

    #[test]
    fn emergency_stop_frame_matches_hardware_contract() {
        let frame = emergency_stop_frame();
        assert_eq!(frame.arbitration_id, 0x1FF);
        assert!(!frame.is_extended_id);
        assert_eq!(frame.data, vec![0xFF; 8]);
    }

    #[test]
    fn generic_send_truncates_oversized_payload() {
        let frame = encode_j1939(6, 65280, 0x01, &[0u8; 12]);
        assert_eq!(frame.data.len(), 8);
    }
}
