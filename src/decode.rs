//! The PGN Payload Decoder (spec §4.2): turns a raw CAN frame into a
//! [`DecodedMessage`] by walking a PGN's [`FieldDef`] table and extracting
//! each field's bits from the little-endian payload.

use chrono::{DateTime, Utc};

use crate::arbitration::decode_id;
use crate::field::{DecodedMessage, FieldRecord, FieldValue, RawValue};
use crate::pgns::{field_defs_for, FieldDef, FieldKind};

/// Extract `width` bits starting at `offset` from a little-endian byte
/// sequence and return them right-aligned in a `u64`. Bits past the end of
/// `data` are treated as absent, not zero; the caller must check
/// `offset + width <= data.len() * 8` before trusting the result.
fn extract_bits(data: &[u8], offset: u32, width: u32) -> u64 {
    let mut value: u64 = 0;
    for i in 0..width {
        let bit_pos = offset + i;
        let byte_idx = (bit_pos / 8) as usize;
        let bit_idx = bit_pos % 8;
        let bit = (data[byte_idx] >> bit_idx) & 1;
        value |= (bit as u64) << i;
    }
    value
}

fn sign_extend(raw: u64, width: u32) -> i64 {
    if width == 0 || width >= 64 {
        return raw as i64;
    }
    let shift = 64 - width;
    ((raw << shift) as i64) >> shift
}

/// Decode one field out of `data` per its [`FieldDef`]. Returns `None`
/// (value/raw both null) when the field's bit range doesn't fit in `data`,
/// or when the raw bits are the all-1s "not available" sentinel.
fn decode_field(def: &FieldDef, data: &[u8]) -> FieldRecord {
    let available_bits = data.len() as u32 * 8;
    let in_range = def.bit_offset + def.bit_width <= available_bits;

    if !in_range {
        return FieldRecord {
            id: def.id.to_string(),
            raw_value: RawValue::None,
            value: FieldValue::Null,
            unit_of_measurement: def.unit.to_string(),
        };
    }

    let raw = extract_bits(data, def.bit_offset, def.bit_width);
    let all_ones = def.bit_width < 64 && raw == (1u64 << def.bit_width) - 1;
    if all_ones {
        return FieldRecord {
            id: def.id.to_string(),
            raw_value: RawValue::None,
            value: FieldValue::Null,
            unit_of_measurement: def.unit.to_string(),
        };
    }

    match def.kind {
        FieldKind::Bytes => {
            let n_bytes = def.bit_width.div_ceil(8) as usize;
            let mut bytes = Vec::with_capacity(n_bytes);
            let mut remaining = def.bit_width;
            let mut offset = def.bit_offset;
            while remaining > 0 {
                let take = remaining.min(8);
                bytes.push(extract_bits(data, offset, take) as u8);
                offset += take;
                remaining -= take;
            }
            FieldRecord {
                id: def.id.to_string(),
                raw_value: RawValue::Bytes(bytes.clone()),
                value: FieldValue::Bytes(bytes),
                unit_of_measurement: def.unit.to_string(),
            }
        }
        FieldKind::Enum(table) => {
            let signed_raw = if def.signed { sign_extend(raw, def.bit_width) } else { raw as i64 };
            let name = table
                .iter()
                .find(|(k, _)| *k == signed_raw)
                .map(|(_, v)| v.to_string())
                .unwrap_or_else(|| format!("Unknown({signed_raw})"));
            FieldRecord {
                id: def.id.to_string(),
                raw_value: RawValue::Int(signed_raw),
                value: FieldValue::Enum { raw: signed_raw, name },
                unit_of_measurement: def.unit.to_string(),
            }
        }
        FieldKind::Date => {
            let signed_raw = raw as i64;
            FieldRecord {
                id: def.id.to_string(),
                raw_value: RawValue::Int(signed_raw),
                value: FieldValue::Date(signed_raw),
                unit_of_measurement: def.unit.to_string(),
            }
        }
        FieldKind::Time => {
            let signed_raw = raw as i64;
            FieldRecord {
                id: def.id.to_string(),
                raw_value: RawValue::Int(signed_raw),
                value: FieldValue::Time(signed_raw as f64 * def.resolution),
                unit_of_measurement: def.unit.to_string(),
            }
        }
        FieldKind::Numeric => {
            let signed_raw = if def.signed { sign_extend(raw, def.bit_width) } else { raw as i64 };
            let value = if def.resolution == 1.0 {
                FieldValue::Int(signed_raw)
            } else {
                FieldValue::Float(signed_raw as f64 * def.resolution)
            };
            FieldRecord {
                id: def.id.to_string(),
                raw_value: RawValue::Int(signed_raw),
                value,
                unit_of_measurement: def.unit.to_string(),
            }
        }
    }
}

/// Decode a raw CAN frame into a [`DecodedMessage`].
///
/// `id` is the 29-bit extended arbitration id, `data` the frame payload
/// (0-8 bytes). A PGN outside the recognized set (spec §4.2) decodes to an
/// empty field list rather than an error; the caller still forwards it,
/// just without structured fields.
pub fn decode_frame(id: u32, data: &[u8], timestamp: DateTime<Utc>) -> DecodedMessage {
    let decoded_id = decode_id(id);
    let fields = match field_defs_for(decoded_id.pgn) {
        Some(defs) => defs.iter().map(|def| decode_field(def, data)).collect(),
        None => Vec::new(),
    };

    DecodedMessage {
        pgn: decoded_id.pgn,
        source: decoded_id.source,
        destination: decoded_id.destination,
        priority: decoded_id.priority,
        fields,
        timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_id(priority: u8, pgn: u32, source: u8) -> u32 {
        crate::arbitration::encode_id(priority, pgn, source)
    }

    #[test]
    fn decodes_rudder_frame_per_spec_example() {
        // instance=0, direction_order=0, angle_order=0.1047rad (~1047 raw), position=-0.0524rad (~-524 raw)
        let mut data = [0u8; 8];
        data[0] = 0x00; // instance
        data[1] = 0x00; // direction_order bits 8-10, reserved rest
        let angle_raw: i16 = 1047;
        let position_raw: i16 = -524;
        data[2] = (angle_raw & 0xFF) as u8;
        data[3] = ((angle_raw >> 8) & 0xFF) as u8;
        data[4] = (position_raw as u16 & 0xFF) as u8;
        data[5] = ((position_raw as u16 >> 8) & 0xFF) as u8;
        data[6] = 0xFF;
        data[7] = 0xFF;

        let id = frame_id(6, 127245, 0x91);
        let msg = decode_frame(id, &data, Utc::now());

        assert_eq!(msg.pgn, 127245);
        assert_eq!(msg.source, 0x91);
        let angle = msg.fields.iter().find(|f| f.id == "angle_order").unwrap();
        match angle.value {
            FieldValue::Float(v) => assert!((v - 0.1047).abs() < 1e-9),
            _ => panic!("expected float"),
        }
        let position = msg.fields.iter().find(|f| f.id == "position").unwrap();
        match position.value {
            FieldValue::Float(v) => assert!((v + 0.0524).abs() < 1e-9),
            _ => panic!("expected float"),
        }
    }

    #[test]
    fn unknown_pgn_decodes_to_empty_field_list() {
        let id = frame_id(6, 131071, 0x01);
        let msg = decode_frame(id, &[0u8; 8], Utc::now());
        assert!(msg.fields.is_empty());
    }

    #[test]
    fn short_dlc_nulls_out_of_range_fields() {
        // Rudder needs 6 bytes (48 bits); give it only 2.
        let id = frame_id(6, 127245, 0x01);
        let msg = decode_frame(id, &[0x00, 0x00], Utc::now());
        let angle = msg.fields.iter().find(|f| f.id == "angle_order").unwrap();
        assert_eq!(angle.value, FieldValue::Null);
        assert_eq!(angle.raw_value, RawValue::None);
    }

    #[test]
    fn all_ones_sentinel_decodes_to_null() {
        let id = frame_id(6, 127245, 0x01);
        let data = [0xFF; 8];
        let msg = decode_frame(id, &data, Utc::now());
        let angle = msg.fields.iter().find(|f| f.id == "angle_order").unwrap();
        assert_eq!(angle.value, FieldValue::Null);
    }

    #[test]
    fn heartbeat_enum_field_resolves_name() {
        let id = frame_id(6, 126993, 0x01);
        let mut data = [0u8; 8];
        data[3] = 0b0000_0001; // controller1_state = On (bits 24-25)
        let msg = decode_frame(id, &data, Utc::now());
        let state = msg.fields.iter().find(|f| f.id == "controller1_state").unwrap();
        match &state.value {
            FieldValue::Enum { raw, name } => {
                assert_eq!(*raw, 1);
                assert_eq!(name, "On");
            }
            _ => panic!("expected enum"),
        }
    }
}
