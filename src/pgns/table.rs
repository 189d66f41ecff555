//! Field-layout tables for every recognized PGN (spec §4.2).
//!
//! Bit offsets/widths are counted little-endian across the frame's up-to-8
//! data bytes (bit 0 is the LSB of byte 0). Resolutions and units follow the
//! NMEA2000/J1939 public PGN definitions; messages whose real-world layout
//! spans more than one CAN frame (fast-packet territory, explicitly out of
//! scope) are modeled with their full field list so the DLC-too-short edge
//! case (spec §4.2) naturally nulls out whatever doesn't fit in a single
//! frame.

use super::{FieldDef, FieldKind};

const COG_REFERENCE: &[(i64, &str)] = &[(0, "True"), (1, "Magnetic")];
const HEADING_REFERENCE: &[(i64, &str)] = &[(0, "True"), (1, "Magnetic")];
const FLUID_TYPE: &[(i64, &str)] = &[
    (0, "Fuel"),
    (1, "Water"),
    (2, "GrayWater"),
    (3, "LiveWell"),
    (4, "Oil"),
    (5, "BlackWater"),
];
const DC_TYPE: &[(i64, &str)] = &[(0, "Battery"), (1, "Alternator"), (2, "Converter"), (3, "SolarCell"), (4, "WindGenerator")];
const CONTROLLER_STATE: &[(i64, &str)] = &[(0, "Off"), (1, "On"), (2, "Error"), (3, "Unavailable")];
const CONNECTION_STATE: &[(i64, &str)] = &[(0, "Connected"), (1, "Disconnected")];
const GNSS_MODE: &[(i64, &str)] = &[(0, "1D"), (1, "2D"), (2, "3D"), (7, "Unavailable")];

/// Look up the field table for a recognized PGN. Returns `None` for any PGN
/// not in spec §4.2's recognized set, in which case the caller falls back to
/// an empty-fields `Unknown` decode.
pub fn field_defs_for(pgn: u32) -> Option<&'static [FieldDef]> {
    Some(match pgn {
        126992 => &SYSTEM_TIME,
        126993 => &HEARTBEAT,
        127245 => &RUDDER,
        127250 => &VESSEL_HEADING,
        127257 => &ATTITUDE,
        127258 => &MAGNETIC_VARIATION,
        127488 => &ENGINE_RAPID,
        127489 => &ENGINE_DYNAMIC,
        127497 => &TRIP_FUEL,
        127500 => &LOAD_CONTROLLER,
        127501 => &BINARY_SWITCH_BANK,
        127505 => &FLUID_LEVEL,
        127506 => &DC_DETAILED_STATUS,
        127508 => &BATTERY_STATUS,
        127751 => &DC_VOLTAGE_CURRENT,
        129025 => &POSITION_RAPID,
        129026 => &COG_SOG_RAPID,
        129029 => &GNSS_POSITION_DATA,
        129283 => &CROSS_TRACK_ERROR,
        129284 => &NAVIGATION_DATA,
        129539 => &GNSS_DOPS,
        129540 => &GNSS_SATS_IN_VIEW,
        65361 => &PROPRIETARY_65361,
        60928 => &ISO_ADDRESS_CLAIM,
        59392 => &ISO_ACKNOWLEDGMENT,
        _ => return None,
    })
}

const SYSTEM_TIME: [FieldDef; 3] = [
    FieldDef { id: "sid", bit_offset: 0, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "source", bit_offset: 8, bit_width: 4, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "date", bit_offset: 16, bit_width: 16, signed: false, resolution: 1.0, unit: "days", kind: FieldKind::Date },
];

const HEARTBEAT: [FieldDef; 5] = [
    FieldDef { id: "data_transmit_offset", bit_offset: 0, bit_width: 16, signed: false, resolution: 0.01, unit: "s", kind: FieldKind::Numeric },
    FieldDef { id: "sequence_counter", bit_offset: 16, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "controller1_state", bit_offset: 24, bit_width: 2, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Enum(CONTROLLER_STATE) },
    FieldDef { id: "controller2_state", bit_offset: 26, bit_width: 2, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Enum(CONTROLLER_STATE) },
    FieldDef { id: "equipment_status", bit_offset: 28, bit_width: 2, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Enum(CONTROLLER_STATE) },
];

/// Matches spec §4.3's outbound Rudder layout exactly so decode(encode(x)) round-trips.
const RUDDER: [FieldDef; 4] = [
    FieldDef { id: "instance", bit_offset: 0, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "direction_order", bit_offset: 8, bit_width: 3, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "angle_order", bit_offset: 16, bit_width: 16, signed: true, resolution: 0.0001, unit: "rad", kind: FieldKind::Numeric },
    FieldDef { id: "position", bit_offset: 32, bit_width: 16, signed: true, resolution: 0.0001, unit: "rad", kind: FieldKind::Numeric },
];

const VESSEL_HEADING: [FieldDef; 5] = [
    FieldDef { id: "sid", bit_offset: 0, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "heading", bit_offset: 8, bit_width: 16, signed: false, resolution: 0.0001, unit: "rad", kind: FieldKind::Numeric },
    FieldDef { id: "deviation", bit_offset: 24, bit_width: 16, signed: true, resolution: 0.0001, unit: "rad", kind: FieldKind::Numeric },
    FieldDef { id: "variation", bit_offset: 40, bit_width: 16, signed: true, resolution: 0.0001, unit: "rad", kind: FieldKind::Numeric },
    FieldDef { id: "reference", bit_offset: 56, bit_width: 2, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Enum(HEADING_REFERENCE) },
];

const ATTITUDE: [FieldDef; 4] = [
    FieldDef { id: "sid", bit_offset: 0, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "yaw", bit_offset: 8, bit_width: 16, signed: true, resolution: 0.0001, unit: "rad", kind: FieldKind::Numeric },
    FieldDef { id: "pitch", bit_offset: 24, bit_width: 16, signed: true, resolution: 0.0001, unit: "rad", kind: FieldKind::Numeric },
    FieldDef { id: "roll", bit_offset: 40, bit_width: 16, signed: true, resolution: 0.0001, unit: "rad", kind: FieldKind::Numeric },
];

const MAGNETIC_VARIATION: [FieldDef; 4] = [
    FieldDef { id: "sid", bit_offset: 0, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "source", bit_offset: 8, bit_width: 4, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "date", bit_offset: 16, bit_width: 16, signed: false, resolution: 1.0, unit: "days", kind: FieldKind::Date },
    FieldDef { id: "variation", bit_offset: 32, bit_width: 16, signed: true, resolution: 0.0001, unit: "rad", kind: FieldKind::Numeric },
];

const ENGINE_RAPID: [FieldDef; 4] = [
    FieldDef { id: "instance", bit_offset: 0, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "speed", bit_offset: 8, bit_width: 16, signed: false, resolution: 0.25, unit: "rpm", kind: FieldKind::Numeric },
    FieldDef { id: "boost_pressure", bit_offset: 24, bit_width: 16, signed: false, resolution: 100.0, unit: "Pa", kind: FieldKind::Numeric },
    FieldDef { id: "tilt_trim", bit_offset: 40, bit_width: 8, signed: true, resolution: 1.0, unit: "%", kind: FieldKind::Numeric },
];

const ENGINE_DYNAMIC: [FieldDef; 4] = [
    FieldDef { id: "instance", bit_offset: 0, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "oil_pressure", bit_offset: 8, bit_width: 16, signed: false, resolution: 100.0, unit: "Pa", kind: FieldKind::Numeric },
    FieldDef { id: "oil_temperature", bit_offset: 24, bit_width: 16, signed: false, resolution: 0.1, unit: "K", kind: FieldKind::Numeric },
    FieldDef { id: "engine_temperature", bit_offset: 40, bit_width: 16, signed: false, resolution: 0.01, unit: "K", kind: FieldKind::Numeric },
];

const TRIP_FUEL: [FieldDef; 4] = [
    FieldDef { id: "instance", bit_offset: 0, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "trip_fuel_used", bit_offset: 8, bit_width: 16, signed: false, resolution: 1.0, unit: "L", kind: FieldKind::Numeric },
    FieldDef { id: "fuel_rate_average", bit_offset: 24, bit_width: 16, signed: false, resolution: 0.1, unit: "L/h", kind: FieldKind::Numeric },
    FieldDef { id: "fuel_rate_economy", bit_offset: 40, bit_width: 16, signed: false, resolution: 0.1, unit: "L/h", kind: FieldKind::Numeric },
];

const LOAD_CONTROLLER: [FieldDef; 4] = [
    FieldDef { id: "sid", bit_offset: 0, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "connection_id", bit_offset: 8, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "state", bit_offset: 16, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Enum(CONNECTION_STATE) },
    FieldDef { id: "status", bit_offset: 24, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
];

const BINARY_SWITCH_BANK: [FieldDef; 2] = [
    FieldDef { id: "instance", bit_offset: 0, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "indicators", bit_offset: 8, bit_width: 56, signed: false, resolution: 1.0, unit: "bitmask", kind: FieldKind::Numeric },
];

const FLUID_LEVEL: [FieldDef; 4] = [
    FieldDef { id: "instance", bit_offset: 0, bit_width: 4, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "type", bit_offset: 4, bit_width: 4, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Enum(FLUID_TYPE) },
    FieldDef { id: "level", bit_offset: 8, bit_width: 16, signed: false, resolution: 0.004, unit: "%", kind: FieldKind::Numeric },
    FieldDef { id: "capacity", bit_offset: 24, bit_width: 32, signed: false, resolution: 0.1, unit: "L", kind: FieldKind::Numeric },
];

const DC_DETAILED_STATUS: [FieldDef; 5] = [
    FieldDef { id: "sid", bit_offset: 0, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "instance", bit_offset: 8, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "type", bit_offset: 16, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Enum(DC_TYPE) },
    FieldDef { id: "state_of_charge", bit_offset: 24, bit_width: 8, signed: false, resolution: 1.0, unit: "%", kind: FieldKind::Numeric },
    FieldDef { id: "state_of_health", bit_offset: 32, bit_width: 8, signed: false, resolution: 1.0, unit: "%", kind: FieldKind::Numeric },
];

const BATTERY_STATUS: [FieldDef; 5] = [
    FieldDef { id: "instance", bit_offset: 0, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "voltage", bit_offset: 8, bit_width: 16, signed: true, resolution: 0.01, unit: "V", kind: FieldKind::Numeric },
    FieldDef { id: "current", bit_offset: 24, bit_width: 16, signed: true, resolution: 0.1, unit: "A", kind: FieldKind::Numeric },
    FieldDef { id: "temperature", bit_offset: 40, bit_width: 16, signed: false, resolution: 0.01, unit: "K", kind: FieldKind::Numeric },
    FieldDef { id: "sid", bit_offset: 56, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
];

const DC_VOLTAGE_CURRENT: [FieldDef; 4] = [
    FieldDef { id: "sid", bit_offset: 0, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "connection_number", bit_offset: 8, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "dc_voltage", bit_offset: 16, bit_width: 16, signed: false, resolution: 0.01, unit: "V", kind: FieldKind::Numeric },
    FieldDef { id: "dc_current", bit_offset: 32, bit_width: 16, signed: true, resolution: 0.1, unit: "A", kind: FieldKind::Numeric },
];

const POSITION_RAPID: [FieldDef; 2] = [
    FieldDef { id: "latitude", bit_offset: 0, bit_width: 32, signed: true, resolution: 1e-7, unit: "deg", kind: FieldKind::Numeric },
    FieldDef { id: "longitude", bit_offset: 32, bit_width: 32, signed: true, resolution: 1e-7, unit: "deg", kind: FieldKind::Numeric },
];

const COG_SOG_RAPID: [FieldDef; 4] = [
    FieldDef { id: "sid", bit_offset: 0, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "cog_reference", bit_offset: 8, bit_width: 2, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Enum(COG_REFERENCE) },
    FieldDef { id: "cog", bit_offset: 16, bit_width: 16, signed: false, resolution: 0.0001, unit: "rad", kind: FieldKind::Numeric },
    FieldDef { id: "sog", bit_offset: 32, bit_width: 16, signed: false, resolution: 0.01, unit: "m/s", kind: FieldKind::Numeric },
];

/// Real-world PGN 129029 is a multi-frame fast packet (~43 bytes); only
/// `sid`/`date`/`time` fit in a single CAN frame, the rest are exercised by
/// the DLC-too-short edge case.
const GNSS_POSITION_DATA: [FieldDef; 7] = [
    FieldDef { id: "sid", bit_offset: 0, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "date", bit_offset: 8, bit_width: 16, signed: false, resolution: 1.0, unit: "days", kind: FieldKind::Date },
    FieldDef { id: "time", bit_offset: 24, bit_width: 32, signed: false, resolution: 0.0001, unit: "s", kind: FieldKind::Time },
    FieldDef { id: "latitude", bit_offset: 56, bit_width: 64, signed: true, resolution: 1e-16, unit: "deg", kind: FieldKind::Numeric },
    FieldDef { id: "longitude", bit_offset: 120, bit_width: 64, signed: true, resolution: 1e-16, unit: "deg", kind: FieldKind::Numeric },
    FieldDef { id: "altitude", bit_offset: 184, bit_width: 64, signed: true, resolution: 1e-6, unit: "m", kind: FieldKind::Numeric },
    FieldDef { id: "gnss_type", bit_offset: 248, bit_width: 4, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Enum(GNSS_MODE) },
];

const CROSS_TRACK_ERROR: [FieldDef; 2] = [
    FieldDef { id: "sid", bit_offset: 0, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "xte", bit_offset: 16, bit_width: 32, signed: true, resolution: 0.01, unit: "m", kind: FieldKind::Numeric },
];

/// Real-world PGN 129284 is also a fast packet; only the first two fields
/// fit in a single frame.
const NAVIGATION_DATA: [FieldDef; 4] = [
    FieldDef { id: "sid", bit_offset: 0, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "distance_to_waypoint", bit_offset: 8, bit_width: 32, signed: false, resolution: 0.01, unit: "m", kind: FieldKind::Numeric },
    FieldDef { id: "eta_time", bit_offset: 48, bit_width: 32, signed: false, resolution: 0.0001, unit: "s", kind: FieldKind::Time },
    FieldDef { id: "eta_date", bit_offset: 80, bit_width: 16, signed: false, resolution: 1.0, unit: "days", kind: FieldKind::Date },
];

const GNSS_DOPS: [FieldDef; 5] = [
    FieldDef { id: "sid", bit_offset: 0, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "desired_mode", bit_offset: 8, bit_width: 3, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Enum(GNSS_MODE) },
    FieldDef { id: "actual_mode", bit_offset: 11, bit_width: 3, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Enum(GNSS_MODE) },
    FieldDef { id: "hdop", bit_offset: 16, bit_width: 16, signed: true, resolution: 0.01, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "vdop", bit_offset: 32, bit_width: 16, signed: true, resolution: 0.01, unit: "", kind: FieldKind::Numeric },
];

/// Real-world PGN 129540 is a fast packet; only the header fits in one frame.
const GNSS_SATS_IN_VIEW: [FieldDef; 6] = [
    FieldDef { id: "sid", bit_offset: 0, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "range_residual_mode", bit_offset: 8, bit_width: 4, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "sats_in_view", bit_offset: 16, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "prn", bit_offset: 24, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "elevation", bit_offset: 32, bit_width: 16, signed: true, resolution: 0.0001, unit: "rad", kind: FieldKind::Numeric },
    FieldDef { id: "azimuth", bit_offset: 48, bit_width: 16, signed: false, resolution: 0.0001, unit: "rad", kind: FieldKind::Numeric },
];

const PROPRIETARY_65361: [FieldDef; 2] = [
    FieldDef { id: "manufacturer_code", bit_offset: 0, bit_width: 11, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "data", bit_offset: 16, bit_width: 48, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Bytes },
];

const ISO_ADDRESS_CLAIM: [FieldDef; 1] = [
    FieldDef { id: "name", bit_offset: 0, bit_width: 64, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Bytes },
];

const ISO_ACKNOWLEDGMENT: [FieldDef; 3] = [
    FieldDef { id: "control", bit_offset: 0, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "group_function", bit_offset: 8, bit_width: 8, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
    FieldDef { id: "pgn", bit_offset: 40, bit_width: 24, signed: false, resolution: 1.0, unit: "", kind: FieldKind::Numeric },
];
