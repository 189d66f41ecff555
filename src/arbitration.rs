//! 29-bit NMEA2000/J1939 arbitration ID codec (spec §4.1).

/// The decomposed fields of a 29-bit extended CAN arbitration ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedId {
    pub priority: u8,
    pub pgn: u32,
    pub source: u8,
    pub destination: u8,
}

/// Split a 29-bit arbitration ID into priority/PGN/source/destination.
///
/// PDU1 (PF<240) messages are destination-specific: the PS byte is the
/// destination address and is stripped out of the PGN. PDU2 (PF>=240)
/// messages are broadcast/group: PS is part of the PGN and destination is
/// the broadcast address 0xFF.
pub fn decode_id(id: u32) -> DecodedId {
    let id = id & 0x1FFF_FFFF;
    let priority = ((id >> 26) & 0x7) as u8;
    let source = (id & 0xFF) as u8;
    let pf_ps = (id >> 8) & 0x3_FFFF;
    let pf = (pf_ps >> 8) & 0xFF;

    let (pgn, destination) = if pf < 240 {
        (pf_ps & 0x3_FF00, (pf_ps & 0xFF) as u8)
    } else {
        (pf_ps, 0xFF)
    };

    DecodedId {
        priority,
        pgn,
        source,
        destination,
    }
}

/// Recombine priority/PGN/source into a 29-bit arbitration ID.
///
/// The caller is responsible for folding a PDU1 destination into `pgn`
/// before calling this (i.e. `pgn | destination`); every PGN this node
/// sends outbound (127245, the generic J1939 send path) is PDU2, so this
/// degenerates to the simple formula in all current callers.
pub fn encode_id(priority: u8, pgn: u32, source: u8) -> u32 {
    ((priority as u32 & 0x7) << 26) | ((pgn & 0x3_FFFF) << 8) | source as u32
}

/// Full inverse of [`decode_id`], folding a PDU1 destination back into the
/// PGN automatically. Used where a caller holds a `DecodedId` rather than an
/// already-folded PGN (e.g. the round-trip invariant in the test suite).
pub fn encode_id_from_decoded(decoded: DecodedId) -> u32 {
    let pf = (decoded.pgn >> 8) & 0xFF;
    let pgn_field = if pf < 240 {
        (decoded.pgn & 0x3_FF00) | decoded.destination as u32
    } else {
        decoded.pgn
    };
    encode_id(decoded.priority, pgn_field, decoded.source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_pdu2_pgn() {
        // 127245 (Rudder) is PDU2: PF=0xF0, PS is part of the PGN.
        let id = (6u32 << 26) | (127245u32 << 8) | 0x91;
        let decoded = decode_id(id);
        assert_eq!(decoded.priority, 6);
        assert_eq!(decoded.pgn, 127245);
        assert_eq!(decoded.source, 0x91);
        assert_eq!(decoded.destination, 0xFF);
        assert_eq!(encode_id(decoded.priority, decoded.pgn, decoded.source), id);
    }

    #[test]
    fn round_trips_pdu1_with_destination() {
        // PGN 0 is PDU1 (PF=0); PS becomes the destination address.
        let pgn_with_dest = 0x1234 & 0x3FF00;
        let id = (3u32 << 26) | (0x1234u32 << 8) | 0x55;
        let decoded = decode_id(id);
        assert_eq!(decoded.priority, 3);
        assert_eq!(decoded.pgn, pgn_with_dest);
        assert_eq!(decoded.source, 0x55);
        assert_eq!(decoded.destination, 0x34);
    }

    #[test]
    fn exhaustive_round_trip_sample() {
        for id in (0u32..(1 << 29)).step_by(104_729) {
            let decoded = decode_id(id);
            assert_eq!(encode_id_from_decoded(decoded), id);
        }
    }
}
