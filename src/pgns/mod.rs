//! Table-driven PGN field definitions (spec §4.2) and the bit-level
//! extraction engine shared by the decoder.

mod table;

pub use table::field_defs_for;

/// How a field's extracted raw bits are turned into a [`crate::field::FieldValue`].
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// Plain numeric scalar: sign-extend if `signed`, then multiply by `resolution`.
    Numeric,
    /// Resolve the raw integer through a static lookup table.
    Enum(&'static [(i64, &'static str)]),
    /// Days since 1970-01-01.
    Date,
    /// Seconds since midnight, resolution fixed at 1e-4 s per spec §4.2.
    Time,
    /// Raw byte sequence, no scaling.
    Bytes,
}

/// One field's position and decoding recipe within a PGN's 0-8 byte payload.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub id: &'static str,
    pub bit_offset: u32,
    pub bit_width: u32,
    pub signed: bool,
    pub resolution: f64,
    pub unit: &'static str,
    pub kind: FieldKind,
}
