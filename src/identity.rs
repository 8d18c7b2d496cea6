//! Deterministic fixed-width identities for inspected items and their stickers.
//!
//! An item identity is a 32-digit string and a sticker identity a 64-digit
//! string. Both start with a version digit (`0`) followed by fixed-width,
//! zero-padded fields, so an identity works as a dedup key. It is not a
//! lossless serialization: integers wider than their field keep only their
//! leading digits.
//!
//! Optional values are stored as `0` and present values are shifted where
//! `0` is itself legal (score type, tint). Wear outside the open interval
//! `(0, 1)` encodes to an all-zero field: wear `0` and wear `1` are
//! indistinguishable once encoded.
//!
//! Fractions are written as fixed decimals, so precision has a floor. Wear
//! and scale keep 17 decimals and read back exactly for values of at least
//! `1e-9`. Rotation keeps 15 decimals and reads back exactly for magnitudes
//! of at least `1e-7`. Anything smaller loses digits, and values that round
//! to an all-zero field decode as unset. Scale must stay below `10` and
//! rotation magnitude below `1000`; larger values keep only their leading
//! digits.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of an item identity.
pub const ITEM_ID_LEN: usize = 32;
/// Length of a sticker identity.
pub const STICKER_ID_LEN: usize = 64;

const VERSION: char = '0';

const WEAR_DIGITS: usize = 17;
const SCALE_DIGITS: usize = 18;
const ROTATION_DIGITS: usize = 19;
const ROTATION_INT_DIGITS: usize = 3;

// Item layout: version, score type, def index, paint index, paint seed,
// rarity, quality, paint wear.
const ITEM_WIDTHS: [usize; 8] = [1, 1, 3, 3, 3, 2, 2, WEAR_DIGITS];

// Sticker layout: version, sticker id, slot, wear, scale, rotation, tint.
const STICKER_WIDTHS: [usize; 7] = [1, 5, 2, WEAR_DIGITS, SCALE_DIGITS, ROTATION_DIGITS, 2];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("expected {expected} digits, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("non-digit character at offset {0}")]
    NonDigit(usize),

    #[error("unsupported identity version '{0}'")]
    Version(char),

    #[error("malformed {0} field")]
    Field(&'static str),
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// The attributes that define an item's identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemFields {
    pub killeater_score_type: Option<u32>,
    pub defindex: u32,
    pub paintindex: u32,
    pub paintseed: u32,
    pub rarity: u32,
    pub quality: u32,
    pub paintwear: f32,
}

/// A sticker (or patch) applied to an item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sticker {
    pub sticker_id: u32,
    pub slot: u32,
    pub wear: Option<f32>,
    pub scale: Option<f32>,
    pub rotation: Option<f32>,
    pub tint_id: Option<u32>,
}

// ---------------------------------------------------------------------------
// Item identity
// ---------------------------------------------------------------------------

/// Encode item attributes into a 32-digit identity.
pub fn encode_item(fields: &ItemFields) -> String {
    let mut id = String::with_capacity(ITEM_ID_LEN);
    id.push(VERSION);
    push_int(&mut id, shift_optional(fields.killeater_score_type), ITEM_WIDTHS[1]);
    push_int(&mut id, fields.defindex.into(), ITEM_WIDTHS[2]);
    push_int(&mut id, fields.paintindex.into(), ITEM_WIDTHS[3]);
    push_int(&mut id, fields.paintseed.into(), ITEM_WIDTHS[4]);
    push_int(&mut id, fields.rarity.into(), ITEM_WIDTHS[5]);
    push_int(&mut id, fields.quality.into(), ITEM_WIDTHS[6]);
    push_wear(&mut id, Some(fields.paintwear));
    id
}

/// Decode a 32-digit item identity.
pub fn decode_item(id: &str) -> Result<ItemFields, IdentityError> {
    let parts = split(id, &ITEM_WIDTHS)?;

    Ok(ItemFields {
        killeater_score_type: unshift_optional(parse_int(parts[1])),
        defindex: parse_int(parts[2]),
        paintindex: parse_int(parts[3]),
        paintseed: parse_int(parts[4]),
        rarity: parse_int(parts[5]),
        quality: parse_int(parts[6]),
        paintwear: parse_wear(parts[7])?.unwrap_or(0.0),
    })
}

/// Cheap structural check: 32 characters, digits only.
pub fn validate_item_id(id: &str) -> bool {
    id.len() == ITEM_ID_LEN && id.bytes().all(|b| b.is_ascii_digit())
}

// ---------------------------------------------------------------------------
// Sticker identity
// ---------------------------------------------------------------------------

/// Encode a sticker into a 64-digit identity.
pub fn encode_sticker(sticker: &Sticker) -> String {
    let mut id = String::with_capacity(STICKER_ID_LEN);
    id.push(VERSION);
    push_int(&mut id, sticker.sticker_id.into(), STICKER_WIDTHS[1]);
    push_int(&mut id, sticker.slot.into(), STICKER_WIDTHS[2]);
    push_wear(&mut id, sticker.wear);
    push_scale(&mut id, sticker.scale);
    push_rotation(&mut id, sticker.rotation);
    push_int(&mut id, shift_optional(sticker.tint_id), STICKER_WIDTHS[6]);
    id
}

/// Decode a 64-digit sticker identity.
pub fn decode_sticker(id: &str) -> Result<Sticker, IdentityError> {
    let parts = split(id, &STICKER_WIDTHS)?;

    Ok(Sticker {
        sticker_id: parse_int(parts[1]),
        slot: parse_int(parts[2]),
        wear: parse_wear(parts[3])?,
        scale: parse_scale(parts[4])?,
        rotation: parse_rotation(parts[5])?,
        tint_id: unshift_optional(parse_int(parts[6])),
    })
}

// ---------------------------------------------------------------------------
// Field codecs
// ---------------------------------------------------------------------------

fn shift_optional(value: Option<u32>) -> u64 {
    value.map_or(0, |v| u64::from(v) + 1)
}

fn unshift_optional(value: u32) -> Option<u32> {
    value.checked_sub(1)
}

/// Zero-pad to `width`; longer values keep their leading digits.
fn push_int(out: &mut String, value: u64, width: usize) {
    let digits = value.to_string();
    if digits.len() >= width {
        out.push_str(&digits[..width]);
    } else {
        out.extend(std::iter::repeat_n('0', width - digits.len()));
        out.push_str(&digits);
    }
}

fn push_zeros(out: &mut String, width: usize) {
    out.extend(std::iter::repeat_n('0', width));
}

/// Pad or cut a digit run to exactly `width`.
fn push_fixed(out: &mut String, digits: &str, width: usize) {
    if digits.len() >= width {
        out.push_str(&digits[..width]);
    } else {
        out.push_str(digits);
        push_zeros(out, width - digits.len());
    }
}

fn push_wear(out: &mut String, wear: Option<f32>) {
    match wear {
        Some(w) if w > 0.0 && w < 1.0 => {
            let text = format!("{:.*}", WEAR_DIGITS, f64::from(w));
            // "0." prefix
            push_fixed(out, &text[2..], WEAR_DIGITS);
        }
        _ => push_zeros(out, WEAR_DIGITS),
    }
}

fn push_scale(out: &mut String, scale: Option<f32>) {
    match scale {
        Some(s) if s > 0.0 && s.is_finite() => {
            let text = format!("{:.*}", SCALE_DIGITS - 1, f64::from(s)).replace('.', "");
            push_fixed(out, &text, SCALE_DIGITS);
        }
        _ => push_zeros(out, SCALE_DIGITS),
    }
}

fn push_rotation(out: &mut String, rotation: Option<f32>) {
    let decimals = ROTATION_DIGITS - 1 - ROTATION_INT_DIGITS;
    let mut digits = String::with_capacity(ROTATION_DIGITS - 1);
    if let Some(r) = rotation.filter(|r| r.is_finite()) {
        let text = format!("{:.*}", decimals, f64::from(r.abs()));
        let (int, frac) = text.split_once('.').unwrap_or((text.as_str(), ""));
        push_int(&mut digits, int.parse().unwrap_or(0), ROTATION_INT_DIGITS);
        push_fixed(&mut digits, frac, decimals);
    }

    // Rotations that round to nothing are unset, same as zero.
    if digits.is_empty() || all_zero(&digits) {
        out.push('1');
        push_zeros(out, ROTATION_DIGITS - 1);
    } else {
        out.push(if rotation.is_some_and(|r| r < 0.0) { '0' } else { '2' });
        out.push_str(&digits);
    }
}

fn parse_int(digits: &str) -> u32 {
    // Fields are at most five digits and already checked to be ASCII digits.
    digits.bytes().fold(0, |acc, b| acc * 10 + u32::from(b - b'0'))
}

fn all_zero(digits: &str) -> bool {
    digits.bytes().all(|b| b == b'0')
}

fn parse_wear(digits: &str) -> Result<Option<f32>, IdentityError> {
    if all_zero(digits) {
        return Ok(None);
    }
    format!("0.{digits}")
        .parse()
        .map(Some)
        .map_err(|_| IdentityError::Field("wear"))
}

fn parse_scale(digits: &str) -> Result<Option<f32>, IdentityError> {
    if all_zero(digits) {
        return Ok(None);
    }
    format!("{}.{}", &digits[..1], &digits[1..])
        .parse()
        .map(Some)
        .map_err(|_| IdentityError::Field("scale"))
}

fn parse_rotation(digits: &str) -> Result<Option<f32>, IdentityError> {
    let negative = match digits.as_bytes()[0] {
        b'1' => return Ok(None),
        b'0' => true,
        b'2' => false,
        _ => return Err(IdentityError::Field("rotation")),
    };
    let int_end = 1 + ROTATION_INT_DIGITS;
    let value: f32 = format!("{}.{}", &digits[1..int_end], &digits[int_end..])
        .parse()
        .map_err(|_| IdentityError::Field("rotation"))?;
    Ok(Some(if negative { -value } else { value }))
}

/// Validate length, version and digits, then cut `id` into fixed-width parts.
fn split<'a, const N: usize>(
    id: &'a str,
    widths: &[usize; N],
) -> Result<[&'a str; N], IdentityError> {
    let expected: usize = widths.iter().sum();
    if id.len() != expected {
        return Err(IdentityError::Length {
            expected,
            actual: id.len(),
        });
    }
    if let Some(offset) = id.bytes().position(|b| !b.is_ascii_digit()) {
        return Err(IdentityError::NonDigit(offset));
    }
    let version = id.as_bytes()[0] as char;
    if version != VERSION {
        return Err(IdentityError::Version(version));
    }

    let mut parts = [""; N];
    let mut start = 0;
    for (part, width) in parts.iter_mut().zip(widths) {
        *part = &id[start..start + width];
        start += width;
    }
    Ok(parts)
}
