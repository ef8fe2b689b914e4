//! CRC8 checksum
//!
//! The RunCam protocol protects every frame with CRC8 using the DVB-S2
//! polynomial, zero initial value and no reflection.

use ::crc::{Crc, CRC_8_DVB_S2};

/// DVB-S2 polynomial
pub const POLY_DVB_S2: u8 = 0xD5;

const DVB_S2: Crc<u8> = Crc::<u8>::new(&CRC_8_DVB_S2);

/// Feed one byte into a running CRC8
pub fn crc8_update(crc: u8, byte: u8, poly: u8) -> u8 {
    let mut crc = crc ^ byte;
    for _ in 0..8 {
        crc = if crc & 0x80 != 0 {
            (crc << 1) ^ poly
        } else {
            crc << 1
        };
    }
    crc
}

/// CRC8 of a buffer with an arbitrary polynomial
pub fn crc8(buf: &[u8], poly: u8) -> u8 {
    buf.iter().fold(0, |crc, &b| crc8_update(crc, b, poly))
}

/// CRC8 of a buffer with the DVB-S2 polynomial
pub fn crc8_dvb_s2(buf: &[u8]) -> u8 {
    DVB_S2.checksum(buf)
}

/// Check that the last byte of `frame` is the CRC of everything before it.
///
/// Empty frames are never valid.
pub fn validate(frame: &[u8]) -> bool {
    match frame.split_last() {
        Some((&trailer, body)) => crc8_dvb_s2(body) == trailer,
        None => false,
    }
}
