// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Intel hex output for assembled images.

use std::io::{self, Write};

const LINE_LIMIT: usize = 32;

/// Writes `code` as Intel Hex data records starting at `origin`. When an
/// entry address is given, a Start Segment Address record is appended before
/// the end-of-file record.
pub fn write_hex_file<W: Write>(
    mut out: W,
    origin: u16,
    code: &[u8],
    entry: Option<u16>,
) -> io::Result<()> {
    for (ix, chunk) in code.chunks(LINE_LIMIT).enumerate() {
        let addr = origin.wrapping_add((ix * LINE_LIMIT) as u16);
        let mut checksum: u8 = chunk.len() as u8;
        checksum = checksum.wrapping_add((addr >> 8) as u8);
        checksum = checksum.wrapping_add((addr & 0xff) as u8);
        let mut hex_data = String::with_capacity(chunk.len() * 2);
        for val in chunk {
            hex_data.push(hex_digit((val >> 4) & 0x0f));
            hex_data.push(hex_digit(val & 0x0f));
            checksum = checksum.wrapping_add(*val);
        }
        checksum = (!checksum).wrapping_add(1);
        writeln!(
            out,
            ":{:02X}{:04X}00{}{:02X}",
            chunk.len(),
            addr,
            hex_data,
            checksum
        )?;
    }

    if let Some(addr) = entry {
        let mut csum: u8 = 4;
        csum = csum.wrapping_add(3);
        csum = csum.wrapping_add((addr >> 8) as u8);
        csum = csum.wrapping_add((addr & 0xff) as u8);
        csum = (!csum).wrapping_add(1);
        writeln!(out, ":040000030000{:04X}{:02X}", addr, csum)?;
    }

    writeln!(out, ":00000001FF")?;
    Ok(())
}

fn hex_digit(val: u8) -> char {
    match val {
        0..=9 => (b'0' + val) as char,
        _ => (b'A' + (val - 10)) as char,
    }
}
