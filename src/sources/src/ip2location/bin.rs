// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! A reader for the IP2Location PX-series BIN format.
//!
//! The file is a packed table of address ranges sorted by first address.
//! The 64-byte header records the product level (PX1..PX11), the column
//! count, and the 1-based file positions of the IPv4 and IPv6 tables plus
//! their optional /16 prefix indexes. Each row stores the range's first
//! address followed by one 4-byte pointer per column; a pointer addresses a
//! length-prefixed string in the shared pool. The range's last address is
//! implied by the next row's first address.

use std::fs::File;
use std::net::IpAddr;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use memmap2::Mmap;

use super::ProxyRecord;

#[derive(Debug, thiserror::Error)]
pub enum BinError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed BIN database: {0}")]
    Malformed(String),
}

// Column positions per product level (index = PX level, 0 unused). A zero
// means the column is absent at that level.
const PROXY_TYPE: [u32; 12] = [0, 0, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2];
const COUNTRY: [u32; 12] = [0, 2, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3];
const REGION: [u32; 12] = [0, 0, 0, 4, 4, 4, 4, 4, 4, 4, 4, 4];
const CITY: [u32; 12] = [0, 0, 0, 5, 5, 5, 5, 5, 5, 5, 5, 5];
const ISP: [u32; 12] = [0, 0, 0, 0, 6, 6, 6, 6, 6, 6, 6, 6];
const DOMAIN: [u32; 12] = [0, 0, 0, 0, 0, 7, 7, 7, 7, 7, 7, 7];
const USAGE_TYPE: [u32; 12] = [0, 0, 0, 0, 0, 0, 8, 8, 8, 8, 8, 8];
const ASN: [u32; 12] = [0, 0, 0, 0, 0, 0, 0, 9, 9, 9, 9, 9];
const AS_NAME: [u32; 12] = [0, 0, 0, 0, 0, 0, 0, 10, 10, 10, 10, 10];
const LAST_SEEN: [u32; 12] = [0, 0, 0, 0, 0, 0, 0, 0, 11, 11, 11, 11];
const THREAT: [u32; 12] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 12, 12, 12];

/// A memory-mapped PX database.
pub struct ProxyDatabase {
    data: Mmap,
    db_type: usize,
    columns: u32,
    ipv4_count: u32,
    ipv4_addr: u32,
    ipv6_count: u32,
    ipv6_addr: u32,
    ipv4_index: u32,
    ipv6_index: u32,
}

impl ProxyDatabase {
    pub fn open(path: &Path) -> Result<ProxyDatabase, BinError> {
        let file = File::open(path)?;
        // Safety: the file is replaced only by rename, never truncated or
        // written in place, so the mapping stays valid for its lifetime.
        let data = unsafe { Mmap::map(&file)? };
        if data.len() < 64 {
            return Err(BinError::Malformed("shorter than the 64 byte header".into()));
        }

        let db = ProxyDatabase {
            db_type: usize::from(data[0]),
            columns: u32::from(data[1]),
            ipv4_count: LittleEndian::read_u32(&data[5..9]),
            ipv4_addr: LittleEndian::read_u32(&data[9..13]),
            ipv6_count: LittleEndian::read_u32(&data[13..17]),
            ipv6_addr: LittleEndian::read_u32(&data[17..21]),
            ipv4_index: LittleEndian::read_u32(&data[21..25]),
            ipv6_index: LittleEndian::read_u32(&data[25..29]),
            data,
        };
        if db.db_type == 0 || db.db_type > 11 {
            return Err(BinError::Malformed(format!(
                "unknown product level {}",
                db.db_type
            )));
        }
        if db.columns < 2 || db.ipv4_addr == 0 {
            return Err(BinError::Malformed("missing IPv4 table".into()));
        }
        Ok(db)
    }

    /// Looks up the row covering `ip`, if any.
    pub fn lookup(&self, ip: IpAddr) -> Option<ProxyRecord> {
        match ip {
            IpAddr::V4(v4) => self.lookup_v4(u32::from(v4)),
            IpAddr::V6(v6) => match v6.to_ipv4() {
                Some(v4) => self.lookup_v4(u32::from(v4)),
                None => self.lookup_v6(u128::from(v6)),
            },
        }
    }

    fn lookup_v4(&self, ip: u32) -> Option<ProxyRecord> {
        let row_size = self.columns.checked_mul(4)?;
        let (mut low, mut high) = if self.ipv4_index > 0 {
            let index = self.ipv4_index + (ip >> 16) * 8;
            (self.u32_at(index)?, self.u32_at(index + 4)?)
        } else {
            (0, self.ipv4_count)
        };

        while low <= high {
            let mid = (low + high) / 2;
            let row = self.ipv4_addr.checked_add(mid.checked_mul(row_size)?)?;
            let ip_from = self.u32_at(row)?;
            let ip_to = self.u32_at(row + row_size)?;
            if (ip_from..ip_to).contains(&ip) {
                return Some(self.record_at(row, 4));
            } else if ip < ip_from {
                high = mid.checked_sub(1)?;
            } else {
                low = mid + 1;
            }
        }
        None
    }

    fn lookup_v6(&self, ip: u128) -> Option<ProxyRecord> {
        if self.ipv6_count == 0 || self.ipv6_addr == 0 {
            return None;
        }
        let row_size = 16 + (self.columns - 1) * 4;
        let (mut low, mut high) = if self.ipv6_index > 0 {
            let prefix = u32::try_from(ip >> 112).ok()?;
            let index = self.ipv6_index + prefix * 8;
            (self.u32_at(index)?, self.u32_at(index + 4)?)
        } else {
            (0, self.ipv6_count)
        };

        while low <= high {
            let mid = (low + high) / 2;
            let row = self.ipv6_addr.checked_add(mid.checked_mul(row_size)?)?;
            let ip_from = self.u128_at(row)?;
            let ip_to = self.u128_at(row + row_size)?;
            if (ip_from..ip_to).contains(&ip) {
                return Some(self.record_at(row, 16));
            } else if ip < ip_from {
                high = mid.checked_sub(1)?;
            } else {
                low = mid + 1;
            }
        }
        None
    }

    /// Builds a record from the row at 1-based position `row`, whose first
    /// column (the range start) is `addr_width` bytes wide.
    fn record_at(&self, row: u32, addr_width: u32) -> ProxyRecord {
        let column = |positions: &[u32; 12]| -> String {
            let position = positions[self.db_type];
            if position == 0 {
                return String::new();
            }
            let offset = row + addr_width + 4 * (position - 2);
            match self.u32_at(offset) {
                Some(pointer) => self.str_at(pointer),
                None => String::new(),
            }
        };

        let raw_country = {
            let position = COUNTRY[self.db_type];
            let offset = row + addr_width + 4 * (position - 2);
            self.u32_at(offset)
        };
        let (country_short, country_long) = match raw_country {
            Some(pointer) => (self.str_at(pointer), self.str_at(pointer + 3)),
            None => (String::new(), String::new()),
        };

        let mut record = ProxyRecord {
            is_proxy: !country_short.is_empty() && country_short != "-",
            proxy_type: norm(column(&PROXY_TYPE)),
            country_short: norm(country_short),
            country_long: norm(country_long),
            region: norm(column(&REGION)),
            city: norm(column(&CITY)),
            isp: norm(column(&ISP)),
            domain: norm(column(&DOMAIN)),
            usage_type: norm(column(&USAGE_TYPE)),
            asn: norm(column(&ASN)),
            as_name: norm(column(&AS_NAME)),
            last_seen: column(&LAST_SEEN).parse().unwrap_or(0),
            threat: norm(column(&THREAT)),
        };
        if record.threat == "NOT SUPPORTED" {
            record.threat = String::new();
        }
        record
    }

    /// Reads a little-endian u32 at a 1-based file position.
    fn u32_at(&self, pos: u32) -> Option<u32> {
        let start = usize::try_from(pos).ok()?.checked_sub(1)?;
        let bytes = self.data.get(start..start + 4)?;
        Some(LittleEndian::read_u32(bytes))
    }

    /// Reads a little-endian u128 at a 1-based file position.
    fn u128_at(&self, pos: u32) -> Option<u128> {
        let start = usize::try_from(pos).ok()?.checked_sub(1)?;
        let bytes = self.data.get(start..start + 16)?;
        Some(LittleEndian::read_u128(bytes))
    }

    /// Reads a length-prefixed string at a 0-based pool offset.
    fn str_at(&self, offset: u32) -> String {
        let Ok(start) = usize::try_from(offset) else {
            return String::new();
        };
        let Some(&len) = self.data.get(start) else {
            return String::new();
        };
        match self.data.get(start + 1..start + 1 + usize::from(len)) {
            Some(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            None => String::new(),
        }
    }
}

/// The upstream `-` sentinel denotes an absent value.
fn norm(s: String) -> String {
    if s == "-" {
        String::new()
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    /// Assembles a tiny PX3 database (columns: range start, proxy type,
    /// country, region, city) with two real rows and a terminal row.
    fn fixture() -> Vec<u8> {
        const COLUMNS: u32 = 5;
        // Two real ranges plus the terminal row; the header count covers
        // only the real ranges.
        const REAL_ROWS: u32 = 2;
        const PHYSICAL_ROWS: u32 = 3;
        let rows_start = 64u32;
        let pool_start = rows_start + PHYSICAL_ROWS * COLUMNS * 4;

        let mut pool: Vec<u8> = Vec::new();
        let mut add_str = |s: &str| -> u32 {
            let offset = pool_start + u32::try_from(pool.len()).unwrap();
            pool.push(u8::try_from(s.len()).unwrap());
            pool.extend_from_slice(s.as_bytes());
            offset
        };

        // Country cells pack the short code and, three bytes later, the
        // long name.
        let us = add_str("US");
        assert_eq!(add_str("United States"), us + 3);
        let de = add_str("DE");
        assert_eq!(add_str("Germany"), de + 3);
        let vpn = add_str("VPN");
        let pub_ = add_str("PUB");
        let california = add_str("California");
        let berlin_region = add_str("Berlin");
        let los_angeles = add_str("Los Angeles");
        let berlin = add_str("Berlin");

        let mut data = vec![0u8; usize::try_from(rows_start).unwrap()];
        data[0] = 3; // PX3
        data[1] = u8::try_from(COLUMNS).unwrap();
        data[5..9].copy_from_slice(&REAL_ROWS.to_le_bytes());
        data[9..13].copy_from_slice(&(rows_start + 1).to_le_bytes()); // 1-based

        let mut row = |ip_from: u32, cells: [u32; 4]| {
            data.extend_from_slice(&ip_from.to_le_bytes());
            for cell in cells {
                data.extend_from_slice(&cell.to_le_bytes());
            }
        };
        // 1.0.0.0/24 and 1.0.1.0/24, then the terminal sentinel.
        row(0x0100_0000, [vpn, us, california, los_angeles]);
        row(0x0100_0100, [pub_, de, berlin_region, berlin]);
        row(u32::MAX, [0, 0, 0, 0]);

        data.extend_from_slice(&pool);
        data
    }

    fn open_fixture() -> (tempfile::TempDir, ProxyDatabase) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("px3.bin");
        let mut file = File::create(&path).unwrap();
        file.write_all(&fixture()).unwrap();
        drop(file);
        (dir, ProxyDatabase::open(&path).unwrap())
    }

    #[test]
    fn lookup_hits_the_covering_row() {
        let (_dir, db) = open_fixture();
        let record = db.lookup("1.0.0.7".parse().unwrap()).unwrap();
        assert!(record.is_proxy);
        assert_eq!(record.proxy_type, "VPN");
        assert_eq!(record.country_short, "US");
        assert_eq!(record.country_long, "United States");
        assert_eq!(record.region, "California");
        assert_eq!(record.city, "Los Angeles");
        // Columns beyond PX3 are absent.
        assert_eq!(record.isp, "");
        assert_eq!(record.asn, "");

        let record = db.lookup("1.0.1.255".parse().unwrap()).unwrap();
        assert_eq!(record.country_short, "DE");
        assert_eq!(record.proxy_type, "PUB");
    }

    #[test]
    fn lookup_misses_below_the_first_range() {
        let (_dir, db) = open_fixture();
        assert!(db.lookup("0.255.255.255".parse().unwrap()).is_none());
    }

    #[test]
    fn mapped_ipv6_addresses_use_the_ipv4_table() {
        let (_dir, db) = open_fixture();
        let record = db.lookup("::ffff:1.0.0.7".parse().unwrap()).unwrap();
        assert_eq!(record.country_short, "US");
    }

    #[test]
    fn truncated_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.bin");
        std::fs::write(&path, [0u8; 16]).unwrap();
        assert!(matches!(
            ProxyDatabase::open(&path),
            Err(BinError::Malformed(_))
        ));
    }
}
