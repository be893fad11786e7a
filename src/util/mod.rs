//! util — общие мелкие хелперы CLI и бэкендов.
//!
//! Содержит:
//! - now_unix(): текущее Unix-время в секундах;
//! - hex_dump()/display_text(): вывод сырых байтов;
//! - parse_u8_byte(): разбор байта (dec/0x/0o/0b) для clap.

/// Текущее Unix-время в секундах (0, если часы раньше эпохи).
#[inline]
pub fn now_unix() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// 16 байт на строку, с offset’ом слева.
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (row, chunk) in bytes.chunks(16).enumerate() {
        if row > 0 {
            out.push('\n');
        }
        out.push_str(&format!("{:06x}:", row * 16));
        for b in chunk {
            out.push_str(&format!(" {:02x}", b));
        }
    }
    out
}

pub fn display_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => format!("(binary {} B)", bytes.len()),
    }
}

pub fn parse_u8_byte(s: &str) -> Result<u8, String> {
    let s = s.trim();
    if let Some(x) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(x, 16).map_err(|e| e.to_string())
    } else if let Some(x) = s.strip_prefix("0o").or_else(|| s.strip_prefix("0O")) {
        u8::from_str_radix(x, 8).map_err(|e| e.to_string())
    } else if let Some(x) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        u8::from_str_radix(x, 2).map_err(|e| e.to_string())
    } else {
        s.parse::<u8>().map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_byte_literals() {
        assert_eq!(parse_u8_byte("0xff"), Ok(0xFF));
        assert_eq!(parse_u8_byte(" 0b101 "), Ok(5));
        assert_eq!(parse_u8_byte("0o17"), Ok(15));
        assert_eq!(parse_u8_byte("42"), Ok(42));
        assert!(parse_u8_byte("256").is_err());
        assert!(parse_u8_byte("0xzz").is_err());
    }

    #[test]
    fn hex_dump_rows() {
        let data: Vec<u8> = (0u8..18).collect();
        let d = hex_dump(&data);
        let lines: Vec<&str> = d.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("000000: 00 01"));
        assert_eq!(lines[1], "000010: 10 11");
    }

    #[test]
    fn display_text_falls_back_for_binary() {
        assert_eq!(display_text(b"hi"), "hi");
        assert_eq!(display_text(&[0xff, 0xfe]), "(binary 2 B)");
    }
}
