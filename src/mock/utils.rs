// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Memory inspection helpers layered on the proxy.
// Author: Lukas Bower

use std::io::{self, Write};
use std::rc::Rc;

use anyhow::{anyhow, ensure, Result};

use super::proxy::MockProxy;
use crate::value::{expect_args, Command, Namespace, Value};

const HEXDUMP_WIDTH: usize = 16;
const REGDUMP_SPAN: u64 = 32;

/// Longest range, in bytes, a single dump command reads.
pub const MAX_DUMP_LEN: u64 = 1 << 20;

/// `hexdump`, `regdump` and alignment helpers bound as `utils`.
#[derive(Clone)]
pub struct MockUtils {
    entries: Rc<Vec<(String, Value)>>,
}

impl MockUtils {
    /// Build helpers that read through `proxy`.
    pub fn new(proxy: &MockProxy) -> Self {
        Self {
            entries: Rc::new(build_entries(proxy)),
        }
    }
}

impl Namespace for MockUtils {
    fn type_name(&self) -> &str {
        "utils"
    }

    fn entries(&self) -> Vec<(String, Value)> {
        self.entries.as_ref().clone()
    }
}

/// Classic 16-byte hexdump with offsets and an ASCII column.
pub fn write_hexdump(out: &mut dyn Write, data: &[u8]) -> io::Result<()> {
    for (line, chunk) in data.chunks(HEXDUMP_WIDTH).enumerate() {
        write!(out, "{:08x}  ", line * HEXDUMP_WIDTH)?;
        for index in 0..HEXDUMP_WIDTH {
            match chunk.get(index) {
                Some(byte) => write!(out, "{byte:02x} ")?,
                None => write!(out, "   ")?,
            }
        }
        let ascii: String = (0..HEXDUMP_WIDTH)
            .map(|index| chunk.get(index).map_or(' ', |byte| printable(*byte)))
            .collect();
        writeln!(out, " {ascii}")?;
    }
    Ok(())
}

/// One line per 32 bytes: the address, then eight 32-bit words.
pub fn write_regdump(out: &mut dyn Write, addr: u64, words: &[u32]) -> io::Result<()> {
    for (line, chunk) in words.chunks(8).enumerate() {
        write!(out, "{:016x}  ", addr.wrapping_add(line as u64 * REGDUMP_SPAN))?;
        for word in chunk {
            write!(out, "{word:08x} ")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Round `value` up to a multiple of the power-of-two `align`.
pub fn align_up(value: u64, align: u64) -> Result<u64> {
    check_align(align)?;
    value
        .checked_add(align - 1)
        .map(|sum| sum & !(align - 1))
        .ok_or_else(|| anyhow!("{value:#x} cannot be aligned up to {align:#x}"))
}

/// Round `value` down to a multiple of the power-of-two `align`.
pub fn align_down(value: u64, align: u64) -> Result<u64> {
    check_align(align)?;
    Ok(value & !(align - 1))
}

fn check_align(align: u64) -> Result<()> {
    ensure!(
        align.is_power_of_two(),
        "alignment {align:#x} is not a power of two"
    );
    Ok(())
}

fn printable(byte: u8) -> char {
    if (0x20..=0x7e).contains(&byte) {
        char::from(byte)
    } else {
        '.'
    }
}

fn check_dump_len(len: u64) -> Result<()> {
    ensure!(
        len <= MAX_DUMP_LEN,
        "dump length {len:#x} exceeds the {MAX_DUMP_LEN:#x}-byte limit"
    );
    Ok(())
}

fn read_bytes(proxy: &MockProxy, addr: u64, len: u64) -> Result<Vec<u8>> {
    check_dump_len(len)?;
    (0..len)
        .map(|offset| {
            let byte_addr = addr
                .checked_add(offset)
                .ok_or_else(|| anyhow!("hexdump range at {addr:#x} overflows"))?;
            Ok(proxy.read(byte_addr, 8)? as u8)
        })
        .collect()
}

fn read_words(proxy: &MockProxy, addr: u64, len: u64) -> Result<Vec<u32>> {
    check_dump_len(len)?;
    let words = len
        .div_ceil(REGDUMP_SPAN)
        .checked_mul(REGDUMP_SPAN / 4)
        .ok_or_else(|| anyhow!("regdump length {len:#x} overflows"))?;
    (0..words)
        .map(|index| {
            let word_addr = index
                .checked_mul(4)
                .and_then(|offset| addr.checked_add(offset))
                .ok_or_else(|| anyhow!("regdump range at {addr:#x} overflows"))?;
            Ok(proxy.read(word_addr, 32)? as u32)
        })
        .collect()
}

fn build_entries(proxy: &MockProxy) -> Vec<(String, Value)> {
    let reader = proxy.clone();
    let hexdump = Command::new("hexdump", move |out, args| {
        let [addr, len] = expect_args::<2>("hexdump", args)?;
        let data = read_bytes(&reader, addr.expect_u64("address")?, len.expect_u64("length")?)?;
        write_hexdump(out, &data)?;
        Ok(Value::None)
    });

    let reader = proxy.clone();
    let regdump = Command::new("regdump", move |out, args| {
        let [addr, len] = expect_args::<2>("regdump", args)?;
        let addr = addr.expect_u64("address")?;
        let words = read_words(&reader, addr, len.expect_u64("length")?)?;
        write_regdump(out, addr, &words)?;
        Ok(Value::None)
    });

    let up = Command::new("align_up", |_, args| {
        let [value, align] = expect_args::<2>("align_up", args)?;
        Ok(align_up(value.expect_u64("value")?, align.expect_u64("alignment")?)?.into())
    });
    let down = Command::new("align_down", |_, args| {
        let [value, align] = expect_args::<2>("align_down", args)?;
        Ok(align_down(value.expect_u64("value")?, align.expect_u64("alignment")?)?.into())
    });

    vec![
        ("align_down".to_owned(), down.into()),
        ("align_up".to_owned(), up.into()),
        ("hexdump".to_owned(), hexdump.into()),
        ("regdump".to_owned(), regdump.into()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hexdump(data: &[u8]) -> String {
        let mut out = Vec::new();
        write_hexdump(&mut out, data).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn command(utils: &MockUtils, name: &str) -> Command {
        let Some(Value::Command(command)) = utils.attr(name) else {
            panic!("missing command {name}");
        };
        command
    }

    #[test]
    fn hexdump_pads_the_last_line() {
        let dump = hexdump(b"Hello, proxy!\n\x00\xffAB");
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "00000000  48 65 6c 6c 6f 2c 20 70 72 6f 78 79 21 0a 00 ff  Hello, proxy!..."
        );
        assert_eq!(
            lines[1],
            format!("00000010  41 42 {} AB{}", "   ".repeat(14), " ".repeat(14))
        );
    }

    #[test]
    fn regdump_lists_eight_words_per_line() {
        let words: Vec<u32> = (0..16).collect();
        let mut out = Vec::new();
        write_regdump(&mut out, 0x1000, &words).unwrap();
        let dump = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(
            lines[0],
            "0000000000001000  00000000 00000001 00000002 00000003 00000004 00000005 00000006 00000007 "
        );
        assert!(lines[1].starts_with("0000000000001020  00000008 "));
    }

    #[test]
    fn regdump_reads_whole_lines() {
        let proxy = MockProxy::new();
        proxy.write(0x204, 32, 0xdead_beef).unwrap();
        let words = read_words(&proxy, 0x200, 4).unwrap();
        assert_eq!(words.len(), 8);
        assert_eq!(words[1], 0xdead_beef);
    }

    #[test]
    fn dump_commands_write_to_the_session_writer() {
        let proxy = MockProxy::new();
        proxy.write(0x40, 32, 0x6463_6261).unwrap();
        let utils = MockUtils::new(&proxy);
        let mut out = Vec::new();
        let result = command(&utils, "hexdump")
            .call(&mut out, &[Value::Int(0x40), Value::Int(4)])
            .unwrap();
        assert_eq!(result, Value::None);
        let dump = String::from_utf8(out).unwrap();
        assert!(dump.starts_with("00000000  61 62 63 64 "), "{dump:?}");
        assert!(dump.trim_end().ends_with("abcd"));
    }

    #[test]
    fn oversized_dumps_are_rejected() {
        let utils = MockUtils::new(&MockProxy::new());
        let huge = Value::from(u64::MAX);
        for name in ["hexdump", "regdump"] {
            let mut out = Vec::new();
            let err = command(&utils, name)
                .call(&mut out, &[Value::Int(0), huge.clone()])
                .unwrap_err();
            assert!(err.to_string().contains(name), "{name}: {err}");
            assert!(out.is_empty());
        }
        assert!(read_words(&MockProxy::new(), 0, MAX_DUMP_LEN + 1).is_err());
        assert!(read_bytes(&MockProxy::new(), u64::MAX, 2).is_err());
    }

    #[test]
    fn alignment_helpers() {
        assert_eq!(align_up(0x1001, 0x1000).unwrap(), 0x2000);
        assert_eq!(align_up(0x1000, 0x1000).unwrap(), 0x1000);
        assert_eq!(align_down(0x1fff, 0x1000).unwrap(), 0x1000);
        assert!(align_up(1, 3).is_err());
        assert!(align_up(u64::MAX, 0x10).is_err());
    }
}
