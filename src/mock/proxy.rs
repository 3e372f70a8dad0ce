// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: In-memory stand-in for the hardware proxy.
// Author: Lukas Bower

//! In-memory stand-in for the hardware proxy.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::{ensure, Result};
use log::trace;

use crate::exit::EvalResult;
use crate::value::{expect_args, Command, Namespace, Value};

/// Value of the `base` attribute.
pub const DEFAULT_BASE: u64 = 0x8_0000_0000;

/// Access widths supported by the read and write commands.
pub const ACCESS_WIDTHS: [u32; 4] = [8, 16, 32, 64];

#[derive(Debug, Default)]
struct ProxyState {
    memory: RefCell<BTreeMap<u64, u8>>,
    sysregs: RefCell<BTreeMap<u64, u64>>,
}

/// Sparse little-endian memory and a system-register file.
///
/// Clones share state, so the utility and monitor collaborators observe writes
/// made through the proxy.
#[derive(Clone)]
pub struct MockProxy {
    state: Rc<ProxyState>,
    base: u64,
    entries: Rc<Vec<(String, Value)>>,
}

impl MockProxy {
    /// Create a proxy with zeroed memory and registers.
    pub fn new() -> Self {
        Self::with_base(DEFAULT_BASE)
    }

    /// Create a proxy reporting `base` as its memory base.
    pub fn with_base(base: u64) -> Self {
        let state = Rc::new(ProxyState::default());
        let entries = Rc::new(build_entries(&state, base));
        Self {
            state,
            base,
            entries,
        }
    }

    /// Base address reported to the console.
    #[must_use]
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Read a `bits`-wide little-endian word.
    pub fn read(&self, addr: u64, bits: u32) -> Result<u64> {
        read(&self.state, addr, bits)
    }

    /// Write a `bits`-wide little-endian word.
    pub fn write(&self, addr: u64, bits: u32, value: u64) -> Result<()> {
        write(&self.state, addr, bits, value)
    }

    /// Read a system register; unset registers read as zero.
    #[must_use]
    pub fn mrs(&self, reg: u64) -> u64 {
        self.state.sysregs.borrow().get(&reg).copied().unwrap_or(0)
    }

    /// Write a system register.
    pub fn msr(&self, reg: u64, value: u64) {
        self.state.sysregs.borrow_mut().insert(reg, value);
    }
}

impl Default for MockProxy {
    fn default() -> Self {
        Self::new()
    }
}

impl Namespace for MockProxy {
    fn type_name(&self) -> &str {
        "proxy"
    }

    fn entries(&self) -> Vec<(String, Value)> {
        self.entries.as_ref().clone()
    }
}

fn check_access(addr: u64, bits: u32) -> Result<usize> {
    ensure!(ACCESS_WIDTHS.contains(&bits), "unsupported access width {bits}");
    let bytes = (bits / 8) as usize;
    ensure!(
        addr % bytes as u64 == 0,
        "unaligned {bits}-bit access at {addr:#x}"
    );
    ensure!(
        addr.checked_add(bytes as u64 - 1).is_some(),
        "{bits}-bit access at {addr:#x} wraps the address space"
    );
    Ok(bytes)
}

fn read(state: &ProxyState, addr: u64, bits: u32) -> Result<u64> {
    let bytes = check_access(addr, bits)?;
    let memory = state.memory.borrow();
    let value = (0..bytes).rev().fold(0u64, |acc, index| {
        let byte = memory.get(&(addr + index as u64)).copied().unwrap_or(0);
        (acc << 8) | u64::from(byte)
    });
    trace!("read{bits}({addr:#x}) = {value:#x}");
    Ok(value)
}

fn write(state: &ProxyState, addr: u64, bits: u32, value: u64) -> Result<()> {
    let bytes = check_access(addr, bits)?;
    ensure!(
        bits == 64 || value >> bits == 0,
        "value {value:#x} does not fit in {bits} bits"
    );
    let mut memory = state.memory.borrow_mut();
    for (index, byte) in value.to_le_bytes().into_iter().take(bytes).enumerate() {
        memory.insert(addr + index as u64, byte);
    }
    trace!("write{bits}({addr:#x}, {value:#x})");
    Ok(())
}

fn build_entries(state: &Rc<ProxyState>, base: u64) -> Vec<(String, Value)> {
    let mut entries = vec![("base".to_owned(), Value::from(base))];
    for bits in ACCESS_WIDTHS {
        let name = format!("read{bits}");
        let (shared, label) = (Rc::clone(state), name.clone());
        let command = Command::new(&name, move |_, args| {
            let [addr] = expect_args::<1>(&label, args)?;
            Ok(read(&shared, addr.expect_u64("address")?, bits)?.into())
        });
        entries.push((name, command.into()));

        let name = format!("write{bits}");
        let (shared, label) = (Rc::clone(state), name.clone());
        let command = Command::new(&name, move |_, args| {
            let [addr, value] = expect_args::<2>(&label, args)?;
            write(
                &shared,
                addr.expect_u64("address")?,
                bits,
                value.expect_u64("value")?,
            )?;
            Ok(Value::None)
        });
        entries.push((name, command.into()));
    }

    entries.push(update32(state, "set32", |old, bits| old | bits));
    entries.push(update32(state, "clear32", |old, bits| old & !bits));

    let shared = Rc::clone(state);
    entries.push((
        "mask32".to_owned(),
        Command::new("mask32", move |_, args| {
            let [addr, clear, set] = expect_args::<3>("mask32", args)?;
            let addr = addr.expect_u64("address")?;
            let clear = clear.expect_u64("clear mask")?;
            let set = set.expect_u64("set mask")?;
            let old = read(&shared, addr, 32)?;
            write(&shared, addr, 32, ((old & !clear) | set) & 0xffff_ffff)?;
            Ok(Value::None)
        })
        .into(),
    ));

    let shared = Rc::clone(state);
    entries.push((
        "mrs".to_owned(),
        Command::new("mrs", move |_, args| {
            let [reg] = expect_args::<1>("mrs", args)?;
            let reg = reg.expect_u64("register")?;
            let value = shared.sysregs.borrow().get(&reg).copied().unwrap_or(0);
            Ok(value.into())
        })
        .into(),
    ));

    let shared = Rc::clone(state);
    entries.push((
        "msr".to_owned(),
        Command::new("msr", move |_, args| {
            let [reg, value] = expect_args::<2>("msr", args)?;
            shared
                .sysregs
                .borrow_mut()
                .insert(reg.expect_u64("register")?, value.expect_u64("value")?);
            Ok(Value::None)
        })
        .into(),
    ));

    entries.push((
        "nop".to_owned(),
        Command::new("nop", |_, args| {
            expect_args::<0>("nop", args)?;
            Ok(Value::None)
        })
        .into(),
    ));
    entries
}

fn update32(
    state: &Rc<ProxyState>,
    name: &'static str,
    apply: fn(u64, u64) -> u64,
) -> (String, Value) {
    let shared = Rc::clone(state);
    let command = Command::new(name, move |_, args| -> EvalResult<Value> {
        let [addr, bits] = expect_args::<2>(name, args)?;
        let addr = addr.expect_u64("address")?;
        let old = read(&shared, addr, 32)?;
        write(
            &shared,
            addr,
            32,
            apply(old, bits.expect_u64("mask")?) & 0xffff_ffff,
        )?;
        Ok(Value::None)
    });
    (name.to_owned(), command.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(proxy: &MockProxy, name: &str, args: &[Value]) -> EvalResult<Value> {
        let Some(Value::Command(command)) = proxy.attr(name) else {
            panic!("missing command {name}");
        };
        command.call(&mut std::io::sink(), args)
    }

    #[test]
    fn words_are_little_endian() {
        let proxy = MockProxy::new();
        proxy.write(0x100, 32, 0x1122_3344).unwrap();
        assert_eq!(proxy.read(0x100, 8).unwrap(), 0x44);
        assert_eq!(proxy.read(0x102, 16).unwrap(), 0x1122);
        assert_eq!(proxy.read(0x100, 64).unwrap(), 0x1122_3344);
    }

    #[test]
    fn rejects_bad_accesses() {
        let proxy = MockProxy::new();
        assert!(proxy.read(0x101, 32).is_err());
        assert!(proxy.write(0x100, 8, 0x100).is_err());
        assert!(proxy.read(0x100, 12).is_err());
        assert!(proxy.read(u64::MAX - 3, 64).is_err());
    }

    #[test]
    fn commands_share_state_across_clones() {
        let proxy = MockProxy::new();
        let clone = proxy.clone();
        call(&proxy, "write32", &[Value::Int(0x40), Value::Int(0xf0)]).unwrap();
        call(&clone, "set32", &[Value::Int(0x40), Value::Int(0x0f)]).unwrap();
        call(&clone, "clear32", &[Value::Int(0x40), Value::Int(0x30)]).unwrap();
        assert_eq!(
            call(&proxy, "read32", &[Value::Int(0x40)]).unwrap(),
            Value::Int(0xcf)
        );
        call(&proxy, "mask32", &[0x40u64.into(), 0xffu64.into(), 0x5au64.into()]).unwrap();
        assert_eq!(proxy.read(0x40, 32).unwrap(), 0x5a);
    }

    #[test]
    fn system_registers_round_trip() {
        let proxy = MockProxy::new();
        call(&proxy, "msr", &[Value::Int(0x18_0000), Value::Int(7)]).unwrap();
        assert_eq!(
            call(&proxy, "mrs", &[Value::Int(0x18_0000)]).unwrap(),
            Value::Int(7)
        );
        assert_eq!(proxy.mrs(0x18_1000), 0);
    }

    #[test]
    fn base_is_a_plain_attribute() {
        let proxy = MockProxy::with_base(0x1000);
        assert_eq!(proxy.attr("base"), Some(Value::Int(0x1000)));
        assert!(call(&proxy, "nop", &[Value::Int(1)]).is_err());
    }
}
