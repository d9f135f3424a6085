//! Decode one argument descriptor into one trace line.
//!
//! The printer is pure apart from reads of the traced process's memory: it
//! takes a descriptor and the phase it is printed in and returns the text,
//! which the caller appends to the sink in one write.

use crate::memory::{self, ForeignMemory};
use crate::sink::Sink;
use crate::types::{
    ArgDescriptor, ArgMode, ArgType, HexStyle, Ordinal, Phase, ScalarKind, StructKind,
};

pub(crate) const NULL_MARKER: &str = "<null>";
pub(crate) const NYI_MARKER: &str = "<NYI>";
pub(crate) const UNREADABLE_MARKER: &str = "<unreadable>";

/// Byte size of the wide string header.
const WIDE_STRING_SIZE: usize = 16;
/// Byte size of the object attributes block.
const OBJECT_ATTRIBUTES_SIZE: usize = 48;
/// Byte size of the I/O status block.
const IO_STATUS_BLOCK_SIZE: usize = 16;

/// Decode `arg` and write it to `sink` as a single line.
pub(crate) fn print_arg(
    sink: &Sink,
    arg: &ArgDescriptor<'_>,
    phase: Phase,
    mem: &dyn ForeignMemory,
) -> std::io::Result<()> {
    sink.write_line(&format_arg(arg, phase, mem))
}

/// Render `arg` as `\t<position>: <value> (<annotation>)\n`.
pub(crate) fn format_arg(arg: &ArgDescriptor<'_>, phase: Phase, mem: &dyn ForeignMemory) -> String {
    let mut line = match arg.ordinal {
        Ordinal::Return => String::from("\tretval: "),
        Ordinal::Arg(n) => format!("\targ {}: ", n),
    };

    match arg.ty {
        ArgType::Scalar(kind) => line.push_str(&format_scalar(arg, kind, phase, mem)),
        ArgType::Structured(kind) => line.push_str(&format_structured(arg, kind, phase, mem)),
        ArgType::Unknown => line.push_str(NYI_MARKER),
    }

    line.push_str(" (");
    line.push_str(&annotation(arg));
    line.push_str(")\n");
    line
}

fn format_scalar(
    arg: &ArgDescriptor<'_>,
    kind: ScalarKind,
    phase: Phase,
    mem: &dyn ForeignMemory,
) -> String {
    let style = kind.style();
    if !arg.is_by_reference() {
        return style.format(arg.raw_value);
    }

    let mut out = HexStyle::Padded.format(arg.raw_value);
    if arg.contents_visible_in(phase)
        && let Some(value) = memory::read_word(mem, arg.raw_value, arg.size as usize)
    {
        out.push_str(" => ");
        out.push_str(&style.format(value));
    }
    out
}

fn format_structured(
    arg: &ArgDescriptor<'_>,
    kind: StructKind,
    phase: Phase,
    mem: &dyn ForeignMemory,
) -> String {
    let addr = arg.raw_value;
    if addr == 0 {
        return NULL_MARKER.to_string();
    }
    // An out-only block has not been filled in yet.
    if phase == Phase::Pre && !arg.mode.contains(ArgMode::INPUT) {
        return HexStyle::Padded.format(addr);
    }

    let decoded = match kind {
        StructKind::WideString => wide_string(mem, addr),
        StructKind::ObjectAttributes => object_attributes(mem, addr),
        StructKind::IoStatusBlock => io_status_block(mem, addr),
        StructKind::LargeInteger => {
            memory::read_word(mem, addr, 8).map(|v| HexStyle::Padded.format(v))
        }
        StructKind::CString => memory::read_string(mem, addr).map(|s| format!("{:?}", s)),
    };
    decoded.unwrap_or_else(|| HexStyle::Padded.format(addr))
}

fn u16_at(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

fn u32_at(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn u64_at(buf: &[u8], at: usize) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(word)
}

/// `<len>/<max> "<text>"`, the text cut to the declared length.
fn wide_string(mem: &dyn ForeignMemory, addr: u64) -> Option<String> {
    let header = memory::read_array::<WIDE_STRING_SIZE>(mem, addr)?;
    let length = u16_at(&header, 0);
    let maximum = u16_at(&header, 2);
    let buffer = u64_at(&header, 8);

    let text = if buffer == 0 {
        NULL_MARKER.to_string()
    } else {
        let byte_len = usize::from(length) & !1;
        match memory::read_buffer(mem, buffer, byte_len) {
            Some(bytes) => {
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]]))
                    .collect();
                format!("{:?}", String::from_utf16_lossy(&units))
            }
            None => UNREADABLE_MARKER.to_string(),
        }
    };
    Some(format!("{}/{} {}", length, maximum, text))
}

fn object_attributes(mem: &dyn ForeignMemory, addr: u64) -> Option<String> {
    let block = memory::read_array::<OBJECT_ATTRIBUTES_SIZE>(mem, addr)?;
    let length = u32_at(&block, 0);
    let root = u64_at(&block, 8);
    let object_name = u64_at(&block, 16);
    let attributes = u32_at(&block, 24);
    let security_descriptor = u64_at(&block, 32);
    let security_qos = u64_at(&block, 40);

    let name = if object_name == 0 {
        NULL_MARKER.to_string()
    } else {
        wide_string(mem, object_name).unwrap_or_else(|| HexStyle::Padded.format(object_name))
    };

    Some(format!(
        "len={}, root={}, name={}, att={}, sd={}, sqos={}",
        HexStyle::Minimal.format(u64::from(length)),
        HexStyle::Minimal.format(root),
        name,
        HexStyle::Minimal.format(u64::from(attributes)),
        HexStyle::Padded.format(security_descriptor),
        HexStyle::Padded.format(security_qos),
    ))
}

fn io_status_block(mem: &dyn ForeignMemory, addr: u64) -> Option<String> {
    let block = memory::read_array::<IO_STATUS_BLOCK_SIZE>(mem, addr)?;
    Some(format!(
        "status={}, info={}",
        HexStyle::Minimal.format(u64::from(u32_at(&block, 0))),
        HexStyle::Minimal.format(u64_at(&block, 8)),
    ))
}

/// `name=<name>, type=<type>[*], size=<size>`
fn annotation(arg: &ArgDescriptor<'_>) -> String {
    let mut out = String::new();
    if let Some(name) = arg.name {
        out.push_str("name=");
        out.push_str(name);
        out.push_str(", ");
    }
    out.push_str("type=");
    match arg.type_name {
        Some(type_name) => {
            out.push_str(type_name);
            if !arg.mode.intersects(ArgMode::INLINED | ArgMode::RETVAL) {
                out.push('*');
            }
        }
        None => out.push_str("\"\""),
    }
    out.push_str(", size=");
    out.push_str(&HexStyle::Minimal.format(arg.size));
    out
}
