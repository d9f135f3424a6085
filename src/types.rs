//! Shared data types used across the tracer.
//!
//! Contains the argument descriptor handed to the printer ([`ArgDescriptor`],
//! [`ArgMode`], [`ArgType`]), the call [`Phase`], the per-thread interceptor
//! state ([`ProcessState`]), and the hex formatting helpers.

use std::sync::Arc;

use bitflags::bitflags;
use nix::unistd::Pid;

use crate::session::Session;

/// Bytes in one machine word of the traced process.
pub(crate) const WORD_SIZE: usize = std::mem::size_of::<u64>();

/// Which side of the kernel call a handler is running on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    Pre,
    Post,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Pre => f.write_str("pre-syscall"),
            Phase::Post => f.write_str("post-syscall"),
        }
    }
}

bitflags! {
    /// Direction and passing convention of one argument.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub(crate) struct ArgMode: u8 {
        const INPUT = 1 << 0;
        const OUTPUT = 1 << 1;
        /// `raw_value` is the value itself rather than its address.
        const INLINED = 1 << 2;
        const RETVAL = 1 << 3;
    }
}

/// Position of an argument in the call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Ordinal {
    Arg(u32),
    Return,
}

/// Kinds that fit in one machine word.
///
/// `Void`, `Bool`, `Int`, `Status` and `Atom` have no entry in the Linux
/// syscall table; the printer handles them for any other descriptor source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(dead_code)]
pub(crate) enum ScalarKind {
    Void,
    Pointer,
    Bool,
    Int,
    SignedInt,
    UnsignedInt,
    Handle,
    Status,
    Atom,
}

impl ScalarKind {
    pub(crate) fn style(self) -> HexStyle {
        match self {
            ScalarKind::Void | ScalarKind::Pointer => HexStyle::Padded,
            ScalarKind::Bool
            | ScalarKind::Int
            | ScalarKind::SignedInt
            | ScalarKind::UnsignedInt
            | ScalarKind::Handle
            | ScalarKind::Status
            | ScalarKind::Atom => HexStyle::Minimal,
        }
    }
}

/// Kinds whose contents live in the traced process and need decomposing.
///
/// The three NT layouts never appear in the Linux syscall table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(dead_code)]
pub(crate) enum StructKind {
    /// Counted UTF-16 string (`UNICODE_STRING` layout).
    WideString,
    /// `OBJECT_ATTRIBUTES` layout.
    ObjectAttributes,
    /// `IO_STATUS_BLOCK` layout.
    IoStatusBlock,
    /// 64-bit integer stored behind a pointer.
    LargeInteger,
    /// NUL-terminated narrow string.
    CString,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ArgType {
    Scalar(ScalarKind),
    Structured(StructKind),
    Unknown,
}

/// One argument (or the return value) of one call, for one phase.
///
/// Produced by the interception layer while iterating and dropped as soon as
/// the printer is done with it.
#[derive(Clone, Debug)]
pub(crate) struct ArgDescriptor<'a> {
    pub(crate) ordinal: Ordinal,
    pub(crate) ty: ArgType,
    pub(crate) mode: ArgMode,
    pub(crate) raw_value: u64,
    pub(crate) size: u64,
    pub(crate) valid: bool,
    pub(crate) name: Option<&'a str>,
    pub(crate) type_name: Option<&'a str>,
}

impl ArgDescriptor<'_> {
    /// True when `raw_value` is the address of the value, not the value.
    pub(crate) fn is_by_reference(&self) -> bool {
        !self.mode.intersects(ArgMode::INLINED | ArgMode::RETVAL)
    }

    /// Whether the handler for `phase` prints this descriptor at all.
    pub(crate) fn selected_in(&self, phase: Phase) -> bool {
        match phase {
            Phase::Pre => {
                !self.mode.contains(ArgMode::RETVAL)
                    && self.mode.intersects(ArgMode::INPUT | ArgMode::INLINED)
            }
            Phase::Post => self.mode.intersects(ArgMode::OUTPUT | ArgMode::RETVAL),
        }
    }

    /// Whether the memory behind `raw_value` holds meaningful data in `phase`.
    pub(crate) fn contents_visible_in(&self, phase: Phase) -> bool {
        match phase {
            Phase::Pre => self.mode.contains(ArgMode::INPUT),
            Phase::Post => self.mode.contains(ArgMode::OUTPUT),
        }
    }
}

/// Numeric rendering chosen by argument kind, never by value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum HexStyle {
    /// `0x` plus one full word of zero-padded digits.
    Padded,
    /// `0x` plus the shortest digit string.
    Minimal,
}

impl HexStyle {
    pub(crate) fn format(self, value: u64) -> String {
        match self {
            HexStyle::Padded => format!("{:#0width$x}", value, width = 2 + 2 * WORD_SIZE),
            HexStyle::Minimal => format!("{:#x}", value),
        }
    }
}

/// Per-thread interceptor state.
///
/// ptrace reports entry and exit as separate stops, so the syscall number
/// and argument registers seen at entry are kept until the matching exit.
pub(crate) struct ProcessState {
    pub(crate) in_syscall: bool,
    /// Whether the gate accepted the call currently in flight.
    pub(crate) traced: bool,
    pub(crate) last_syscall: u64,
    pub(crate) last_syscall_args: [u64; 6],
    pub(crate) session: Arc<Session>,
}

impl ProcessState {
    pub(crate) fn new(session: Arc<Session>) -> Self {
        ProcessState {
            in_syscall: false,
            traced: false,
            last_syscall: 0,
            last_syscall_args: [0; 6],
            session,
        }
    }
}

/// Threads that stopped before the fork/clone event naming their parent.
pub(crate) type ParkedPids = std::collections::HashSet<Pid>;

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(mode: ArgMode) -> ArgDescriptor<'static> {
        ArgDescriptor {
            ordinal: Ordinal::Arg(0),
            ty: ArgType::Scalar(ScalarKind::Int),
            mode,
            raw_value: 0,
            size: 4,
            valid: true,
            name: None,
            type_name: None,
        }
    }

    // HexStyle tests

    #[test]
    fn padded_is_one_full_word() {
        assert_eq!(HexStyle::Padded.format(0), "0x0000000000000000");
        assert_eq!(HexStyle::Padded.format(0x7ffd_1234), "0x000000007ffd1234");
        assert_eq!(HexStyle::Padded.format(u64::MAX), "0xffffffffffffffff");
    }

    #[test]
    fn minimal_has_no_padding() {
        assert_eq!(HexStyle::Minimal.format(0), "0x0");
        assert_eq!(HexStyle::Minimal.format(0x1c), "0x1c");
    }

    #[test]
    fn style_follows_kind() {
        assert_eq!(ScalarKind::Pointer.style(), HexStyle::Padded);
        assert_eq!(ScalarKind::Void.style(), HexStyle::Padded);
        assert_eq!(ScalarKind::Handle.style(), HexStyle::Minimal);
        assert_eq!(ScalarKind::Status.style(), HexStyle::Minimal);
        assert_eq!(ScalarKind::Bool.style(), HexStyle::Minimal);
    }

    // selection tests

    #[test]
    fn pre_selects_inputs_and_inlined_only() {
        assert!(descriptor(ArgMode::INPUT).selected_in(Phase::Pre));
        assert!(descriptor(ArgMode::INLINED | ArgMode::OUTPUT).selected_in(Phase::Pre));
        assert!(!descriptor(ArgMode::OUTPUT).selected_in(Phase::Pre));
        assert!(!descriptor(ArgMode::RETVAL).selected_in(Phase::Pre));
        assert!(!descriptor(ArgMode::RETVAL | ArgMode::INLINED).selected_in(Phase::Pre));
    }

    #[test]
    fn post_selects_outputs_and_retval() {
        assert!(descriptor(ArgMode::OUTPUT).selected_in(Phase::Post));
        assert!(descriptor(ArgMode::INPUT | ArgMode::OUTPUT).selected_in(Phase::Post));
        assert!(descriptor(ArgMode::RETVAL).selected_in(Phase::Post));
        assert!(!descriptor(ArgMode::INPUT | ArgMode::INLINED).selected_in(Phase::Post));
    }

    #[test]
    fn by_reference_excludes_inlined_and_retval() {
        assert!(descriptor(ArgMode::INPUT).is_by_reference());
        assert!(!descriptor(ArgMode::INPUT | ArgMode::INLINED).is_by_reference());
        assert!(!descriptor(ArgMode::RETVAL).is_by_reference());
    }
}
