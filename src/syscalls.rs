//! x86-64 Linux syscall names and argument signatures.
//!
//! [`name`] covers the syscalls a typical program makes; [`signature`]
//! describes the arguments of a subset of them. A syscall with a name but no
//! signature is traced with its details marked unknown.

use crate::types::{ArgMode, ArgType, ScalarKind, StructKind};

/// Declared shape of one argument.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ArgSpec {
    pub(crate) name: &'static str,
    pub(crate) type_name: &'static str,
    pub(crate) ty: ArgType,
    pub(crate) mode: ArgMode,
    pub(crate) size: u64,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct RetSpec {
    pub(crate) type_name: &'static str,
    pub(crate) ty: ArgType,
}

#[derive(Debug)]
pub(crate) struct Signature {
    pub(crate) args: &'static [ArgSpec],
    pub(crate) ret: RetSpec,
}

const IN: ArgMode = ArgMode::INPUT.union(ArgMode::INLINED);
const INOUT: ArgMode = ArgMode::INPUT.union(ArgMode::OUTPUT);

const fn arg(
    name: &'static str,
    type_name: &'static str,
    ty: ArgType,
    mode: ArgMode,
    size: u64,
) -> ArgSpec {
    ArgSpec {
        name,
        type_name,
        ty,
        mode,
        size,
    }
}

const fn fd(name: &'static str) -> ArgSpec {
    arg(name, "int", ArgType::Scalar(ScalarKind::Handle), IN, 4)
}

const fn int(name: &'static str) -> ArgSpec {
    arg(name, "int", ArgType::Scalar(ScalarKind::SignedInt), IN, 4)
}

const fn uint(name: &'static str, type_name: &'static str) -> ArgSpec {
    arg(name, type_name, ArgType::Scalar(ScalarKind::UnsignedInt), IN, 4)
}

const fn long(name: &'static str, type_name: &'static str) -> ArgSpec {
    arg(name, type_name, ArgType::Scalar(ScalarKind::SignedInt), IN, 8)
}

const fn ulong(name: &'static str, type_name: &'static str) -> ArgSpec {
    arg(name, type_name, ArgType::Scalar(ScalarKind::UnsignedInt), IN, 8)
}

/// A pointer printed as an address, never followed.
const fn addr(name: &'static str) -> ArgSpec {
    arg(name, "void*", ArgType::Scalar(ScalarKind::Pointer), IN, 8)
}

/// NUL-terminated input string; variable length, so no declared size.
const fn path(name: &'static str) -> ArgSpec {
    arg(name, "char", ArgType::Structured(StructKind::CString), ArgMode::INPUT, 0)
}

/// A word-sized value behind a pointer.
const fn word_ref(name: &'static str, type_name: &'static str, mode: ArgMode, size: u64) -> ArgSpec {
    arg(name, type_name, ArgType::Scalar(ScalarKind::UnsignedInt), mode, size)
}

const fn offset_ref(name: &'static str, type_name: &'static str) -> ArgSpec {
    arg(name, type_name, ArgType::Structured(StructKind::LargeInteger), INOUT, 8)
}

/// A structure this tracer does not decode.
const fn opaque(name: &'static str, type_name: &'static str, mode: ArgMode, size: u64) -> ArgSpec {
    arg(name, type_name, ArgType::Unknown, mode, size)
}

const RET_INT: RetSpec = RetSpec {
    type_name: "int",
    ty: ArgType::Scalar(ScalarKind::SignedInt),
};
const RET_LONG: RetSpec = RetSpec {
    type_name: "long",
    ty: ArgType::Scalar(ScalarKind::SignedInt),
};
const RET_SSIZE: RetSpec = RetSpec {
    type_name: "ssize_t",
    ty: ArgType::Scalar(ScalarKind::SignedInt),
};
const RET_FD: RetSpec = RetSpec {
    type_name: "int",
    ty: ArgType::Scalar(ScalarKind::Handle),
};
const RET_PID: RetSpec = RetSpec {
    type_name: "pid_t",
    ty: ArgType::Scalar(ScalarKind::SignedInt),
};
const RET_OFF: RetSpec = RetSpec {
    type_name: "off_t",
    ty: ArgType::Scalar(ScalarKind::SignedInt),
};
const RET_UINT: RetSpec = RetSpec {
    type_name: "unsigned int",
    ty: ArgType::Scalar(ScalarKind::UnsignedInt),
};
const RET_PTR: RetSpec = RetSpec {
    type_name: "void*",
    ty: ArgType::Scalar(ScalarKind::Pointer),
};

const STAT: ArgSpec = opaque("statbuf", "struct stat", ArgMode::OUTPUT, 144);
const TIMESPEC_IN: ArgSpec = opaque("timeout", "struct timespec", ArgMode::INPUT, 16);

const READ: Signature = Signature {
    args: &[fd("fd"), addr("buf"), ulong("count", "size_t")],
    ret: RET_SSIZE,
};
const WRITE: Signature = READ;
const OPEN: Signature = Signature {
    args: &[path("pathname"), int("flags"), uint("mode", "mode_t")],
    ret: RET_FD,
};
const CLOSE: Signature = Signature {
    args: &[fd("fd")],
    ret: RET_INT,
};
const STAT_PATH: Signature = Signature {
    args: &[path("pathname"), STAT],
    ret: RET_INT,
};
const FSTAT: Signature = Signature {
    args: &[fd("fd"), STAT],
    ret: RET_INT,
};
const POLL: Signature = Signature {
    args: &[
        opaque("fds", "struct pollfd", INOUT, 8),
        ulong("nfds", "nfds_t"),
        int("timeout"),
    ],
    ret: RET_INT,
};
const LSEEK: Signature = Signature {
    args: &[fd("fd"), long("offset", "off_t"), int("whence")],
    ret: RET_OFF,
};
const MMAP: Signature = Signature {
    args: &[
        addr("addr"),
        ulong("length", "size_t"),
        int("prot"),
        int("flags"),
        fd("fd"),
        long("offset", "off_t"),
    ],
    ret: RET_PTR,
};
const MPROTECT: Signature = Signature {
    args: &[addr("addr"), ulong("len", "size_t"), int("prot")],
    ret: RET_INT,
};
const MUNMAP: Signature = Signature {
    args: &[addr("addr"), ulong("length", "size_t")],
    ret: RET_INT,
};
const BRK: Signature = Signature {
    args: &[addr("addr")],
    ret: RET_PTR,
};
const RT_SIGACTION: Signature = Signature {
    args: &[
        int("signum"),
        opaque("act", "struct sigaction", ArgMode::INPUT, 32),
        opaque("oldact", "struct sigaction", ArgMode::OUTPUT, 32),
        ulong("sigsetsize", "size_t"),
    ],
    ret: RET_INT,
};
const RT_SIGPROCMASK: Signature = Signature {
    args: &[
        int("how"),
        word_ref("set", "sigset_t", ArgMode::INPUT, 8),
        word_ref("oldset", "sigset_t", ArgMode::OUTPUT, 8),
        ulong("sigsetsize", "size_t"),
    ],
    ret: RET_INT,
};
const IOCTL: Signature = Signature {
    args: &[fd("fd"), ulong("request", "unsigned long"), addr("argp")],
    ret: RET_INT,
};
const PREAD64: Signature = Signature {
    args: &[
        fd("fd"),
        addr("buf"),
        ulong("count", "size_t"),
        long("offset", "off_t"),
    ],
    ret: RET_SSIZE,
};
const PWRITE64: Signature = PREAD64;
const ACCESS: Signature = Signature {
    args: &[path("pathname"), int("mode")],
    ret: RET_INT,
};
const PIPE: Signature = Signature {
    args: &[opaque("pipefd", "int[2]", ArgMode::OUTPUT, 8)],
    ret: RET_INT,
};
const PIPE2: Signature = Signature {
    args: &[opaque("pipefd", "int[2]", ArgMode::OUTPUT, 8), int("flags")],
    ret: RET_INT,
};
const NO_ARGS_INT: Signature = Signature {
    args: &[],
    ret: RET_INT,
};
const NO_ARGS_PID: Signature = Signature {
    args: &[],
    ret: RET_PID,
};
const NO_ARGS_UINT: Signature = Signature {
    args: &[],
    ret: RET_UINT,
};
const DUP: Signature = Signature {
    args: &[fd("oldfd")],
    ret: RET_FD,
};
const DUP2: Signature = Signature {
    args: &[fd("oldfd"), fd("newfd")],
    ret: RET_FD,
};
const DUP3: Signature = Signature {
    args: &[fd("oldfd"), fd("newfd"), int("flags")],
    ret: RET_FD,
};
const NANOSLEEP: Signature = Signature {
    args: &[
        opaque("req", "struct timespec", ArgMode::INPUT, 16),
        opaque("rem", "struct timespec", ArgMode::OUTPUT, 16),
    ],
    ret: RET_INT,
};
const SENDFILE: Signature = Signature {
    args: &[
        fd("out_fd"),
        fd("in_fd"),
        offset_ref("offset", "off_t"),
        ulong("count", "size_t"),
    ],
    ret: RET_SSIZE,
};
const SOCKET: Signature = Signature {
    args: &[int("domain"), int("type"), int("protocol")],
    ret: RET_FD,
};
const CONNECT: Signature = Signature {
    args: &[
        fd("sockfd"),
        opaque("addr", "struct sockaddr", ArgMode::INPUT, 16),
        uint("addrlen", "socklen_t"),
    ],
    ret: RET_INT,
};
const BIND: Signature = CONNECT;
const ACCEPT: Signature = Signature {
    args: &[
        fd("sockfd"),
        opaque("addr", "struct sockaddr", ArgMode::OUTPUT, 16),
        word_ref("addrlen", "socklen_t", INOUT, 4),
    ],
    ret: RET_FD,
};
const ACCEPT4: Signature = Signature {
    args: &[
        fd("sockfd"),
        opaque("addr", "struct sockaddr", ArgMode::OUTPUT, 16),
        word_ref("addrlen", "socklen_t", INOUT, 4),
        int("flags"),
    ],
    ret: RET_FD,
};
const LISTEN: Signature = Signature {
    args: &[fd("sockfd"), int("backlog")],
    ret: RET_INT,
};
const CLONE: Signature = Signature {
    args: &[
        ulong("flags", "unsigned long"),
        addr("stack"),
        addr("parent_tid"),
        addr("child_tid"),
        ulong("tls", "unsigned long"),
    ],
    ret: RET_PID,
};
const EXECVE: Signature = Signature {
    args: &[
        path("pathname"),
        opaque("argv", "char*[]", ArgMode::INPUT, 8),
        opaque("envp", "char*[]", ArgMode::INPUT, 8),
    ],
    ret: RET_INT,
};
const EXIT: Signature = Signature {
    args: &[int("status")],
    ret: RET_LONG,
};
const WAIT4: Signature = Signature {
    args: &[
        long("pid", "pid_t"),
        arg(
            "wstatus",
            "int",
            ArgType::Scalar(ScalarKind::SignedInt),
            ArgMode::OUTPUT,
            4,
        ),
        int("options"),
        opaque("rusage", "struct rusage", ArgMode::OUTPUT, 144),
    ],
    ret: RET_PID,
};
const KILL: Signature = Signature {
    args: &[long("pid", "pid_t"), int("sig")],
    ret: RET_INT,
};
const UNAME: Signature = Signature {
    args: &[opaque("buf", "struct utsname", ArgMode::OUTPUT, 390)],
    ret: RET_INT,
};
const FCNTL: Signature = Signature {
    args: &[fd("fd"), int("cmd"), ulong("arg", "unsigned long")],
    ret: RET_INT,
};
const FD_ONLY: Signature = Signature {
    args: &[fd("fd")],
    ret: RET_INT,
};
const TRUNCATE: Signature = Signature {
    args: &[path("path"), long("length", "off_t")],
    ret: RET_INT,
};
const FTRUNCATE: Signature = Signature {
    args: &[fd("fd"), long("length", "off_t")],
    ret: RET_INT,
};
const GETCWD: Signature = Signature {
    args: &[addr("buf"), ulong("size", "size_t")],
    ret: RET_LONG,
};
const PATH_ONLY: Signature = Signature {
    args: &[path("pathname")],
    ret: RET_INT,
};
const RENAME: Signature = Signature {
    args: &[path("oldpath"), path("newpath")],
    ret: RET_INT,
};
const PATH_MODE: Signature = Signature {
    args: &[path("pathname"), uint("mode", "mode_t")],
    ret: RET_INT,
};
const FCHMOD: Signature = Signature {
    args: &[fd("fd"), uint("mode", "mode_t")],
    ret: RET_INT,
};
const READLINK: Signature = Signature {
    args: &[path("pathname"), addr("buf"), ulong("bufsiz", "size_t")],
    ret: RET_SSIZE,
};
const UMASK: Signature = Signature {
    args: &[uint("mask", "mode_t")],
    ret: RET_UINT,
};
const ARCH_PRCTL: Signature = Signature {
    args: &[int("code"), ulong("addr", "unsigned long")],
    ret: RET_INT,
};
const FUTEX: Signature = Signature {
    args: &[
        arg(
            "uaddr",
            "int",
            ArgType::Scalar(ScalarKind::SignedInt),
            ArgMode::INPUT,
            4,
        ),
        int("futex_op"),
        uint("val", "uint32_t"),
        TIMESPEC_IN,
        addr("uaddr2"),
        uint("val3", "uint32_t"),
    ],
    ret: RET_LONG,
};
const GETDENTS64: Signature = Signature {
    args: &[fd("fd"), addr("dirp"), uint("count", "unsigned int")],
    ret: RET_SSIZE,
};
const SET_TID_ADDRESS: Signature = Signature {
    args: &[addr("tidptr")],
    ret: RET_PID,
};
const CLOCK_GETTIME: Signature = Signature {
    args: &[
        int("clockid"),
        opaque("tp", "struct timespec", ArgMode::OUTPUT, 16),
    ],
    ret: RET_INT,
};
const OPENAT: Signature = Signature {
    args: &[
        fd("dirfd"),
        path("pathname"),
        int("flags"),
        uint("mode", "mode_t"),
    ],
    ret: RET_FD,
};
const MKDIRAT: Signature = Signature {
    args: &[fd("dirfd"), path("pathname"), uint("mode", "mode_t")],
    ret: RET_INT,
};
const NEWFSTATAT: Signature = Signature {
    args: &[fd("dirfd"), path("pathname"), STAT, int("flags")],
    ret: RET_INT,
};
const UNLINKAT: Signature = Signature {
    args: &[fd("dirfd"), path("pathname"), int("flags")],
    ret: RET_INT,
};
const READLINKAT: Signature = Signature {
    args: &[
        fd("dirfd"),
        path("pathname"),
        addr("buf"),
        ulong("bufsiz", "size_t"),
    ],
    ret: RET_SSIZE,
};
const FACCESSAT: Signature = Signature {
    args: &[fd("dirfd"), path("pathname"), int("mode")],
    ret: RET_INT,
};
const SET_ROBUST_LIST: Signature = Signature {
    args: &[addr("head"), ulong("len", "size_t")],
    ret: RET_LONG,
};
const SPLICE: Signature = Signature {
    args: &[
        fd("fd_in"),
        offset_ref("off_in", "loff_t"),
        fd("fd_out"),
        offset_ref("off_out", "loff_t"),
        ulong("len", "size_t"),
        uint("flags", "unsigned int"),
    ],
    ret: RET_SSIZE,
};
const COPY_FILE_RANGE: Signature = SPLICE;
const EVENTFD2: Signature = Signature {
    args: &[uint("initval", "unsigned int"), int("flags")],
    ret: RET_FD,
};
const FLAGS_TO_FD: Signature = Signature {
    args: &[int("flags")],
    ret: RET_FD,
};
const PRLIMIT64: Signature = Signature {
    args: &[
        long("pid", "pid_t"),
        int("resource"),
        opaque("new_limit", "struct rlimit64", ArgMode::INPUT, 16),
        opaque("old_limit", "struct rlimit64", ArgMode::OUTPUT, 16),
    ],
    ret: RET_INT,
};
const GETRANDOM: Signature = Signature {
    args: &[
        addr("buf"),
        ulong("buflen", "size_t"),
        uint("flags", "unsigned int"),
    ],
    ret: RET_SSIZE,
};
const MEMFD_CREATE: Signature = Signature {
    args: &[path("name"), uint("flags", "unsigned int")],
    ret: RET_FD,
};
const STATX: Signature = Signature {
    args: &[
        fd("dirfd"),
        path("pathname"),
        int("flags"),
        uint("mask", "unsigned int"),
        opaque("statxbuf", "struct statx", ArgMode::OUTPUT, 256),
    ],
    ret: RET_INT,
};
const CLOSE_RANGE: Signature = Signature {
    args: &[
        uint("first", "unsigned int"),
        uint("last", "unsigned int"),
        uint("flags", "unsigned int"),
    ],
    ret: RET_INT,
};

/// Display name of syscall `nr`, if it is one this tracer knows by name.
pub(crate) fn name(nr: u64) -> Option<&'static str> {
    let name = match nr as libc::c_long {
        libc::SYS_read => "read",
        libc::SYS_write => "write",
        libc::SYS_open => "open",
        libc::SYS_close => "close",
        libc::SYS_stat => "stat",
        libc::SYS_fstat => "fstat",
        libc::SYS_lstat => "lstat",
        libc::SYS_poll => "poll",
        libc::SYS_lseek => "lseek",
        libc::SYS_mmap => "mmap",
        libc::SYS_mprotect => "mprotect",
        libc::SYS_munmap => "munmap",
        libc::SYS_brk => "brk",
        libc::SYS_rt_sigaction => "rt_sigaction",
        libc::SYS_rt_sigprocmask => "rt_sigprocmask",
        libc::SYS_rt_sigreturn => "rt_sigreturn",
        libc::SYS_ioctl => "ioctl",
        libc::SYS_pread64 => "pread64",
        libc::SYS_pwrite64 => "pwrite64",
        libc::SYS_readv => "readv",
        libc::SYS_writev => "writev",
        libc::SYS_access => "access",
        libc::SYS_pipe => "pipe",
        libc::SYS_select => "select",
        libc::SYS_sched_yield => "sched_yield",
        libc::SYS_mremap => "mremap",
        libc::SYS_msync => "msync",
        libc::SYS_madvise => "madvise",
        libc::SYS_dup => "dup",
        libc::SYS_dup2 => "dup2",
        libc::SYS_pause => "pause",
        libc::SYS_nanosleep => "nanosleep",
        libc::SYS_getpid => "getpid",
        libc::SYS_sendfile => "sendfile",
        libc::SYS_socket => "socket",
        libc::SYS_connect => "connect",
        libc::SYS_accept => "accept",
        libc::SYS_sendto => "sendto",
        libc::SYS_recvfrom => "recvfrom",
        libc::SYS_sendmsg => "sendmsg",
        libc::SYS_recvmsg => "recvmsg",
        libc::SYS_shutdown => "shutdown",
        libc::SYS_bind => "bind",
        libc::SYS_listen => "listen",
        libc::SYS_getsockname => "getsockname",
        libc::SYS_getpeername => "getpeername",
        libc::SYS_socketpair => "socketpair",
        libc::SYS_setsockopt => "setsockopt",
        libc::SYS_getsockopt => "getsockopt",
        libc::SYS_clone => "clone",
        libc::SYS_fork => "fork",
        libc::SYS_vfork => "vfork",
        libc::SYS_execve => "execve",
        libc::SYS_exit => "exit",
        libc::SYS_wait4 => "wait4",
        libc::SYS_kill => "kill",
        libc::SYS_uname => "uname",
        libc::SYS_fcntl => "fcntl",
        libc::SYS_flock => "flock",
        libc::SYS_fsync => "fsync",
        libc::SYS_fdatasync => "fdatasync",
        libc::SYS_truncate => "truncate",
        libc::SYS_ftruncate => "ftruncate",
        libc::SYS_getdents => "getdents",
        libc::SYS_getcwd => "getcwd",
        libc::SYS_chdir => "chdir",
        libc::SYS_fchdir => "fchdir",
        libc::SYS_rename => "rename",
        libc::SYS_mkdir => "mkdir",
        libc::SYS_rmdir => "rmdir",
        libc::SYS_creat => "creat",
        libc::SYS_link => "link",
        libc::SYS_unlink => "unlink",
        libc::SYS_symlink => "symlink",
        libc::SYS_readlink => "readlink",
        libc::SYS_chmod => "chmod",
        libc::SYS_fchmod => "fchmod",
        libc::SYS_chown => "chown",
        libc::SYS_fchown => "fchown",
        libc::SYS_umask => "umask",
        libc::SYS_gettimeofday => "gettimeofday",
        libc::SYS_getrlimit => "getrlimit",
        libc::SYS_getrusage => "getrusage",
        libc::SYS_sysinfo => "sysinfo",
        libc::SYS_ptrace => "ptrace",
        libc::SYS_getuid => "getuid",
        libc::SYS_getgid => "getgid",
        libc::SYS_setuid => "setuid",
        libc::SYS_setgid => "setgid",
        libc::SYS_geteuid => "geteuid",
        libc::SYS_getegid => "getegid",
        libc::SYS_setpgid => "setpgid",
        libc::SYS_getppid => "getppid",
        libc::SYS_getpgrp => "getpgrp",
        libc::SYS_setsid => "setsid",
        libc::SYS_sigaltstack => "sigaltstack",
        libc::SYS_statfs => "statfs",
        libc::SYS_fstatfs => "fstatfs",
        libc::SYS_prctl => "prctl",
        libc::SYS_arch_prctl => "arch_prctl",
        libc::SYS_setrlimit => "setrlimit",
        libc::SYS_chroot => "chroot",
        libc::SYS_sync => "sync",
        libc::SYS_mount => "mount",
        libc::SYS_umount2 => "umount2",
        libc::SYS_gettid => "gettid",
        libc::SYS_futex => "futex",
        libc::SYS_sched_setaffinity => "sched_setaffinity",
        libc::SYS_sched_getaffinity => "sched_getaffinity",
        libc::SYS_set_tid_address => "set_tid_address",
        libc::SYS_getdents64 => "getdents64",
        libc::SYS_clock_gettime => "clock_gettime",
        libc::SYS_clock_getres => "clock_getres",
        libc::SYS_clock_nanosleep => "clock_nanosleep",
        libc::SYS_exit_group => "exit_group",
        libc::SYS_epoll_wait => "epoll_wait",
        libc::SYS_epoll_ctl => "epoll_ctl",
        libc::SYS_tgkill => "tgkill",
        libc::SYS_openat => "openat",
        libc::SYS_mkdirat => "mkdirat",
        libc::SYS_newfstatat => "newfstatat",
        libc::SYS_unlinkat => "unlinkat",
        libc::SYS_renameat => "renameat",
        libc::SYS_readlinkat => "readlinkat",
        libc::SYS_faccessat => "faccessat",
        libc::SYS_pselect6 => "pselect6",
        libc::SYS_ppoll => "ppoll",
        libc::SYS_set_robust_list => "set_robust_list",
        libc::SYS_get_robust_list => "get_robust_list",
        libc::SYS_splice => "splice",
        libc::SYS_tee => "tee",
        libc::SYS_utimensat => "utimensat",
        libc::SYS_epoll_pwait => "epoll_pwait",
        libc::SYS_timerfd_create => "timerfd_create",
        libc::SYS_fallocate => "fallocate",
        libc::SYS_accept4 => "accept4",
        libc::SYS_signalfd4 => "signalfd4",
        libc::SYS_eventfd2 => "eventfd2",
        libc::SYS_epoll_create1 => "epoll_create1",
        libc::SYS_dup3 => "dup3",
        libc::SYS_pipe2 => "pipe2",
        libc::SYS_inotify_init1 => "inotify_init1",
        libc::SYS_preadv => "preadv",
        libc::SYS_pwritev => "pwritev",
        libc::SYS_recvmmsg => "recvmmsg",
        libc::SYS_prlimit64 => "prlimit64",
        libc::SYS_sendmmsg => "sendmmsg",
        libc::SYS_getcpu => "getcpu",
        libc::SYS_renameat2 => "renameat2",
        libc::SYS_seccomp => "seccomp",
        libc::SYS_getrandom => "getrandom",
        libc::SYS_memfd_create => "memfd_create",
        libc::SYS_bpf => "bpf",
        libc::SYS_execveat => "execveat",
        libc::SYS_membarrier => "membarrier",
        libc::SYS_copy_file_range => "copy_file_range",
        libc::SYS_statx => "statx",
        libc::SYS_rseq => "rseq",
        libc::SYS_clone3 => "clone3",
        libc::SYS_close_range => "close_range",
        libc::SYS_openat2 => "openat2",
        libc::SYS_faccessat2 => "faccessat2",
        _ => return None,
    };
    Some(name)
}

/// Argument signature of syscall `nr`, when its details are known.
pub(crate) fn signature(nr: u64) -> Option<&'static Signature> {
    let sig = match nr as libc::c_long {
        libc::SYS_read => &READ,
        libc::SYS_write => &WRITE,
        libc::SYS_open => &OPEN,
        libc::SYS_close => &CLOSE,
        libc::SYS_stat | libc::SYS_lstat => &STAT_PATH,
        libc::SYS_fstat => &FSTAT,
        libc::SYS_poll => &POLL,
        libc::SYS_lseek => &LSEEK,
        libc::SYS_mmap => &MMAP,
        libc::SYS_mprotect => &MPROTECT,
        libc::SYS_munmap => &MUNMAP,
        libc::SYS_brk => &BRK,
        libc::SYS_rt_sigaction => &RT_SIGACTION,
        libc::SYS_rt_sigprocmask => &RT_SIGPROCMASK,
        libc::SYS_ioctl => &IOCTL,
        libc::SYS_pread64 => &PREAD64,
        libc::SYS_pwrite64 => &PWRITE64,
        libc::SYS_access => &ACCESS,
        libc::SYS_pipe => &PIPE,
        libc::SYS_sched_yield | libc::SYS_pause | libc::SYS_sync => &NO_ARGS_INT,
        libc::SYS_dup => &DUP,
        libc::SYS_dup2 => &DUP2,
        libc::SYS_nanosleep => &NANOSLEEP,
        libc::SYS_getpid
        | libc::SYS_getppid
        | libc::SYS_gettid
        | libc::SYS_getpgrp
        | libc::SYS_setsid
        | libc::SYS_fork
        | libc::SYS_vfork => &NO_ARGS_PID,
        libc::SYS_getuid | libc::SYS_getgid | libc::SYS_geteuid | libc::SYS_getegid => {
            &NO_ARGS_UINT
        }
        libc::SYS_sendfile => &SENDFILE,
        libc::SYS_socket => &SOCKET,
        libc::SYS_connect => &CONNECT,
        libc::SYS_bind => &BIND,
        libc::SYS_accept => &ACCEPT,
        libc::SYS_accept4 => &ACCEPT4,
        libc::SYS_listen => &LISTEN,
        libc::SYS_clone => &CLONE,
        libc::SYS_execve => &EXECVE,
        libc::SYS_exit | libc::SYS_exit_group => &EXIT,
        libc::SYS_wait4 => &WAIT4,
        libc::SYS_kill => &KILL,
        libc::SYS_uname => &UNAME,
        libc::SYS_fcntl => &FCNTL,
        libc::SYS_fsync | libc::SYS_fdatasync | libc::SYS_fchdir => &FD_ONLY,
        libc::SYS_truncate => &TRUNCATE,
        libc::SYS_ftruncate => &FTRUNCATE,
        libc::SYS_getcwd => &GETCWD,
        libc::SYS_chdir | libc::SYS_rmdir | libc::SYS_unlink | libc::SYS_chroot => &PATH_ONLY,
        libc::SYS_rename | libc::SYS_link | libc::SYS_symlink => &RENAME,
        libc::SYS_mkdir | libc::SYS_chmod | libc::SYS_creat => &PATH_MODE,
        libc::SYS_fchmod => &FCHMOD,
        libc::SYS_readlink => &READLINK,
        libc::SYS_umask => &UMASK,
        libc::SYS_arch_prctl => &ARCH_PRCTL,
        libc::SYS_futex => &FUTEX,
        libc::SYS_getdents64 => &GETDENTS64,
        libc::SYS_set_tid_address => &SET_TID_ADDRESS,
        libc::SYS_clock_gettime | libc::SYS_clock_getres => &CLOCK_GETTIME,
        libc::SYS_openat => &OPENAT,
        libc::SYS_mkdirat => &MKDIRAT,
        libc::SYS_newfstatat => &NEWFSTATAT,
        libc::SYS_unlinkat => &UNLINKAT,
        libc::SYS_readlinkat => &READLINKAT,
        libc::SYS_faccessat => &FACCESSAT,
        libc::SYS_set_robust_list => &SET_ROBUST_LIST,
        libc::SYS_splice => &SPLICE,
        libc::SYS_copy_file_range => &COPY_FILE_RANGE,
        libc::SYS_eventfd2 => &EVENTFD2,
        libc::SYS_epoll_create1 | libc::SYS_inotify_init1 => &FLAGS_TO_FD,
        libc::SYS_dup3 => &DUP3,
        libc::SYS_pipe2 => &PIPE2,
        libc::SYS_prlimit64 => &PRLIMIT64,
        libc::SYS_getrandom => &GETRANDOM,
        libc::SYS_memfd_create => &MEMFD_CREATE,
        libc::SYS_statx => &STATX,
        libc::SYS_close_range => &CLOSE_RANGE,
        _ => return None,
    };
    Some(sig)
}

/// A raw result in the kernel's errno range means the call failed.
pub(crate) fn is_error_result(raw: u64) -> bool {
    (-4095..=-1).contains(&(raw as i64))
}
