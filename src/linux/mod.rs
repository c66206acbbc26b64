//! Linux backend built on procfs and cross-memory-attach syscalls

pub mod maps;
pub mod target;

pub use target::LinuxTarget;
