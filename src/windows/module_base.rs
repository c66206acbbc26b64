//! Main-module discovery for an opened process
//!
//! The primary strategy starts a thread in the target at
//! `kernel32!GetModuleHandleA` with a null argument; the thread's exit code is
//! the executable's base. Kernel32 is mapped at the same address in every
//! process of a boot session, so the local export address is valid remotely.
//! Exit codes are 32 bits wide, so on 64-bit targets the full base is
//! recovered by matching the low half against the module list.

use super::bindings::{kernel32, psapi};
use super::types::{Handle, ProcessHandle};
use crate::core::types::{MemoryAddress, ModuleBounds, TargetError, TargetResult};
use tracing::debug;
use winapi::shared::minwindef::HMODULE;

/// One way of locating the main module's base
pub trait ModuleBaseResolver: Send + Sync {
    fn name(&self) -> &'static str;

    fn resolve(&self, process: &ProcessHandle) -> TargetResult<MemoryAddress>;
}

/// Remote `GetModuleHandleA(NULL)` thread
#[derive(Debug, Default)]
pub struct RemoteThreadResolver;

impl RemoteThreadResolver {
    fn remote_entry_point() -> TargetResult<usize> {
        let k32 = kernel32::get_module_handle("kernel32.dll")
            .ok_or_else(|| TargetError::module_resolution("kernel32.dll is not loaded"))?;

        unsafe {
            kernel32::get_proc_address(k32, "GetModuleHandleA")
                .or_else(|| kernel32::get_proc_address(k32, "GetModuleHandleW"))
        }
        .ok_or_else(|| TargetError::module_resolution("GetModuleHandle export not found"))
    }
}

impl ModuleBaseResolver for RemoteThreadResolver {
    fn name(&self) -> &'static str {
        "remote-thread"
    }

    fn resolve(&self, process: &ProcessHandle) -> TargetResult<MemoryAddress> {
        let entry = Self::remote_entry_point()?;

        let thread = Handle::new(unsafe { kernel32::create_remote_thread(process.raw(), entry, 0)? });
        if !unsafe { kernel32::wait_for_single_object(thread.raw()) } {
            return Err(TargetError::module_resolution("remote thread wait failed"));
        }

        let exit_code = unsafe { kernel32::get_exit_code_thread(thread.raw()) }
            .filter(|code| *code != 0)
            .ok_or_else(|| TargetError::module_resolution("remote thread returned no base"))?;

        if std::mem::size_of::<usize>() <= 4 {
            return Ok(MemoryAddress::new(exit_code as usize));
        }

        let modules = unsafe { psapi::enum_process_modules(process.raw())? };
        widen_truncated_base(exit_code, modules.iter().map(|module| *module as usize))
            .ok_or_else(|| {
                TargetError::module_resolution(format!(
                    "no module matches truncated base 0x{:08X}",
                    exit_code
                ))
            })
    }
}

/// First entry of EnumProcessModules
#[derive(Debug, Default)]
pub struct ModuleEnumResolver;

impl ModuleBaseResolver for ModuleEnumResolver {
    fn name(&self) -> &'static str {
        "module-enum"
    }

    fn resolve(&self, process: &ProcessHandle) -> TargetResult<MemoryAddress> {
        let modules = unsafe { psapi::enum_process_modules(process.raw())? };
        modules
            .first()
            .map(|module| MemoryAddress::new(*module as usize))
            .ok_or_else(|| TargetError::module_resolution("process reports no modules"))
    }
}

/// Picks the module whose base has `low` as its lower 32 bits
pub fn widen_truncated_base<I>(low: u32, bases: I) -> Option<MemoryAddress>
where
    I: IntoIterator<Item = usize>,
{
    bases
        .into_iter()
        .find(|base| (*base as u64 & 0xFFFF_FFFF) as u32 == low)
        .map(MemoryAddress::new)
}

/// Default resolver chain
pub fn default_resolvers() -> Vec<Box<dyn ModuleBaseResolver>> {
    vec![Box::new(RemoteThreadResolver), Box::new(ModuleEnumResolver)]
}

/// Tries each resolver in turn, then sizes the image
pub fn resolve_main_module(
    process: &ProcessHandle,
    resolvers: &[Box<dyn ModuleBaseResolver>],
) -> TargetResult<ModuleBounds> {
    resolve_with(process, resolvers, |base| image_size(process, base))
}

/// A base that cannot be sized counts as a failed resolver
fn resolve_with<F>(
    process: &ProcessHandle,
    resolvers: &[Box<dyn ModuleBaseResolver>],
    size_of: F,
) -> TargetResult<ModuleBounds>
where
    F: Fn(MemoryAddress) -> TargetResult<usize>,
{
    let mut last_error = TargetError::module_resolution("no resolver configured");

    for resolver in resolvers {
        let attempt = resolver
            .resolve(process)
            .and_then(|base| Ok(ModuleBounds::new(base, size_of(base)?)));
        match attempt {
            Ok(bounds) => {
                debug!(
                    resolver = resolver.name(),
                    base = %bounds.start,
                    size = bounds.size(),
                    "main module resolved"
                );
                return Ok(bounds);
            }
            Err(e) => {
                debug!(resolver = resolver.name(), error = %e, "module resolver failed");
                last_error = e;
            }
        }
    }

    Err(last_error)
}

fn image_size(process: &ProcessHandle, base: MemoryAddress) -> TargetResult<usize> {
    let info =
        unsafe { psapi::get_module_information(process.raw(), base.as_usize() as HMODULE)? };
    Ok(info.SizeOfImage as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use winapi::um::processthreadsapi::GetCurrentProcessId;

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_widen_truncated_base() {
        let bases = vec![0x7FF6_1234_0000usize, 0x7FFA_0000_0000];
        assert_eq!(
            widen_truncated_base(0x1234_0000, bases.clone()),
            Some(MemoryAddress::new(0x7FF6_1234_0000))
        );
        assert_eq!(widen_truncated_base(0x5555_0000, bases), None);
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_resolvers_agree_on_self() {
        let process = ProcessHandle::open_for_scanning(unsafe { GetCurrentProcessId() }).unwrap();
        let remote = RemoteThreadResolver.resolve(&process).unwrap();
        let listed = ModuleEnumResolver.resolve(&process).unwrap();
        assert_eq!(remote, listed);

        let bounds = resolve_main_module(&process, &default_resolvers()).unwrap();
        assert_eq!(bounds.start, remote);
        assert!(bounds.size() > 0);
    }

    struct FixedBase(usize);

    impl ModuleBaseResolver for FixedBase {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn resolve(&self, _process: &ProcessHandle) -> TargetResult<MemoryAddress> {
            Ok(MemoryAddress::new(self.0))
        }
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_unsizable_base_falls_through() {
        let process = ProcessHandle::open_for_scanning(unsafe { GetCurrentProcessId() }).unwrap();
        let resolvers: Vec<Box<dyn ModuleBaseResolver>> =
            vec![Box::new(FixedBase(0x1000_0000)), Box::new(FixedBase(0x2000_0000))];

        let bounds = resolve_with(&process, &resolvers, |base| {
            if base.as_usize() == 0x1000_0000 {
                Err(TargetError::module_resolution("GetModuleInformation failed"))
            } else {
                Ok(0x5000)
            }
        })
        .unwrap();
        assert_eq!(bounds.start, MemoryAddress::new(0x2000_0000));
        assert_eq!(bounds.size(), 0x5000);

        let all_fail = resolve_with(&process, &resolvers[..1], |_| {
            Err(TargetError::module_resolution("GetModuleInformation failed"))
        });
        assert!(all_fail.is_err());
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_empty_chain_fails() {
        let process = ProcessHandle::open_for_scanning(unsafe { GetCurrentProcessId() }).unwrap();
        assert!(resolve_main_module(&process, &[]).is_err());
    }
}
