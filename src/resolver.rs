//! PID to process-name resolution with a shared cache.
//!
//! Lookups hit the OS process table once per PID. Failed lookups cache a
//! `<pid>` placeholder so a dead producer does not cost an OS call per message.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

#[cfg(unix)]
use std::path::{Path, PathBuf};

/// Source of process names and liveness.
pub trait ProcessLookup: Send + Sync {
    /// Returns the display name of a running process.
    fn process_name(&self, pid: i32) -> Option<String>;

    /// Returns true while the process exists.
    fn is_alive(&self, pid: i32) -> bool;
}

/// Placeholder cached for PIDs that could not be resolved.
pub fn placeholder_name(pid: i32) -> String {
    format!("<{pid}>")
}

/// Cached PID -> name resolver shared by all capture channels.
pub struct ProcessNameResolver {
    cache: DashMap<i32, String>,
    lookup: Arc<dyn ProcessLookup>,
}

impl Default for ProcessNameResolver {
    fn default() -> Self {
        Self::new(Arc::new(SystemProcessLookup::default()))
    }
}

impl ProcessNameResolver {
    pub fn new(lookup: Arc<dyn ProcessLookup>) -> Self {
        Self {
            cache: DashMap::new(),
            lookup,
        }
    }

    /// Returns the cached name, querying the OS on first sight of a PID.
    pub fn resolve(&self, pid: i32) -> String {
        if let Some(name) = self.cache.get(&pid) {
            return name.clone();
        }

        // Query outside the shard lock; a concurrent resolver may win the insert
        let name = match self.lookup.process_name(pid) {
            Some(name) => name,
            None => {
                debug!(pid, "process lookup failed, caching placeholder");
                placeholder_name(pid)
            }
        };

        self.cache.entry(pid).or_insert(name).clone()
    }

    /// Removes entries whose process no longer exists. Returns how many were dropped.
    pub fn prune(&self) -> usize {
        let before = self.cache.len();
        self.cache.retain(|pid, _| self.lookup.is_alive(*pid));
        let removed = before.saturating_sub(self.cache.len());
        if removed > 0 {
            debug!(removed, "pruned process name cache");
        }
        removed
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Process lookup backed by the operating system.
#[cfg(unix)]
#[derive(Debug, Clone)]
pub struct SystemProcessLookup {
    proc_root: PathBuf,
}

#[cfg(unix)]
impl Default for SystemProcessLookup {
    fn default() -> Self {
        Self::with_proc_root("/proc")
    }
}

#[cfg(unix)]
impl SystemProcessLookup {
    /// Uses an alternative procfs mount point.
    pub fn with_proc_root(root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: root.into(),
        }
    }

    fn proc_path(&self, pid: i32) -> Option<PathBuf> {
        (pid > 0).then(|| self.proc_root.join(pid.to_string()))
    }
}

#[cfg(unix)]
impl ProcessLookup for SystemProcessLookup {
    fn process_name(&self, pid: i32) -> Option<String> {
        read_process_name(&self.proc_path(pid)?)
    }

    fn is_alive(&self, pid: i32) -> bool {
        self.proc_path(pid).is_some_and(|p| p.exists())
    }
}

/// Reads process name from comm file or extracts it from cmdline.
#[cfg(unix)]
fn read_process_name(proc_path: &Path) -> Option<String> {
    if let Ok(s) = std::fs::read_to_string(proc_path.join("comm")) {
        let t = s.trim();
        if !t.is_empty() {
            return Some(t.into());
        }
    }

    let content = std::fs::read(proc_path.join("cmdline")).ok()?;
    let first = content
        .split(|&b| b == 0u8)
        .find_map(|s| std::str::from_utf8(s).ok().filter(|s| !s.is_empty()))?;
    Path::new(first)
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}

/// Process lookup backed by the operating system.
#[cfg(windows)]
#[derive(Debug, Clone, Default)]
pub struct SystemProcessLookup;

#[cfg(windows)]
impl ProcessLookup for SystemProcessLookup {
    fn process_name(&self, pid: i32) -> Option<String> {
        use windows_sys::Win32::Foundation::CloseHandle;
        use windows_sys::Win32::System::Threading::{
            OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
            PROCESS_QUERY_LIMITED_INFORMATION,
        };

        let pid = u32::try_from(pid).ok()?;
        let mut buf = [0u16; 1024];
        let mut len = buf.len() as u32;

        // SAFETY: the handle is checked before use and closed on every path;
        // `buf`/`len` describe a valid writable UTF-16 buffer.
        let path = unsafe {
            let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
            if handle == 0 {
                return None;
            }
            let ok = QueryFullProcessImageNameW(handle, PROCESS_NAME_WIN32, buf.as_mut_ptr(), &mut len);
            CloseHandle(handle);
            if ok == 0 {
                return None;
            }
            String::from_utf16_lossy(&buf[..len as usize])
        };

        std::path::Path::new(&path)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string)
    }

    fn is_alive(&self, pid: i32) -> bool {
        use windows_sys::Win32::Foundation::{CloseHandle, STILL_ACTIVE};
        use windows_sys::Win32::System::Threading::{
            GetExitCodeProcess, OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION,
        };

        let Ok(pid) = u32::try_from(pid) else {
            return false;
        };

        // SAFETY: the handle is checked before use and closed before returning.
        unsafe {
            let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
            if handle == 0 {
                return false;
            }
            let mut code = 0u32;
            let ok = GetExitCodeProcess(handle, &mut code);
            CloseHandle(handle);
            ok != 0 && code == STILL_ACTIVE as u32
        }
    }
}
