//! System `DBWIN_*` objects via the Win32 API.

use std::ffi::c_void;
use std::ptr;
use std::time::Duration;

use windows_sys::Win32::Foundation::{
    CloseHandle, GetLastError, HANDLE, INVALID_HANDLE_VALUE, WAIT_OBJECT_0, WAIT_TIMEOUT,
};
use windows_sys::Win32::System::Memory::{
    CreateFileMappingW, MapViewOfFile, UnmapViewOfFile, FILE_MAP_READ,
    MEMORY_MAPPED_VIEW_ADDRESS, PAGE_READWRITE,
};
use windows_sys::Win32::System::Threading::{
    CreateEventW, SetEvent, WaitForSingleObject,
};

use super::layout::BUFFER_SIZE;
use super::transport::{DebugTransport, TransportFactory};
use super::CaptureScope;
use crate::error::CaptureError;

/// Opens the real debug-output objects.
pub struct Win32Backend;

impl TransportFactory for Win32Backend {
    fn open(&self, scope: CaptureScope) -> Result<Box<dyn DebugTransport>, CaptureError> {
        Ok(Box::new(Win32Transport::open(scope)?))
    }
}

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn last_error(scope: CaptureScope, resource: &str) -> CaptureError {
    // SAFETY: GetLastError has no preconditions.
    let code = unsafe { GetLastError() };
    CaptureError::ResourceAcquisition {
        scope,
        resource: resource.to_string(),
        reason: format!("win32 error {code}"),
    }
}

/// Mapping, view and event handles for one scope. Zero means "not held".
struct Win32Transport {
    scope: CaptureScope,
    mapping: HANDLE,
    view: MEMORY_MAPPED_VIEW_ADDRESS,
    buffer_ready: HANDLE,
    data_ready: HANDLE,
}

// SAFETY: the handles and view are process-wide kernel objects owned
// exclusively by this value; moving it between threads is sound.
unsafe impl Send for Win32Transport {}

impl Win32Transport {
    fn open(scope: CaptureScope) -> Result<Self, CaptureError> {
        let names = scope.object_names();
        let mut transport = Self {
            scope,
            mapping: 0,
            view: MEMORY_MAPPED_VIEW_ADDRESS { Value: ptr::null_mut() },
            buffer_ready: 0,
            data_ready: 0,
        };

        // Partially opened handles are released by Drop on early return.
        // SAFETY: all pointers passed are valid NUL-terminated UTF-16 names or null.
        unsafe {
            let name = wide(&names.buffer);
            transport.mapping = CreateFileMappingW(
                INVALID_HANDLE_VALUE,
                ptr::null(),
                PAGE_READWRITE,
                0,
                BUFFER_SIZE as u32,
                name.as_ptr(),
            );
            if transport.mapping == 0 {
                return Err(last_error(scope, &names.buffer));
            }

            transport.view = MapViewOfFile(transport.mapping, FILE_MAP_READ, 0, 0, BUFFER_SIZE);
            if transport.view.Value.is_null() {
                return Err(last_error(scope, &names.buffer));
            }

            let name = wide(&names.buffer_ready);
            transport.buffer_ready = CreateEventW(ptr::null(), 0, 0, name.as_ptr());
            if transport.buffer_ready == 0 {
                return Err(last_error(scope, &names.buffer_ready));
            }

            let name = wide(&names.data_ready);
            transport.data_ready = CreateEventW(ptr::null(), 0, 0, name.as_ptr());
            if transport.data_ready == 0 {
                return Err(last_error(scope, &names.data_ready));
            }
        }

        Ok(transport)
    }
}

impl DebugTransport for Win32Transport {
    fn signal_ready(&mut self) -> Result<(), CaptureError> {
        // SAFETY: buffer_ready is a valid event handle for the lifetime of self.
        if unsafe { SetEvent(self.buffer_ready) } == 0 {
            return Err(CaptureError::Handshake {
                scope: self.scope,
                reason: format!("SetEvent failed: win32 error {}", unsafe { GetLastError() }),
            });
        }
        Ok(())
    }

    fn wait_data(&mut self, timeout: Duration) -> Result<bool, CaptureError> {
        let millis = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX - 1);
        // SAFETY: data_ready is a valid event handle for the lifetime of self.
        match unsafe { WaitForSingleObject(self.data_ready, millis) } {
            WAIT_OBJECT_0 => Ok(true),
            WAIT_TIMEOUT => Ok(false),
            other => Err(CaptureError::Handshake {
                scope: self.scope,
                reason: format!("WaitForSingleObject returned {other:#x}"),
            }),
        }
    }

    fn read_buffer(&mut self, buf: &mut [u8]) {
        let len = buf.len().min(BUFFER_SIZE);
        // SAFETY: the view maps BUFFER_SIZE readable bytes; `len` never exceeds it.
        unsafe {
            ptr::copy_nonoverlapping(self.view.Value as *const c_void as *const u8, buf.as_mut_ptr(), len);
        }
    }
}

impl Drop for Win32Transport {
    fn drop(&mut self) {
        // SAFETY: each handle is released at most once and only when held.
        unsafe {
            if !self.view.Value.is_null() {
                UnmapViewOfFile(self.view);
            }
            for handle in [self.data_ready, self.buffer_ready, self.mapping] {
                if handle != 0 {
                    CloseHandle(handle);
                }
            }
        }
    }
}
