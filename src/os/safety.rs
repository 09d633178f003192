//! Thin safe wrappers over the Win32 calls the platform layer makes in
//! more than one place.

use core::{mem::zeroed, ptr::null_mut};
use std::{ffi::OsStr, iter::once, os::windows::ffi::OsStrExt};
use winapi::{
    shared::{
        minwindef::{FARPROC, HMODULE},
        windef::{HWND, RECT},
    },
    um::{
        errhandlingapi::GetLastError,
        libloaderapi::{GetProcAddress, LoadLibraryA},
        winnt::LPCSTR,
        winuser::{GetClientRect, PeekMessageW, MSG, PM_REMOVE},
    },
};

pub fn win32_string(value: &str) -> Vec<u16> {
    OsStr::new(value).encode_wide().chain(once(0)).collect()
}

pub fn last_error() -> u32 {
    unsafe { GetLastError() }
}

/// `name` must be NUL-terminated.
pub fn load_library(name: &str) -> Option<HMODULE> {
    debug_assert!(name.ends_with('\0'));
    let module = unsafe { LoadLibraryA(name.as_ptr() as LPCSTR) };
    if module.is_null() {
        None
    } else {
        Some(module)
    }
}

/// `proc_name` must be NUL-terminated.
pub fn get_proc_address(module: HMODULE, proc_name: &str) -> Option<FARPROC> {
    debug_assert!(proc_name.ends_with('\0'));
    let result = unsafe { GetProcAddress(module, proc_name.as_ptr() as LPCSTR) };
    if result.is_null() {
        None
    } else {
        Some(result)
    }
}

pub fn peek_message_remove() -> Option<MSG> {
    unsafe {
        let mut message = zeroed();
        if PeekMessageW(&mut message, null_mut(), 0, 0, PM_REMOVE) != 0 {
            Some(message)
        } else {
            None
        }
    }
}

/// Width and height of the window's client area.
pub fn client_size(window: HWND) -> (i32, i32) {
    let mut client_rect = RECT::default();
    unsafe {
        GetClientRect(window, &mut client_rect);
    }
    (
        client_rect.right - client_rect.left,
        client_rect.bottom - client_rect.top,
    )
}
