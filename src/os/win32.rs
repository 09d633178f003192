//! Win32 window, GDI blit, XInput gamepads and DirectSound output.

use super::safety::{
    client_size, get_proc_address, last_error, load_library, peek_message_remove, win32_string,
};
use game::{
    app::{App, FrameClock, Platform, Pump},
    buffer::{Dimension, PixelBuffer},
    common::ControllerInput,
    config::Config,
    error::{Error, Result},
    input::{apply_key, DisconnectedGamepads, GamepadState, Gamepads, Key, KeyFlags},
    sound::{AudioSink, SilentAudio},
};
use std::{
    cell::Cell,
    mem::{size_of, transmute, zeroed},
    ptr::{null, null_mut},
    slice,
};
use winapi::{
    ctypes::c_void,
    shared::{
        basetsd::LONG_PTR,
        guiddef::LPCGUID,
        minwindef::{DWORD, HMODULE, LPARAM, LPVOID, LRESULT, UINT, WPARAM},
        mmreg::{WAVEFORMATEX, WAVE_FORMAT_PCM},
        windef::HWND,
        winerror::ERROR_SUCCESS,
    },
    um::{
        dsound::*,
        libloaderapi::GetModuleHandleW,
        unknwnbase::LPUNKNOWN,
        wingdi::{StretchDIBits, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, SRCCOPY},
        winnt::HRESULT,
        winuser::*,
        xinput::{XINPUT_STATE, XUSER_MAX_COUNT},
    },
};

const VK_W: i32 = 'W' as i32;
const VK_A: i32 = 'A' as i32;
const VK_S: i32 = 'S' as i32;
const VK_D: i32 = 'D' as i32;
const VK_Q: i32 = 'Q' as i32;
const VK_E: i32 = 'E' as i32;

/// What the window procedure reports back to the frame loop. Reached through
/// `GWLP_USERDATA`, so it only uses interior mutability.
#[derive(Debug)]
struct WindowState {
    running: Cell<bool>,
    resized: Cell<Option<Dimension>>,
}

impl WindowState {
    fn new() -> Self {
        Self {
            running: Cell::new(true),
            resized: Cell::new(None),
        }
    }
}

unsafe fn window_state<'a>(window: HWND) -> Option<&'a WindowState> {
    (GetWindowLongPtrW(window, GWLP_USERDATA) as *const WindowState).as_ref()
}

unsafe extern "system" fn main_window_callback(
    window: HWND,
    message: UINT,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    let mut result = 0;

    match message {
        WM_NCCREATE => {
            let create = &*(l_param as *const CREATESTRUCTW);
            SetWindowLongPtrW(window, GWLP_USERDATA, create.lpCreateParams as LONG_PTR);
            result = DefWindowProcW(window, message, w_param, l_param);
        }
        WM_CLOSE => {
            info!("wm_close");
            if let Some(state) = window_state(window) {
                state.running.set(false);
            }
        }
        WM_DESTROY => {
            info!("wm_destroy");
            if let Some(state) = window_state(window) {
                state.running.set(false);
            }
        }
        WM_ACTIVATEAPP => debug!("wm_activateapp: active: {}", w_param != 0),
        WM_SIZE => {
            let width = (l_param as u32) & 0xFFFF;
            let height = ((l_param as u32) >> 16) & 0xFFFF;
            debug!("wm_size: {}x{}", width, height);
            if let Some(state) = window_state(window) {
                state.resized.set(Some(Dimension::new(width, height)));
            }
        }
        WM_KEYUP | WM_KEYDOWN | WM_SYSKEYDOWN | WM_SYSKEYUP => {
            warn!("keyboard input came in through a non-dispatch message");
        }
        WM_PAINT => {
            // the frame loop blits every frame, so just validate the region
            let mut paint = PAINTSTRUCT::default();
            BeginPaint(window, &mut paint);
            EndPaint(window, &paint);
        }
        _ => {
            result = DefWindowProcW(window, message, w_param, l_param);
        }
    }

    result
}

fn translate_key(vk_code: i32) -> Option<Key> {
    let key = match vk_code {
        VK_W => Key::W,
        VK_A => Key::A,
        VK_S => Key::S,
        VK_D => Key::D,
        VK_Q => Key::Q,
        VK_E => Key::E,
        VK_UP => Key::Up,
        VK_DOWN => Key::Down,
        VK_LEFT => Key::Left,
        VK_RIGHT => Key::Right,
        VK_ESCAPE => Key::Escape,
        VK_SPACE => Key::Space,
        VK_F4 => Key::F4,
        _ => return None,
    };
    Some(key)
}

type XInputGetState = unsafe extern "system" fn(DWORD, *mut XINPUT_STATE) -> DWORD;

struct XInputGamepads {
    _library: HMODULE,
    get_state: XInputGetState,
}

impl XInputGamepads {
    /// Newest XInput first; no library means no gamepads, not an error.
    fn load() -> Option<Self> {
        for name in &["xinput1_4.dll\0", "xinput9_1_0.dll\0", "xinput1_3.dll\0"] {
            let library = match load_library(name) {
                Some(library) => library,
                None => continue,
            };
            if let Some(proc) = get_proc_address(library, "XInputGetState\0") {
                info!("loaded {}", name.trim_end_matches('\0'));
                return Some(Self {
                    _library: library,
                    get_state: unsafe { transmute::<_, XInputGetState>(proc) },
                });
            }
        }
        warn!("XInput is not available, gamepads are disabled");
        None
    }
}

impl Gamepads for XInputGamepads {
    fn poll(&mut self, gamepad_index: usize) -> Option<GamepadState> {
        if gamepad_index >= XUSER_MAX_COUNT as usize {
            return None;
        }

        let mut controller_state: XINPUT_STATE = unsafe { zeroed() };
        if unsafe { (self.get_state)(gamepad_index as DWORD, &mut controller_state) }
            != ERROR_SUCCESS
        {
            return None;
        }

        let pad = controller_state.Gamepad;
        Some(GamepadState {
            buttons: pad.wButtons,
            stick_x: pad.sThumbLX,
            stick_y: pad.sThumbLY,
        })
    }
}

type DirectSoundCreate = unsafe extern "system" fn(LPCGUID, *mut LPDIRECTSOUND, LPUNKNOWN) -> HRESULT;

struct DirectSoundOutput {
    direct_sound: LPDIRECTSOUND,
    sound_buffer: LPDIRECTSOUNDBUFFER,
    running_sample_index: u32,
    bytes_per_sample: u32,
    sound_buffer_size: u32,
    latency_sample_count: u32,
    pending: Option<(u32, u32)>,
}

impl DirectSoundOutput {
    /// Any failure leaves the game silent; it never stops the window.
    fn init(window: HWND, samples_per_second: u32, game_update_hz: u32) -> Option<Self> {
        let library = match load_library("dsound.dll\0") {
            Some(library) => library,
            None => {
                warn!("dsound.dll not found, running without sound");
                return None;
            }
        };
        let create: DirectSoundCreate = match get_proc_address(library, "DirectSoundCreate\0") {
            Some(proc) => unsafe { transmute::<_, DirectSoundCreate>(proc) },
            None => {
                warn!("DirectSoundCreate not found, running without sound");
                return None;
            }
        };

        let bytes_per_sample = (size_of::<i16>() * 2) as u32;
        let sound_buffer_size = samples_per_second * bytes_per_sample;

        unsafe {
            let mut direct_sound: LPDIRECTSOUND = null_mut();
            match create(null(), &mut direct_sound, null_mut()) {
                DS_OK => {}
                e => {
                    error!("Couldn't create direct sound object: {:x}", e);
                    return None;
                }
            }

            let bits_per_sample = 16;
            let channels = 2;
            let block_alignment = channels * bits_per_sample / 8;
            let mut wave_format = WAVEFORMATEX {
                wFormatTag: WAVE_FORMAT_PCM,
                nChannels: channels,
                nSamplesPerSec: samples_per_second,
                nAvgBytesPerSec: samples_per_second * block_alignment as u32,
                nBlockAlign: block_alignment,
                wBitsPerSample: bits_per_sample,
                cbSize: 0,
            };

            match (*direct_sound).SetCooperativeLevel(window, DSSCL_PRIORITY) {
                DS_OK => {
                    let mut buffer_description: DSBUFFERDESC = zeroed();
                    buffer_description.dwSize = size_of::<DSBUFFERDESC>() as u32;
                    buffer_description.dwFlags = DSBCAPS_PRIMARYBUFFER;
                    let mut primary_buffer: LPDIRECTSOUNDBUFFER = null_mut();

                    match (*direct_sound).CreateSoundBuffer(
                        &buffer_description,
                        &mut primary_buffer,
                        null_mut(),
                    ) {
                        DS_OK => {
                            match (*primary_buffer).SetFormat(&wave_format) {
                                DS_OK => info!("Successfully set the wave format"),
                                e => error!("Couldn't set the wave format: {:x}", e),
                            }
                            // the format sticks to the device; the handle is not needed
                            (*primary_buffer).Release();
                        }
                        e => error!("Couldn't create the primary sound buffer: {:x}", e),
                    }
                }
                e => error!("Couldn't set the cooperative level: {:x}", e),
            }

            let mut buffer_description: DSBUFFERDESC = zeroed();
            buffer_description.dwSize = size_of::<DSBUFFERDESC>() as u32;
            buffer_description.dwFlags = DSBCAPS_GETCURRENTPOSITION2;
            buffer_description.dwBufferBytes = sound_buffer_size;
            buffer_description.lpwfxFormat = &mut wave_format;
            let mut sound_buffer: LPDIRECTSOUNDBUFFER = null_mut();
            match (*direct_sound).CreateSoundBuffer(
                &buffer_description,
                &mut sound_buffer,
                null_mut(),
            ) {
                DS_OK => info!("Secondary buffer created successfully"),
                e => {
                    error!("Couldn't create the secondary sound buffer: {:x}", e);
                    (*direct_sound).Release();
                    return None;
                }
            }

            let mut output = Self {
                direct_sound,
                sound_buffer,
                running_sample_index: 0,
                bytes_per_sample,
                sound_buffer_size,
                latency_sample_count: samples_per_second / game_update_hz.max(1) * 2,
                pending: None,
            };
            output.clear();
            (*sound_buffer).Play(0, 0, DSBPLAY_LOOPING);
            Some(output)
        }
    }

    /// Locks `bytes` bytes at `offset` and hands both wrapped regions to `f`.
    unsafe fn with_locked<F>(&mut self, offset: u32, bytes: u32, f: F)
    where
        F: FnOnce(&mut [i16], &mut [i16]),
    {
        let mut region1: LPVOID = null_mut();
        let mut region1_size: DWORD = 0;
        let mut region2: LPVOID = null_mut();
        let mut region2_size: DWORD = 0;
        match (*self.sound_buffer).Lock(
            offset,
            bytes,
            &mut region1,
            &mut region1_size,
            &mut region2,
            &mut region2_size,
            0,
        ) {
            DS_OK => {
                let first = region_samples(region1, region1_size);
                let second = region_samples(region2, region2_size);
                f(first, second);
                (*self.sound_buffer).Unlock(region1, region1_size, region2, region2_size);
            }
            e => error!("Could not lock the sound buffer: {:x}", e),
        }
    }

    fn clear(&mut self) {
        let size = self.sound_buffer_size;
        unsafe {
            self.with_locked(0, size, |first, second| {
                for sample in first.iter_mut().chain(second.iter_mut()) {
                    *sample = 0;
                }
            });
        }
    }
}

unsafe fn region_samples<'a>(region: LPVOID, size: DWORD) -> &'a mut [i16] {
    if region.is_null() {
        &mut []
    } else {
        slice::from_raw_parts_mut(region as *mut i16, size as usize / size_of::<i16>())
    }
}

impl AudioSink for DirectSoundOutput {
    fn samples_wanted(&mut self) -> usize {
        let mut play_cursor: DWORD = 0;
        let mut write_cursor: DWORD = 0;
        let position = unsafe {
            (*self.sound_buffer).GetCurrentPosition(&mut play_cursor, &mut write_cursor)
        };
        if position != DS_OK {
            warn!("Sound invalid: {:x}", position);
            self.pending = None;
            return 0;
        }

        let byte_to_lock =
            (self.running_sample_index * self.bytes_per_sample) % self.sound_buffer_size;
        let target_cursor = (play_cursor + self.latency_sample_count * self.bytes_per_sample)
            % self.sound_buffer_size;
        let bytes_to_write = if byte_to_lock > target_cursor {
            self.sound_buffer_size - byte_to_lock + target_cursor
        } else {
            target_cursor - byte_to_lock
        };

        self.pending = Some((byte_to_lock, bytes_to_write));
        (bytes_to_write / self.bytes_per_sample) as usize
    }

    fn submit(&mut self, samples: &[i16]) {
        let (byte_to_lock, bytes_to_write) = match self.pending.take() {
            Some(pending) => pending,
            None => return,
        };
        if bytes_to_write == 0 {
            return;
        }

        let mut written = 0;
        unsafe {
            self.with_locked(byte_to_lock, bytes_to_write, |first, second| {
                let split = first.len().min(samples.len());
                first[..split].copy_from_slice(&samples[..split]);
                let rest = &samples[split..];
                let count = second.len().min(rest.len());
                second[..count].copy_from_slice(&rest[..count]);
                written = split + count;
            });
        }
        // two channels per sample
        self.running_sample_index = self
            .running_sample_index
            .wrapping_add(written as u32 / 2);
    }
}

impl Drop for DirectSoundOutput {
    fn drop(&mut self) {
        unsafe {
            (*self.sound_buffer).Stop();
            (*self.sound_buffer).Release();
            (*self.direct_sound).Release();
        }
    }
}

struct Win32Platform {
    window: HWND,
    state: Box<WindowState>,
    gamepads: Box<dyn Gamepads>,
    audio: Box<dyn AudioSink>,
}

fn bitmap_info(buffer: &PixelBuffer) -> BITMAPINFO {
    let mut info = BITMAPINFO::default();
    info.bmiHeader.biSize = size_of::<BITMAPINFOHEADER>() as _;
    info.bmiHeader.biWidth = buffer.width() as i32;
    // negative height makes the bitmap top-down: row 0 is the top row
    info.bmiHeader.biHeight = -(buffer.height() as i32);
    info.bmiHeader.biPlanes = 1;
    info.bmiHeader.biBitCount = (buffer.bytes_per_pixel() * 8) as _;
    info.bmiHeader.biCompression = BI_RGB;
    info
}

impl Platform for Win32Platform {
    fn process_pending_messages(&mut self, keyboard: &mut ControllerInput) -> Pump {
        let mut pump = Pump::default();

        while let Some(message) = peek_message_remove() {
            match message.message {
                WM_QUIT => pump.quit = true,
                WM_KEYDOWN | WM_KEYUP | WM_SYSKEYDOWN | WM_SYSKEYUP => {
                    let vk_code = message.wParam as i32;
                    let flags = KeyFlags::from_lparam(message.lParam);

                    if flags.is_transition() {
                        if let Some(key) = translate_key(vk_code) {
                            apply_key(keyboard, key, flags.is_down);
                        }
                    }
                    if vk_code == VK_F4 && flags.alt_down {
                        info!("alt+f4");
                        pump.quit = true;
                    }
                }
                _ => unsafe {
                    TranslateMessage(&message);
                    DispatchMessageW(&message);
                },
            }
        }

        if !self.state.running.get() {
            pump.quit = true;
        }
        pump.resized = self.state.resized.take();
        pump
    }

    fn gamepads(&mut self) -> &mut dyn Gamepads {
        self.gamepads.as_mut()
    }

    fn audio(&mut self) -> &mut dyn AudioSink {
        self.audio.as_mut()
    }

    fn window_dimension(&self) -> Dimension {
        let (width, height) = client_size(self.window);
        Dimension::new(width.max(0) as u32, height.max(0) as u32)
    }

    fn display_buffer(&mut self, buffer: &PixelBuffer, target: Dimension) {
        if buffer.is_empty() {
            return;
        }
        let info = bitmap_info(buffer);
        unsafe {
            let device_context = GetDC(self.window);
            StretchDIBits(
                device_context,
                0,
                0,
                target.width as i32,
                target.height as i32,
                0,
                0,
                buffer.width() as i32,
                buffer.height() as i32,
                buffer.memory().as_ptr() as *const c_void,
                &info,
                DIB_RGB_COLORS,
                SRCCOPY,
            );
            ReleaseDC(self.window, device_context);
        }
    }
}

impl Drop for Win32Platform {
    fn drop(&mut self) {
        unsafe {
            // the state box dies with us, so the window must stop pointing at it
            SetWindowLongPtrW(self.window, GWLP_USERDATA, 0);
            DestroyWindow(self.window);
        }
    }
}

pub fn main(config: &Config) -> Result<()> {
    // the back buffer is sized once up front; the window stretches it
    let mut app = App::new(config)?;

    let state = Box::new(WindowState::new());
    let class_name = win32_string(&config.window_class_name);
    let title = win32_string(&config.window_title);

    let window = unsafe {
        let instance = GetModuleHandleW(null_mut());
        let window_class = WNDCLASSW {
            style: CS_HREDRAW | CS_VREDRAW,
            lpfnWndProc: Some(main_window_callback),
            hInstance: instance,
            lpszClassName: class_name.as_ptr(),
            ..WNDCLASSW::default()
        };

        if RegisterClassW(&window_class) == 0 {
            return Err(Error::Platform(format!(
                "Couldn't register window class: {}",
                last_error()
            )));
        }

        CreateWindowExW(
            0,
            class_name.as_ptr(),
            title.as_ptr(),
            WS_OVERLAPPEDWINDOW | WS_VISIBLE,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            null_mut(),
            null_mut(),
            instance,
            &*state as *const WindowState as LPVOID,
        )
    };
    if window.is_null() {
        return Err(Error::Platform(format!(
            "Window wasn't created: {}",
            last_error()
        )));
    }

    let gamepads: Box<dyn Gamepads> = match XInputGamepads::load() {
        Some(xinput) => Box::new(xinput),
        None => Box::new(DisconnectedGamepads),
    };
    let audio: Box<dyn AudioSink> =
        match DirectSoundOutput::init(window, config.samples_per_second, config.game_update_hz) {
            Some(direct_sound) => Box::new(direct_sound),
            None => Box::new(SilentAudio),
        };

    let mut platform = Win32Platform {
        window,
        state,
        gamepads,
        audio,
    };

    let mut clock = FrameClock::new(config.target_seconds_per_frame());
    app.run(&mut platform, Some(&mut clock))
}
