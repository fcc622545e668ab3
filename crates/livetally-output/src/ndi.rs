//! NDI SDK backend.
//!
//! Raw bindings to the handful of NDI send-side entry points the monitor
//! uses. The library is initialized exactly once per process; connection
//! handles are created and destroyed per session.

use std::ffi::{c_char, c_int, c_void, CString};
use std::ptr;
use std::sync::OnceLock;

use tracing::{debug, info};

use crate::backend::BroadcastBackend;
use crate::buffer::FrameBuffer;
use crate::error::OutputError;
use crate::{OutputResult, VideoMode};

/// BGRA FourCC as declared by the SDK ('B','G','R','A' little-endian).
const FOURCC_BGRA: c_int = 0x41524742;

/// Progressive frame format.
const FRAME_FORMAT_PROGRESSIVE: c_int = 1;

#[repr(C)]
struct NdiSendCreate {
    name: *const c_char,
    groups: *const c_char,
    clock_video: bool,
    clock_audio: bool,
}

#[repr(C)]
struct NdiVideoFrame {
    xres: c_int,
    yres: c_int,
    fourcc: c_int,
    frame_rate_n: c_int,
    frame_rate_d: c_int,
    picture_aspect_ratio: f32,
    frame_format_type: c_int,
    timecode: i64,
    data: *const u8,
    line_stride_in_bytes: c_int,
    metadata: *const c_char,
    timestamp: i64,
}

#[repr(C)]
struct NdiMetadataFrame {
    length: c_int,
    timecode: i64,
    data: *const c_char,
}

#[link(name = "ndi")]
extern "C" {
    fn NDIlib_initialize() -> bool;
    fn NDIlib_send_create(create: *const NdiSendCreate) -> *mut c_void;
    fn NDIlib_send_destroy(instance: *mut c_void);
    fn NDIlib_send_send_video_v2(instance: *mut c_void, frame: *const NdiVideoFrame);
    fn NDIlib_send_send_metadata(instance: *mut c_void, frame: *const NdiMetadataFrame);
}

/// Whether the one-time library initialization succeeded.
static SDK_INITIALIZED: OnceLock<bool> = OnceLock::new();

fn ensure_initialized() -> OutputResult<()> {
    let ok = *SDK_INITIALIZED.get_or_init(|| {
        let ok = unsafe { NDIlib_initialize() };
        if ok {
            info!("NDI library initialized");
        }
        ok
    });

    if ok {
        Ok(())
    } else {
        Err(OutputError::SdkInit(
            "NDIlib_initialize returned false (unsupported CPU?)".into(),
        ))
    }
}

/// NDI send-side backend. One connection handle per session.
pub struct NdiBackend {
    instance: *mut c_void,
}

// SAFETY: the send instance is only ever driven from one place at a time;
// the sender's mutex serializes all calls into the SDK.
unsafe impl Send for NdiBackend {}

impl NdiBackend {
    /// Initialize the SDK (once per process) and create the backend.
    pub fn new() -> OutputResult<Self> {
        ensure_initialized()?;
        Ok(Self {
            instance: ptr::null_mut(),
        })
    }
}

impl BroadcastBackend for NdiBackend {
    fn connect(&mut self, session_name: &str) -> OutputResult<()> {
        let name = CString::new(session_name)
            .map_err(|_| OutputError::ConnectionFailed("session name contains NUL".into()))?;

        let create = NdiSendCreate {
            name: name.as_ptr(),
            groups: ptr::null(),
            clock_video: true,
            clock_audio: false,
        };

        let instance = unsafe { NDIlib_send_create(&create) };
        if instance.is_null() {
            return Err(OutputError::ConnectionFailed(
                "NDIlib_send_create returned null".into(),
            ));
        }

        debug!(session_name, "NDI send instance created");
        self.instance = instance;
        Ok(())
    }

    fn send_video(&mut self, frame: &FrameBuffer, mode: &VideoMode) -> OutputResult<()> {
        if self.instance.is_null() {
            return Err(OutputError::Send("no send instance".into()));
        }

        let video = NdiVideoFrame {
            xres: mode.width as c_int,
            yres: mode.height as c_int,
            fourcc: FOURCC_BGRA,
            frame_rate_n: mode.frame_rate_n as c_int,
            frame_rate_d: mode.frame_rate_d as c_int,
            picture_aspect_ratio: mode.width as f32 / mode.height as f32,
            frame_format_type: FRAME_FORMAT_PROGRESSIVE,
            timecode: i64::MAX, // SDK convention: synthesize the timecode
            data: frame.data().as_ptr(),
            line_stride_in_bytes: frame.stride() as c_int,
            metadata: ptr::null(),
            timestamp: 0,
        };

        unsafe { NDIlib_send_send_video_v2(self.instance, &video) };
        Ok(())
    }

    fn send_metadata(&mut self, record: &str) -> OutputResult<()> {
        if self.instance.is_null() {
            return Err(OutputError::Send("no send instance".into()));
        }

        let data = CString::new(record)
            .map_err(|_| OutputError::Send("metadata contains NUL".into()))?;

        let frame = NdiMetadataFrame {
            length: record.len() as c_int,
            timecode: i64::MAX,
            data: data.as_ptr(),
        };

        unsafe { NDIlib_send_send_metadata(self.instance, &frame) };
        Ok(())
    }

    fn disconnect(&mut self) {
        if !self.instance.is_null() {
            unsafe { NDIlib_send_destroy(self.instance) };
            self.instance = ptr::null_mut();
            debug!("NDI send instance destroyed");
        }
    }

    fn name(&self) -> &'static str {
        "ndi"
    }
}

impl Drop for NdiBackend {
    fn drop(&mut self) {
        self.disconnect();
    }
}
