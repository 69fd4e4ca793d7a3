//! Run-time binding to the SEGGER J-Link shared library
//!
//! The library is loaded with `libloading` and every entry point used is
//! resolved once at load time, so a missing symbol is reported up front
//! instead of in the middle of a flashing run.

use std::env;
use std::ffi::{c_char, c_int, c_void};
use std::path::{Path, PathBuf};

use libloading::Library;

use crate::error::{JLinkError, Result};

/// Environment variable overriding the library location
pub const LIBRARY_ENV: &str = "FLASHKIT_JLINK_LIB";

/// Host interface masks for `JLINKARM_EMU_GetList`
pub(crate) mod hostif {
    use std::ffi::c_int;

    pub const USB: c_int = 1;
    pub const IP: c_int = 2;
}

/// Target interface ids for `JLINKARM_TIF_Select`
pub(crate) mod tif {
    use std::ffi::c_int;

    pub const JTAG: c_int = 0;
    pub const SWD: c_int = 1;
}

/// RTT control commands for `JLINK_RTTERMINAL_Control`
pub(crate) mod rtt_cmd {
    use std::ffi::c_int;

    pub const START: c_int = 0;
    pub const STOP: c_int = 1;
}

/// `JLINKARM_EMU_CONNECT_INFO`
#[repr(C)]
#[derive(Clone, Copy)]
pub(crate) struct ConnectInfo {
    pub serial_number: u32,
    pub connection: u32,
    pub usb_addr: u32,
    pub ip_addr: [u8; 16],
    pub time: i32,
    pub time_us: u64,
    pub hw_version: u32,
    pub mac_addr: [u8; 6],
    pub product: [c_char; 32],
    pub nick_name: [c_char; 32],
    pub fw_string: [c_char; 112],
    pub is_dhcp_assigned_ip: c_char,
    pub is_dhcp_assigned_ip_is_valid: c_char,
    pub num_ip_connections: c_char,
    pub num_ip_connections_is_valid: c_char,
    pub padding: [u8; 34],
}

impl ConnectInfo {
    pub fn zeroed() -> Self {
        Self {
            serial_number: 0,
            connection: 0,
            usb_addr: 0,
            ip_addr: [0; 16],
            time: 0,
            time_us: 0,
            hw_version: 0,
            mac_addr: [0; 6],
            product: [0; 32],
            nick_name: [0; 32],
            fw_string: [0; 112],
            is_dhcp_assigned_ip: 0,
            is_dhcp_assigned_ip_is_valid: 0,
            num_ip_connections: 0,
            num_ip_connections_is_valid: 0,
            padding: [0; 34],
        }
    }

    /// Product string, if the probe reports a non-empty one
    pub fn product(&self) -> Option<String> {
        let bytes: Vec<u8> = self
            .product
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        let s = String::from_utf8_lossy(&bytes).trim().to_string();
        (!s.is_empty()).then_some(s)
    }

    /// Returns true if the probe is reached over the network
    pub fn is_ip(&self) -> bool {
        self.connection == hostif::IP as u32
    }
}

/// `JLINK_RTTERMINAL_START`
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct RttStart {
    pub config_block_address: u32,
    pub reserved: [u32; 3],
}

type EmuGetListFn = unsafe extern "C" fn(c_int, *mut ConnectInfo, c_int) -> c_int;
type EmuSelectByUsbSnFn = unsafe extern "C" fn(u32) -> c_int;
type OpenExFn = unsafe extern "C" fn(*const c_void, *const c_void) -> *const c_char;
type IsOpenFn = unsafe extern "C" fn() -> c_char;
type CloseFn = unsafe extern "C" fn();
type TifSelectFn = unsafe extern "C" fn(c_int) -> c_int;
type SetSpeedFn = unsafe extern "C" fn(u32);
type ExecCommandFn = unsafe extern "C" fn(*const c_char, *mut c_char, c_int) -> c_int;
type ConnectFn = unsafe extern "C" fn() -> c_int;
type IsConnectedFn = unsafe extern "C" fn() -> c_char;
type ReadMemU32Fn = unsafe extern "C" fn(u32, u32, *mut u32, *mut u8) -> c_int;
type ReadMemFn = unsafe extern "C" fn(u32, u32, *mut c_void) -> c_int;
type IsHaltedFn = unsafe extern "C" fn() -> c_char;
type HaltFn = unsafe extern "C" fn() -> c_char;
type DownloadFileFn = unsafe extern "C" fn(*const c_char, u32) -> c_int;
type SetResetDelayFn = unsafe extern "C" fn(c_int);
type ResetFn = unsafe extern "C" fn() -> c_int;
type GoFn = unsafe extern "C" fn();
type RttControlFn = unsafe extern "C" fn(c_int, *mut c_void) -> c_int;
type RttReadFn = unsafe extern "C" fn(u32, *mut c_char, u32) -> c_int;
type RttWriteFn = unsafe extern "C" fn(u32, *const c_char, u32) -> c_int;

/// Resolved entry points of a loaded J-Link library
///
/// The function pointers stay valid for as long as `_lib` is alive, which is
/// the lifetime of this struct.
pub(crate) struct JLinkLibrary {
    pub emu_get_list: EmuGetListFn,
    pub emu_select_by_usb_sn: EmuSelectByUsbSnFn,
    pub open_ex: OpenExFn,
    pub is_open: IsOpenFn,
    pub close: CloseFn,
    pub tif_select: TifSelectFn,
    pub set_speed: SetSpeedFn,
    pub exec_command: ExecCommandFn,
    pub connect: ConnectFn,
    pub is_connected: IsConnectedFn,
    pub read_mem_u32: ReadMemU32Fn,
    pub read_mem: ReadMemFn,
    pub is_halted: IsHaltedFn,
    pub halt: HaltFn,
    pub download_file: DownloadFileFn,
    pub set_reset_delay: SetResetDelayFn,
    pub reset: ResetFn,
    pub go: GoFn,
    pub rtt_control: RttControlFn,
    pub rtt_read: RttReadFn,
    pub rtt_write: RttWriteFn,
    _lib: Library,
}

macro_rules! symbol {
    ($lib:expr, $ty:ty, $name:literal) => {{
        // SAFETY: the symbol type matches the J-Link SDK prototype
        let sym = unsafe { $lib.get::<$ty>(concat!($name, "\0").as_bytes()) }
            .map_err(|source| JLinkError::MissingSymbol {
                name: $name,
                source,
            })?;
        *sym
    }};
}

impl JLinkLibrary {
    /// Load the library from `path`, or from the environment override, or
    /// from the platform's default locations
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let candidates = match path {
            Some(p) => vec![p.to_path_buf()],
            None => match env::var_os(LIBRARY_ENV) {
                Some(p) => vec![PathBuf::from(p)],
                None => default_candidates(),
            },
        };

        let explicit = candidates.len() == 1;
        for candidate in &candidates {
            log::debug!("jlink: Trying library {}", candidate.display());
            // SAFETY: loading runs the library's initialisers; the SEGGER
            // library has no unsound ones
            match unsafe { Library::new(candidate) } {
                Ok(lib) => return Self::bind(lib, candidate),
                Err(source) if explicit => {
                    return Err(JLinkError::LibraryLoad {
                        path: candidate.clone(),
                        source,
                    })
                }
                Err(e) => log::trace!("jlink: {}: {}", candidate.display(), e),
            }
        }

        Err(JLinkError::LibraryNotFound {
            tried: candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    fn bind(lib: Library, path: &Path) -> Result<Self> {
        let library = Self {
            emu_get_list: symbol!(lib, EmuGetListFn, "JLINKARM_EMU_GetList"),
            emu_select_by_usb_sn: symbol!(lib, EmuSelectByUsbSnFn, "JLINKARM_EMU_SelectByUSBSN"),
            open_ex: symbol!(lib, OpenExFn, "JLINKARM_OpenEx"),
            is_open: symbol!(lib, IsOpenFn, "JLINKARM_IsOpen"),
            close: symbol!(lib, CloseFn, "JLINKARM_Close"),
            tif_select: symbol!(lib, TifSelectFn, "JLINKARM_TIF_Select"),
            set_speed: symbol!(lib, SetSpeedFn, "JLINKARM_SetSpeed"),
            exec_command: symbol!(lib, ExecCommandFn, "JLINKARM_ExecCommand"),
            connect: symbol!(lib, ConnectFn, "JLINKARM_Connect"),
            is_connected: symbol!(lib, IsConnectedFn, "JLINKARM_IsConnected"),
            read_mem_u32: symbol!(lib, ReadMemU32Fn, "JLINKARM_ReadMemU32"),
            read_mem: symbol!(lib, ReadMemFn, "JLINKARM_ReadMem"),
            is_halted: symbol!(lib, IsHaltedFn, "JLINKARM_IsHalted"),
            halt: symbol!(lib, HaltFn, "JLINKARM_Halt"),
            download_file: symbol!(lib, DownloadFileFn, "JLINK_DownloadFile"),
            set_reset_delay: symbol!(lib, SetResetDelayFn, "JLINKARM_SetResetDelay"),
            reset: symbol!(lib, ResetFn, "JLINKARM_Reset"),
            go: symbol!(lib, GoFn, "JLINKARM_Go"),
            rtt_control: symbol!(lib, RttControlFn, "JLINK_RTTERMINAL_Control"),
            rtt_read: symbol!(lib, RttReadFn, "JLINK_RTTERMINAL_Read"),
            rtt_write: symbol!(lib, RttWriteFn, "JLINK_RTTERMINAL_Write"),
            _lib: lib,
        };
        log::debug!("jlink: Loaded {}", path.display());
        Ok(library)
    }
}

fn default_candidates() -> Vec<PathBuf> {
    let names: &[&str] = if cfg!(target_os = "windows") {
        &[
            "JLink_x64.dll",
            "JLinkARM.dll",
            "C:\\Program Files\\SEGGER\\JLink\\JLink_x64.dll",
        ]
    } else if cfg!(target_os = "macos") {
        &[
            "libjlinkarm.dylib",
            "/Applications/SEGGER/JLink/libjlinkarm.dylib",
        ]
    } else {
        &[
            "libjlinkarm.so",
            "libjlinkarm.so.8",
            "/opt/SEGGER/JLink/libjlinkarm.so",
        ]
    };
    names.iter().map(PathBuf::from).collect()
}
