//! J-Link probe implementation
//!
//! This module provides the `JLink` struct that implements the
//! `DebugTransport` trait on top of the SEGGER shared library.
//!
//! The SEGGER library keeps one probe session per process; a `JLink` owns
//! that session while it is open.

use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::path::Path;
use std::ptr;

use flashkit_core::error::{Error as CoreError, Result as CoreResult};
use flashkit_core::probe::{Connection, ProbeInfo, ProbeKind};
use flashkit_core::programmer::{DebugTransport, Interface};

use crate::error::Result;
use crate::library::{hostif, rtt_cmd, tif, ConnectInfo, JLinkLibrary, RttStart};
use crate::options::JLinkOptions;

/// Size of the error buffer passed to `JLINKARM_ExecCommand`
const ERROR_BUF_SIZE: usize = 256;

/// Delay after reset before the core is released, in milliseconds
const RESET_DELAY_MS: c_int = 0;

/// SEGGER J-Link probe
pub struct JLink {
    lib: JLinkLibrary,
    speed_khz: u32,
    open: bool,
}

impl JLink {
    /// Load the J-Link library named by `options` (or the default one)
    pub fn load(options: &JLinkOptions) -> Result<Self> {
        let lib = JLinkLibrary::load(options.library.as_deref())?;
        Ok(Self {
            lib,
            speed_khz: options.speed_khz,
            open: false,
        })
    }

    fn exec_command(&mut self, command: &str) -> CoreResult<()> {
        let cmd = CString::new(command)
            .map_err(|_| CoreError::InvalidParameter(format!("NUL in command {:?}", command)))?;
        let mut err_buf = [0 as c_char; ERROR_BUF_SIZE];
        // SAFETY: cmd is NUL terminated, err_buf is ERROR_BUF_SIZE long
        unsafe {
            (self.lib.exec_command)(cmd.as_ptr(), err_buf.as_mut_ptr(), ERROR_BUF_SIZE as c_int)
        };
        // SAFETY: the library NUL terminates the buffer, and it starts zeroed
        let message = unsafe { CStr::from_ptr(err_buf.as_ptr()) }
            .to_string_lossy()
            .into_owned();
        if message.is_empty() {
            Ok(())
        } else {
            Err(CoreError::InvalidParameter(format!("{}: {}", command, message)))
        }
    }

    fn require_open(&self) -> CoreResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(CoreError::NotOpen)
        }
    }
}

/// Enumerate attached J-Link probes
pub fn enumerate(options: &JLinkOptions) -> CoreResult<Vec<ProbeInfo>> {
    let jlink = JLink::load(options)?;
    jlink.list_probes()
}

impl DebugTransport for JLink {
    fn list_probes(&self) -> CoreResult<Vec<ProbeInfo>> {
        let mask = hostif::USB | hostif::IP;
        // SAFETY: a null buffer with size 0 only queries the count
        let count = unsafe { (self.lib.emu_get_list)(mask, ptr::null_mut(), 0) };
        if count < 0 {
            return Err(CoreError::Library(format!(
                "JLINKARM_EMU_GetList failed with {}",
                count
            )));
        }
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut infos = vec![ConnectInfo::zeroed(); count as usize];
        // SAFETY: infos holds `count` elements
        let count = unsafe { (self.lib.emu_get_list)(mask, infos.as_mut_ptr(), count) };
        if count < 0 {
            return Err(CoreError::Library(format!(
                "JLINKARM_EMU_GetList failed with {}",
                count
            )));
        }
        infos.truncate(count as usize);

        Ok(infos
            .iter()
            .map(|info| {
                let mut probe =
                    ProbeInfo::new(ProbeKind::JLink, Some(info.serial_number), info.product());
                if info.is_ip() {
                    probe.connection = Connection::Ip;
                }
                probe
            })
            .collect())
    }

    fn open(&mut self, serial: Option<u32>) -> CoreResult<()> {
        if let Some(sn) = serial {
            log::debug!("jlink: Selecting probe {}", sn);
            // SAFETY: plain value call
            if unsafe { (self.lib.emu_select_by_usb_sn)(sn) } < 0 {
                return Err(CoreError::ProbeNotFound { serial: Some(sn) });
            }
        }

        // SAFETY: null log handlers are accepted by the library
        let err = unsafe { (self.lib.open_ex)(ptr::null(), ptr::null()) };
        if !err.is_null() {
            // SAFETY: a non-null result is a static NUL terminated message
            let msg = unsafe { CStr::from_ptr(err) }.to_string_lossy().into_owned();
            return Err(CoreError::OpenFailed(msg));
        }
        // SAFETY: plain call
        if unsafe { (self.lib.is_open)() } == 0 {
            return Err(CoreError::OpenFailed("probe did not open".into()));
        }
        self.open = true;

        // SAFETY: plain value call
        unsafe { (self.lib.set_speed)(self.speed_khz) };
        log::debug!("jlink: Opened, speed {} kHz", self.speed_khz);
        Ok(())
    }

    fn is_open(&self) -> bool {
        // SAFETY: plain call
        self.open && unsafe { (self.lib.is_open)() } != 0
    }

    fn select_interface(&mut self, interface: Interface) -> CoreResult<()> {
        self.require_open()?;
        let id = match interface {
            Interface::Swd => tif::SWD,
            Interface::Jtag => tif::JTAG,
        };
        // SAFETY: plain value call
        let res = unsafe { (self.lib.tif_select)(id) };
        if res != 0 {
            return Err(CoreError::InterfaceSelect(format!(
                "{} not supported (code {})",
                interface, res
            )));
        }
        Ok(())
    }

    fn connect(&mut self, target: &str) -> CoreResult<()> {
        self.require_open()?;
        self.exec_command(&format!("device = {}", target))
            .map_err(|e| CoreError::ConnectFailed {
                target: target.to_string(),
                reason: e.to_string(),
            })?;
        // SAFETY: plain call
        let res = unsafe { (self.lib.connect)() };
        if res < 0 {
            return Err(CoreError::ConnectFailed {
                target: target.to_string(),
                reason: format!("JLINKARM_Connect returned {}", res),
            });
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        // SAFETY: plain call
        self.open && unsafe { (self.lib.is_connected)() } != 0
    }

    fn read_u32(&mut self, address: u32) -> CoreResult<u32> {
        self.require_open()?;
        let mut data = 0u32;
        let mut status = 0u8;
        // SAFETY: one word and one status byte are provided
        let n = unsafe { (self.lib.read_mem_u32)(address, 1, &mut data, &mut status) };
        if n < 1 || status != 0 {
            return Err(CoreError::ReadFailed {
                address,
                reason: format!("returned {} (status {})", n, status),
            });
        }
        Ok(data)
    }

    fn read_memory(&mut self, address: u32, buf: &mut [u8]) -> CoreResult<()> {
        self.require_open()?;
        // SAFETY: buf is valid for buf.len() bytes
        let res = unsafe {
            (self.lib.read_mem)(address, buf.len() as u32, buf.as_mut_ptr() as *mut c_void)
        };
        if res != 0 {
            return Err(CoreError::ReadFailed {
                address,
                reason: format!("JLINKARM_ReadMem returned {}", res),
            });
        }
        Ok(())
    }

    fn is_halted(&mut self) -> CoreResult<bool> {
        self.require_open()?;
        // SAFETY: plain call
        match unsafe { (self.lib.is_halted)() } {
            res if res < 0 => Err(CoreError::HaltFailed(format!(
                "JLINKARM_IsHalted returned {}",
                res
            ))),
            0 => Ok(false),
            _ => Ok(true),
        }
    }

    fn halt(&mut self) -> CoreResult<()> {
        self.require_open()?;
        // SAFETY: plain call
        let res = unsafe { (self.lib.halt)() };
        if res != 0 {
            return Err(CoreError::HaltFailed(format!(
                "JLINKARM_Halt returned {}",
                res
            )));
        }
        Ok(())
    }

    fn flash_file(&mut self, path: &Path, base_address: u32) -> CoreResult<i32> {
        self.require_open()?;
        let path_str = path
            .to_str()
            .ok_or_else(|| CoreError::FlashFailed(format!("non UTF-8 path {}", path.display())))?;
        let c_path = CString::new(path_str)
            .map_err(|_| CoreError::FlashFailed(format!("NUL in path {}", path.display())))?;
        // SAFETY: c_path is NUL terminated
        let code = unsafe { (self.lib.download_file)(c_path.as_ptr(), base_address) };
        Ok(code)
    }

    fn reset(&mut self, halt: bool) -> CoreResult<()> {
        self.require_open()?;
        // SAFETY: plain value calls
        unsafe { (self.lib.set_reset_delay)(RESET_DELAY_MS) };
        let res = unsafe { (self.lib.reset)() };
        if res < 0 {
            return Err(CoreError::ResetFailed(format!(
                "JLINKARM_Reset returned {}",
                res
            )));
        }
        if !halt {
            // SAFETY: plain call
            unsafe { (self.lib.go)() };
        }
        Ok(())
    }

    fn close(&mut self) {
        if self.open {
            log::debug!("jlink: Closing probe");
            // SAFETY: plain call, valid while open
            unsafe { (self.lib.close)() };
            self.open = false;
        }
    }

    fn rtt_start(&mut self, control_block: Option<u32>) -> CoreResult<()> {
        self.require_open()?;
        let mut start = RttStart {
            config_block_address: control_block.unwrap_or(0),
            ..Default::default()
        };
        let arg = match control_block {
            Some(_) => &mut start as *mut RttStart as *mut c_void,
            None => ptr::null_mut(),
        };
        // SAFETY: arg is null or points at a live RttStart
        let res = unsafe { (self.lib.rtt_control)(rtt_cmd::START, arg) };
        if res < 0 {
            return Err(CoreError::Rtt(format!("start returned {}", res)));
        }
        Ok(())
    }

    fn rtt_stop(&mut self) -> CoreResult<()> {
        self.require_open()?;
        // SAFETY: STOP takes no argument
        let res = unsafe { (self.lib.rtt_control)(rtt_cmd::STOP, ptr::null_mut()) };
        if res < 0 {
            return Err(CoreError::Rtt(format!("stop returned {}", res)));
        }
        Ok(())
    }

    fn rtt_read(&mut self, channel: u32, buf: &mut [u8]) -> CoreResult<usize> {
        self.require_open()?;
        // SAFETY: buf is valid for buf.len() bytes
        let n = unsafe {
            (self.lib.rtt_read)(channel, buf.as_mut_ptr() as *mut c_char, buf.len() as u32)
        };
        if n < 0 {
            return Err(CoreError::Rtt(format!("read returned {}", n)));
        }
        Ok(n as usize)
    }

    fn rtt_write(&mut self, channel: u32, data: &[u8]) -> CoreResult<usize> {
        self.require_open()?;
        // SAFETY: data is valid for data.len() bytes
        let n = unsafe {
            (self.lib.rtt_write)(channel, data.as_ptr() as *const c_char, data.len() as u32)
        };
        if n < 0 {
            return Err(CoreError::Rtt(format!("write returned {}", n)));
        }
        Ok(n as usize)
    }
}

impl Drop for JLink {
    fn drop(&mut self) {
        self.close();
    }
}
