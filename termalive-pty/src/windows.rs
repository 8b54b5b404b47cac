//! Windows PTY backend built on the ConPTY API.
//!
//! Unlike the Unix backend, ConPTY exposes no pollable handle: callers drain
//! output by issuing blocking `ReadFile` calls from a dedicated thread
//! (Windows ConPTY).

use std::ffi::OsStr;
use std::os::windows::ffi::OsStrExt;
use std::ptr;

use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::Storage::FileSystem::{ReadFile, WriteFile};
use windows::Win32::System::Console::{
    ClosePseudoConsole, CreatePseudoConsole, HPCON, COORD, ResizePseudoConsole,
};
use windows::Win32::System::Pipes::CreatePipe;
use windows::Win32::System::Threading::{
    CREATE_UNICODE_ENVIRONMENT, CreateProcessW, DeleteProcThreadAttributeList,
    EXTENDED_STARTUPINFO_PRESENT, GetExitCodeProcess,
    InitializeProcThreadAttributeList, LPPROC_THREAD_ATTRIBUTE_LIST,
    PROC_THREAD_ATTRIBUTE_PSEUDOCONSOLE, PROCESS_INFORMATION,
    STARTUPINFOEXW, STARTUPINFOW, TerminateProcess, UpdateProcThreadAttribute,
    WaitForSingleObject, INFINITE,
};

use crate::options::PtyOptions;
use crate::session::Session;
use crate::{PtySize, SessionError};

/// A ConPTY-backed pseudo terminal session.
pub struct WindowsSession {
    pty: HPCON,
    input_write: HANDLE,
    output_read: HANDLE,
    process: HANDLE,
    process_id: u32,
    exit_code: Option<i32>,
    attribute_list: Box<[u8]>,
}

// Safety: the handles above are only ever touched through `&mut self`, so a
// `WindowsSession` can move between threads freely as long as it isn't
// shared concurrently, matching the `Session: Send` contract.
unsafe impl Send for WindowsSession {}

impl WindowsSession {
    fn read_handle_result(res: windows::core::Result<()>, bytes_read: u32) -> Result<usize, SessionError> {
        match res {
            Ok(()) => Ok(bytes_read as usize),
            Err(err) if err.code().0 as u32 == 0x8007_006D => {
                // ERROR_BROKEN_PIPE: the child closed its console.
                Ok(0)
            },
            Err(err) => Err(SessionError::IO(std::io::Error::from_raw_os_error(
                err.code().0,
            ))),
        }
    }
}

impl Session for WindowsSession {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SessionError> {
        let mut bytes_read: u32 = 0;
        let res = unsafe {
            ReadFile(
                self.output_read,
                Some(buf),
                Some(&mut bytes_read),
                None,
            )
        };
        Self::read_handle_result(res, bytes_read)
    }

    fn write(&mut self, input: &[u8]) -> Result<usize, SessionError> {
        let mut bytes_written: u32 = 0;
        unsafe {
            WriteFile(
                self.input_write,
                Some(input),
                Some(&mut bytes_written),
                None,
            )
        }
        .map_err(|err| {
            SessionError::IO(std::io::Error::from_raw_os_error(err.code().0))
        })?;
        Ok(bytes_written as usize)
    }

    fn resize(&mut self, size: PtySize) -> Result<(), SessionError> {
        let coord = COORD { X: size.cols as i16, Y: size.rows as i16 };
        unsafe { ResizePseudoConsole(self.pty, coord) }.map_err(|err| {
            SessionError::Resize(std::io::Error::from_raw_os_error(err.code().0))
        })
    }

    fn kill(&mut self, _force: bool) -> Result<(), SessionError> {
        // ConPTY has no graceful-shutdown signal; every kill is unconditional.
        unsafe { TerminateProcess(self.process, 1) }.map_err(|err| {
            SessionError::IO(std::io::Error::from_raw_os_error(err.code().0))
        })
    }

    fn wait_for_exit(&mut self) -> Result<i32, SessionError> {
        if let Some(code) = self.exit_code {
            return Ok(code);
        }

        unsafe { WaitForSingleObject(self.process, INFINITE) };

        let mut raw_code: u32 = 0;
        unsafe { GetExitCodeProcess(self.process, &mut raw_code) }.map_err(
            |err| SessionError::IO(std::io::Error::from_raw_os_error(err.code().0)),
        )?;

        let code = raw_code as i32;
        self.exit_code = Some(code);
        Ok(code)
    }

    fn process_id(&self) -> Option<u32> {
        Some(self.process_id)
    }

    fn has_exited(&mut self) -> bool {
        if self.exit_code.is_some() {
            return true;
        }

        let mut raw_code: u32 = 0;
        if unsafe { GetExitCodeProcess(self.process, &mut raw_code) }.is_ok() {
            const STILL_ACTIVE: u32 = 259;
            if raw_code != STILL_ACTIVE {
                self.exit_code = Some(raw_code as i32);
            }
        }

        self.exit_code.is_some()
    }

    fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }
}

impl Drop for WindowsSession {
    fn drop(&mut self) {
        unsafe {
            ClosePseudoConsole(self.pty);
            let _ = CloseHandle(self.input_write);
            let _ = CloseHandle(self.output_read);
            let _ = CloseHandle(self.process);
        }
    }
}

fn wide_null(value: &OsStr) -> Vec<u16> {
    value.encode_wide().chain(std::iter::once(0)).collect()
}

fn build_command_line(options: &PtyOptions) -> Vec<u16> {
    let mut line = options.command.clone();
    for arg in &options.arguments {
        line.push(' ');
        // Minimal quoting: wrap arguments containing whitespace in quotes.
        if arg.contains(' ') {
            line.push('"');
            line.push_str(arg);
            line.push('"');
        } else {
            line.push_str(arg);
        }
    }
    wide_null(OsStr::new(&line))
}

fn build_environment_block(options: &PtyOptions) -> Option<Vec<u16>> {
    if options.environment.is_empty() {
        return None;
    }

    let mut block = Vec::new();
    for (key, value) in std::env::vars() {
        block.extend(wide_null(OsStr::new(&format!("{key}={value}"))));
    }
    // Entries appended after the inherited block take precedence: Windows
    // scans for the first matching name, so overrides must come first.
    let mut overrides: Vec<u16> = Vec::new();
    for (key, value) in &options.environment {
        overrides.extend(wide_null(OsStr::new(&format!("{key}={value}"))));
    }
    overrides.extend(block);
    overrides.push(0);
    Some(overrides)
}

/// Spawn the command described by `options` attached to a fresh ConPTY.
pub fn spawn(options: PtyOptions) -> Result<WindowsSession, SessionError> {
    let size = options.pty_size();

    let (input_read, input_write) = create_pipe_pair()?;
    let (output_read, output_write) = create_pipe_pair()?;

    let coord = COORD { X: size.cols as i16, Y: size.rows as i16 };
    let pty = unsafe { CreatePseudoConsole(coord, input_read, output_write, 0) }
        .map_err(|_| SessionError::Create(crate::errors::PtyCreateError::from_last_os_error()))?;

    unsafe {
        let _ = CloseHandle(input_read);
        let _ = CloseHandle(output_write);
    }

    let mut attr_size: usize = 0;
    unsafe {
        let _ = InitializeProcThreadAttributeList(
            LPPROC_THREAD_ATTRIBUTE_LIST::default(),
            1,
            None,
            &mut attr_size,
        );
    }
    let mut attribute_list = vec![0u8; attr_size].into_boxed_slice();
    let attribute_list_ptr =
        LPPROC_THREAD_ATTRIBUTE_LIST(attribute_list.as_mut_ptr().cast());

    unsafe {
        InitializeProcThreadAttributeList(
            attribute_list_ptr,
            1,
            None,
            &mut attr_size,
        )
        .map_err(|_| {
            SessionError::Create(crate::errors::PtyCreateError::from_last_os_error())
        })?;

        UpdateProcThreadAttribute(
            attribute_list_ptr,
            0,
            PROC_THREAD_ATTRIBUTE_PSEUDOCONSOLE as usize,
            Some(pty.0.cast()),
            std::mem::size_of::<HPCON>(),
            None,
            None,
        )
        .map_err(|_| {
            SessionError::Create(crate::errors::PtyCreateError::from_last_os_error())
        })?;
    }

    let mut startup_info = STARTUPINFOEXW {
        StartupInfo: STARTUPINFOW {
            cb: std::mem::size_of::<STARTUPINFOEXW>() as u32,
            ..Default::default()
        },
        lpAttributeList: attribute_list_ptr,
    };

    let mut command_line = build_command_line(&options);
    let environment_block = build_environment_block(&options);
    let working_directory: Option<Vec<u16>> = options
        .working_directory
        .as_ref()
        .map(|dir| wide_null(OsStr::new(dir)));

    let mut process_info = PROCESS_INFORMATION::default();

    let creation_flags = EXTENDED_STARTUPINFO_PRESENT
        | if environment_block.is_some() {
            CREATE_UNICODE_ENVIRONMENT
        } else {
            Default::default()
        };

    unsafe {
        CreateProcessW(
            None,
            Some(windows::core::PWSTR(command_line.as_mut_ptr())),
            None,
            None,
            false,
            creation_flags,
            environment_block
                .as_ref()
                .map(|b| b.as_ptr().cast::<std::ffi::c_void>())
                .unwrap_or(ptr::null()) as _,
            working_directory
                .as_ref()
                .map(|w| windows::core::PCWSTR(w.as_ptr()))
                .unwrap_or(windows::core::PCWSTR::null()),
            &startup_info.StartupInfo,
            &mut process_info,
        )
    }
    .map_err(|_| {
        SessionError::Create(crate::errors::PtyCreateError::from_last_os_error())
    })?;

    unsafe {
        DeleteProcThreadAttributeList(attribute_list_ptr);
        let _ = CloseHandle(process_info.hThread);
    }

    Ok(WindowsSession {
        pty,
        input_write,
        output_read,
        process: process_info.hProcess,
        process_id: process_info.dwProcessId,
        exit_code: None,
        attribute_list,
    })
}

fn create_pipe_pair() -> Result<(HANDLE, HANDLE), SessionError> {
    let mut read = HANDLE::default();
    let mut write = HANDLE::default();
    unsafe { CreatePipe(&mut read, &mut write, None, 0) }.map_err(|_| {
        SessionError::Create(crate::errors::PtyCreateError::from_last_os_error())
    })?;
    Ok((read, write))
}
