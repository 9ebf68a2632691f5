//! Terminal detection, used to decide whether output gets colored.

#[cfg(unix)]
mod unix {
    /// True when stdout is a terminal.
    pub fn use_color() -> bool {
        // Safety: isatty only inspects the file descriptor.
        unsafe { libc::isatty(/* stdout */ 1) == 1 }
    }
}

#[cfg(unix)]
pub use unix::*;

#[cfg(windows)]
mod windows {
    use windows_sys::Win32::System::Console::*;

    /// True when stdout is a console that accepts ANSI color sequences.
    pub fn use_color() -> bool {
        unsafe {
            let handle = GetStdHandle(STD_OUTPUT_HANDLE);
            let mut mode = 0;
            // Note: GetConsoleMode itself fails when not attached to a console.
            if GetConsoleMode(handle, &mut mode) == 0 {
                return false;
            }
            SetConsoleMode(handle, mode | ENABLE_VIRTUAL_TERMINAL_PROCESSING) != 0
        }
    }
}

#[cfg(windows)]
pub use windows::*;

#[cfg(target_arch = "wasm32")]
pub fn use_color() -> bool {
    false
}
