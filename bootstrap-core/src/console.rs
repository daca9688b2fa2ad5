use std::io::{BufRead, Write};

/// Switches the console to UTF-8 so interpreter banners and pip output
/// render correctly. No-op off Windows.
pub fn setup() {
    #[cfg(windows)]
    unsafe {
        use windows_sys::Win32::System::Console::{SetConsoleCP, SetConsoleOutputCP};
        const CP_UTF8: u32 = 65001;
        SetConsoleOutputCP(CP_UTF8);
        SetConsoleCP(CP_UTF8);
    }
}

/// Blocks until the user presses enter. Double-click launches get no
/// attached console afterwards, so every fatal path routes through this
/// before the window closes.
pub fn pause(prompt: &str) {
    print!("{prompt}");
    let _ = std::io::stdout().flush();
    let mut line = String::new();
    let _ = std::io::stdin().lock().read_line(&mut line);
}

/// Reads one trimmed, lowercased line (for Y/N prompts).
pub fn read_choice(prompt: &str) -> String {
    print!("{prompt}");
    let _ = std::io::stdout().flush();
    let mut line = String::new();
    let _ = std::io::stdin().lock().read_line(&mut line);
    line.trim().to_ascii_lowercase()
}
