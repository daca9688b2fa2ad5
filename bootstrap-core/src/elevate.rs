use std::path::{Path, PathBuf};

pub const WORKING_DIR_FLAG: &str = "--working-dir=";

/// Extracts the `--working-dir=<path>` value from the argument list,
/// stripping surrounding quotes if present.
pub fn parse_working_dir(args: &[String]) -> Option<PathBuf> {
    for arg in args {
        if let Some(value) = arg.strip_prefix(WORKING_DIR_FLAG) {
            let cleaned: String = value.chars().filter(|c| *c != '"').collect();
            if !cleaned.is_empty() {
                return Some(PathBuf::from(cleaned));
            }
        }
    }
    None
}

/// Arguments to forward when relaunching elevated: any prior
/// `--working-dir=` is dropped and a fresh one carrying the pre-elevation
/// working directory is injected first. Everything else passes through
/// unchanged.
pub fn forwarded_args(args: &[String], workdir: &Path) -> Vec<String> {
    let mut out = vec![format!("{WORKING_DIR_FLAG}\"{}\"", workdir.display())];
    out.extend(
        args.iter()
            .filter(|arg| !arg.starts_with("--working-dir"))
            .cloned(),
    );
    out
}

/// Whether the current process holds BUILTIN\Administrators membership.
#[cfg(windows)]
pub fn is_elevated() -> bool {
    use windows_sys::Win32::Foundation::FALSE;
    use windows_sys::Win32::Security::{
        AllocateAndInitializeSid, CheckTokenMembership, FreeSid, SECURITY_NT_AUTHORITY,
    };
    use windows_sys::Win32::System::SystemServices::{
        DOMAIN_ALIAS_RID_ADMINS, SECURITY_BUILTIN_DOMAIN_RID,
    };

    unsafe {
        let authority = SECURITY_NT_AUTHORITY;
        let mut admins_group = std::ptr::null_mut();
        let mut is_member = FALSE;
        if AllocateAndInitializeSid(
            &authority,
            2,
            SECURITY_BUILTIN_DOMAIN_RID as u32,
            DOMAIN_ALIAS_RID_ADMINS as u32,
            0,
            0,
            0,
            0,
            0,
            0,
            &mut admins_group,
        ) != 0
        {
            CheckTokenMembership(0, admins_group, &mut is_member);
            FreeSid(admins_group);
        }
        is_member != FALSE
    }
}

#[cfg(not(windows))]
pub fn is_elevated() -> bool {
    true
}

/// Fire-and-forget elevation: requests a relaunch of the current executable
/// with the `runas` verb and exits immediately. There is no result channel;
/// a rejected prompt is surfaced by the platform, not observed here.
#[cfg(windows)]
pub fn relaunch_elevated(args: &[String], workdir: &Path) -> ! {
    use std::os::windows::ffi::OsStrExt;
    use windows_sys::Win32::UI::Shell::ShellExecuteW;
    use windows_sys::Win32::UI::WindowsAndMessaging::SW_SHOWNORMAL;

    let exe = std::env::current_exe().unwrap_or_default();
    let params = forwarded_args(args, workdir).join(" ");

    let to_wide = |s: &std::ffi::OsStr| -> Vec<u16> {
        s.encode_wide().chain(std::iter::once(0)).collect()
    };
    let verb = to_wide(std::ffi::OsStr::new("runas"));
    let file = to_wide(exe.as_os_str());
    let params = to_wide(std::ffi::OsStr::new(&params));

    unsafe {
        ShellExecuteW(
            0,
            verb.as_ptr(),
            file.as_ptr(),
            params.as_ptr(),
            std::ptr::null(),
            SW_SHOWNORMAL,
        );
    }
    std::process::exit(0);
}

#[cfg(not(windows))]
pub fn relaunch_elevated(_args: &[String], _workdir: &Path) -> ! {
    eprintln!("warning: privilege elevation is not available on this platform");
    std::process::exit(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_working_dir_strips_quotes() {
        let args = vec![format!("{WORKING_DIR_FLAG}\"C:\\Apps\\My App\"")];
        assert_eq!(
            parse_working_dir(&args),
            Some(PathBuf::from(r"C:\Apps\My App"))
        );
    }

    #[test]
    fn parse_working_dir_absent() {
        let args = vec!["--verbose".to_string()];
        assert_eq!(parse_working_dir(&args), None);
    }

    #[test]
    fn forwarded_args_replace_working_dir() {
        let args = vec![
            format!("{WORKING_DIR_FLAG}\"C:\\old\""),
            "--verbose".to_string(),
        ];
        let out = forwarded_args(&args, Path::new(r"C:\new"));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], format!("{WORKING_DIR_FLAG}\"C:\\new\""));
        assert_eq!(out[1], "--verbose");
    }

    #[test]
    fn forwarded_args_pass_unknown_flags_through() {
        let args = vec!["--foo".to_string(), "bar".to_string()];
        let out = forwarded_args(&args, Path::new("/tmp/work"));
        assert_eq!(&out[1..], &["--foo".to_string(), "bar".to_string()]);
    }
}
