use semver::Version;

/// Supported interpreter range: inclusive lower bound, exclusive upper bound.
pub const MIN_SUPPORTED: Version = Version::new(3, 8, 0);
pub const MAX_EXCLUSIVE: Version = Version::new(3, 14, 0);

pub fn is_supported(version: &Version) -> bool {
    *version >= MIN_SUPPORTED && *version < MAX_EXCLUSIVE
}

pub fn supported_range() -> String {
    format!(">= {MIN_SUPPORTED} and < {MAX_EXCLUSIVE}")
}

/// Parses a `python --version` banner such as "Python 3.12.8\r\n".
pub fn parse_banner(banner: &str) -> Option<Version> {
    let rest = banner.split("Python ").nth(1)?;
    let token = rest.split_whitespace().next()?;
    parse_loose(token)
}

/// Lenient version parse: accepts "3.12", "3.12.8", "3.13.0rc1";
/// missing trailing components are treated as zero.
pub fn parse_loose(text: &str) -> Option<Version> {
    let mut parts = [0u64; 3];
    let mut seen = 0;
    for (i, comp) in text.trim().split('.').take(3).enumerate() {
        let digits: String = comp.chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            break;
        }
        parts[i] = digits.parse().ok()?;
        seen = i + 1;
    }
    if seen == 0 {
        return None;
    }
    Some(Version::new(parts[0], parts[1], parts[2]))
}
