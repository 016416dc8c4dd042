//! Built-in path exclusions applied unless the operator opts out.

/// Literal, case-insensitive path substrings skipped by default
pub const DEFAULT_EXCLUDES: &[&str] = &[
    // OS / System
    "Windows",
    "Program Files",
    "Program Files (x86)",
    "ProgramData",
    "AppData",
    "$Recycle.Bin",
    "System Volume Information",
    ".DS_Store",
    "Thumbs.db",
    "pagefile.sys",
    "swapfile.sys",
    "hiberfil.sys",
    // Dev / SCM
    ".git",
    ".svn",
    "node_modules",
    "vendor",
    "__pycache__",
    ".idea",
    ".vscode",
    "venv",
    // Large media and binaries
    ".iso",
    ".exe",
    ".dll",
    ".bin",
    ".msi",
    // Profile folders with no useful loot
    "Microsoft/Edge/User Data/ZxcvbnData",
    "Cookies",
    "My Music",
    "My Pictures",
    "My Videos",
    "NetHood",
    "PrintHood",
    "Recent",
    "SendTo",
    "Start Menu",
    "Templates",
];

/// Owned copy of the default exclude list, for seeding a `MatchConfig`.
#[must_use]
pub fn default_excludes() -> Vec<String> {
    DEFAULT_EXCLUDES.iter().map(|s| (*s).to_string()).collect()
}
