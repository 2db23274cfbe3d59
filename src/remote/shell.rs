// ABOUTME: Shell quoting helpers for building remote command lines.
// ABOUTME: Every path handed to a remote shell goes through `quote`.

/// Quote a value for a POSIX shell using single quotes.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Join a base path and a relative path with exactly one separator.
pub fn join(base: &str, relative: &str) -> String {
    let base = base.trim_end_matches('/');
    let relative = relative.trim_start_matches('/');
    if relative.is_empty() {
        return base.to_string();
    }
    if base.is_empty() {
        return format!("/{}", relative);
    }
    format!("{}/{}", base, relative)
}

/// Last path component, ignoring trailing slashes.
pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}
