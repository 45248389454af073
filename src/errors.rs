// ABOUTME: Error type and error-code registry for the interpreter

use thiserror::Error;

/// Interpreter error codes are plain integers so that user programs can
/// allocate and compare them at runtime.
pub type ErrorCode = i32;

pub const ENOERR: ErrorCode = 0x0000;

// ===== Reader faults =====
pub const EREAD: ErrorCode = 0x0001;
pub const EEOF: ErrorCode = 0x0002;

// ===== Runtime faults =====
pub const EEVAL: ErrorCode = 0x0101;
pub const ENOSYM: ErrorCode = 0x0102;
pub const ESTACK: ErrorCode = 0x0103;
pub const ETYPE: ErrorCode = 0x0104;
pub const EMATCH: ErrorCode = 0x0105;
pub const ENIL: ErrorCode = 0x0106;
pub const EDIVZERO: ErrorCode = 0x0107;
pub const EREADONLY: ErrorCode = 0x0108;
pub const EEXIST: ErrorCode = 0x0109;
pub const EVALUE: ErrorCode = 0x010A;
pub const EOVERFLOW: ErrorCode = 0x010B;
pub const EINDEX: ErrorCode = 0x010C;
pub const EIO: ErrorCode = 0x010D;

// ===== Embedding faults, reserved for the host and the allocator =====
pub const EAPI: ErrorCode = 0x0200;
pub const ENOMEM: ErrorCode = 0x0201;

/// First user-allocated error code; `new_error_code` hands out codes from
/// here upwards.
pub const EUSER0: ErrorCode = 0x0400;

/// All built-in codes, by name. User codes live in `ErrorStore`.
pub const BUILTIN_CODES: &[(&str, ErrorCode)] = &[
    ("EREAD", EREAD),
    ("EEOF", EEOF),
    ("EEVAL", EEVAL),
    ("ENOSYM", ENOSYM),
    ("ESTACK", ESTACK),
    ("ETYPE", ETYPE),
    ("EMATCH", EMATCH),
    ("ENIL", ENIL),
    ("EDIVZERO", EDIVZERO),
    ("EREADONLY", EREADONLY),
    ("EEXIST", EEXIST),
    ("EVALUE", EVALUE),
    ("EOVERFLOW", EOVERFLOW),
    ("EINDEX", EINDEX),
    ("EIO", EIO),
    ("EAPI", EAPI),
    ("ENOMEM", ENOMEM),
];

/// Name of a built-in error code, if it is one.
pub fn builtin_name(code: ErrorCode) -> Option<&'static str> {
    BUILTIN_CODES
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(n, _)| *n)
}

fn fallback_name(code: ErrorCode) -> String {
    match builtin_name(code) {
        Some(name) => name.to_string(),
        None if code >= EUSER0 => format!("EUSER{}", code - EUSER0),
        None => format!("error {:#06x}", code),
    }
}

/// A thrown interpreter error: an error code plus an optional message.
///
/// Propagated through the evaluator as the `Err` branch of [`Result`];
/// the `Cheax` handle records the most recent one so the embedding-side
/// `errno`/`errstate`/`perror` surface stays observable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", format_error(*.code, .msg.as_deref()))]
pub struct Error {
    pub code: ErrorCode,
    pub msg: Option<String>,
}

fn format_error(code: ErrorCode, msg: Option<&str>) -> String {
    match msg {
        Some(m) => format!("{}: {}", fallback_name(code), m),
        None => fallback_name(code),
    }
}

impl Error {
    pub fn new(code: ErrorCode, msg: impl Into<String>) -> Self {
        Error {
            code,
            msg: Some(msg.into()),
        }
    }

    pub fn bare(code: ErrorCode) -> Self {
        Error { code, msg: None }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Append-only registry of user error codes, keyed by name.
///
/// Built-in codes are fixed; user codes are allocated from `EUSER0`
/// upwards and remembered here so reporting can pair a code with the name
/// it was registered under.
#[derive(Debug, Default)]
pub struct ErrorStore {
    user: Vec<String>,
}

impl ErrorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next user error code under `name`. Rejects names
    /// already taken by a built-in or a previous registration.
    pub fn new_code(&mut self, name: &str) -> Result<ErrorCode> {
        if BUILTIN_CODES.iter().any(|(n, _)| *n == name)
            || self.user.iter().any(|n| n == name)
        {
            return Err(Error::new(
                EEXIST,
                format!("error code {} already registered", name),
            ));
        }
        self.user.push(name.to_string());
        Ok(EUSER0 + self.user.len() as ErrorCode - 1)
    }

    pub fn find(&self, name: &str) -> Option<ErrorCode> {
        BUILTIN_CODES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, c)| *c)
            .or_else(|| {
                self.user
                    .iter()
                    .position(|n| n == name)
                    .map(|i| EUSER0 + i as ErrorCode)
            })
    }

    /// Reporting name for a code: registered name where known, a stable
    /// placeholder otherwise.
    pub fn name_of(&self, code: ErrorCode) -> String {
        if let Some(name) = builtin_name(code) {
            return name.to_string();
        }
        if code >= EUSER0 {
            if let Some(name) = self.user.get((code - EUSER0) as usize) {
                return name.clone();
            }
        }
        fallback_name(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_name_lookup() {
        assert_eq!(builtin_name(EVALUE), Some("EVALUE"));
        assert_eq!(builtin_name(EAPI), Some("EAPI"));
        assert_eq!(builtin_name(0x7777), None);
    }

    #[test]
    fn test_user_code_allocation() {
        let mut store = ErrorStore::new();
        let a = store.new_code("EFIRST").unwrap();
        let b = store.new_code("ESECOND").unwrap();
        assert_eq!(a, EUSER0);
        assert_eq!(b, EUSER0 + 1);
        assert_eq!(store.find("EFIRST"), Some(a));
        assert_eq!(store.name_of(b), "ESECOND");
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let mut store = ErrorStore::new();
        store.new_code("EMINE").unwrap();
        let err = store.new_code("EMINE").unwrap_err();
        assert_eq!(err.code, EEXIST);

        let err = store.new_code("EVALUE").unwrap_err();
        assert_eq!(err.code, EEXIST);
    }

    #[test]
    fn test_error_display() {
        let e = Error::new(ETYPE, "expected an integer");
        assert_eq!(format!("{}", e), "ETYPE: expected an integer");

        let bare = Error::bare(ESTACK);
        assert_eq!(format!("{}", bare), "ESTACK");
    }
}
