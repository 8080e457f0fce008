//! Command-line contract between the server and the privileged walker.
//!
//! The walker is a separate executable so that the accessibility grant
//! attaches to it rather than to whatever launched the server. stdout
//! carries the payload (a status line, a JSON document, or a confirmation),
//! stderr carries diagnostics, and the exit code classifies failures.

use crate::search::MutatedControl;

pub mod command {
    pub const CHECK_ACCESS: &str = "check-access";
    pub const LIST_TRACKS: &str = "list-tracks";
    pub const GET_PARAMS: &str = "get-params";
    pub const SET_PARAM: &str = "set-param";
    pub const QUERY: &str = "query";
}

pub mod exit {
    pub const OK: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const PERMISSION_DENIED: i32 = 2;
    pub const NOT_FOUND: i32 = 3;
    /// The control was found but refused the value (type mismatch or read-only).
    pub const REJECTED: i32 = 4;
    pub const HOST_NOT_RUNNING: i32 = 5;
}

/// `check-access` status lines.
pub const ACCESS_GRANTED: &str = "granted";
pub const ACCESS_DENIED: &str = "denied";

/// The line `set-param` prints on success.
pub fn confirmation(control: &MutatedControl) -> String {
    format!("Set {} = {}", control.name, control.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Role;

    #[test]
    fn confirmation_line() {
        let control = MutatedControl {
            name: "Cutoff".into(),
            value: "0.5".into(),
            role: Role::Slider,
        };
        assert_eq!(confirmation(&control), "Set Cutoff = 0.5");
    }
}
