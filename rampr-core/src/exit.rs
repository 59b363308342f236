/// Process exit codes for scenario runs. Stable so wrappers and CI can
/// branch on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    ThresholdsFailed = 11,
    SetupFailed = 20,
    InvalidInput = 30,
    RuntimeError = 40,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.as_i32() as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::ThresholdsFailed.as_i32(), 11);
        assert_eq!(ExitCode::SetupFailed.as_i32(), 20);
        assert_eq!(ExitCode::InvalidInput.as_i32(), 30);
        assert_eq!(ExitCode::RuntimeError.as_i32(), 40);
    }
}
