/// Chip constants for supported targets.
///
/// Each chip module defines the identifiers the console and status
/// messages report, selected at compile time via feature flags.

#[cfg(feature = "esp32c6")]
mod hw {
    pub const BOARD_NAME: &str = "esp32c6";
    pub const PROMPT: &str = "esp32c6>";
}

#[cfg(all(feature = "esp32h2", not(feature = "esp32c6")))]
mod hw {
    pub const BOARD_NAME: &str = "esp32h2";
    pub const PROMPT: &str = "esp32h2>";
}

#[cfg(not(any(feature = "esp32c6", feature = "esp32h2")))]
mod hw {
    pub const BOARD_NAME: &str = "host";
    pub const PROMPT: &str = "host>";
}

pub use hw::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_is_board_name_with_marker() {
        assert_eq!(PROMPT.strip_suffix('>'), Some(BOARD_NAME));
    }
}
