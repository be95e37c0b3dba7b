//! Prompt pattern helpers.

/// Landing prompt used when a hop does not configure its own: a trailing
/// `>` or `#` at the end of any line.
pub const DEFAULT_LANDING_PROMPT: &str = r"(?m)[>#]\s*$";

/// Generic shell prompt used to resynchronise on a jump host.
pub const SHELL_PROMPT: &str = r"(?m)[>$#]\s*$";

#[cfg(test)]
mod tests {
    use super::*;
    use regex::bytes::Regex;

    #[test]
    fn test_default_landing_prompt() {
        let pattern = Regex::new(DEFAULT_LANDING_PROMPT).unwrap();
        assert!(pattern.is_match(b"RP/0/RSP0/CPU0:R3-STA#"));
        assert!(pattern.is_match(b"banner line\r\nswitch> "));
        assert!(!pattern.is_match(b"ops@jh2:~$ "));
        assert!(!pattern.is_match(b"ssh -tt -l admin 10.1.1.1\r\n"));
    }

    #[test]
    fn test_shell_prompt_accepts_dollar() {
        let pattern = Regex::new(SHELL_PROMPT).unwrap();
        assert!(pattern.is_match(b"ops@jh2:~$ "));
        assert!(pattern.is_match(b"C:\\Users\\ops>"));
    }
}
