//! Colored one-line notes for terminal output.

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM").map(|t| t != "dumb").unwrap_or(false))
}

fn format_note(color: &str, symbol: &str, plain_tag: &str, msg: &str, colored: bool) -> String {
    if colored {
        format!("{color}{BOLD}{symbol}{RESET} {msg}")
    } else {
        format!("{plain_tag}: {msg}")
    }
}

pub fn note_info(msg: &str) {
    println!("{}", format_note(CYAN, "ℹ", "INFO", msg, supports_color()));
}

pub fn note_warn(msg: &str) {
    println!("{}", format_note(YELLOW, "⚠", "WARN", msg, supports_color()));
}

/// Errors go to stderr.
pub fn note_error(msg: &str) {
    eprintln!("{}", format_note(RED, "✗", "ERROR", msg, supports_color()));
}

pub fn note_success(msg: &str) {
    println!("{}", format_note(GREEN, "✓", "OK", msg, supports_color()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_notes_have_tags() {
        assert_eq!(format_note(RED, "✗", "ERROR", "permission denied", false), "ERROR: permission denied");
    }

    #[test]
    fn colored_notes_keep_message() {
        let note = format_note(GREEN, "✓", "OK", "Answer:", true);
        assert!(note.starts_with(GREEN));
        assert!(note.ends_with("Answer:"));
    }
}
