//! Yes/no confirmation on the controlling terminal.

use std::io::{self, BufRead, Write};

/// Ask `question [y/N]: ` on stdout and read one line from stdin.
pub fn confirm(question: &str) -> bool {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    confirm_with(&mut stdin.lock(), &mut stdout, question)
}

/// Only `y` or `yes` (any case) confirms; EOF and read errors decline.
pub fn confirm_with<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> bool {
    let _ = write!(output, "{} [y/N]: ", question);
    let _ = output.flush();

    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) | Err(_) => false,
        Ok(_) => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(text: &str) -> (bool, String) {
        let mut input = io::Cursor::new(text.as_bytes().to_vec());
        let mut output = Vec::new();
        let confirmed = confirm_with(&mut input, &mut output, "Confirm");
        (confirmed, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_yes_answers() {
        assert!(answer("y\n").0);
        assert!(answer("YES\n").0);
        assert!(answer("  yes  \n").0);
    }

    #[test]
    fn test_default_is_no() {
        assert!(!answer("\n").0);
        assert!(!answer("").0);
        assert!(!answer("yep\n").0);
        assert!(!answer("n\n").0);
    }

    #[test]
    fn test_prompt_text() {
        assert_eq!(answer("n\n").1, "Confirm [y/N]: ");
    }
}
