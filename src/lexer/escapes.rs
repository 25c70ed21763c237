//! Escape-sequence scanning shared by string, char and template literals.

use super::Lexer;

/// Scans one escape sequence after the backslash has already been consumed.
/// Supported: `\n \t \r \\ \' \" \0 \xHH`.
pub(super) fn scan_escape(lexer: &mut Lexer) -> Result<char, String> {
    match lexer.advance() {
        Some('n') => Ok('\n'),
        Some('t') => Ok('\t'),
        Some('r') => Ok('\r'),
        Some('\\') => Ok('\\'),
        Some('\'') => Ok('\''),
        Some('"') => Ok('"'),
        Some('0') => Ok('\0'),
        Some('x') => {
            let hi = lexer.advance().ok_or("unterminated \\x escape")?;
            let lo = lexer.advance().ok_or("unterminated \\x escape")?;
            let value = u8::from_str_radix(&format!("{hi}{lo}"), 16)
                .map_err(|_| format!("invalid hex escape \\x{hi}{lo}"))?;
            Ok(value as char)
        }
        Some(other) => Err(format!("invalid escape sequence '\\{other}'")),
        None => Err("unterminated escape sequence".to_string()),
    }
}
