//! POSIX shell quoting for command lines handed to a remote shell.

use std::borrow::Cow;

fn is_plain(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || b"-_./=:,@%+".contains(&byte)
}

/// Quote one word so that `sh` reads it back unchanged.
///
/// Words made only of plain characters are returned as-is; everything else
/// is wrapped in single quotes with embedded quotes spelled `'\''`.
pub fn quote(word: &str) -> Cow<'_, str> {
    if !word.is_empty() && word.bytes().all(is_plain) {
        Cow::Borrowed(word)
    } else {
        Cow::Owned(format!("'{}'", word.replace('\'', r"'\''")))
    }
}

/// Quote and join words into one shell command line.
pub fn join<I, S>(words: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    words
        .into_iter()
        .map(|word| quote(word.as_ref()).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether a path can be typed into a remote shell unquoted, keeping a
/// leading `~` subject to tilde expansion.
pub fn is_shell_safe_path(path: &str) -> bool {
    let rest = path.strip_prefix('~').unwrap_or(path);
    !rest.is_empty() && rest.bytes().all(|b| is_plain(b) && b != b'=')
}
