/// Quote a word for a POSIX shell, leaving plain words untouched.
///
/// ```
/// use agent_en_place::utils::shell::escape;
///
/// assert_eq!(escape("/home/me/project"), "/home/me/project");
/// assert_eq!(escape("my project"), "'my project'");
/// assert_eq!(escape("foo'bar"), "'foo'\\''bar'");
/// ```
pub fn escape(s: &str) -> String {
    let plain = !s.is_empty()
        && s.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | ':' | '=' | '@' | '+' | ',')
        });
    if plain {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

/// Join command arguments, quoting only where the shell needs it
pub fn join_args(args: &[impl AsRef<str>]) -> String {
    args.iter()
        .map(|arg| escape(arg.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}
