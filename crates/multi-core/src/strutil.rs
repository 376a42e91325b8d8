//! String utilities shared by the command-template launchers: joining FIFO
//! paths into a single argument and substituting the `{}` placeholder.

/// Join `parts` with `sep` between each pair, classical style, no escaping.
pub fn join(parts: &[String], sep: &str) -> String {
    parts.join(sep)
}

/// Replace the first occurrence of the literal two-byte placeholder `"{}"`
/// in `src` with `value`. Returns a copy of `src` unchanged if the
/// placeholder does not appear.
pub fn replace_first(src: &str, value: &str) -> String {
    match src.find("{}") {
        Some(pos) => {
            let mut out = String::with_capacity(src.len() - 2 + value.len());
            out.push_str(&src[..pos]);
            out.push_str(value);
            out.push_str(&src[pos + 2..]);
            out
        }
        None => src.to_string(),
    }
}
