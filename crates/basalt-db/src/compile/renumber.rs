use regex::{Captures, Regex};

/// Shift every `$N` placeholder in `sql` by `offset`.
///
/// Applied to an independently-numbered SET expression when it is spliced
/// after a WHERE fragment. `$` cannot start an identifier in the emitted
/// dialect, so `$\d+` is an unambiguous token and no SQL parsing is needed.
pub fn renumber(sql: &str, offset: usize) -> String {
    if offset == 0 {
        return sql.to_string();
    }
    let placeholder = Regex::new(r"\$(\d+)").expect("valid placeholder pattern");
    placeholder
        .replace_all(sql, |caps: &Captures<'_>| {
            let n: usize = caps[1].parse().unwrap_or(0);
            format!("${}", n + offset)
        })
        .into_owned()
}
