/// Translate one `*`/`?` wildcard token into an anchored regex source
/// string. `*` becomes "any sequence", `?` "any single character"; every
/// other character is literal, so `com.foo.*` does not match `com.food.Baz`.
pub fn wildcard_regex(token: &str) -> String {
    let mut out = String::with_capacity(token.len() + 8);
    out.push_str("^(?:");
    for ch in token.chars() {
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '.' | '+' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$' | '\\' | '&'
            | '~' | '#' | '-' => {
                out.push('\\');
                out.push(ch);
            }
            c => out.push(c),
        }
    }
    out.push_str(")$");
    out
}
