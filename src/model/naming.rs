//! Identifier case conversion.

/// Converts a camel-case identifier into lower snake case.
///
/// Every uppercase character after the first position gains a leading
/// underscore, so `userName` becomes `user_name` and `URL` becomes `u_r_l`.
pub fn camel_to_snake(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 4);
    for (idx, ch) in ident.chars().enumerate() {
        if ch.is_uppercase() {
            if idx > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
