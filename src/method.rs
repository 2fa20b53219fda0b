//! HTTP verb inference from handler method names

use http::Method;

/// Verbs recognised as the leading word of a controller method name, in
/// match order.
pub const HTTP_METHODS: [Method; 9] = [
    Method::POST,
    Method::GET,
    Method::DELETE,
    Method::PUT,
    Method::CONNECT,
    Method::HEAD,
    Method::OPTIONS,
    Method::PATCH,
    Method::TRACE,
];

/// Infer the HTTP verb for a controller method.
///
/// The first word of `name` (split on case changes, digits, `_` and `-`) is
/// compared case-insensitively against [`HTTP_METHODS`]. Anything else maps
/// to `GET`.
///
/// ```rust
/// use handler_injector::method_for_handler;
/// use http::Method;
///
/// assert_eq!(method_for_handler("PostCreateUser"), Method::POST);
/// assert_eq!(method_for_handler("delete_user"), Method::DELETE);
/// assert_eq!(method_for_handler("SyncAll"), Method::GET);
/// ```
pub fn method_for_handler(name: &str) -> Method {
    let word = first_word(name);
    HTTP_METHODS
        .iter()
        .find(|method| method.as_str().eq_ignore_ascii_case(word))
        .cloned()
        .unwrap_or(Method::GET)
}

/// Leading camel-case, snake-case or kebab-case word of `name`.
fn first_word(name: &str) -> &str {
    let name = name.trim_start_matches(['_', '-']);
    let chars: Vec<(usize, char)> = name.char_indices().collect();

    for window in 1..chars.len() {
        let (idx, cur) = chars[window];
        let (_, prev) = chars[window - 1];
        let next = chars.get(window + 1).map(|(_, c)| *c);

        let boundary = cur == '_'
            || cur == '-'
            || (prev.is_lowercase() && cur.is_uppercase())
            || (prev.is_alphabetic() && cur.is_ascii_digit())
            || (prev.is_ascii_digit() && cur.is_alphabetic())
            || (prev.is_uppercase()
                && cur.is_uppercase()
                && next.is_some_and(char::is_lowercase));

        if boundary {
            return &name[..idx];
        }
    }
    name
}
