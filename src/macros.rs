// src/macros.rs
#[macro_export]
macro_rules! s {
    // String shorthand

    () => {
        ::std::string::String::new()
    };
    ($expr:expr) => {
        ::std::string::String::from($expr)
    };
}

#[macro_export]
macro_rules! join {
    // Concatenate into one owned String
    ($first:expr $(, $rest:expr)+ $(,)?) => {{
        let mut s = ::std::string::String::from($first);
        $(
            s.push_str($rest);
        )+
        s
    }};
}

/// Build an ordered form payload: `fields![("a", x), ("b", y)]`.
/// Order matters to some WebForms handlers, so this is a Vec, not a map.
#[macro_export]
macro_rules! fields {
    () => {
        ::std::vec::Vec::<(::std::string::String, ::std::string::String)>::new()
    };
    ($(($k:expr, $v:expr)),+ $(,)?) => {
        vec![$((::std::string::String::from($k), ::std::string::String::from($v))),+]
    };
}
