use super::*;

#[test]
fn test_truncate_chars_short_string_untouched() {
    assert_eq!(truncate_chars("hello", 10, "..."), "hello");
    assert_eq!(truncate_chars("hello", 5, "..."), "hello");
}

#[test]
fn test_truncate_chars_appends_suffix() {
    assert_eq!(truncate_chars("hello world", 5, "..."), "hello...");
}

#[test]
fn test_truncate_chars_multibyte() {
    let s = "héllo wörld";
    let t = truncate_chars(s, 4, "…");
    assert!(t.starts_with("héll"));
    assert!(t.ends_with('…'));
}

#[test]
fn test_truncate_chars_empty() {
    assert_eq!(truncate_chars("", 4, "…"), "");
}
