/// Reduce a label to characters that are safe in a file name.
pub fn sanitize_file_stem(name: &str) -> Option<String> {
    let mut stem = String::new();

    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
            stem.push(ch);
        } else if ch == ' ' {
            stem.push('_');
        }
    }

    if stem.is_empty() || stem.chars().all(|ch| ch == '.') {
        None
    } else {
        Some(stem)
    }
}

/// Signed percentage with two decimals, or `N/A` when absent.
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{:+.2}%", value),
        None => "N/A".to_string(),
    }
}
