//! Citation markup for matched documents

/// Render a references block linking each matched document.
///
/// An empty list renders nothing. Order and duplicates are kept as given.
pub fn render_references(names: &[String], route: &str) -> String {
    if names.is_empty() {
        return String::new();
    }

    let route = route.trim_end_matches('/');
    let items: String = names
        .iter()
        .map(|name| {
            let name = escape_html(name);
            format!(
                r#"<li><a href="{}/{}" target="_blank">{}</a></li>"#,
                route, name, name
            )
        })
        .collect();

    format!("<h5>📚 References</h5><ul>{}</ul>", items)
}

/// Escape text for HTML element content and quoted attributes
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
