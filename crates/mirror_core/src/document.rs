/// Wrap a rewritten body in a minimal standalone HTML document.
///
/// `stylesheet`, when non-empty, is placed in a `<style>` block ahead of the
/// body.
pub fn build_standalone_document(title: &str, body: &str, stylesheet: Option<&str>) -> String {
    let style = match stylesheet.map(str::trim) {
        Some(css) if !css.is_empty() => format!("<style>\n{css}\n</style>\n"),
        _ => String::new(),
    };
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n    <meta charset=\"utf-8\">\n    <title>{title}</title>\n</head>\n<body>\n{style}{body}\n</body>\n</html>\n",
        title = escape_html(title),
        style = style,
        body = body,
    )
}

/// Escape text for use in element content or quoted attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{build_standalone_document, escape_html};

    #[test]
    fn title_is_escaped() {
        let doc = build_standalone_document("A <b> & \"c\"", "<p>x</p>", None);
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<meta charset=\"utf-8\">"));
        assert!(doc.contains("<title>A &lt;b&gt; &amp; &quot;c&quot;</title>"));
        assert!(doc.contains("<body>\n<p>x</p>\n</body>"));
        assert!(!doc.contains("<style>"));
    }

    #[test]
    fn stylesheet_precedes_body() {
        let doc = build_standalone_document("T", "<p>x</p>", Some("p { color: red; }"));
        let style_at = doc.find("<style>").unwrap();
        let body_at = doc.find("<p>x</p>").unwrap();
        assert!(style_at < body_at);
    }

    #[test]
    fn escape_leaves_plain_text() {
        assert_eq!(escape_html("plain text"), "plain text");
    }
}
