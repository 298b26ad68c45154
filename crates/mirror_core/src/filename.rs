use sha2::{Digest, Sha256};

/// Characters that are rejected by at least one common filesystem.
pub const ILLEGAL_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Map a remote filename or URL segment to a safe local path segment.
///
/// Percent-escapes are decoded and illegal characters removed until neither
/// step changes the name any more, so `sanitize(sanitize(x)) == sanitize(x)`.
/// Names made only of dots (`.`, `..`) would address the current or parent
/// directory and come back empty. The result may be empty; callers
/// substitute a synthesized name then.
pub fn sanitize(name: &str) -> String {
    let mut current = name.to_string();
    loop {
        let next = clean_step(&current);
        if next == current {
            return if next.chars().all(|c| c == '.') {
                String::new()
            } else {
                next
            };
        }
        current = next;
    }
}

// A changing step either shortens the name or consumes a '%', so the loop in
// `sanitize` terminates.
fn clean_step(input: &str) -> String {
    let decoded = percent_decode(input);
    let stripped: String = decoded.chars().filter(|c| !is_forbidden(*c)).collect();
    stripped.trim().to_string()
}

fn percent_decode(input: &str) -> String {
    if !input.contains('%') {
        return input.to_string();
    }
    let bytes = urlencoding::decode_binary(input.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

fn is_forbidden(c: char) -> bool {
    ILLEGAL_CHARS.contains(&c) || c.is_control()
}

/// Final path segment of a URL with query string and fragment removed.
pub fn last_path_segment(url: &str) -> &str {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query.rsplit('/').next().unwrap_or("")
}

/// `resource_{short_hash(url)}{ext}` for references that carry no usable name.
pub fn synthesized_name(url: &str, mime_hint: Option<&str>) -> String {
    format!("resource_{}{}", short_hash(url), guess_extension(url, mime_hint))
}

/// Name used when a node title sanitizes to nothing.
pub fn untitled_name(node_id: &str) -> String {
    format!("untitled_{}", short_hash(node_id))
}

fn guess_extension(url: &str, mime_hint: Option<&str>) -> &'static str {
    if let Some(mime) = mime_hint {
        let essence = mime.split(';').next().unwrap_or(mime).trim().to_ascii_lowercase();
        match essence.as_str() {
            "image/png" => return ".png",
            "image/jpeg" | "image/jpg" => return ".jpg",
            "image/gif" => return ".gif",
            "image/svg+xml" => return ".svg",
            "image/webp" => return ".webp",
            "application/pdf" => return ".pdf",
            other if other.starts_with("image/") => return ".jpg",
            _ => {}
        }
    }
    let lower = url.to_ascii_lowercase();
    if lower.contains("image") || [".jpg", ".png", ".gif"].iter().any(|ext| lower.contains(ext)) {
        ".jpg"
    } else {
        ".bin"
    }
}

/// First four bytes of the SHA-256 of `input`, hex encoded.
pub fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
