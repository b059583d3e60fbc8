// Accepts "8080", ":8080" or a full host:port string and yields an address
// the listener can actually bind.
pub fn normalize_addr(addr: &str, default: &str) -> String {
    let addr = addr.trim();

    if addr.is_empty() {
        return default.to_string();
    }

    if let Some(port) = addr.strip_prefix(':') {
        return format!("0.0.0.0:{}", port);
    }

    if addr.chars().all(|c| c.is_ascii_digit()) {
        return format!("0.0.0.0:{}", addr);
    }

    addr.to_string()
}
