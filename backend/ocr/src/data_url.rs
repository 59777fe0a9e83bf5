use once_cell::sync::Lazy;
use regex::Regex;

static IMAGE_DATA_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^data:image/(png|jpeg|jpg|gif|bmp|webp);base64,").unwrap());

/// Whether `s` is a base64 image data URL in a format OCR providers accept.
pub fn is_valid_image_data_url(s: &str) -> bool {
    IMAGE_DATA_URL.is_match(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_known_formats() {
        assert!(is_valid_image_data_url("data:image/png;base64,AAAA"));
        assert!(is_valid_image_data_url("data:image/JPEG;base64,AAAA"));
        assert!(is_valid_image_data_url("data:image/webp;base64,"));
    }

    #[test]
    fn test_rejects_other_payloads() {
        assert!(!is_valid_image_data_url(""));
        assert!(!is_valid_image_data_url("data:image/svg+xml;base64,AAAA"));
        assert!(!is_valid_image_data_url("data:text/plain;base64,AAAA"));
        assert!(!is_valid_image_data_url("https://example.com/a.png"));
    }
}
