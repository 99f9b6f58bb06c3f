//! MIME type detection module
//!
//! Returns the corresponding Content-Type based on file extension.

use crate::rule::RuleType;
use std::path::Path;

/// Fallback for extensions missing from the table
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Content-Type of a rendered handler page
pub const HANDLER_PAGE_CONTENT_TYPE: &str = "text/html";

/// Get MIME Content-Type based on file extension
///
/// # Examples
/// ```
/// use fsroute::http::mime::get_content_type;
/// assert_eq!(get_content_type(Some("html")), "text/html");
/// assert_eq!(get_content_type(Some("mp4")), "video/mp4");
/// assert_eq!(get_content_type(None), "application/octet-stream");
/// ```
pub fn get_content_type(extension: Option<&str>) -> &'static str {
    let Some(ext) = extension else {
        return DEFAULT_CONTENT_TYPE;
    };

    match ext.to_ascii_lowercase().as_str() {
        // Text
        "htm" | "html" | "stm" => "text/html",
        "htt" => "text/webviewhtml",
        "htc" => "text/x-component",
        "css" => "text/css",
        "csv" => "text/csv",
        "ics" => "text/calendar",
        "txt" | "c" | "h" | "bas" => "text/plain",
        "rtx" => "text/richtext",
        "vcf" => "text/vcard",
        "xml" => "text/xml",
        "xhtml" => "application/xhtml+xml",
        "mht" | "mhtml" | "nws" => "message/rfc822",

        // JavaScript/JSON
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "jsonld" => "application/ld+json",

        // Images
        "apng" => "image/apng",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        "gif" => "image/gif",
        "ico" => "image/vnd.microsoft.icon",
        "jpeg" | "jpg" => "image/jpeg",
        "png" => "image/png",
        "rgb" => "image/x-rgb",
        "svg" => "image/svg+xml",
        "tif" | "tiff" => "image/tiff",
        "webp" => "image/webp",

        // Video
        "avi" => "video/x-msvideo",
        "mp4" => "video/mp4",
        "mpeg" | "mpg" | "mpa" | "mpe" | "mp2" | "mpv2" => "video/mpeg",
        "mov" | "qt" => "video/quicktime",
        "ogv" => "video/ogg",
        "ts" => "video/mp2t",
        "webm" => "video/webm",
        "3gp" => "video/3gpp",
        "3g2" => "video/3gpp2",

        // Audio
        "aac" => "audio/aac",
        "mid" | "midi" => "audio/midi",
        "mp3" => "audio/mpeg",
        "oga" => "audio/ogg",
        "opus" => "audio/opus",
        "wav" => "audio/wav",
        "weba" => "audio/webm",

        // Fonts
        "eot" => "application/vnd.ms-fontobject",
        "otf" => "font/otf",
        "ttf" => "font/ttf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",

        // Documents
        "abw" => "application/x-abiword",
        "azw" => "application/vnd.amazon.ebook",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "epub" => "application/epub+zip",
        "odp" => "application/vnd.oasis.opendocument.presentation",
        "ods" => "application/vnd.oasis.opendocument.spreadsheet",
        "odt" => "application/vnd.oasis.opendocument.text",
        "pdf" => "application/pdf",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "rtf" => "application/rtf",
        "vsd" => "application/vnd.visio",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xul" => "application/vnd.mozilla.xul+xml",

        // Archives
        "arc" => "application/x-freearc",
        "bz" => "application/x-bzip",
        "bz2" => "application/x-bzip2",
        "gz" => "application/gzip",
        "jar" => "application/java-archive",
        "mpkg" => "application/vnd.apple.installer+xml",
        "rar" => "application/vnd.rar",
        "tar" => "application/x-tar",
        "zip" => "application/zip",
        "7z" => "application/x-7z-compressed",

        // Misc
        "cda" => "application/x-cdf",
        "csh" => "application/x-csh",
        "ogx" => "application/ogg",
        "sh" => "application/x-sh",
        "wasm" => "application/wasm",

        // Default
        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// Content-Type for serving `path` under a rule of `rule_type`
///
/// Handler files never map to a type that would expose their source: under
/// API rules the handler decides the type (empty here), elsewhere they are
/// rendered as HTML pages.
pub fn content_type_for(path: &Path, rule_type: RuleType, handler_ext: &str) -> &'static str {
    let extension = path.extension().and_then(|e| e.to_str());

    if extension.is_some_and(|e| e.eq_ignore_ascii_case(handler_ext)) {
        return match rule_type {
            RuleType::Api => "",
            _ => HANDLER_PAGE_CONTENT_TYPE,
        };
    }

    get_content_type(extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_types() {
        assert_eq!(get_content_type(Some("html")), "text/html");
        assert_eq!(get_content_type(Some("css")), "text/css");
        assert_eq!(get_content_type(Some("js")), "text/javascript");
        assert_eq!(get_content_type(Some("json")), "application/json");
        assert_eq!(get_content_type(Some("png")), "image/png");
        assert_eq!(get_content_type(Some("mp4")), "video/mp4");
        assert_eq!(get_content_type(Some("7z")), "application/x-7z-compressed");
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(get_content_type(Some("PNG")), "image/png");
        assert_eq!(get_content_type(Some("Html")), "text/html");
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(get_content_type(Some("xyz")), "application/octet-stream");
        assert_eq!(get_content_type(None), "application/octet-stream");
    }

    #[test]
    fn test_handler_ext_under_api_is_empty() {
        for path in ["users/[id].rs", "index.rs", "a/b/UPPER.RS"] {
            assert_eq!(content_type_for(Path::new(path), RuleType::Api, "rs"), "");
        }
    }

    #[test]
    fn test_handler_ext_elsewhere_is_html() {
        assert_eq!(
            content_type_for(Path::new("index.rs"), RuleType::Static, "rs"),
            "text/html"
        );
        assert_eq!(
            content_type_for(Path::new("app.rs"), RuleType::Sticky, "rs"),
            "text/html"
        );
    }

    #[test]
    fn test_regular_file_ignores_rule_type() {
        assert_eq!(
            content_type_for(Path::new("logo.svg"), RuleType::Api, "rs"),
            "image/svg+xml"
        );
        assert_eq!(
            content_type_for(Path::new("README"), RuleType::Static, "rs"),
            DEFAULT_CONTENT_TYPE
        );
    }
}
