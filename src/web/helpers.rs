use actix_web::http::StatusCode;
use actix_web::HttpResponse;

const XML_CONTENT_TYPE: &str = "application/xml";

pub const FEED_NOT_FOUND: &str =
    "<!-- Feed file not found. Please wait for the next scheduled update. -->";

pub fn xml_response(status: StatusCode, body: String) -> HttpResponse {
    HttpResponse::build(status)
        .content_type(XML_CONTENT_TYPE)
        .body(body)
}

pub fn feed_error() -> HttpResponse {
    HttpResponse::InternalServerError()
        .content_type("text/plain")
        .body("Error serving podcast feed")
}

pub fn key_matches(supplied: Option<&str>, expected: &str) -> bool {
    supplied == Some(expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_matches_requires_exact_key() {
        assert!(key_matches(Some("s3cret"), "s3cret"));
        assert!(!key_matches(Some("s3cre"), "s3cret"));
        assert!(!key_matches(Some("S3cret"), "s3cret"));
        assert!(!key_matches(Some(""), "s3cret"));
        assert!(!key_matches(None, "s3cret"));
    }
}
