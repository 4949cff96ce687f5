/// Short reason phrase and long explanation for the status codes the server
/// knows about.
///
/// The short phrase goes on the status line; the long text fills the
/// "explanation" paragraph of the default error page.
const STATUS_TEXT: &[(u16, &str, &str)] = &[
    (100, "Continue", "Request received, please continue"),
    (101, "Switching Protocols", "Switching to new protocol; obey Upgrade header"),
    (102, "Processing", ""),
    (103, "Early Hints", ""),
    (200, "OK", "Request fulfilled, document follows"),
    (201, "Created", "Document created, URL follows"),
    (202, "Accepted", "Request accepted, processing continues off-line"),
    (203, "Non-Authoritative Information", "Request fulfilled from cache"),
    (204, "No Content", "Request fulfilled, nothing follows"),
    (205, "Reset Content", "Clear input form for further input"),
    (206, "Partial Content", "Partial content follows"),
    (207, "Multi-Status", ""),
    (208, "Already Reported", ""),
    (226, "IM Used", ""),
    (300, "Multiple Choices", "Object has several resources -- see URI list"),
    (301, "Moved Permanently", "Object moved permanently -- see URI list"),
    (302, "Found", "Object moved temporarily -- see URI list"),
    (303, "See Other", "Object moved -- see Method and URL list"),
    (304, "Not Modified", "Document has not changed since given time"),
    (305, "Use Proxy", "You must use proxy specified in Location to access this resource"),
    (307, "Temporary Redirect", "Object moved temporarily -- see URI list"),
    (308, "Permanent Redirect", "Object moved permanently -- see URI list"),
    (400, "Bad Request", "Bad request syntax or unsupported method"),
    (401, "Unauthorized", "No permission -- see authorization schemes"),
    (402, "Payment Required", "No payment -- see charging schemes"),
    (403, "Forbidden", "Request forbidden -- authorization will not help"),
    (404, "Not Found", "Nothing matches the given URI"),
    (405, "Method Not Allowed", "Specified method is invalid for this resource"),
    (406, "Not Acceptable", "URI not available in preferred format"),
    (407, "Proxy Authentication Required", "You must authenticate with this proxy before proceeding"),
    (408, "Request Timeout", "Request timed out; try again later"),
    (409, "Conflict", "Request conflict"),
    (410, "Gone", "URI no longer exists and has been permanently removed"),
    (411, "Length Required", "Client must specify Content-Length"),
    (412, "Precondition Failed", "Precondition in headers is false"),
    (413, "Request Entity Too Large", "Entity is too large"),
    (414, "Request-URI Too Long", "URI is too long"),
    (415, "Unsupported Media Type", "Entity body in unsupported format"),
    (416, "Requested Range Not Satisfiable", "Cannot satisfy request range"),
    (417, "Expectation Failed", "Expect condition could not be satisfied"),
    (418, "I'm a Teapot", "Server refuses to brew coffee because it is a teapot."),
    (421, "Misdirected Request", "Server is not able to produce a response"),
    (422, "Unprocessable Entity", ""),
    (423, "Locked", ""),
    (424, "Failed Dependency", ""),
    (425, "Too Early", ""),
    (426, "Upgrade Required", ""),
    (428, "Precondition Required", "The origin server requires the request to be conditional"),
    (429, "Too Many Requests", "The user has sent too many requests in a given amount of time (\"rate limiting\")"),
    (431, "Request Header Fields Too Large", "The server is unwilling to process the request because its header fields are too large"),
    (451, "Unavailable For Legal Reasons", "The server is denying access to the resource as a consequence of a legal demand"),
    (500, "Internal Server Error", "Server got itself in trouble"),
    (501, "Not Implemented", "Server does not support this operation"),
    (502, "Bad Gateway", "Invalid responses from another server/proxy"),
    (503, "Service Unavailable", "The server cannot process the request due to a high load"),
    (504, "Gateway Timeout", "The gateway server did not receive a timely response"),
    (505, "HTTP Version Not Supported", "Cannot fulfill request"),
    (506, "Variant Also Negotiates", ""),
    (507, "Insufficient Storage", ""),
    (508, "Loop Detected", ""),
    (510, "Not Extended", ""),
    (511, "Network Authentication Required", "The client needs to authenticate to gain network access"),
];

/// Returns the `(reason phrase, explanation)` pair for a status code.
///
/// # Example
///
/// ```
/// # use canned::http::response::status_text;
/// assert_eq!(status_text(404).map(|(short, _)| short), Some("Not Found"));
/// assert_eq!(status_text(299), None);
/// ```
pub fn status_text(code: u16) -> Option<(&'static str, &'static str)> {
    STATUS_TEXT
        .binary_search_by_key(&code, |(c, _, _)| *c)
        .ok()
        .map(|i| (STATUS_TEXT[i].1, STATUS_TEXT[i].2))
}

/// Standard reason phrase, or an empty string for unknown codes.
pub fn reason_phrase(code: u16) -> &'static str {
    status_text(code).map(|(short, _)| short).unwrap_or("")
}

/// Statuses whose responses never carry a body: every 1xx, 204, 205 and 304.
pub fn forbids_body(code: u16) -> bool {
    code < 200 || matches!(code, 204 | 205 | 304)
}

/// `Server` header value sent with every response.
pub const SERVER_NAME: &str = concat!("canned/", env!("CARGO_PKG_VERSION"));

pub const ERROR_CONTENT_TYPE: &str = "text/html;charset=utf-8";

/// Whether `text` fits ISO-8859-1, the encoding of a response head.
pub fn is_latin1(text: &str) -> bool {
    text.chars().all(|c| u32::from(c) <= 0xFF)
}

/// Renders the default HTML error page.
///
/// `message` and `explain` are HTML-escaped before insertion.
pub fn error_page(code: u16, message: &str, explain: &str) -> String {
    format!(
        "<!DOCTYPE HTML>\n\
         <html lang=\"en\">\n    \
             <head>\n        \
                 <meta charset=\"utf-8\">\n        \
                 <title>Error response</title>\n    \
             </head>\n    \
             <body>\n        \
                 <h1>Error response</h1>\n        \
                 <p>Error code: {code}</p>\n        \
                 <p>Message: {message}.</p>\n        \
                 <p>Error code explanation: {code} - {explain}.</p>\n    \
             </body>\n\
         </html>\n",
        code = code,
        message = escape_html(message),
        explain = escape_html(explain),
    )
}

/// Escape HTML special characters (quotes are left alone).
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_table_is_sorted() {
        assert!(STATUS_TEXT.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn error_page_escapes_message() {
        let page = error_page(400, "<bad> & worse", "nope");
        assert!(page.contains("<p>Error code: 400</p>"));
        assert!(page.contains("Message: &lt;bad&gt; &amp; worse."));
        assert!(page.contains("Error code explanation: 400 - nope."));
    }
}
