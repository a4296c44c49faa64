//! Doc-text extraction
//!
//! A single-pass line scanner over the free-form documentation attached to a
//! declaration. `@param <name> <text>` opens a named bucket, `@return <text>`
//! opens the response bucket, and any other `@tag` closes whatever bucket is
//! open. Continuation lines are space-joined into the open bucket.

use indexmap::IndexMap;

#[derive(Debug, Default)]
struct ScannedDoc {
    leading: Vec<String>,
    params: IndexMap<String, Vec<String>>,
    response: Vec<String>,
}

enum Bucket {
    None,
    Leading,
    Param(String),
    Response,
}

fn scan(doc: &str) -> ScannedDoc {
    let mut scanned = ScannedDoc::default();
    let mut bucket = Bucket::Leading;

    for line in doc.lines() {
        let trimmed = line.trim();

        if let Some(tag_body) = trimmed.strip_prefix('@') {
            let tag: String = tag_body
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric())
                .collect();
            let rest = tag_body[tag.len()..].trim();

            match tag.as_str() {
                "param" => {
                    let mut words = rest.splitn(2, char::is_whitespace);
                    match words.next().filter(|name| !name.is_empty()) {
                        Some(name) => {
                            let text = words.next().unwrap_or("").trim();
                            let segments = scanned.params.entry(name.to_string()).or_default();
                            if !text.is_empty() {
                                segments.push(text.to_string());
                            }
                            bucket = Bucket::Param(name.to_string());
                        }
                        // A bare `@param` with no name closes the open bucket.
                        None => bucket = Bucket::None,
                    }
                }
                "return" => {
                    if !rest.is_empty() {
                        scanned.response.push(rest.to_string());
                    }
                    bucket = Bucket::Response;
                }
                _ => bucket = Bucket::None,
            }
            continue;
        }

        if trimmed.is_empty() {
            if matches!(bucket, Bucket::Leading) {
                scanned.leading.push(String::new());
            }
            continue;
        }

        match &bucket {
            Bucket::Leading => scanned.leading.push(line.trim_end().to_string()),
            Bucket::Param(name) => {
                scanned
                    .params
                    .entry(name.clone())
                    .or_default()
                    .push(trimmed.to_string());
            }
            Bucket::Response => scanned.response.push(trimmed.to_string()),
            Bucket::None => {}
        }
    }

    scanned
}

/// Per-parameter descriptions from `@param` buckets, in tag order.
pub fn extract_param_descriptions(doc: &str) -> IndexMap<String, String> {
    scan(doc)
        .params
        .into_iter()
        .map(|(name, segments)| (name, segments.join(" ")))
        .collect()
}

/// The response description from the `@return` bucket.
pub fn extract_response_description(doc: &str) -> String {
    scan(doc).response.join(" ")
}

/// The prose preceding the first tag, with everything from the first
/// recognized tag onward dropped.
pub fn sanitize(doc: &str) -> String {
    scan(doc).leading.join("\n").trim().to_string()
}
