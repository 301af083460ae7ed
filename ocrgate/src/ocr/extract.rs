//! Normalizes remote OCR payloads into plain text.
//!
//! Remote responses are untrusted: any missing or mistyped node is skipped
//! rather than reported, so extraction never fails.

use serde_json::Value;

/// A result schema the remote service is known to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Classic OCR: `regions[].lines[].words[].text`.
    Regions,
    /// Read API: `analyzeResult.readResults[]` or bare `readResults[]`, each page
    /// carrying `lines[].text`.
    ReadResults,
}

/// Shapes tried by [`extract`], in output order.
pub const ALL_SHAPES: &[Shape] = &[Shape::Regions, Shape::ReadResults];

/// Extract text from every recognized shape in `root`.
pub fn extract(root: &Value) -> String {
    extract_shapes(root, ALL_SHAPES)
}

/// Extract text using only the given shapes, concatenated in slice order.
pub fn extract_shapes(root: &Value, shapes: &[Shape]) -> String {
    let mut lines: Vec<String> = Vec::new();
    for shape in shapes {
        match shape {
            Shape::Regions => collect_regions(root, &mut lines),
            Shape::ReadResults => collect_read_results(root, &mut lines),
        }
    }
    lines.join("\n").trim().to_string()
}

fn collect_regions(root: &Value, out: &mut Vec<String>) {
    for region in array_at(root.get("regions")) {
        for line in array_at(region.get("lines")) {
            let Some(words) = line.get("words").and_then(Value::as_array) else {
                continue;
            };
            let text: Vec<String> = words
                .iter()
                .filter_map(|word| word.get("text").and_then(scalar_text))
                .collect();
            out.push(text.join(" "));
        }
    }
}

fn collect_read_results(root: &Value, out: &mut Vec<String>) {
    let pages = root
        .pointer("/analyzeResult/readResults")
        .or_else(|| root.get("readResults"));
    for page in array_at(pages) {
        for line in array_at(page.get("lines")) {
            if let Some(text) = line.get("text").and_then(scalar_text) {
                out.push(text);
            }
        }
    }
}

fn array_at(node: Option<&Value>) -> &[Value] {
    node.and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn scalar_text(node: &Value) -> Option<String> {
    match node {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
