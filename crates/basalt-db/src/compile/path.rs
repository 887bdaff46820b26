//! JSONB access-path construction.
//!
//! A dotted path `a.b.2.c` rooted at column `data` has two forms: the
//! container form `data->'a'->'b'->2->'c'` (every accessor `->`, numeric
//! segments unquoted) and the text form, identical except the terminal
//! accessor is `->>`. Inside `$elemMatch` the root is the subquery alias.

/// The two extraction forms for one field path.
///
/// `json` is absent only for the primitive-mode `$elemMatch` pseudo-path
/// (`elem_val.value`), where text extraction has already discarded JSON
/// structure; operators that need the container form must reject it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AccessPath {
    text: String,
    json: Option<String>,
}

impl AccessPath {
    pub(crate) fn build(root: &str, path: &str) -> AccessPath {
        let segments: Vec<&str> = path.split('.').collect();
        let mut text = String::from(root);
        for (i, seg) in segments.iter().enumerate() {
            if i + 1 == segments.len() {
                text.push_str(&text_accessor(seg));
            } else {
                text.push_str(&container_accessor(seg));
            }
        }
        AccessPath {
            text,
            json: Some(container_path(root, path)),
        }
    }

    /// A bare text expression with no container form.
    pub(crate) fn text_only(expr: &str) -> AccessPath {
        AccessPath {
            text: expr.to_string(),
            json: None,
        }
    }

    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn json(&self) -> Option<&str> {
        self.json.as_deref()
    }
}

/// The container form alone: `root->'a'->2->'c'`.
pub(crate) fn container_path(root: &str, path: &str) -> String {
    let mut out = String::from(root);
    for seg in path.split('.') {
        out.push_str(&container_accessor(seg));
    }
    out
}

fn is_index(seg: &str) -> bool {
    !seg.is_empty() && seg.bytes().all(|b| b.is_ascii_digit())
}

fn container_accessor(seg: &str) -> String {
    if is_index(seg) {
        format!("->{seg}")
    } else {
        format!("->'{}'", seg.replace('\'', "''"))
    }
}

fn text_accessor(seg: &str) -> String {
    if is_index(seg) {
        format!("->>{seg}")
    } else {
        format!("->>'{}'", seg.replace('\'', "''"))
    }
}
