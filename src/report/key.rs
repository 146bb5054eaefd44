//! Metric key handling
//!
//! Producers may send anything as a key. Before a key reaches the wire it
//! is sanitized into a graphite-safe path and decorated with the
//! configured prefix, app, team and node segments.

/// Normalize an arbitrary key into a graphite-safe path.
///
/// Runs of whitespace become `_`, `/` becomes `-`, and every remaining
/// character outside `[A-Za-z0-9_.-]` is dropped.
pub fn sanitize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut in_whitespace = false;

    for c in key.chars() {
        if is_path_space(c) {
            if !in_whitespace {
                out.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;

        match c {
            '/' => out.push('-'),
            c if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') => out.push(c),
            _ => {}
        }
    }

    out
}

/// ASCII whitespace including vertical tab; other Unicode spaces are dropped
fn is_path_space(c: char) -> bool {
    c.is_ascii_whitespace() || c == '\x0B'
}

/// Builds full metric paths from producer keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyFormatter {
    leading: Vec<String>,
    trailing: Vec<String>,
}

impl KeyFormatter {
    /// Formatter that only sanitizes
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(self, prefix: &str) -> Self {
        self.push_leading(prefix)
    }

    pub fn with_app(self, app: &str) -> Self {
        self.push_leading(app)
    }

    pub fn with_team(self, team: &str) -> Self {
        self.push_leading(team)
    }

    /// Append the node identity, `name@host`, as two trailing segments.
    ///
    /// Dots in the host are flattened to `_` so it stays one segment.
    pub fn with_node(mut self, node: &str) -> Self {
        let (name, host) = match node.split_once('@') {
            Some((name, host)) => (name, host),
            None => (node, ""),
        };

        for segment in [sanitize_key(name), sanitize_key(host).replace('.', "_")] {
            if !segment.is_empty() {
                self.trailing.push(segment);
            }
        }
        self
    }

    fn push_leading(mut self, segment: &str) -> Self {
        let segment = sanitize_key(segment);
        if !segment.is_empty() {
            self.leading.push(segment);
        }
        self
    }

    /// Full dotted path for a raw producer key
    pub fn format(&self, key: &str) -> String {
        let key = sanitize_key(key);
        if self.leading.is_empty() && self.trailing.is_empty() {
            return key;
        }

        self.leading
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(key.as_str()))
            .chain(self.trailing.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(".")
    }
}
