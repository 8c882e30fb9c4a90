//! Allow/ignore filtering of repository file paths.
//!
//! Patterns use shell `fnmatch` rules: `*` matches any run of characters
//! (slashes included), `?` matches exactly one, and `[...]` is a character
//! class (`[!...]` negates, `a-z` ranges are allowed).

/// Weights, configs and tokenizer files.
pub const DEFAULT_ALLOW_PATTERNS: &[&str] = &[
    "*.safetensors",
    "*.bin",
    "*.json",
    "*.txt",
    "tokenizer.model",
    "*.tiktoken",
    "tokenizer/*",
];

/// Alternative export formats, legacy PyTorch pickles and docs.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    "*.onnx*",
    "*.pb",
    "*.h5",
    "*.msgpack",
    "*.ckpt",
    "*pytorch_model*",
    "training_args.json",
    "*.md",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePatterns {
    allow: Vec<String>,
    ignore: Vec<String>,
}

impl FilePatterns {
    pub fn new(allow: Vec<String>, ignore: Vec<String>) -> Self {
        Self { allow, ignore }
    }

    /// A path is selected when some allow pattern matches and no ignore pattern does.
    pub fn is_match(&self, path: &str) -> bool {
        self.allow.iter().any(|p| glob_match(p, path))
            && !self.ignore.iter().any(|p| glob_match(p, path))
    }

    pub fn select<'a, I>(&self, paths: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        paths
            .into_iter()
            .filter(|p| self.is_match(p))
            .map(str::to_string)
            .collect()
    }
}

impl Default for FilePatterns {
    fn default() -> Self {
        Self::new(
            DEFAULT_ALLOW_PATTERNS.iter().map(|p| p.to_string()).collect(),
            DEFAULT_IGNORE_PATTERNS.iter().map(|p| p.to_string()).collect(),
        )
    }
}

/// Match `text` against an fnmatch-style `pattern`.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    // Position of the last `*` seen and the text index it is currently absorbing up to.
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() {
            match pattern[p] {
                '*' => {
                    backtrack = Some((p, t));
                    p += 1;
                    continue;
                }
                '?' => {
                    p += 1;
                    t += 1;
                    continue;
                }
                '[' => {
                    if let Some((matched, next)) = match_class(&pattern, p, text[t]) {
                        if matched {
                            p = next;
                            t += 1;
                            continue;
                        }
                    } else if text[t] == '[' {
                        // Unterminated class is a literal '['
                        p += 1;
                        t += 1;
                        continue;
                    }
                }
                c if c == text[t] => {
                    p += 1;
                    t += 1;
                    continue;
                }
                _ => {}
            }
        }

        match backtrack {
            Some((star, absorbed)) => {
                p = star + 1;
                t = absorbed + 1;
                backtrack = Some((star, absorbed + 1));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Evaluate the class starting at `pattern[start] == '['` against `c`.
/// Returns whether it matched and the index just past the closing `]`,
/// or `None` if the class is never closed.
fn match_class(pattern: &[char], start: usize, c: char) -> Option<(bool, usize)> {
    let mut i = start + 1;
    let negate = matches!(pattern.get(i), Some('!') | Some('^'));
    if negate {
        i += 1;
    }

    let mut matched = false;
    let mut first = true;
    while i < pattern.len() {
        let lo = pattern[i];
        if lo == ']' && !first {
            return Some((matched != negate, i + 1));
        }
        first = false;

        if i + 2 < pattern.len() && pattern[i + 1] == '-' && pattern[i + 2] != ']' {
            let hi = pattern[i + 2];
            if lo <= c && c <= hi {
                matched = true;
            }
            i += 3;
        } else {
            if lo == c {
                matched = true;
            }
            i += 1;
        }
    }
    None
}
