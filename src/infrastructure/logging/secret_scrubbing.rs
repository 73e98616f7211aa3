use regex::Regex;
use std::io::{self, Write};
use std::sync::LazyLock;
use tracing_subscriber::fmt::MakeWriter;

/// Pattern/replacement pairs applied in order.
const PATTERNS: &[(&str, &str)] = &[
    // Anthropic API keys: sk-ant-api03-...
    (r"sk-ant-[a-zA-Z0-9_-]{20,}", "[API_KEY_REDACTED]"),
    // Bearer tokens in Authorization headers
    (r"Bearer\s+[a-zA-Z0-9_.\-]+", "Bearer [TOKEN_REDACTED]"),
    // Generic key/token fields
    (
        r#"(?P<key>["']?(?:api_key|apikey|x-api-key|token|secret)["']?\s*[:=]\s*)["']?[a-zA-Z0-9_.\-]{20,}["']?"#,
        "${key}[REDACTED]",
    ),
    // Password fields
    (
        r#"(?P<key>["']?password["']?\s*[:=]\s*)["']?[^"'\s,}]+["']?"#,
        "${key}[REDACTED]",
    ),
];

static SCRUBBER: LazyLock<SecretScrubber> = LazyLock::new(SecretScrubber::new);

/// Redacts credentials from text before it reaches a log sink or an error
/// message.
struct SecretScrubber {
    patterns: Vec<(Regex, &'static str)>,
}

impl SecretScrubber {
    fn new() -> Self {
        let patterns = PATTERNS
            .iter()
            .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, *replacement)))
            .collect();
        Self { patterns }
    }

    fn scrub(&self, message: &str) -> String {
        self.patterns
            .iter()
            .fold(message.to_string(), |text, (re, replacement)| {
                re.replace_all(&text, *replacement).into_owned()
            })
    }
}

/// Scrub a message of sensitive data.
pub fn scrub_secrets(message: &str) -> String {
    SCRUBBER.scrub(message)
}

/// [`MakeWriter`] wrapper that scrubs every formatted event before writing.
#[derive(Debug, Clone)]
pub struct ScrubbingMakeWriter<M> {
    inner: M,
}

impl<M> ScrubbingMakeWriter<M> {
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

impl<'a, M: MakeWriter<'a>> MakeWriter<'a> for ScrubbingMakeWriter<M> {
    type Writer = ScrubbingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        ScrubbingWriter {
            inner: self.inner.make_writer(),
        }
    }
}

pub struct ScrubbingWriter<W> {
    inner: W,
}

impl<W: Write> Write for ScrubbingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        self.inner.write_all(scrub_secrets(&text).as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
