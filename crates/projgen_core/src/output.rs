//! Output buffer with tagged-line removal.

use crate::error::GenResult;
use crate::resolver::Resolver;
use crate::value::OMIT_TAG;

/// Accumulates resolved template text for one output file.
///
/// Lines carrying [`OMIT_TAG`] are dropped by [`OutputBuffer::finalize`]. Line
/// terminators of the kept lines are preserved byte for byte.
#[derive(Debug, Default, Clone)]
pub struct OutputBuffer {
    text: String,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `template` against the active bindings and append it.
    pub fn write(&mut self, resolver: &Resolver, template: &str) -> GenResult<()> {
        let resolved = resolver.resolve(template)?;
        self.text.push_str(&resolved);
        Ok(())
    }

    /// Append text without resolving it.
    pub fn write_verbatim(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The accumulated text before tagged lines are removed.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Drop every tagged line and return the final bytes.
    pub fn finalize(self) -> Vec<u8> {
        remove_tagged_lines(&self.text).into_bytes()
    }
}

/// Remove every line containing [`OMIT_TAG`] in a single pass.
///
/// Kept lines retain their own terminator (`\n` or `\r\n`); a final line
/// without a terminator stays without one.
pub fn remove_tagged_lines(text: &str) -> String {
    if !text.contains(OMIT_TAG) {
        return text.to_string();
    }

    text.split_inclusive('\n')
        .filter(|line| !line.contains(OMIT_TAG))
        .collect()
}
