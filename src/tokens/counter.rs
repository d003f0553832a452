use std::sync::LazyLock;

use tiktoken_rs::CoreBPE;
use tracing::warn;

use super::pricing::{CostEstimate, ModelInfo, encoding_for};
use crate::llm::Message;

/// Per-message framing overhead in chat formats
const TOKENS_PER_MESSAGE: usize = 4;
/// Overhead for priming the assistant reply
const REPLY_PRIMING_TOKENS: usize = 3;
/// Characters per token when no tokenizer could be loaded
const CHARS_PER_TOKEN: usize = 4;

static O200K: LazyLock<Option<CoreBPE>> = LazyLock::new(|| {
    tiktoken_rs::o200k_base()
        .map_err(|e| warn!(encoding = "o200k_base", error = %e, "failed to load tokenizer"))
        .ok()
});

static CL100K: LazyLock<Option<CoreBPE>> = LazyLock::new(|| {
    tiktoken_rs::cl100k_base()
        .map_err(|e| warn!(encoding = "cl100k_base", error = %e, "failed to load tokenizer"))
        .ok()
});

/// Tokenizer for an encoding name. Anything but o200k uses cl100k.
fn tokenizer(encoding: &str) -> Option<&'static CoreBPE> {
    let bpe = match encoding {
        "o200k_base" => O200K.as_ref(),
        _ => None,
    };
    bpe.or_else(|| CL100K.as_ref())
}

/// Token counter backed by the BPE encoding of its default model.
///
/// Models without a known encoding are counted with cl100k. If no tokenizer
/// can be loaded at all, counts fall back to one token per four characters.
#[derive(Debug, Clone)]
pub struct TokenCounter {
    default_model: String,
    encoding: &'static str,
}

impl TokenCounter {
    pub fn new(default_model: impl Into<String>) -> Self {
        let default_model = default_model.into();
        let encoding = encoding_for(&default_model);
        Self {
            default_model,
            encoding,
        }
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// BPE encoding name used for counting
    pub fn encoding(&self) -> &'static str {
        self.encoding
    }

    /// Token count for `text`
    pub fn count(&self, text: &str) -> usize {
        match tokenizer(self.encoding) {
            Some(bpe) => bpe.encode_with_special_tokens(text).len(),
            None => text.chars().count().div_ceil(CHARS_PER_TOKEN),
        }
    }

    /// Token count for a chat transcript including framing overhead
    pub fn count_messages(&self, messages: &[Message]) -> usize {
        let body: usize = messages
            .iter()
            .map(|m| TOKENS_PER_MESSAGE + self.count(m.role.as_str()) + self.count(&m.content))
            .sum();
        body + REPLY_PRIMING_TOKENS
    }

    /// Cost estimate for the given model, or the default model when `None`
    pub fn estimate_cost(
        &self,
        input_tokens: usize,
        output_tokens: usize,
        model: Option<&str>,
    ) -> CostEstimate {
        let model = model.unwrap_or(&self.default_model);
        CostEstimate::compute(model, input_tokens, output_tokens)
    }

    /// Longest prefix of `text` that fits within `max_tokens`
    pub fn truncate_to_limit(&self, text: &str, max_tokens: usize) -> String {
        let Some(bpe) = tokenizer(self.encoding) else {
            return text.chars().take(max_tokens * CHARS_PER_TOKEN).collect();
        };

        let ids = bpe.encode_with_special_tokens(text);
        if ids.len() <= max_tokens {
            return text.to_string();
        }

        // A cut inside a multi-byte character does not decode; back off until it does.
        let mut cut = max_tokens;
        while cut > 0 {
            if let Ok(prefix) = bpe.decode(ids[..cut].to_vec()) {
                return prefix;
            }
            cut -= 1;
        }
        String::new()
    }

    /// Split `text` into chunks of at most `chunk_size` tokens, repeating
    /// `overlap` tokens between consecutive chunks.
    pub fn split_into_chunks(&self, text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
        let chunk_size = chunk_size.max(1);
        let Some(bpe) = tokenizer(self.encoding) else {
            return char_chunks(text, chunk_size * CHARS_PER_TOKEN, overlap * CHARS_PER_TOKEN);
        };

        let ids = bpe.encode_with_special_tokens(text);
        let decode = |range: std::ops::Range<usize>| bpe.decode(ids[range].to_vec()).ok();

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < ids.len() {
            let mut end = (start + chunk_size).min(ids.len());
            let mut chunk = decode(start..end);
            // Shrink, then grow, until the chunk ends on a character boundary.
            while chunk.is_none() && end > start + 1 {
                end -= 1;
                chunk = decode(start..end);
            }
            if chunk.is_none() {
                end = (start + chunk_size).min(ids.len());
                while chunk.is_none() && end < ids.len() {
                    end += 1;
                    chunk = decode(start..end);
                }
            }
            chunks.push(chunk.unwrap_or_default());
            if end >= ids.len() {
                break;
            }

            let mut next = end.saturating_sub(overlap).max(start + 1);
            while next < end && decode(next..end).is_none() {
                next += 1;
            }
            start = next;
        }
        chunks
    }

    pub fn model_info(&self, model: &str) -> ModelInfo {
        ModelInfo::lookup(model)
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new("gpt-4o")
    }
}

fn char_chunks(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start = end.saturating_sub(overlap).max(start + 1);
    }
    chunks
}
