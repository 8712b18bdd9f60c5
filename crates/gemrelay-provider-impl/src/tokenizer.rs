use tiktoken_rs::{CoreBPE, get_bpe_from_model, o200k_base};
use tracing::warn;

/// Local token count for text the provider did not bill.
pub trait TextTokenEstimator: Send + Sync {
    fn count_tokens(&self, model: &str, text: &str) -> u32;
}

/// BPE count with the model's own encoding, falling back to `o200k_base`
/// for models tiktoken does not know (every Gemini model).
#[derive(Debug, Default, Clone, Copy)]
pub struct TiktokenEstimator;

impl TextTokenEstimator for TiktokenEstimator {
    fn count_tokens(&self, model: &str, text: &str) -> u32 {
        if text.is_empty() {
            return 0;
        }
        match bpe_for_model(model) {
            Ok(bpe) => u32::try_from(bpe.encode_ordinary(text).len()).unwrap_or(u32::MAX),
            Err(err) => {
                warn!(event = "tokenizer_unavailable", model = %model, error = %err);
                approximate(text)
            }
        }
    }
}

fn bpe_for_model(model: &str) -> Result<CoreBPE, String> {
    get_bpe_from_model(model)
        .or_else(|_| o200k_base())
        .map_err(|err| err.to_string())
}

/// Roughly four characters per token.
fn approximate(text: &str) -> u32 {
    let chars = text.chars().count();
    u32::try_from(chars.div_ceil(4)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_unknown_model_with_fallback_encoding() {
        let estimator = TiktokenEstimator;
        let count = estimator.count_tokens("gemini-2.5-flash", "hello world, how are you?");
        assert!(count > 0);
        assert!(count < 25);
        assert_eq!(estimator.count_tokens("gemini-2.5-flash", ""), 0);
    }

    #[test]
    fn approximation() {
        assert_eq!(approximate("abcdefgh"), 2);
        assert_eq!(approximate("abc"), 1);
    }
}
