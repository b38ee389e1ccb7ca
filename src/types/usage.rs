//! Token usage accounting.

use serde::{Deserialize, Serialize};

/// Token usage reported by the provider.
///
/// Fields are `None` when the provider never reported them ("not observed"
/// sentinel); a stream that ends without a completion chunk surfaces a
/// default all-`None` usage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    /// Tokens consumed by the prompt.
    pub prompt_tokens: Option<u64>,
    /// Tokens produced by the completion.
    pub completion_tokens: Option<u64>,
    /// Total tokens.
    pub total_tokens: Option<u64>,
}

impl Usage {
    /// Usage with known prompt/completion counts; total is their sum.
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens: Some(prompt_tokens),
            completion_tokens: Some(completion_tokens),
            total_tokens: Some(prompt_tokens + completion_tokens),
        }
    }

    /// Field-wise sum. A field stays unobserved only when it is unobserved
    /// on both sides; otherwise the missing side counts as zero.
    pub fn add(&mut self, other: &Usage) {
        fn sum(a: Option<u64>, b: Option<u64>) -> Option<u64> {
            match (a, b) {
                (None, None) => None,
                _ => Some(a.unwrap_or(0) + b.unwrap_or(0)),
            }
        }
        self.prompt_tokens = sum(self.prompt_tokens, other.prompt_tokens);
        self.completion_tokens = sum(self.completion_tokens, other.completion_tokens);
        self.total_tokens = sum(self.total_tokens, other.total_tokens);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_field_wise_across_steps() {
        let mut total = Usage::new(10, 20);
        total.add(&Usage::new(10, 5));
        assert_eq!(total.prompt_tokens, Some(20));
        assert_eq!(total.completion_tokens, Some(25));
        assert_eq!(total.total_tokens, Some(45));
    }

    #[test]
    fn unobserved_fields_stay_unobserved() {
        let mut total = Usage::default();
        total.add(&Usage::default());
        assert_eq!(total, Usage::default());

        total.add(&Usage::new(3, 4));
        assert_eq!(total.total_tokens, Some(7));
    }
}
