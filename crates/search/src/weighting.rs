/// Relative trust in the vector and text result lists for one query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryWeights {
    pub vector: f32,
    pub text: f32,
}

impl QueryWeights {
    #[must_use]
    pub const fn new(vector: f32, text: f32) -> Self {
        Self { vector, text }
    }

    /// Moves `shift` from vector to text (clamped so neither goes negative).
    #[must_use]
    pub fn shifted_toward_text(self, shift: f32) -> Self {
        let shift = shift.min(self.vector).max(0.0);
        Self::new(self.vector - shift, self.text + shift)
    }

    /// Scales the pair to sum to 1. A zero pair becomes vector-only.
    #[must_use]
    pub fn normalized(self) -> Self {
        let sum = self.vector + self.text;
        if sum <= 0.0 || !sum.is_finite() {
            return Self::new(1.0, 0.0);
        }
        Self::new(self.vector / sum, self.text / sum)
    }
}

/// Weights by query length.
///
/// Single words are lexically ambiguous, so vectors dominate hardest. Two words are the
/// likeliest to match verbatim and get the largest text share. Longer questions rarely appear
/// verbatim in the source, so vectors dominate again, slightly less than for one word.
#[must_use]
pub fn weights_for(query: &str) -> QueryWeights {
    match query.split_whitespace().count() {
        1 => QueryWeights::new(0.8, 0.2),
        2 => QueryWeights::new(0.65, 0.35),
        _ => QueryWeights::new(0.75, 0.25),
    }
}
