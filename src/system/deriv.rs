//! Per-variable derivative terms
//!
//! Each state variable `q_i` gets one [`DerivFuncBuilder`]: a list of source
//! terms and a list of sink terms, each a rate constant times a product of
//! state values.
//!
//! ```text
//! dq_i/dt = Σ_sources k·Π q[indices] − Σ_sinks k·Π q[indices]
//! ```
//!
//! A reaction species with coefficient `n` appears `n` times in the index
//! list of its side; the term itself carries no further multiplier.

/// One mass-action or transport term
#[derive(Debug, Clone, PartialEq)]
pub struct RateTerm {
    rate: f64,
    indices: Vec<usize>,
}

impl RateTerm {
    /// `rate · Π q[indices]`
    ///
    /// An index repeated `n` times raises that value to the power `n`.
    pub fn new(rate: f64, indices: Vec<usize>) -> Self {
        Self { rate, indices }
    }

    /// First-order term on a single state value
    pub fn transport(rate: f64, index: usize) -> Self {
        Self::new(rate, vec![index])
    }

    /// Rate constant in count-based units (1/s for first order)
    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    #[inline]
    fn eval(&self, q: &[f64]) -> f64 {
        let product: f64 = self.indices.iter().map(|&j| q[j]).product();
        self.rate * product
    }
}

/// Source and sink terms of one state variable
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivFuncBuilder {
    sources: Vec<RateTerm>,
    sinks: Vec<RateTerm>,
}

impl DerivFuncBuilder {
    pub fn new(sources: Vec<RateTerm>, sinks: Vec<RateTerm>) -> Self {
        Self { sources, sinks }
    }

    pub fn sources(&self) -> &[RateTerm] {
        &self.sources
    }

    pub fn sinks(&self) -> &[RateTerm] {
        &self.sinks
    }

    /// Number of source plus sink terms
    pub fn n_terms(&self) -> usize {
        self.sources.len() + self.sinks.len()
    }

    /// Evaluate the derivative for the full state `q`
    ///
    /// Does not allocate. The system is autonomous, `_t` is ignored.
    pub fn deriv(&self, q: &[f64], _t: f64) -> f64 {
        let gain: f64 = self.sources.iter().map(|term| term.eval(q)).sum();
        let loss: f64 = self.sinks.iter().map(|term| term.eval(q)).sum();
        gain - loss
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_builder_is_zero() {
        let builder = DerivFuncBuilder::default();
        assert_eq!(builder.deriv(&[1.0, 2.0], 0.0), 0.0);
        assert_eq!(builder.n_terms(), 0);
    }

    #[test]
    fn test_sources_minus_sinks() {
        // dq0/dt = 2·q1·q2 − 0.5·q0
        let builder = DerivFuncBuilder::new(vec![RateTerm::new(2.0, vec![1, 2])], vec![RateTerm::transport(0.5, 0)]);
        assert_relative_eq!(builder.deriv(&[4.0, 3.0, 5.0], 0.0), 30.0 - 2.0);
    }

    #[test]
    fn test_repeated_index_is_a_power() {
        // 2A → B, sink for A: k·A²
        let builder = DerivFuncBuilder::new(vec![], vec![RateTerm::new(0.1, vec![0, 0])]);
        assert_relative_eq!(builder.deriv(&[3.0], 0.0), -0.1 * 9.0);
    }

    #[test]
    fn test_time_is_ignored() {
        let builder = DerivFuncBuilder::new(vec![RateTerm::transport(1.0, 0)], vec![]);
        assert_eq!(builder.deriv(&[7.0], 0.0), builder.deriv(&[7.0], 1e6));
    }
}
