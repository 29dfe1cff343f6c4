// src/route.rs
//
// Weighted mixing matrix between one node's outputs and another's inputs.

use crate::error::RouteError;
use crate::node::Sample;

/// A `(source outputs) x (target inputs)` weight matrix.
///
/// Pulling a source adds `output[i] * weight(i, j)` into `input[j]` for every
/// pair, so one route can express plain wiring, fan-out, summing or any
/// many-to-many mix.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    source_arity: usize,
    target_arity: usize,

    /// Row-major: `weights[i * target_arity + j]`.
    weights: Vec<Sample>,
}

impl Route {
    /// All-zero matrix of the given shape.
    pub fn zeros(source_arity: usize, target_arity: usize) -> Self {
        Self {
            source_arity,
            target_arity,
            weights: vec![0.0; source_arity * target_arity],
        }
    }

    /// Output `i` feeds input `i`, nothing else.
    pub fn identity(arity: usize) -> Self {
        let mut route = Self::zeros(arity, arity);
        for i in 0..arity {
            route.set_weight(i, i, 1.0);
        }
        route
    }

    /// One output copied to every one of `target_arity` inputs.
    pub fn broadcast(target_arity: usize) -> Self {
        Self::filled(1, target_arity, 1.0)
    }

    /// Every one of `source_arity` outputs summed into a single input.
    pub fn sum(source_arity: usize) -> Self {
        Self::filled(source_arity, 1, 1.0)
    }

    fn filled(source_arity: usize, target_arity: usize, weight: Sample) -> Self {
        Self {
            source_arity,
            target_arity,
            weights: vec![weight; source_arity * target_arity],
        }
    }

    /// Guess a route from the two arities.
    ///
    /// - equal arities: identity
    /// - one source output: broadcast
    /// - one target input: sum
    /// - anything else: error, never padding or truncation
    pub fn default_for(source_arity: usize, target_arity: usize) -> Result<Self, RouteError> {
        if source_arity == target_arity {
            Ok(Self::identity(source_arity))
        } else if source_arity == 1 {
            Ok(Self::broadcast(target_arity))
        } else if target_arity == 1 {
            Ok(Self::sum(source_arity))
        } else {
            Err(RouteError::NoDefaultRoute {
                source_arity,
                target_arity,
            })
        }
    }

    /// Build from an explicit table, one row per source output.
    pub fn from_rows(rows: Vec<Vec<Sample>>) -> Result<Self, RouteError> {
        let expected = rows.first().map_or(0, Vec::len);
        if expected == 0 {
            return Err(RouteError::EmptyMatrix);
        }

        let mut weights = Vec::with_capacity(rows.len() * expected);
        for (row, values) in rows.iter().enumerate() {
            if values.len() != expected {
                return Err(RouteError::RaggedMatrix {
                    row,
                    len: values.len(),
                    expected,
                });
            }
            weights.extend_from_slice(values);
        }

        Ok(Self {
            source_arity: rows.len(),
            target_arity: expected,
            weights,
        })
    }

    #[inline]
    pub fn source_arity(&self) -> usize {
        self.source_arity
    }

    #[inline]
    pub fn target_arity(&self) -> usize {
        self.target_arity
    }

    #[inline]
    pub fn weight(&self, source: usize, target: usize) -> Sample {
        self.weights[source * self.target_arity + target]
    }

    #[inline]
    pub fn set_weight(&mut self, source: usize, target: usize, weight: Sample) {
        self.weights[source * self.target_arity + target] = weight;
    }

    /// `input += weights^T * output`.
    ///
    /// Both slices must match the route's shape; the graph checks this when
    /// the route is attached.
    pub fn accumulate(&self, output: &[Sample], input: &mut [Sample]) {
        debug_assert_eq!(output.len(), self.source_arity);
        debug_assert_eq!(input.len(), self.target_arity);

        for (row, &value) in self.weights.chunks_exact(self.target_arity.max(1)).zip(output) {
            for (slot, &weight) in input.iter_mut().zip(row) {
                *slot += value * weight;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_identity_has_no_crosstalk() {
        let route = Route::default_for(2, 2).unwrap();
        let mut input = [0.0; 2];
        route.accumulate(&[0.25, -0.5], &mut input);
        assert_eq!(input, [0.25, -0.5]);
    }

    #[test]
    fn test_default_broadcast() {
        let route = Route::default_for(1, 3).unwrap();
        let mut input = [0.0; 3];
        route.accumulate(&[0.75], &mut input);
        assert_eq!(input, [0.75, 0.75, 0.75]);
    }

    #[test]
    fn test_default_sum() {
        let route = Route::default_for(3, 1).unwrap();
        let mut input = [0.0; 1];
        route.accumulate(&[0.25, 0.5, 0.125], &mut input);
        assert_eq!(input, [0.875]);
    }

    #[test]
    fn test_no_default_for_mismatched_arities() {
        assert_eq!(
            Route::default_for(2, 3),
            Err(RouteError::NoDefaultRoute {
                source_arity: 2,
                target_arity: 3
            })
        );
    }

    #[test]
    fn test_accumulate_adds_to_existing_input() {
        let route = Route::identity(1);
        let mut input = [1.0];
        route.accumulate(&[0.5], &mut input);
        assert_eq!(input, [1.5]);
    }

    #[test]
    fn test_explicit_matrix_mixes() {
        // Swap the two channels and bleed half of the left into the right.
        let route = Route::from_rows(vec![vec![0.0, 1.0], vec![1.0, 0.5]]).unwrap();
        assert_eq!(route.source_arity(), 2);
        assert_eq!(route.target_arity(), 2);

        let mut input = [0.0; 2];
        route.accumulate(&[0.5, 1.0], &mut input);
        assert_eq!(input, [1.0, 1.0]);
    }

    #[test]
    fn test_explicit_matrix_must_be_rectangular() {
        assert_eq!(
            Route::from_rows(vec![vec![1.0, 0.0], vec![1.0]]),
            Err(RouteError::RaggedMatrix {
                row: 1,
                len: 1,
                expected: 2
            })
        );
        assert_eq!(Route::from_rows(vec![]), Err(RouteError::EmptyMatrix));
        assert_eq!(Route::from_rows(vec![vec![]]), Err(RouteError::EmptyMatrix));
    }
}
