//! Batch.

/// A batch of transitions `(o_t, a_t, o_t+1, r_t, is_terminated_t)`.
///
/// Observations and actions are flattened in row-major order, one row per
/// transition.
pub trait TransitionBatch {
    /// Unpacks the data `(o_t, a_t, o_t+1, r_t, is_terminated_t)`.
    fn unpack(self) -> (Vec<f32>, Vec<f32>, Vec<f32>, Vec<f32>, Vec<i8>);

    /// Returns the number of transitions.
    fn len(&self) -> usize;

    /// Returns `true` if the batch has no transition.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimension of an observation.
    fn obs_dim(&self) -> usize;

    /// Dimension of an action.
    fn act_dim(&self) -> usize;
}
