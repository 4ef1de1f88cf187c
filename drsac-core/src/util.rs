//! Scaling between agent-internal and environment actions.
//!
//! Agents act in `[-1, 1]` per dimension. Environments act in
//! `[-max_action, max_action]`. The conversion is done by the driver.

/// Maps an agent action in `[-1, 1]` to `[-max_action, max_action]`.
pub fn action_adapter(a: &[f32], max_action: f32) -> Vec<f32> {
    a.iter().map(|x| x * max_action).collect()
}

/// Maps an environment action in `[-max_action, max_action]` back to `[-1, 1]`.
pub fn action_adapter_reverse(act: &[f32], max_action: f32) -> Vec<f32> {
    act.iter().map(|x| x / max_action).collect()
}
