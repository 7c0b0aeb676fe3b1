//! Shared input/output memory for a task invocation.

use std::sync::{Arc, Mutex};

/// Description of the memory regions one task invocation reads and writes.
///
/// Inputs are immutable shared slices. Outputs are shared buffers with a
/// declared element count that the task's post-process phase fills in.
/// Cloning is cheap and shares the underlying regions, so a caller holding
/// a clone observes whatever the task wrote.
pub struct TaskData<In, Out> {
    inputs: Vec<Arc<[In]>>,
    outputs: Vec<Arc<Mutex<Vec<Out>>>>,
    output_counts: Vec<usize>,
}

impl<In, Out> TaskData<In, Out> {
    /// Empty description with no declared regions.
    pub fn new() -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
            output_counts: Vec::new(),
        }
    }

    /// Declare one input region.
    pub fn push_input(&mut self, values: impl Into<Arc<[In]>>) -> &mut Self {
        self.inputs.push(values.into());
        self
    }

    /// Declare one output region of exactly `count` elements.
    pub fn add_output(&mut self, count: usize) -> &mut Self {
        self.outputs.push(Arc::new(Mutex::new(Vec::new())));
        self.output_counts.push(count);
        self
    }

    /// Number of declared input regions.
    pub fn inputs_len(&self) -> usize {
        self.inputs.len()
    }

    /// Number of declared output regions.
    pub fn outputs_len(&self) -> usize {
        self.outputs.len()
    }

    /// Element count of the input region at `index`.
    pub fn input_count(&self, index: usize) -> usize {
        self.inputs[index].len()
    }

    /// Declared element count of the output region at `index`.
    pub fn output_count(&self, index: usize) -> usize {
        self.output_counts[index]
    }

    /// Borrow the input region at `index`.
    pub fn input(&self, index: usize) -> &[In] {
        &self.inputs[index]
    }

    /// Fill the output region at `index`.
    ///
    /// Panics if `values` does not match the declared element count; that
    /// mismatch is a contract violation in the task implementation, not a
    /// recoverable condition.
    pub fn write_output(&self, index: usize, values: Vec<Out>) {
        assert_eq!(
            values.len(),
            self.output_counts[index],
            "output region {index} declared {} elements",
            self.output_counts[index],
        );
        let mut region = self.outputs[index]
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        *region = values;
    }

    /// Snapshot the output region at `index`. Empty until the task's
    /// post-process phase has written it.
    pub fn read_output(&self, index: usize) -> Vec<Out>
    where
        Out: Clone,
    {
        self.outputs[index]
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }
}

impl<In, Out> Clone for TaskData<In, Out> {
    fn clone(&self) -> Self {
        Self {
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            output_counts: self.output_counts.clone(),
        }
    }
}

impl<In, Out> Default for TaskData<In, Out> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_output_regions() {
        let mut data = TaskData::<i32, i64>::new();
        data.push_input(vec![1, 2, 3]).add_output(1);
        let handle = data.clone();

        data.write_output(0, vec![6]);
        assert_eq!(handle.read_output(0), vec![6]);
    }

    #[test]
    fn counts_reflect_declarations() {
        let mut data = TaskData::<u8, u8>::new();
        data.push_input(vec![0u8; 16]).add_output(4).add_output(2);
        assert_eq!(data.inputs_len(), 1);
        assert_eq!(data.outputs_len(), 2);
        assert_eq!(data.input_count(0), 16);
        assert_eq!(data.output_count(0), 4);
        assert_eq!(data.output_count(1), 2);
    }

    #[test]
    #[should_panic(expected = "declared 2 elements")]
    fn wrong_output_size_panics() {
        let mut data = TaskData::<i32, i32>::new();
        data.add_output(2);
        data.write_output(0, vec![1, 2, 3]);
    }
}
