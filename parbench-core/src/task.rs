//! Task lifecycle contract and its enforcing guard.

use crate::{Backend, TaskData};

/// Marker string present in every lifecycle-violation panic message.
pub const ORDER_VIOLATION: &str = "task phase order violated";

/// Lifecycle states a task moves through, strictly in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed, no phase called yet.
    Created,
    /// `validate` has run.
    Validated,
    /// `pre_process` has run.
    PreProcessed,
    /// `run` has run at least once.
    Ran,
    /// `post_process` has run; terminal.
    PostProcessed,
}

/// Whether a task instance is driven by functional tests or by the
/// performance harness. Observable metadata only; it never changes the
/// lifecycle rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TestingMode {
    /// Functional testing.
    #[default]
    Func,
    /// Performance measurement.
    Perf,
}

/// Contract implemented once per backend for each concrete algorithm.
///
/// Implementations hold a [`TaskData`] handle plus whatever private working
/// state the algorithm needs. Each phase reports success as `true`; the
/// phase ordering itself is enforced by [`Task`], not by implementations.
pub trait TaskImpl {
    /// Element type of the input regions.
    type Input;
    /// Element type of the output regions.
    type Output;

    /// Static backend discriminant, used for registration dispatch.
    const BACKEND: Backend;

    /// Construct a fresh implementation over shared task data.
    fn from_data(data: TaskData<Self::Input, Self::Output>) -> Self
    where
        Self: Sized;

    /// Check the declared region shapes against the algorithm's
    /// preconditions. Must not mutate outputs.
    fn validate(&mut self) -> bool;

    /// Materialize the internal working copy of the inputs.
    fn pre_process(&mut self) -> bool;

    /// Execute the algorithm body.
    fn run(&mut self) -> bool;

    /// Write the internal result back into the output regions.
    fn post_process(&mut self) -> bool;

    /// The shared data handle this task reads and writes.
    fn data(&self) -> &TaskData<Self::Input, Self::Output>;
}

/// Lifecycle guard around a [`TaskImpl`].
///
/// Phase methods may only be called in lifecycle order. Any out-of-order
/// call, and dropping the guard before the terminal state, panics with a
/// message containing [`ORDER_VIOLATION`]. The check is deliberately fatal
/// so misuse surfaces during testing instead of corrupting measurements.
///
/// One relaxation: `run` may be called again from the `Ran` state. The
/// timing engine measures the run phase in a loop while the surrounding
/// phases execute once outside it.
pub struct Task<T: TaskImpl> {
    inner: T,
    state: LifecycleState,
    mode: TestingMode,
}

impl<T: TaskImpl> std::fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("state", &self.state)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl<T: TaskImpl> Task<T> {
    /// Build a functional-mode task over `data`.
    pub fn new(data: TaskData<T::Input, T::Output>) -> Self {
        Self::with_mode(data, TestingMode::Func)
    }

    /// Build a task over `data` in the given mode.
    pub fn with_mode(data: TaskData<T::Input, T::Output>, mode: TestingMode) -> Self {
        Self {
            inner: T::from_data(data),
            state: LifecycleState::Created,
            mode,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Mode this task was constructed in.
    pub fn mode(&self) -> TestingMode {
        self.mode
    }

    /// Backend of the underlying implementation.
    pub fn backend(&self) -> Backend {
        T::BACKEND
    }

    /// The shared data handle of the underlying implementation.
    pub fn data(&self) -> &TaskData<T::Input, T::Output> {
        self.inner.data()
    }

    /// First phase: check region shapes against preconditions.
    pub fn validate(&mut self) -> bool {
        self.advance("validate", LifecycleState::Created, LifecycleState::Validated);
        self.inner.validate()
    }

    /// Second phase: build the internal working copy of the inputs.
    pub fn pre_process(&mut self) -> bool {
        self.advance(
            "pre_process",
            LifecycleState::Validated,
            LifecycleState::PreProcessed,
        );
        self.inner.pre_process()
    }

    /// Third phase: execute the algorithm body. Repeatable from `Ran`.
    pub fn run(&mut self) -> bool {
        if self.state != LifecycleState::PreProcessed && self.state != LifecycleState::Ran {
            panic!(
                "{ORDER_VIOLATION}: run called in state {:?}, expected PreProcessed or Ran",
                self.state
            );
        }
        self.state = LifecycleState::Ran;
        self.inner.run()
    }

    /// Terminal phase: write results back into the output regions.
    pub fn post_process(&mut self) -> bool {
        self.advance("post_process", LifecycleState::Ran, LifecycleState::PostProcessed);
        self.inner.post_process()
    }

    /// Dispose of a task that will not complete its lifecycle, without
    /// tripping the destruction check. Used by harnesses after a rejected
    /// validation or a failed phase; everywhere else an incomplete task is
    /// a bug and should stay fatal.
    pub fn abandon(mut self) {
        self.state = LifecycleState::PostProcessed;
    }

    fn advance(&mut self, phase: &str, expected: LifecycleState, next: LifecycleState) {
        if self.state != expected {
            panic!(
                "{ORDER_VIOLATION}: {phase} called in state {:?}, expected {expected:?}",
                self.state
            );
        }
        self.state = next;
    }
}

impl<T: TaskImpl> Drop for Task<T> {
    fn drop(&mut self) {
        if self.state != LifecycleState::PostProcessed && !std::thread::panicking() {
            panic!("{ORDER_VIOLATION}: task dropped in state {:?}", self.state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts the elements of its single input region.
    struct CountOnes {
        data: TaskData<i32, usize>,
        input: Vec<i32>,
        count: usize,
    }

    impl TaskImpl for CountOnes {
        type Input = i32;
        type Output = usize;
        const BACKEND: Backend = Backend::Seq;

        fn from_data(data: TaskData<i32, usize>) -> Self {
            Self {
                data,
                input: Vec::new(),
                count: 0,
            }
        }

        fn validate(&mut self) -> bool {
            self.data.inputs_len() == 1
                && self.data.input_count(0) > 0
                && self.data.outputs_len() == 1
                && self.data.output_count(0) == 1
        }

        fn pre_process(&mut self) -> bool {
            self.input = self.data.input(0).to_vec();
            self.count = 0;
            true
        }

        fn run(&mut self) -> bool {
            self.count = self.input.iter().filter(|&&v| v == 1).count();
            true
        }

        fn post_process(&mut self) -> bool {
            self.data.write_output(0, vec![self.count]);
            true
        }

        fn data(&self) -> &TaskData<i32, usize> {
            &self.data
        }
    }

    fn ones(n: usize) -> TaskData<i32, usize> {
        let mut data = TaskData::new();
        data.push_input(vec![1; n]).add_output(1);
        data
    }

    #[test]
    fn full_cycle_counts_twenty_ones() {
        let data = ones(20);
        let mut task = Task::<CountOnes>::new(data.clone());
        assert!(task.validate());
        assert!(task.pre_process());
        assert!(task.run());
        assert!(task.post_process());
        assert_eq!(task.state(), LifecycleState::PostProcessed);
        assert_eq!(data.read_output(0), vec![20]);
    }

    #[test]
    fn empty_input_fails_validation() {
        let mut data = TaskData::<i32, usize>::new();
        data.push_input(Vec::<i32>::new()).add_output(1);
        let mut task = Task::<CountOnes>::new(data);
        assert!(!task.validate());
        task.abandon();
    }

    #[test]
    fn run_is_repeatable_from_ran() {
        let mut task = Task::<CountOnes>::new(ones(5));
        assert!(task.validate());
        assert!(task.pre_process());
        for _ in 0..3 {
            assert!(task.run());
        }
        assert!(task.post_process());
    }

    #[test]
    fn perf_mode_is_observable() {
        let mut task = Task::<CountOnes>::with_mode(ones(1), TestingMode::Perf);
        assert_eq!(task.mode(), TestingMode::Perf);
        assert_eq!(task.backend(), Backend::Seq);
        task.validate();
        task.pre_process();
        task.run();
        task.post_process();
    }

    #[test]
    #[should_panic(expected = "task phase order violated")]
    fn run_before_validate_panics() {
        let mut task = Task::<CountOnes>::new(ones(1));
        task.run();
    }

    #[test]
    #[should_panic(expected = "task phase order violated")]
    fn double_validate_panics() {
        let mut task = Task::<CountOnes>::new(ones(1));
        task.validate();
        task.validate();
    }

    #[test]
    #[should_panic(expected = "task phase order violated")]
    fn post_process_before_run_panics() {
        let mut task = Task::<CountOnes>::new(ones(1));
        task.validate();
        task.pre_process();
        task.post_process();
    }

    #[test]
    #[should_panic(expected = "task phase order violated")]
    fn drop_before_terminal_state_panics() {
        let mut task = Task::<CountOnes>::new(ones(1));
        task.validate();
        drop(task);
    }

    #[test]
    fn abandon_suppresses_drop_check() {
        let mut task = Task::<CountOnes>::new(ones(1));
        task.validate();
        task.abandon();
    }
}
