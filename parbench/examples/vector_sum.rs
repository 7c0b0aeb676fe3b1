//! Demo benchmark binary: summing a large vector on every backend.
//!
//! Run it single-process:
//!
//! ```text
//! cargo run --release --example vector_sum
//! ```
//!
//! or as a four-worker process group:
//!
//! ```text
//! cargo run --release --example vector_sum -- --procs 4
//! ```

use parbench::prelude::*;
use rayon::prelude::*;
use std::sync::Arc;

const INPUT_LEN: usize = 1 << 22;

/// Shared scaffolding for every sum implementation: the phases only
/// differ in how `run` folds the working copy.
macro_rules! sum_task {
    ($name:ident, $backend:expr, |$input:ident| $body:expr) => {
        struct $name {
            data: TaskData<i32, i64>,
            input: Vec<i32>,
            sum: i64,
        }

        impl TaskImpl for $name {
            type Input = i32;
            type Output = i64;
            const BACKEND: Backend = $backend;

            fn from_data(data: TaskData<i32, i64>) -> Self {
                Self {
                    data,
                    input: Vec::new(),
                    sum: 0,
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
                self.sum = 0;
                true
            }

            fn run(&mut self) -> bool {
                let $input: &[i32] = &self.input;
                self.sum = $body;
                true
            }

            fn post_process(&mut self) -> bool {
                self.data.write_output(0, vec![self.sum]);
                true
            }

            fn data(&self) -> &TaskData<i32, i64> {
                &self.data
            }
        }
    };
}

sum_task!(SumSeq, Backend::Seq, |input| {
    input.iter().map(|&v| i64::from(v)).sum()
});

sum_task!(SumRayon, Backend::Rayon, |input| {
    input.par_iter().map(|&v| i64::from(v)).sum()
});

sum_task!(SumThreads, Backend::Threads, |input| {
    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let chunk_len = input.len().div_ceil(workers);
    std::thread::scope(|scope| {
        // Spawn every worker before joining any of them.
        let handles: Vec<_> = input
            .chunks(chunk_len)
            .map(|chunk| scope.spawn(move || chunk.iter().map(|&v| i64::from(v)).sum::<i64>()))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or(0))
            .sum()
    })
});

sum_task!(SumSimd, Backend::Simd, |input| {
    // Four independent accumulators keep the reduction lanes busy.
    let mut lanes = [0i64; 4];
    let mut chunks = input.chunks_exact(4);
    for chunk in &mut chunks {
        lanes[0] += i64::from(chunk[0]);
        lanes[1] += i64::from(chunk[1]);
        lanes[2] += i64::from(chunk[2]);
        lanes[3] += i64::from(chunk[3]);
    }
    let tail: i64 = chunks.remainder().iter().map(|&v| i64::from(v)).sum();
    lanes.iter().sum::<i64>() + tail
});

sum_task!(SumProc, Backend::Proc, |input| {
    // Every worker folds the same input; the harness brackets the timed
    // region with group barriers so the recorded time spans all workers.
    input.iter().map(|&v| i64::from(v)).sum()
});

sum_task!(SumAll, Backend::All, |input| {
    input.par_iter().map(|&v| i64::from(v)).sum()
});

fn make_input() -> TaskData<i32, i64> {
    let mut data = TaskData::new();
    data.push_input(vec![1; INPUT_LEN]).add_output(1);
    data
}

fn check_sum(data: &TaskData<i32, i64>) -> bool {
    data.read_output(0) == vec![data.input_count(0) as i64]
}

fn main() -> anyhow::Result<()> {
    parbench::run(|suite| {
        suite
            .family(
                "demos/sum_threads/settings.toml",
                make_input,
                Some(Arc::new(check_sum)),
            )
            .add::<SumSeq>()
            .add::<SumRayon>()
            .add::<SumThreads>()
            .add::<SumSimd>()
            .add::<SumAll>();

        suite
            .family(
                "demos/sum_processes/settings.toml",
                make_input,
                Some(Arc::new(check_sum)),
            )
            .add::<SumSeq>()
            .add::<SumProc>();
    })
}
